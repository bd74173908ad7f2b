use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::Store;
use crate::config::ClientOptions;
use crate::error::Error;
use crate::models::{
    Application, ApplicationDetail, ApplicationRequirement, ApplicationUpdate,
    ApplicationWithUniversity, NewApplication, NewParent, NewRequirement, NewStudent, Page,
    Parent, ParentStudentLink, ParentUpdate, RequirementUpdate, Student, StudentUpdate,
    University, UniversityQuery,
};
use crate::permissions::Role;
use crate::postgrest::{
    contains_pattern, quote_list_value, CountOption, FilterOperator, PostgrestClient,
};

const WITH_UNIVERSITY: &str = "*,universities(*)";
const WITH_REQUIREMENTS: &str = "*,universities(*),application_requirements(*)";
const WITH_LINKS: &str = "*,parent_students(student_id)";

/// Row of the `user_roles` table
#[derive(Debug, Deserialize)]
struct UserRoleRow {
    role: Role,
}

#[derive(Debug, Deserialize)]
struct LinkedStudent {
    student_id: Uuid,
}

/// `parents` row with its `parent_students` links embedded
#[derive(Debug, Deserialize)]
struct ParentRow {
    id: Uuid,
    user_id: String,
    name: String,
    email: String,
    #[serde(default)]
    parent_students: Vec<LinkedStudent>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ParentRow> for Parent {
    fn from(row: ParentRow) -> Self {
        Parent {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            email: row.email,
            student_ids: row.parent_students.into_iter().map(|l| l.student_id).collect(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApplicationDetailRow {
    #[serde(flatten)]
    application: Application,
    #[serde(default)]
    universities: Option<University>,
    #[serde(default)]
    application_requirements: Vec<ApplicationRequirement>,
}

/// Store backed by the PostgREST API of a Supabase project
///
/// Expects the schema in `migrations/0001_admissions.sql`: the
/// trigger-maintained `user_roles` table, the `parent_students` link table, the unique
/// `(student_id, university_id)` constraint and the `delete_application`
/// function.
#[derive(Clone)]
pub struct SupabaseStore {
    url: String,
    key: String,
    client: Client,
    options: ClientOptions,
}

impl SupabaseStore {
    pub fn new(url: &str, key: &str, options: ClientOptions) -> Self {
        Self::with_client(url, key, Client::new(), options)
    }

    pub fn with_client(url: &str, key: &str, client: Client, options: ClientOptions) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            key: key.to_string(),
            client,
            options,
        }
    }

    fn from(&self, table: &str) -> PostgrestClient {
        PostgrestClient::new(
            &self.url,
            &self.key,
            table,
            self.client.clone(),
            self.options.clone(),
        )
    }

    async fn parent_where(&self, column: &str, value: &str) -> Result<Option<Parent>, Error> {
        let row = self
            .from("parents")
            .select(WITH_LINKS)
            .eq(column, value)
            .execute_one::<ParentRow>()
            .await?;
        Ok(row.map(Parent::from))
    }

    async fn parent(&self, id: Uuid) -> Result<Parent, Error> {
        self.parent_where("id", &id.to_string())
            .await?
            .ok_or_else(|| Error::not_found("Parent profile not found"))
    }
}

fn single<T>(rows: Vec<T>, missing: &str) -> Result<T, Error> {
    rows.into_iter().next().ok_or_else(|| Error::not_found(missing))
}

/// The row echoed back by an insert with `return=representation`
fn inserted<T>(rows: Vec<T>, table: &str) -> Result<T, Error> {
    rows.into_iter()
        .next()
        .ok_or_else(|| Error::database(format!("insert into {table} returned no row")))
}

/// A second profile for the same user trips the `user_roles` primary key
fn profile_conflict(e: Error) -> Error {
    match e {
        Error::Conflict(detail) => {
            debug!(%detail, "profile insert rejected by constraint");
            Error::conflict("Profile already exists")
        }
        e => e,
    }
}

#[async_trait]
impl Store for SupabaseStore {
    async fn resolve_role(&self, user_id: &str) -> Result<Option<Role>, Error> {
        let row = self
            .from("user_roles")
            .select("role")
            .eq("user_id", user_id)
            .execute_one::<UserRoleRow>()
            .await?;
        Ok(row.map(|r| r.role))
    }

    async fn student_by_user(&self, user_id: &str) -> Result<Option<Student>, Error> {
        self.from("students")
            .select("*")
            .eq("user_id", user_id)
            .execute_one()
            .await
    }

    async fn student(&self, id: Uuid) -> Result<Option<Student>, Error> {
        self.from("students")
            .select("*")
            .eq("id", id)
            .execute_one()
            .await
    }

    async fn create_student(&self, student: NewStudent) -> Result<Student, Error> {
        let rows = self
            .from("students")
            .insert(&student)
            .execute()
            .await
            .map_err(profile_conflict)?;
        let created: Student = inserted(rows, "students")?;
        info!(student_id = %created.id, "created student profile");
        Ok(created)
    }

    async fn update_student(&self, id: Uuid, update: StudentUpdate) -> Result<Student, Error> {
        let rows = self
            .from("students")
            .update(&update)
            .eq("id", id)
            .execute()
            .await?;
        single(rows, "Student profile not found")
    }

    async fn parent_by_user(&self, user_id: &str) -> Result<Option<Parent>, Error> {
        self.parent_where("user_id", user_id).await
    }

    async fn create_parent(&self, parent: NewParent) -> Result<Parent, Error> {
        let rows = self
            .from("parents")
            .insert(&parent)
            .execute::<ParentRow>()
            .await
            .map_err(profile_conflict)?;
        let created: Parent = inserted(rows, "parents")?.into();
        info!(parent_id = %created.id, "created parent profile");
        Ok(created)
    }

    async fn update_parent(&self, id: Uuid, update: ParentUpdate) -> Result<Parent, Error> {
        let rows = self
            .from("parents")
            .update(&update)
            .eq("id", id)
            .execute::<serde_json::Value>()
            .await?;
        if rows.is_empty() {
            return Err(Error::not_found("Parent profile not found"));
        }
        // re-read so the links are embedded
        self.parent(id).await
    }

    async fn link_student(&self, parent_id: Uuid, student_id: Uuid) -> Result<(), Error> {
        if self.student(student_id).await?.is_none() {
            return Err(Error::not_found(format!("Student {student_id} not found")));
        }

        let link = ParentStudentLink {
            parent_id,
            student_id,
        };
        match self
            .from("parent_students")
            .insert(&link)
            .execute_no_return()
            .await
        {
            Ok(()) => {}
            // already linked
            Err(Error::Conflict(_)) => debug!(%parent_id, %student_id, "link already present"),
            Err(e) => return Err(e),
        }
        Ok(())
    }

    async fn linked_students(&self, parent_id: Uuid) -> Result<Vec<Student>, Error> {
        let links = self
            .from("parent_students")
            .select("student_id")
            .eq("parent_id", parent_id)
            .execute::<LinkedStudent>()
            .await?;
        if links.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = links.into_iter().map(|l| l.student_id).collect();
        self.from("students")
            .select("*")
            .in_list("id", &ids)
            .order("name", true)
            .execute()
            .await
    }

    async fn applications_for_student(
        &self,
        student_id: Uuid,
    ) -> Result<Vec<ApplicationWithUniversity>, Error> {
        self.from("applications")
            .select(WITH_UNIVERSITY)
            .eq("student_id", student_id)
            .order("created_at", false)
            .execute()
            .await
    }

    async fn application(&self, id: Uuid) -> Result<Option<Application>, Error> {
        self.from("applications")
            .select("*")
            .eq("id", id)
            .execute_one()
            .await
    }

    async fn application_with_university(
        &self,
        id: Uuid,
    ) -> Result<Option<ApplicationWithUniversity>, Error> {
        self.from("applications")
            .select(WITH_UNIVERSITY)
            .eq("id", id)
            .execute_one()
            .await
    }

    async fn application_detail(&self, id: Uuid) -> Result<Option<ApplicationDetail>, Error> {
        let row = self
            .from("applications")
            .select(WITH_REQUIREMENTS)
            .eq("id", id)
            .execute_one::<ApplicationDetailRow>()
            .await?;
        Ok(row.map(|r| {
            ApplicationDetail::new(r.application, r.universities, r.application_requirements)
        }))
    }

    async fn create_application(
        &self,
        application: NewApplication,
    ) -> Result<Application, Error> {
        let rows = match self
            .from("applications")
            .insert(&application)
            .execute()
            .await
        {
            Ok(rows) => rows,
            Err(Error::Conflict(detail)) => {
                debug!(%detail, "duplicate application rejected by constraint");
                return Err(Error::conflict(
                    "Application already exists for this university",
                ));
            }
            Err(e) => return Err(e),
        };
        let created: Application = inserted(rows, "applications")?;
        info!(application_id = %created.id, student_id = %created.student_id, "created application");
        Ok(created)
    }

    async fn update_application(
        &self,
        id: Uuid,
        update: ApplicationUpdate,
    ) -> Result<Application, Error> {
        let rows = self
            .from("applications")
            .update(&update)
            .eq("id", id)
            .execute()
            .await?;
        single(rows, "Application not found")
    }

    async fn delete_application(&self, id: Uuid) -> Result<(), Error> {
        let deleted = self
            .from("applications")
            .rpc("delete_application", json!({ "application_id": id }))
            .execute::<bool>()
            .await
            .map_err(|e| {
                warn!(application_id = %id, error = %e, "delete_application failed");
                e
            })?;

        if !deleted {
            return Err(Error::not_found("Application not found"));
        }
        info!(application_id = %id, "deleted application");
        Ok(())
    }

    async fn requirements(
        &self,
        application_id: Uuid,
    ) -> Result<Vec<ApplicationRequirement>, Error> {
        self.from("application_requirements")
            .select("*")
            .eq("application_id", application_id)
            .order("created_at", true)
            .execute()
            .await
    }

    async fn requirement(&self, id: Uuid) -> Result<Option<ApplicationRequirement>, Error> {
        self.from("application_requirements")
            .select("*")
            .eq("id", id)
            .execute_one()
            .await
    }

    async fn create_requirement(
        &self,
        requirement: NewRequirement,
    ) -> Result<ApplicationRequirement, Error> {
        let rows = self
            .from("application_requirements")
            .insert(&requirement)
            .execute()
            .await?;
        inserted(rows, "application_requirements")
    }

    async fn update_requirement(
        &self,
        id: Uuid,
        update: RequirementUpdate,
    ) -> Result<ApplicationRequirement, Error> {
        let rows = self
            .from("application_requirements")
            .update(&update)
            .eq("id", id)
            .execute()
            .await?;
        single(rows, "Requirement not found")
    }

    async fn delete_requirement(&self, id: Uuid) -> Result<(), Error> {
        let rows = self
            .from("application_requirements")
            .delete()
            .eq("id", id)
            .execute::<serde_json::Value>()
            .await?;
        if rows.is_empty() {
            return Err(Error::not_found("Requirement not found"));
        }
        Ok(())
    }

    async fn universities(&self, query: &UniversityQuery) -> Result<Page<University>, Error> {
        let table = self.from("universities");
        let mut select = table.select("*");

        if let Some(search) = query.search.as_deref() {
            // commas and dots in the search text are reserved inside `or=(...)`
            let pattern = quote_list_value(&contains_pattern(search));
            let conditions: Vec<String> = ["name", "city", "state"]
                .iter()
                .map(|column| format!("{column}.{}", FilterOperator::ILike.apply(&pattern)))
                .collect();
            select.or(&conditions);
        }
        if let Some(country) = query.country.as_deref() {
            select.ilike("country", &contains_pattern(country));
        }
        if let Some(state) = query.state.as_deref() {
            select.ilike("state", &contains_pattern(state));
        }
        if let Some(min) = query.min_ranking {
            select.gte("us_news_ranking", min);
        }
        if let Some(max) = query.max_ranking {
            select.lte("us_news_ranking", max);
        }
        if let Some(min) = query.min_acceptance_rate {
            select.gte("acceptance_rate", min);
        }
        if let Some(max) = query.max_acceptance_rate {
            select.lte("acceptance_rate", max);
        }
        if let Some(system) = query.application_system.as_deref() {
            select.eq("application_system", system);
        }

        select
            .order_nulls_last("us_news_ranking", true)
            .limit(query.limit)
            .offset(query.offset)
            .count(CountOption::Exact);

        let (items, total) = select.execute_with_count::<University>().await?;
        let total = total.unwrap_or(u64::from(query.offset) + items.len() as u64);

        Ok(Page {
            items,
            total,
            limit: query.limit,
            offset: query.offset,
        })
    }

    async fn university(&self, id: Uuid) -> Result<Option<University>, Error> {
        self.from("universities")
            .select("*")
            .eq("id", id)
            .execute_one()
            .await
    }
}
