use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use super::Store;
use crate::error::Error;
use crate::models::{
    catalog_order, Application, ApplicationDetail, ApplicationRequirement, ApplicationUpdate,
    ApplicationWithUniversity, NewApplication, NewParent, NewRequirement, NewStudent, Page,
    Parent, ParentUpdate, RequirementUpdate, Student, StudentUpdate, University,
    UniversityQuery,
};
use crate::permissions::Role;

#[derive(Default)]
struct Tables {
    /// `user_id → role`, kept in step with `students` and `parents`
    roles: HashMap<String, Role>,
    students: HashMap<Uuid, Student>,
    parents: HashMap<Uuid, Parent>,
    links: BTreeSet<(Uuid, Uuid)>,
    universities: HashMap<Uuid, University>,
    applications: HashMap<Uuid, Application>,
    requirements: HashMap<Uuid, ApplicationRequirement>,
}

impl Tables {
    fn with_university(&self, application: &Application) -> ApplicationWithUniversity {
        ApplicationWithUniversity {
            application: application.clone(),
            universities: self.universities.get(&application.university_id).cloned(),
        }
    }

    fn requirements_of(&self, application_id: Uuid) -> Vec<ApplicationRequirement> {
        let mut list: Vec<_> = self
            .requirements
            .values()
            .filter(|r| r.application_id == application_id)
            .cloned()
            .collect();
        list.sort_by_key(|r| r.created_at);
        list
    }

    fn parent_view(&self, parent: &Parent) -> Parent {
        let mut parent = parent.clone();
        parent.student_ids = self
            .links
            .iter()
            .filter(|(owner, _)| *owner == parent.id)
            .map(|(_, student)| *student)
            .collect();
        parent
    }

    fn claim_user(&mut self, user_id: &str, role: Role) -> Result<(), Error> {
        if self.roles.contains_key(user_id) {
            return Err(Error::conflict("Profile already exists"));
        }
        self.roles.insert(user_id.to_string(), role);
        Ok(())
    }
}

/// In-process store; every mutation happens under one write lock
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_university(&self, university: University) {
        self.tables
            .write()
            .await
            .universities
            .insert(university.id, university);
    }

    /// Load a JSON array of universities, e.g. an export of the `universities` table
    pub async fn seed_universities(&self, path: &Path) -> Result<usize, Error> {
        let raw = tokio::fs::read(path)
            .await
            .map_err(|e| Error::general(format!("cannot read {}: {e}", path.display())))?;
        let universities: Vec<University> = serde_json::from_slice(&raw)?;
        let count = universities.len();

        let mut tables = self.tables.write().await;
        for university in universities {
            tables.universities.insert(university.id, university);
        }
        info!(count, path = %path.display(), "seeded universities");
        Ok(count)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn resolve_role(&self, user_id: &str) -> Result<Option<Role>, Error> {
        Ok(self.tables.read().await.roles.get(user_id).copied())
    }

    async fn student_by_user(&self, user_id: &str) -> Result<Option<Student>, Error> {
        let tables = self.tables.read().await;
        Ok(tables
            .students
            .values()
            .find(|s| s.user_id == user_id)
            .cloned())
    }

    async fn student(&self, id: Uuid) -> Result<Option<Student>, Error> {
        Ok(self.tables.read().await.students.get(&id).cloned())
    }

    async fn create_student(&self, student: NewStudent) -> Result<Student, Error> {
        let mut tables = self.tables.write().await;
        tables.claim_user(&student.user_id, Role::Student)?;

        let now = Utc::now();
        let created = Student {
            id: Uuid::new_v4(),
            user_id: student.user_id,
            name: student.name,
            email: student.email,
            graduation_year: student.graduation_year,
            gpa: student.gpa,
            sat_score: student.sat_score,
            act_score: student.act_score,
            target_countries: student.target_countries,
            intended_majors: student.intended_majors,
            created_at: now,
            updated_at: now,
        };
        tables.students.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_student(&self, id: Uuid, update: StudentUpdate) -> Result<Student, Error> {
        let mut tables = self.tables.write().await;
        let student = tables
            .students
            .get_mut(&id)
            .ok_or_else(|| Error::not_found("Student profile not found"))?;
        update.apply_to(student);
        Ok(student.clone())
    }

    async fn parent_by_user(&self, user_id: &str) -> Result<Option<Parent>, Error> {
        let tables = self.tables.read().await;
        Ok(tables
            .parents
            .values()
            .find(|p| p.user_id == user_id)
            .map(|p| tables.parent_view(p)))
    }

    async fn create_parent(&self, parent: NewParent) -> Result<Parent, Error> {
        let mut tables = self.tables.write().await;
        tables.claim_user(&parent.user_id, Role::Parent)?;

        let now = Utc::now();
        let created = Parent {
            id: Uuid::new_v4(),
            user_id: parent.user_id,
            name: parent.name,
            email: parent.email,
            student_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        tables.parents.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_parent(&self, id: Uuid, update: ParentUpdate) -> Result<Parent, Error> {
        let mut tables = self.tables.write().await;
        let parent = tables
            .parents
            .get_mut(&id)
            .ok_or_else(|| Error::not_found("Parent profile not found"))?;
        if let Some(name) = update.name {
            parent.name = name;
        }
        if let Some(updated_at) = update.updated_at {
            parent.updated_at = updated_at;
        }
        let parent = parent.clone();
        Ok(tables.parent_view(&parent))
    }

    async fn link_student(&self, parent_id: Uuid, student_id: Uuid) -> Result<(), Error> {
        let mut tables = self.tables.write().await;
        if !tables.parents.contains_key(&parent_id) {
            return Err(Error::not_found("Parent profile not found"));
        }
        if !tables.students.contains_key(&student_id) {
            return Err(Error::not_found(format!("Student {student_id} not found")));
        }
        tables.links.insert((parent_id, student_id));
        Ok(())
    }

    async fn linked_students(&self, parent_id: Uuid) -> Result<Vec<Student>, Error> {
        let tables = self.tables.read().await;
        let mut students: Vec<Student> = tables
            .links
            .iter()
            .filter(|(parent, _)| *parent == parent_id)
            .filter_map(|(_, student)| tables.students.get(student).cloned())
            .collect();
        students.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(students)
    }

    async fn applications_for_student(
        &self,
        student_id: Uuid,
    ) -> Result<Vec<ApplicationWithUniversity>, Error> {
        let tables = self.tables.read().await;
        let mut list: Vec<&Application> = tables
            .applications
            .values()
            .filter(|a| a.student_id == student_id)
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list.into_iter().map(|a| tables.with_university(a)).collect())
    }

    async fn application(&self, id: Uuid) -> Result<Option<Application>, Error> {
        Ok(self.tables.read().await.applications.get(&id).cloned())
    }

    async fn application_with_university(
        &self,
        id: Uuid,
    ) -> Result<Option<ApplicationWithUniversity>, Error> {
        let tables = self.tables.read().await;
        Ok(tables
            .applications
            .get(&id)
            .map(|a| tables.with_university(a)))
    }

    async fn application_detail(&self, id: Uuid) -> Result<Option<ApplicationDetail>, Error> {
        let tables = self.tables.read().await;
        Ok(tables.applications.get(&id).map(|a| {
            ApplicationDetail::new(
                a.clone(),
                tables.universities.get(&a.university_id).cloned(),
                tables.requirements_of(a.id),
            )
        }))
    }

    async fn create_application(
        &self,
        application: NewApplication,
    ) -> Result<Application, Error> {
        let mut tables = self.tables.write().await;

        let duplicate = tables.applications.values().any(|a| {
            a.student_id == application.student_id && a.university_id == application.university_id
        });
        if duplicate {
            return Err(Error::conflict(
                "Application already exists for this university",
            ));
        }
        if !tables.students.contains_key(&application.student_id) {
            return Err(Error::not_found("Student profile not found"));
        }
        if !tables.universities.contains_key(&application.university_id) {
            return Err(Error::not_found("University not found"));
        }

        let now = Utc::now();
        let created = Application {
            id: Uuid::new_v4(),
            student_id: application.student_id,
            university_id: application.university_id,
            application_type: application.application_type,
            deadline: application.deadline,
            status: application.status,
            submitted_date: None,
            decision_date: None,
            decision_type: None,
            notes: application.notes,
            created_at: now,
            updated_at: now,
        };
        tables.applications.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_application(
        &self,
        id: Uuid,
        update: ApplicationUpdate,
    ) -> Result<Application, Error> {
        let mut tables = self.tables.write().await;
        let application = tables
            .applications
            .get_mut(&id)
            .ok_or_else(|| Error::not_found("Application not found"))?;
        update.apply_to(application);
        Ok(application.clone())
    }

    async fn delete_application(&self, id: Uuid) -> Result<(), Error> {
        let mut tables = self.tables.write().await;
        if tables.applications.remove(&id).is_none() {
            return Err(Error::not_found("Application not found"));
        }
        tables.requirements.retain(|_, r| r.application_id != id);
        Ok(())
    }

    async fn requirements(
        &self,
        application_id: Uuid,
    ) -> Result<Vec<ApplicationRequirement>, Error> {
        Ok(self.tables.read().await.requirements_of(application_id))
    }

    async fn requirement(&self, id: Uuid) -> Result<Option<ApplicationRequirement>, Error> {
        Ok(self.tables.read().await.requirements.get(&id).cloned())
    }

    async fn create_requirement(
        &self,
        requirement: NewRequirement,
    ) -> Result<ApplicationRequirement, Error> {
        let mut tables = self.tables.write().await;
        if !tables.applications.contains_key(&requirement.application_id) {
            return Err(Error::not_found("Application not found"));
        }

        let now = Utc::now();
        let created = ApplicationRequirement {
            id: Uuid::new_v4(),
            application_id: requirement.application_id,
            requirement_type: requirement.requirement_type,
            status: requirement.status,
            deadline: requirement.deadline,
            notes: requirement.notes,
            created_at: now,
            updated_at: now,
        };
        tables.requirements.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_requirement(
        &self,
        id: Uuid,
        update: RequirementUpdate,
    ) -> Result<ApplicationRequirement, Error> {
        let mut tables = self.tables.write().await;
        let requirement = tables
            .requirements
            .get_mut(&id)
            .ok_or_else(|| Error::not_found("Requirement not found"))?;
        update.apply_to(requirement);
        Ok(requirement.clone())
    }

    async fn delete_requirement(&self, id: Uuid) -> Result<(), Error> {
        self.tables
            .write()
            .await
            .requirements
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| Error::not_found("Requirement not found"))
    }

    async fn universities(&self, query: &UniversityQuery) -> Result<Page<University>, Error> {
        let tables = self.tables.read().await;
        let mut matching: Vec<&University> = tables
            .universities
            .values()
            .filter(|u| query.matches(u))
            .collect();
        matching.sort_by(|a, b| catalog_order(a, b));

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .cloned()
            .collect();

        Ok(Page {
            items,
            total,
            limit: query.limit,
            offset: query.offset,
        })
    }

    async fn university(&self, id: Uuid) -> Result<Option<University>, Error> {
        Ok(self.tables.read().await.universities.get(&id).cloned())
    }
}
