//! Resource ownership
//!
//! Permissions say what a role may do; these checks say which rows a given
//! caller may do it to. A missing row is denied exactly like someone else's.

use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use crate::error::Error;
use crate::permissions::{has_permission, Permission, Role};
use crate::store::Store;

/// The caller of one request, built by the `AuthUser` extractor
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub user_id: String,
    pub email: Option<String>,
    /// `None` until the user has completed profile setup
    pub role: Option<Role>,
    pub user_metadata: Map<String, Value>,
}

impl AuthUser {
    pub fn has_permission(&self, permission: Permission) -> bool {
        has_permission(self.role, permission)
    }

    pub fn require(&self, permission: Permission) -> Result<(), Error> {
        if self.has_permission(permission) {
            Ok(())
        } else {
            Err(Error::forbidden("Insufficient permissions"))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Application(Uuid),
    Student(Uuid),
    Parent(Uuid),
    Requirement(Uuid),
}

/// True when `user` owns `resource` or is linked to the student who does
pub async fn can_access(store: &dyn Store, user: &AuthUser, resource: Resource) -> Result<bool, Error> {
    let Some(role) = user.role else {
        return Ok(false);
    };

    let student_id = match resource {
        Resource::Parent(id) => {
            if role != Role::Parent {
                return Ok(false);
            }
            let parent = store.parent_by_user(&user.user_id).await?;
            return Ok(parent.map_or(false, |p| p.id == id));
        }
        Resource::Student(id) => id,
        Resource::Application(id) => match store.application(id).await? {
            Some(application) => application.student_id,
            None => return Ok(false),
        },
        Resource::Requirement(id) => {
            let Some(requirement) = store.requirement(id).await? else {
                return Ok(false);
            };
            match store.application(requirement.application_id).await? {
                Some(application) => application.student_id,
                None => return Ok(false),
            }
        }
    };

    owns_student(store, user, role, student_id).await
}

async fn owns_student(
    store: &dyn Store,
    user: &AuthUser,
    role: Role,
    student_id: Uuid,
) -> Result<bool, Error> {
    match role {
        Role::Admin => Ok(true),
        Role::Student => Ok(store
            .student_by_user(&user.user_id)
            .await?
            .map_or(false, |s| s.id == student_id)),
        Role::Parent => Ok(store
            .parent_by_user(&user.user_id)
            .await?
            .map_or(false, |p| p.is_linked_to(student_id))),
        Role::Teacher => Ok(false),
    }
}

/// [`can_access`] as a guard; denial is `403 Access denied`
pub async fn ensure_access(store: &dyn Store, user: &AuthUser, resource: Resource) -> Result<(), Error> {
    if can_access(store, user, resource).await? {
        Ok(())
    } else {
        debug!(user_id = %user.user_id, ?resource, "access denied");
        Err(Error::access_denied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        NewApplication, NewParent, NewRequirement, NewStudent, RequirementStatus, University,
    };
    use crate::store::MemoryStore;

    fn user(id: &str, role: Option<Role>) -> AuthUser {
        AuthUser {
            user_id: id.to_string(),
            email: None,
            role,
            user_metadata: Map::new(),
        }
    }

    struct Fixture {
        store: MemoryStore,
        application: Uuid,
        requirement: Uuid,
        student: Uuid,
        parent: Uuid,
    }

    async fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let student = store
            .create_student(NewStudent {
                user_id: "kid".into(),
                name: "Kid".into(),
                email: "kid@example.com".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        store
            .create_student(NewStudent {
                user_id: "other-kid".into(),
                name: "Other".into(),
                email: "other@example.com".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        let parent = store
            .create_parent(NewParent {
                user_id: "mom".into(),
                name: "Mom".into(),
                email: "mom@example.com".into(),
            })
            .await
            .unwrap();
        store
            .create_parent(NewParent {
                user_id: "stranger".into(),
                name: "Stranger".into(),
                email: "s@example.com".into(),
            })
            .await
            .unwrap();
        store.link_student(parent.id, student.id).await.unwrap();

        let university = University {
            id: Uuid::new_v4(),
            name: "Brown".into(),
            country: None,
            state: None,
            city: None,
            us_news_ranking: Some(9),
            acceptance_rate: None,
            application_system: None,
            tuition_in_state: None,
            tuition_out_state: None,
            application_fee: None,
            deadlines: None,
            created_at: None,
            updated_at: None,
        };
        store.insert_university(university.clone()).await;

        let application = store
            .create_application(NewApplication {
                student_id: student.id,
                university_id: university.id,
                application_type: None,
                deadline: None,
                status: Default::default(),
                notes: None,
            })
            .await
            .unwrap();
        let requirement = store
            .create_requirement(NewRequirement {
                application_id: application.id,
                requirement_type: "transcript".into(),
                status: RequirementStatus::NotStarted,
                deadline: None,
                notes: None,
            })
            .await
            .unwrap();

        Fixture {
            store,
            application: application.id,
            requirement: requirement.id,
            student: student.id,
            parent: parent.id,
        }
    }

    #[tokio::test]
    async fn owner_and_linked_parent_may_access() {
        let f = fixture().await;
        let kid = user("kid", Some(Role::Student));
        let mom = user("mom", Some(Role::Parent));

        for resource in [
            Resource::Application(f.application),
            Resource::Requirement(f.requirement),
            Resource::Student(f.student),
        ] {
            assert!(can_access(&f.store, &kid, resource).await.unwrap());
            assert!(can_access(&f.store, &mom, resource).await.unwrap());
        }
        assert!(can_access(&f.store, &mom, Resource::Parent(f.parent)).await.unwrap());
        assert!(!can_access(&f.store, &kid, Resource::Parent(f.parent)).await.unwrap());
    }

    #[tokio::test]
    async fn others_are_denied() {
        let f = fixture().await;
        let other_kid = user("other-kid", Some(Role::Student));
        let stranger = user("stranger", Some(Role::Parent));
        let teacher = user("t", Some(Role::Teacher));
        let nobody = user("kid", None);

        for caller in [&other_kid, &stranger, &teacher, &nobody] {
            let result = ensure_access(&f.store, caller, Resource::Application(f.application)).await;
            assert!(matches!(result, Err(Error::Forbidden(ref m)) if m == "Access denied"));
        }
        assert!(!can_access(&f.store, &stranger, Resource::Parent(f.parent)).await.unwrap());
    }

    #[tokio::test]
    async fn missing_rows_are_denied_even_for_admin() {
        let f = fixture().await;
        let admin = user("root", Some(Role::Admin));
        assert!(can_access(&f.store, &admin, Resource::Application(f.application)).await.unwrap());
        assert!(!can_access(&f.store, &admin, Resource::Application(Uuid::new_v4())).await.unwrap());
        assert!(!can_access(&f.store, &admin, Resource::Requirement(Uuid::new_v4())).await.unwrap());
    }
}
