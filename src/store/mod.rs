//! Persistence seam
//!
//! Handlers only see [`Store`]. [`SupabaseStore`] talks PostgREST to the
//! managed backend; [`MemoryStore`] keeps everything in process for tests
//! and local development. Both enforce application uniqueness and delete an
//! application together with its requirements atomically.

mod memory;
mod supabase;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Error;
use crate::models::{
    Application, ApplicationDetail, ApplicationRequirement, ApplicationUpdate,
    ApplicationWithUniversity, NewApplication, NewParent, NewRequirement, NewStudent, Page,
    Parent, ParentUpdate, RequirementUpdate, Student, StudentUpdate, University,
    UniversityQuery,
};
use crate::permissions::Role;

pub use memory::MemoryStore;
pub use supabase::SupabaseStore;

#[async_trait]
pub trait Store: Send + Sync {
    /// `user_id → role` in one lookup; `None` until a profile exists
    async fn resolve_role(&self, user_id: &str) -> Result<Option<Role>, Error>;

    async fn student_by_user(&self, user_id: &str) -> Result<Option<Student>, Error>;
    async fn student(&self, id: Uuid) -> Result<Option<Student>, Error>;
    async fn create_student(&self, student: NewStudent) -> Result<Student, Error>;
    async fn update_student(&self, id: Uuid, update: StudentUpdate) -> Result<Student, Error>;

    async fn parent_by_user(&self, user_id: &str) -> Result<Option<Parent>, Error>;
    async fn create_parent(&self, parent: NewParent) -> Result<Parent, Error>;
    async fn update_parent(&self, id: Uuid, update: ParentUpdate) -> Result<Parent, Error>;
    /// Fails with `NotFound` when the student does not exist
    async fn link_student(&self, parent_id: Uuid, student_id: Uuid) -> Result<(), Error>;
    async fn linked_students(&self, parent_id: Uuid) -> Result<Vec<Student>, Error>;

    /// Newest first, university embedded
    async fn applications_for_student(
        &self,
        student_id: Uuid,
    ) -> Result<Vec<ApplicationWithUniversity>, Error>;
    async fn application(&self, id: Uuid) -> Result<Option<Application>, Error>;
    async fn application_with_university(
        &self,
        id: Uuid,
    ) -> Result<Option<ApplicationWithUniversity>, Error>;
    async fn application_detail(&self, id: Uuid) -> Result<Option<ApplicationDetail>, Error>;
    /// Fails with `Conflict` when the student already applied to the university
    async fn create_application(&self, application: NewApplication)
        -> Result<Application, Error>;
    async fn update_application(
        &self,
        id: Uuid,
        update: ApplicationUpdate,
    ) -> Result<Application, Error>;
    /// Removes the application and its requirements, or nothing at all
    async fn delete_application(&self, id: Uuid) -> Result<(), Error>;

    async fn requirements(&self, application_id: Uuid)
        -> Result<Vec<ApplicationRequirement>, Error>;
    async fn requirement(&self, id: Uuid) -> Result<Option<ApplicationRequirement>, Error>;
    async fn create_requirement(
        &self,
        requirement: NewRequirement,
    ) -> Result<ApplicationRequirement, Error>;
    async fn update_requirement(
        &self,
        id: Uuid,
        update: RequirementUpdate,
    ) -> Result<ApplicationRequirement, Error>;
    async fn delete_requirement(&self, id: Uuid) -> Result<(), Error>;

    /// Ranking ascending, unranked last
    async fn universities(&self, query: &UniversityQuery) -> Result<Page<University>, Error>;
    async fn university(&self, id: Uuid) -> Result<Option<University>, Error>;
}
