pub mod auth;
pub mod parent;
pub mod student;
pub mod universities;

use crate::access::AuthUser;
use crate::error::Error;
use crate::models::{Parent, Student};
use crate::store::Store;

async fn current_student(store: &dyn Store, user: &AuthUser) -> Result<Student, Error> {
    store
        .student_by_user(&user.user_id)
        .await?
        .ok_or_else(|| Error::not_found("Student profile not found"))
}

async fn current_parent(store: &dyn Store, user: &AuthUser) -> Result<Parent, Error> {
    store
        .parent_by_user(&user.user_id)
        .await?
        .ok_or_else(|| Error::not_found("Parent profile not found"))
}
