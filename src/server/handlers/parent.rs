use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use super::current_parent;
use crate::access::{ensure_access, AuthUser, Resource};
use crate::error::Error;
use crate::models::{
    append_parent_note, ApplicationUpdate, ApplicationWithUniversity, ParentUpdate, Student,
};
use crate::permissions::Permission;
use crate::server::{
    extract::{Path, Payload},
    state::AppState,
};
use crate::stats::ParentSummary;

pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Value>, Error> {
    user.require(Permission::ReadChildApplications)?;
    let parent = current_parent(state.store.as_ref(), &user).await?;
    Ok(Json(json!({ "parent": parent })))
}

pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Payload(mut update): Payload<ParentUpdate>,
) -> Result<Json<Value>, Error> {
    user.require(Permission::ReadChildApplications)?;
    if matches!(&update.name, Some(name) if name.trim().is_empty()) {
        return Err(Error::bad_request("name must not be empty"));
    }
    let parent = current_parent(state.store.as_ref(), &user).await?;

    update.updated_at = Some(state.clock.now());
    let parent = state.store.update_parent(parent.id, update).await?;
    Ok(Json(json!({ "parent": parent })))
}

/// One linked student as shown on the parent dashboard
#[derive(Debug, Serialize)]
pub struct StudentOverview {
    #[serde(flatten)]
    student: Student,
    applications: Vec<ApplicationWithUniversity>,
    summary: ParentSummary,
}

pub async fn list_students(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Value>, Error> {
    user.require(Permission::ReadChildApplications)?;
    let parent = current_parent(state.store.as_ref(), &user).await?;

    let mut students = Vec::new();
    for student in state.store.linked_students(parent.id).await? {
        let applications = state.store.applications_for_student(student.id).await?;
        let summary = ParentSummary::compute(applications.iter().map(|a| &a.application));
        students.push(StudentOverview {
            student,
            applications,
            summary,
        });
    }

    Ok(Json(json!({ "students": students })))
}

pub async fn student_applications(
    State(state): State<AppState>,
    user: AuthUser,
    Path(student_id): Path<Uuid>,
) -> Result<Json<Value>, Error> {
    user.require(Permission::ReadChildApplications)?;
    ensure_access(state.store.as_ref(), &user, Resource::Student(student_id)).await?;

    let applications = state.store.applications_for_student(student_id).await?;
    Ok(Json(json!({ "applications": applications })))
}

#[derive(Debug, Deserialize)]
pub struct ParentNote {
    #[serde(default, alias = "note")]
    parent_note: Option<String>,
}

pub async fn add_note(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Payload(body): Payload<ParentNote>,
) -> Result<Json<Value>, Error> {
    user.require(Permission::WriteChildNotes)?;
    let note = body
        .parent_note
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| Error::bad_request("Note is required"))?;
    ensure_access(state.store.as_ref(), &user, Resource::Application(id)).await?;

    let current = state
        .store
        .application(id)
        .await?
        .ok_or_else(|| Error::not_found("Application not found"))?;

    let update = ApplicationUpdate {
        notes: Some(append_parent_note(
            current.notes.as_deref(),
            &note,
            state.clock.today(),
        )),
        updated_at: Some(state.clock.now()),
        ..Default::default()
    };
    state.store.update_application(id, update).await?;
    info!(application_id = %id, user_id = %user.user_id, "parent note added");

    let application = state.store.application_with_university(id).await?;
    Ok(Json(json!({ "application": application })))
}
