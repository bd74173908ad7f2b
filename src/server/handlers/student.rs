use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use super::current_student;
use crate::access::{ensure_access, AuthUser, Resource};
use crate::deadlines::upcoming;
use crate::error::Error;
use crate::models::{
    Application, ApplicationStatus, ApplicationUpdate, NewApplication, NewRequirement,
    RequirementUpdate, StudentUpdate,
};
use crate::notifications::{generate, NotificationFeed};
use crate::permissions::Permission;
use crate::server::{
    extract::{Path, Payload, Query},
    state::AppState,
};
use crate::stats::{RequirementProgress, StudentStats};

const DEFAULT_DEADLINE_WINDOW: i64 = 30;

pub async fn list_applications(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Value>, Error> {
    user.require(Permission::ReadOwnApplications)?;
    let student = current_student(state.store.as_ref(), &user).await?;
    let applications = state.store.applications_for_student(student.id).await?;
    Ok(Json(json!({ "applications": applications })))
}

pub async fn create_application(
    State(state): State<AppState>,
    user: AuthUser,
    Payload(mut body): Payload<NewApplication>,
) -> Result<impl IntoResponse, Error> {
    user.require(Permission::WriteOwnApplications)?;
    let student = current_student(state.store.as_ref(), &user).await?;

    if state.store.university(body.university_id).await?.is_none() {
        return Err(Error::not_found("University not found"));
    }
    body.student_id = student.id;

    let created = state.store.create_application(body).await?;
    let application = state
        .store
        .application_with_university(created.id)
        .await?
        .ok_or_else(|| Error::general("created application vanished"))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "application": application })),
    ))
}

pub async fn get_application(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, Error> {
    user.require(Permission::ReadOwnApplications)?;
    ensure_access(state.store.as_ref(), &user, Resource::Application(id)).await?;

    let application = state
        .store
        .application_detail(id)
        .await?
        .ok_or_else(|| Error::not_found("Application not found"))?;
    Ok(Json(json!({ "application": application })))
}

/// Applies an update, filling the dates implied by a status change
async fn apply_update(
    state: &AppState,
    id: Uuid,
    mut update: ApplicationUpdate,
) -> Result<Application, Error> {
    let current = state
        .store
        .application(id)
        .await?
        .ok_or_else(|| Error::not_found("Application not found"))?;

    update.fill_status_dates(&current, state.clock.today());
    update.updated_at = Some(state.clock.now());

    let updated = state.store.update_application(id, update).await?;
    if updated.status != current.status {
        info!(application_id = %id, from = %current.status, to = %updated.status, "status changed");
    }
    Ok(updated)
}

pub async fn update_application(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Payload(update): Payload<ApplicationUpdate>,
) -> Result<Json<Value>, Error> {
    user.require(Permission::WriteOwnApplications)?;
    ensure_access(state.store.as_ref(), &user, Resource::Application(id)).await?;

    apply_update(&state, id, update).await?;
    let application = state.store.application_with_university(id).await?;
    Ok(Json(json!({ "application": application })))
}

pub async fn delete_application(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, Error> {
    user.require(Permission::WriteOwnApplications)?;
    ensure_access(state.store.as_ref(), &user, Resource::Application(id)).await?;

    state.store.delete_application(id).await?;
    Ok(Json(json!({ "message": "Application deleted successfully" })))
}

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    status: ApplicationStatus,
}

pub async fn update_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Payload(change): Payload<StatusChange>,
) -> Result<Json<Value>, Error> {
    user.require(Permission::WriteOwnApplications)?;
    ensure_access(state.store.as_ref(), &user, Resource::Application(id)).await?;

    let updated = apply_update(&state, id, ApplicationUpdate::status(change.status)).await?;
    Ok(Json(json!({
        "application": updated,
        "next_suggested_status": updated.status.next_suggested(),
    })))
}

pub async fn list_requirements(
    State(state): State<AppState>,
    user: AuthUser,
    Path(application_id): Path<Uuid>,
) -> Result<Json<Value>, Error> {
    user.require(Permission::ManageRequirements)?;
    ensure_access(
        state.store.as_ref(),
        &user,
        Resource::Application(application_id),
    )
    .await?;

    let requirements = state.store.requirements(application_id).await?;
    let progress = RequirementProgress::from_requirements(&requirements);
    Ok(Json(json!({ "requirements": requirements, "progress": progress })))
}

pub async fn create_requirement(
    State(state): State<AppState>,
    user: AuthUser,
    Path(application_id): Path<Uuid>,
    Payload(mut body): Payload<NewRequirement>,
) -> Result<impl IntoResponse, Error> {
    user.require(Permission::ManageRequirements)?;
    ensure_access(
        state.store.as_ref(),
        &user,
        Resource::Application(application_id),
    )
    .await?;

    body.application_id = application_id;
    body.validate()?;
    let requirement = state.store.create_requirement(body).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "requirement": requirement })),
    ))
}

pub async fn update_requirement(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Payload(mut update): Payload<RequirementUpdate>,
) -> Result<Json<Value>, Error> {
    user.require(Permission::ManageRequirements)?;
    ensure_access(state.store.as_ref(), &user, Resource::Requirement(id)).await?;

    if matches!(&update.requirement_type, Some(kind) if kind.trim().is_empty()) {
        return Err(Error::bad_request("requirement_type must not be empty"));
    }
    update.updated_at = Some(state.clock.now());
    let requirement = state.store.update_requirement(id, update).await?;
    Ok(Json(json!({ "requirement": requirement })))
}

pub async fn delete_requirement(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, Error> {
    user.require(Permission::ManageRequirements)?;
    ensure_access(state.store.as_ref(), &user, Resource::Requirement(id)).await?;

    state.store.delete_requirement(id).await?;
    Ok(Json(json!({ "message": "Requirement deleted successfully" })))
}

pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Value>, Error> {
    user.require(Permission::ReadOwnApplications)?;
    let student = current_student(state.store.as_ref(), &user).await?;
    Ok(Json(json!({ "student": student })))
}

pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Payload(mut update): Payload<StudentUpdate>,
) -> Result<Json<Value>, Error> {
    user.require(Permission::ReadOwnApplications)?;
    update.validate()?;
    let student = current_student(state.store.as_ref(), &user).await?;

    update.updated_at = Some(state.clock.now());
    let student = state.store.update_student(student.id, update).await?;
    Ok(Json(json!({ "student": student })))
}

pub async fn dashboard_stats(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Value>, Error> {
    user.require(Permission::ReadOwnApplications)?;
    let student = current_student(state.store.as_ref(), &user).await?;
    let applications = state.store.applications_for_student(student.id).await?;

    let stats = StudentStats::compute(
        applications.iter().map(|a| &a.application),
        state.clock.today(),
        &state.policy,
    );
    Ok(Json(json!({ "stats": stats })))
}

#[derive(Debug, Deserialize)]
pub struct DeadlineWindow {
    days: Option<i64>,
}

pub async fn upcoming_deadlines(
    State(state): State<AppState>,
    user: AuthUser,
    Query(window): Query<DeadlineWindow>,
) -> Result<Json<Value>, Error> {
    user.require(Permission::ReadOwnApplications)?;
    let days = window.days.unwrap_or(DEFAULT_DEADLINE_WINDOW);
    if days < 0 {
        return Err(Error::bad_request("days must not be negative"));
    }

    let student = current_student(state.store.as_ref(), &user).await?;
    let applications = state.store.applications_for_student(student.id).await?;
    let deadlines = upcoming(&applications, state.clock.today(), days, &state.policy);

    Ok(Json(json!({ "deadlines": deadlines, "days": days })))
}

pub async fn notifications(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<NotificationFeed>, Error> {
    user.require(Permission::ReadOwnApplications)?;
    let student = current_student(state.store.as_ref(), &user).await?;
    let applications = state.store.applications_for_student(student.id).await?;

    let feed = generate(&applications, state.clock.now(), &state.policy);
    Ok(Json(feed.into()))
}
