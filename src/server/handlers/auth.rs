use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::access::AuthUser;
use crate::error::Error;
use crate::models::{NewParent, NewStudent};
use crate::permissions::{permissions_for, Role};
use crate::server::{
    extract::{OptionalPayload, Payload},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    email: Option<String>,
    password: Option<String>,
    role: Option<String>,
    #[serde(default, alias = "profileData")]
    profile_data: Option<Value>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Only the two self-service roles can be chosen at sign-up
fn selectable_role(value: &str) -> Result<Role, Error> {
    match value.parse::<Role>()? {
        role @ (Role::Student | Role::Parent) => Ok(role),
        _ => Err(Error::bad_request("Invalid role")),
    }
}

pub async fn register(
    State(state): State<AppState>,
    Payload(body): Payload<RegisterRequest>,
) -> Result<impl IntoResponse, Error> {
    let (Some(email), Some(password), Some(role)) = (
        present(&body.email),
        present(&body.password),
        present(&body.role),
    ) else {
        return Err(Error::bad_request("Missing required fields"));
    };
    let role = selectable_role(role)?;

    let auth = state
        .auth
        .as_ref()
        .ok_or_else(|| Error::unavailable("Registration is not configured"))?;

    let metadata = json!({
        "role": role,
        "profile_data": body.profile_data.unwrap_or_else(|| json!({})),
    });

    let user = auth
        .sign_up(email, password, metadata)
        .await
        .map_err(|e| match e {
            Error::Api { message, .. } | Error::Auth(message) | Error::Conflict(message) => {
                warn!(%message, "sign-up rejected");
                Error::bad_request(message)
            }
            other => other,
        })?;

    Ok(Json(json!({
        "message": "Registration successful. Please check your email for verification.",
        "user": user,
    })))
}

/// Profile fields as collected by the sign-up form; numbers may arrive as strings
#[derive(Debug, Default, Deserialize)]
pub struct ProfileData {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, alias = "graduationYear", deserialize_with = "lenient_i32")]
    graduation_year: Option<i32>,
    #[serde(default, deserialize_with = "lenient_f64")]
    gpa: Option<f64>,
    #[serde(default, alias = "satScore", deserialize_with = "lenient_i32")]
    sat_score: Option<i32>,
    #[serde(default, alias = "actScore", deserialize_with = "lenient_i32")]
    act_score: Option<i32>,
    #[serde(default, alias = "targetCountries")]
    target_countries: Option<Vec<String>>,
    #[serde(default, alias = "intendedMajors")]
    intended_majors: Option<Vec<String>>,
    #[serde(default, alias = "studentIds")]
    student_ids: Option<Vec<Uuid>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Int(i64),
    Float(f64),
    Text(String),
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    use serde::de::Error as _;
    match Option::<NumberOrText>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrText::Int(n)) => Ok(Some(n as f64)),
        Some(NumberOrText::Float(n)) => Ok(Some(n)),
        Some(NumberOrText::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(NumberOrText::Text(s)) => s.trim().parse().map(Some).map_err(D::Error::custom),
    }
}

fn lenient_i32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i32>, D::Error> {
    use serde::de::Error as _;
    match lenient_f64(deserializer)? {
        None => Ok(None),
        Some(n) if n.fract() == 0.0 && n >= f64::from(i32::MIN) && n <= f64::from(i32::MAX) => {
            Ok(Some(n as i32))
        }
        Some(n) => Err(D::Error::custom(format!("expected a whole number, got {n}"))),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SetupProfileRequest {
    #[serde(default)]
    role: Option<String>,
    #[serde(default, alias = "profileData")]
    profile_data: Option<Value>,
}

pub async fn setup_profile(
    State(state): State<AppState>,
    user: AuthUser,
    OptionalPayload(body): OptionalPayload<SetupProfileRequest>,
) -> Result<impl IntoResponse, Error> {
    if let Some(role) = user.role {
        return Ok((
            StatusCode::OK,
            Json(json!({ "message": "Profile already exists", "role": role })),
        ));
    }

    let body = body.unwrap_or_default();
    let role = match body
        .role
        .or_else(|| user.user_metadata.get("role").and_then(Value::as_str).map(str::to_string))
    {
        Some(role) => selectable_role(&role)?,
        None => Role::Student,
    };
    let profile_value = body
        .profile_data
        .or_else(|| user.user_metadata.get("profile_data").cloned())
        .filter(|v| !v.is_null())
        .unwrap_or_else(|| json!({}));
    let profile: ProfileData = serde_json::from_value(profile_value)
        .map_err(|e| Error::bad_request(format!("Invalid profile data: {e}")))?;

    let email = user.email.clone().unwrap_or_default();
    let name = profile.name.clone().unwrap_or_default();

    let created = match role {
        Role::Parent => {
            for student_id in profile.student_ids.iter().flatten() {
                if state.store.student(*student_id).await?.is_none() {
                    return Err(Error::bad_request(format!("Student {student_id} not found")));
                }
            }
            let parent = state
                .store
                .create_parent(NewParent {
                    user_id: user.user_id.clone(),
                    name,
                    email,
                })
                .await?;
            for student_id in profile.student_ids.iter().flatten() {
                state
                    .store
                    .link_student(parent.id, *student_id)
                    .await
                    .map_err(|e| match e {
                        Error::NotFound(msg) => Error::bad_request(msg),
                        other => other,
                    })?;
            }
            json!(state.store.parent_by_user(&user.user_id).await?)
        }
        _ => {
            let student = NewStudent {
                user_id: user.user_id.clone(),
                name,
                email,
                graduation_year: profile.graduation_year,
                gpa: profile.gpa,
                sat_score: profile.sat_score,
                act_score: profile.act_score,
                target_countries: profile.target_countries,
                intended_majors: profile.intended_majors,
            };
            student.validate()?;
            json!(state.store.create_student(student).await?)
        }
    };

    info!(user_id = %user.user_id, %role, "profile set up");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Profile created successfully",
            "role": role,
            "profile": created,
        })),
    ))
}

pub async fn session(user: AuthUser) -> Json<Value> {
    let permissions = user.role.map(permissions_for).unwrap_or_default();
    Json(json!({
        "user_id": user.user_id,
        "email": user.email,
        "role": user.role,
        "permissions": permissions,
        "needs_profile_setup": user.role.is_none(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_data_accepts_form_strings() {
        let profile: ProfileData = serde_json::from_value(json!({
            "name": "Ada",
            "graduationYear": "2026",
            "gpa": "3.8",
            "satScore": 1500,
            "actScore": "",
            "targetCountries": ["US", "UK"],
        }))
        .unwrap();

        assert_eq!(profile.graduation_year, Some(2026));
        assert_eq!(profile.gpa, Some(3.8));
        assert_eq!(profile.sat_score, Some(1500));
        assert_eq!(profile.act_score, None);
        assert_eq!(profile.target_countries.map(|c| c.len()), Some(2));
    }

    #[test]
    fn profile_data_rejects_garbage_numbers() {
        let result = serde_json::from_value::<ProfileData>(json!({ "satScore": "lots" }));
        assert!(result.is_err());
        let result = serde_json::from_value::<ProfileData>(json!({ "graduationYear": 2026.5 }));
        assert!(result.is_err());
    }

    #[test]
    fn only_student_and_parent_can_be_chosen() {
        assert_eq!(selectable_role("parent").unwrap(), Role::Parent);
        assert!(matches!(selectable_role("admin"), Err(Error::BadRequest(_))));
        assert!(matches!(selectable_role("wizard"), Err(Error::BadRequest(_))));
    }
}
