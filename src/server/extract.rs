//! Request extractors

use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Request},
    http::{header::AUTHORIZATION, request::Parts},
    Json,
};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::state::AppState;
use crate::access::AuthUser;
use crate::error::Error;

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))?
        .trim();
    (!token.is_empty()).then_some(token)
}

/// Verifies the bearer token and resolves the caller's role
#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(|| Error::auth("Unauthorized"))?;
        let verified = state.verifier.verify(token).await?;
        let role = state.store.resolve_role(&verified.id).await?;

        debug!(user_id = %verified.id, ?role, "authenticated request");
        Ok(AuthUser {
            user_id: verified.id,
            email: verified.email,
            role,
            user_metadata: verified.user_metadata,
        })
    }
}

/// JSON body whose rejections use the `{"error": ...}` shape
pub struct Payload<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Payload(value)),
            Err(rejection) => Err(Error::bad_request(rejection.body_text())),
        }
    }
}

/// JSON body that may be left out entirely
///
/// An empty body yields `None`. A body that is present but does not parse is
/// rejected, so callers never confuse a broken request with an absent one.
pub struct OptionalPayload<T>(pub Option<T>);

#[async_trait]
impl<S, T> FromRequest<S> for OptionalPayload<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| Error::bad_request(rejection.body_text()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(OptionalPayload(None));
        }
        serde_json::from_slice(&bytes)
            .map(|value| OptionalPayload(Some(value)))
            .map_err(|e| Error::bad_request(format!("Invalid request body: {e}")))
    }
}

/// Path parameters, rejected with the `{"error": ...}` shape
pub struct Path<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for Path<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match axum::extract::Path::<T>::from_request_parts(parts, state).await {
            Ok(axum::extract::Path(value)) => Ok(Path(value)),
            Err(rejection) => Err(Error::bad_request(rejection.body_text())),
        }
    }
}

/// Query string, rejected with the `{"error": ...}` shape
pub struct Query<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for Query<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match axum::extract::Query::<T>::from_request_parts(parts, state).await {
            Ok(axum::extract::Query(value)) => Ok(Query(value)),
            Err(rejection) => Err(Error::bad_request(rejection.body_text())),
        }
    }
}
