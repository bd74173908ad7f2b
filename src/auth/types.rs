//! Types for authentication and user management

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// User data as returned by GoTrue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// The user ID
    pub id: String,

    /// The user's email address
    pub email: Option<String>,

    /// The app metadata
    #[serde(default)]
    pub app_metadata: Map<String, Value>,

    /// The user metadata; carries `role` and `profile_data` set at sign-up
    #[serde(default)]
    pub user_metadata: Map<String, Value>,

    /// The GoTrue role (usually `authenticated`), unrelated to the app role
    pub role: Option<String>,

    /// Whether the email has been confirmed
    pub email_confirmed_at: Option<String>,

    /// The creation time
    pub created_at: Option<String>,
}

/// Sign-up payload for `/auth/v1/signup`
#[derive(Debug, Clone, Serialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,

    /// Stored as user metadata
    pub data: Value,
}

/// Claims carried by a Supabase access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// The user ID
    pub sub: String,

    pub email: Option<String>,

    pub aud: String,

    /// Expiry as seconds since the epoch
    pub exp: i64,

    pub role: Option<String>,

    #[serde(default)]
    pub user_metadata: Map<String, Value>,
}

/// Identity established from a bearer token
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedUser {
    pub id: String,
    pub email: Option<String>,
    pub user_metadata: Map<String, Value>,
}

impl From<User> for VerifiedUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            user_metadata: user.user_metadata,
        }
    }
}

impl From<Claims> for VerifiedUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            user_metadata: claims.user_metadata,
        }
    }
}
