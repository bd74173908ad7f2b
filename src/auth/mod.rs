//! Authentication against the identity service
//!
//! Two ways of turning a bearer token into a [`VerifiedUser`]:
//!
//! - [`Auth`] asks GoTrue (`GET /auth/v1/user`) on every request
//! - [`JwtVerifier`] checks the HS256 signature locally with the project's JWT secret
//!
//! [`Auth`] also performs sign-up for the register endpoint.

mod types;

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use reqwest::Client;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::ClientOptions;
use crate::error::Error;
use crate::fetch::Fetch;

pub use types::*;

/// Turns a bearer token into the identity it was issued for
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<VerifiedUser, Error>;
}

/// Client for Supabase Authentication
#[derive(Clone)]
pub struct Auth {
    /// The base URL for the Supabase project
    url: String,

    /// The API key for the Supabase project
    key: String,

    /// HTTP client used for requests
    client: Client,

    /// Client options
    options: ClientOptions,
}

impl Auth {
    /// Create a new Auth client
    pub fn new(url: &str, key: &str, client: Client, options: ClientOptions) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            key: key.to_string(),
            client,
            options,
        }
    }

    fn get_auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.url, path)
    }

    /// Sign up a new user; `metadata` becomes the user's `user_metadata`
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: Value,
    ) -> Result<User, Error> {
        let url = self.get_auth_url("/signup");

        let body = SignUpRequest {
            email: email.to_string(),
            password: password.to_string(),
            data: metadata,
        };

        let result = Fetch::post(&self.client, &url)
            .header("apikey", &self.key)
            .header("X-Client-Info", &self.options.client_info)
            .timeout(self.options.request_timeout)
            .json(&body)?
            .execute::<Value>()
            .await?;

        // With email confirmation on, GoTrue answers with the bare user;
        // otherwise the user sits next to a session.
        let user = match result.get("user") {
            Some(user) if !user.is_null() => serde_json::from_value::<User>(user.clone())?,
            _ => serde_json::from_value::<User>(result)?,
        };

        info!(user_id = %user.id, "registered user");
        Ok(user)
    }

    /// Get the user a token was issued for
    pub async fn get_user(&self, token: &str) -> Result<User, Error> {
        let url = self.get_auth_url("/user");

        Fetch::get(&self.client, &url)
            .header("apikey", &self.key)
            .header("X-Client-Info", &self.options.client_info)
            .timeout(self.options.request_timeout)
            .bearer_auth(token)
            .execute::<User>()
            .await
    }
}

#[async_trait]
impl TokenVerifier for Auth {
    async fn verify(&self, token: &str) -> Result<VerifiedUser, Error> {
        match self.get_user(token).await {
            Ok(user) => Ok(user.into()),
            Err(Error::Auth(_)) | Err(Error::Api { .. }) => Err(Error::auth("Invalid token")),
            Err(e) => Err(e),
        }
    }
}

/// Local HS256 verification of Supabase access tokens
#[derive(Clone)]
pub struct JwtVerifier {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    audience: String,
}

impl JwtVerifier {
    pub fn new(secret: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[audience]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            audience: audience.to_string(),
        }
    }

    /// Issue a token for `user_id`, valid for `ttl_secs`
    pub fn sign(
        &self,
        user_id: &str,
        email: Option<&str>,
        user_metadata: serde_json::Map<String, Value>,
        ttl_secs: i64,
    ) -> Result<String, Error> {
        let claims = Claims {
            sub: user_id.to_string(),
            email: email.map(str::to_string),
            aud: self.audience.clone(),
            exp: Utc::now().timestamp() + ttl_secs,
            role: Some("authenticated".to_string()),
            user_metadata,
        };

        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }
}

#[async_trait]
impl TokenVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedUser, Error> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            warn!(error = %e, "rejected bearer token");
            Error::auth("Invalid token")
        })?;

        Ok(data.claims.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    #[tokio::test]
    async fn jwt_round_trip_keeps_metadata() {
        let verifier = JwtVerifier::new("super-secret", "authenticated");
        let mut metadata = Map::new();
        metadata.insert("role".to_string(), json!("parent"));

        let token = verifier
            .sign("user-1", Some("p@example.com"), metadata, 60)
            .unwrap();
        let user = verifier.verify(&token).await.unwrap();

        assert_eq!(user.id, "user-1");
        assert_eq!(user.email.as_deref(), Some("p@example.com"));
        assert_eq!(user.user_metadata.get("role"), Some(&json!("parent")));
    }

    #[tokio::test]
    async fn jwt_rejects_foreign_signature_and_expiry() {
        let ours = JwtVerifier::new("super-secret", "authenticated");
        let theirs = JwtVerifier::new("other-secret", "authenticated");

        let forged = theirs.sign("user-1", None, Map::new(), 60).unwrap();
        assert!(matches!(ours.verify(&forged).await, Err(Error::Auth(_))));

        let expired = ours.sign("user-1", None, Map::new(), -3600).unwrap();
        assert!(matches!(ours.verify(&expired).await, Err(Error::Auth(_))));
    }

    #[tokio::test]
    async fn jwt_rejects_wrong_audience() {
        let anon = JwtVerifier::new("super-secret", "anon");
        let ours = JwtVerifier::new("super-secret", "authenticated");

        let token = anon.sign("user-1", None, Map::new(), 60).unwrap();
        assert!(ours.verify(&token).await.is_err());
    }
}
