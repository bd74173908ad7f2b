//! Admissions Tracker
//!
//! A role-based HTTP service for tracking university applications. Students
//! manage their applications and checklists; parents follow the students
//! they are linked to and leave notes. Identity and tables live in a Supabase
//! project, reached through the typed GoTrue and PostgREST clients in
//! [`auth`] and [`postgrest`].
//!
//! The rule components are plain functions over the models:
//! [`permissions`], [`access`], [`deadlines`], [`notifications`] and
//! [`stats`]. [`server`] wires them into an axum router over a [`store::Store`].

pub mod access;
pub mod auth;
pub mod clock;
pub mod config;
pub mod deadlines;
pub mod error;
pub mod fetch;
pub mod models;
pub mod notifications;
pub mod permissions;
pub mod postgrest;
pub mod server;
pub mod stats;
pub mod store;

use reqwest::Client;

use crate::auth::Auth;
use crate::config::ClientOptions;
use crate::store::SupabaseStore;

/// Clients for one Supabase project, sharing a connection pool
pub struct Supabase {
    /// The base URL for the Supabase project
    pub url: String,
    /// The API key for the Supabase project
    pub key: String,
    /// HTTP client used for requests
    pub http_client: Client,
    /// Auth client for sign-up and token lookups
    pub auth: Auth,
    /// Client options
    pub options: ClientOptions,
}

impl Supabase {
    /// Create a new Supabase client
    ///
    /// # Example
    ///
    /// ```
    /// use admissions_tracker::Supabase;
    ///
    /// let supabase = Supabase::new("https://your-project-url.supabase.co", "your-service-key");
    /// let store = supabase.store();
    /// ```
    pub fn new(supabase_url: &str, supabase_key: &str) -> Self {
        Self::new_with_options(supabase_url, supabase_key, ClientOptions::default())
    }

    /// Create a new Supabase client with custom options
    pub fn new_with_options(supabase_url: &str, supabase_key: &str, options: ClientOptions) -> Self {
        let http_client = Client::new();

        let auth = Auth::new(supabase_url, supabase_key, http_client.clone(), options.clone());

        Self {
            url: supabase_url.to_string(),
            key: supabase_key.to_string(),
            http_client,
            auth,
            options,
        }
    }

    /// Get a reference to the auth client
    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    /// The admissions tables of this project
    pub fn store(&self) -> SupabaseStore {
        SupabaseStore::with_client(
            &self.url,
            &self.key,
            self.http_client.clone(),
            self.options.clone(),
        )
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::access::AuthUser;
    pub use crate::config::{ClientOptions, ServerConfig};
    pub use crate::error::Error;
    pub use crate::permissions::{Permission, Role};
    pub use crate::server::AppState;
    pub use crate::store::{MemoryStore, Store, SupabaseStore};
    pub use crate::Supabase;
}
