//! Configuration for the backend client and the HTTP server

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::deadlines::UrgencyPolicy;

/// Configuration options for the backend client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// The request timeout
    pub request_timeout: Option<Duration>,

    /// The database schema, sent as `Accept-Profile` / `Content-Profile`
    pub db_schema: String,

    /// Value of the `X-Client-Info` header
    pub client_info: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Some(Duration::from_secs(30)),
            db_schema: "public".to_string(),
            client_info: format!("admissions-tracker/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientOptions {
    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the database schema
    pub fn with_db_schema(mut self, value: &str) -> Self {
        self.db_schema = value.to_string();
        self
    }
}

/// Where table data lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreBackend {
    /// PostgREST tables of a Supabase project
    Supabase,
    /// In-process tables, for local development
    Memory,
}

/// Server settings, read from flags or the environment (`.env` is honoured)
#[derive(Debug, Clone, Parser)]
#[command(name = "admissions-server", version, about)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:3000")]
    pub bind: SocketAddr,

    #[arg(long, env = "STORE_BACKEND", value_enum, default_value = "supabase")]
    pub store: StoreBackend,

    /// Base URL of the Supabase project
    #[arg(long, env = "SUPABASE_URL")]
    pub supabase_url: Option<String>,

    /// Service role key (falls back to the anon key)
    #[arg(long, env = "SUPABASE_SERVICE_ROLE_KEY")]
    pub supabase_service_key: Option<String>,

    #[arg(long, env = "SUPABASE_ANON_KEY")]
    pub supabase_anon_key: Option<String>,

    /// When set, bearer tokens are verified locally instead of calling GoTrue
    #[arg(long, env = "SUPABASE_JWT_SECRET")]
    pub jwt_secret: Option<String>,

    #[arg(long, env = "JWT_AUDIENCE", default_value = "authenticated")]
    pub jwt_audience: String,

    #[arg(long, env = "DB_SCHEMA", default_value = "public")]
    pub db_schema: String,

    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// JSON array of universities loaded into the memory store at startup
    #[arg(long, env = "SEED_UNIVERSITIES")]
    pub seed_universities: Option<PathBuf>,

    #[arg(long, env = "URGENCY_CRITICAL_DAYS", default_value_t = 3)]
    pub urgency_critical_days: i64,

    #[arg(long, env = "URGENCY_HIGH_DAYS", default_value_t = 7)]
    pub urgency_high_days: i64,

    #[arg(long, env = "URGENCY_MEDIUM_DAYS", default_value_t = 14)]
    pub urgency_medium_days: i64,

    #[arg(long, env = "DEFAULT_PAGE_SIZE", default_value_t = 50)]
    pub default_page_size: u32,

    #[arg(long, env = "MAX_PAGE_SIZE", default_value_t = 200)]
    pub max_page_size: u32,
}

impl ServerConfig {
    /// Load `.env` if present, then parse flags and environment
    pub fn load() -> Self {
        dotenv::dotenv().ok();
        Self::parse()
    }

    /// The key used for PostgREST and GoTrue requests
    pub fn api_key(&self) -> Option<&str> {
        self.supabase_service_key
            .as_deref()
            .or(self.supabase_anon_key.as_deref())
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions::default()
            .with_db_schema(&self.db_schema)
            .with_request_timeout(Some(Duration::from_secs(self.request_timeout_secs)))
    }

    pub fn urgency_policy(&self) -> UrgencyPolicy {
        UrgencyPolicy::new(
            self.urgency_critical_days,
            self.urgency_high_days,
            self.urgency_medium_days,
        )
    }

    pub fn pagination(&self) -> PageLimits {
        PageLimits {
            default_limit: self.default_page_size,
            max_limit: self.max_page_size.max(1),
        }
    }
}

/// Bounds applied to `limit` on paginated endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_limit: u32,
    pub max_limit: u32,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_limit: 50,
            max_limit: 200,
        }
    }
}

impl PageLimits {
    pub fn clamp(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_defaults() {
        let config = ServerConfig::parse_from(["admissions-server", "--store", "memory"]);

        assert_eq!(config.store, StoreBackend::Memory);
        assert_eq!(config.jwt_audience, "authenticated");
        assert_eq!(config.urgency_policy(), UrgencyPolicy::default());
        assert_eq!(config.pagination(), PageLimits::default());
    }

    #[test]
    fn service_key_wins_over_anon_key() {
        let config = ServerConfig::parse_from([
            "admissions-server",
            "--supabase-anon-key",
            "anon",
            "--supabase-service-key",
            "service",
        ]);
        assert_eq!(config.api_key(), Some("service"));
    }

    #[test]
    fn clamps_page_size() {
        let limits = PageLimits::default();
        assert_eq!(limits.clamp(None), 50);
        assert_eq!(limits.clamp(Some(0)), 1);
        assert_eq!(limits.clamp(Some(1000)), 200);
    }
}
