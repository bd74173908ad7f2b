use std::process::ExitCode;
use std::sync::Arc;

use admissions_tracker::auth::{JwtVerifier, TokenVerifier};
use admissions_tracker::config::{ServerConfig, StoreBackend};
use admissions_tracker::error::Error;
use admissions_tracker::server::{self, AppState};
use admissions_tracker::store::{MemoryStore, Store};
use admissions_tracker::Supabase;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

async fn build_state(config: &ServerConfig) -> Result<AppState, Error> {
    let supabase = match (config.supabase_url.as_deref(), config.api_key()) {
        (Some(url), Some(key)) => Some(Supabase::new_with_options(
            url,
            key,
            config.client_options(),
        )),
        _ => None,
    };

    let store: Arc<dyn Store> = match config.store {
        StoreBackend::Supabase => {
            let supabase = supabase.as_ref().ok_or_else(|| {
                Error::general("SUPABASE_URL and a Supabase key are required for the supabase store")
            })?;
            Arc::new(supabase.store())
        }
        StoreBackend::Memory => {
            let store = MemoryStore::new();
            if let Some(path) = &config.seed_universities {
                store.seed_universities(path).await?;
            }
            Arc::new(store)
        }
    };

    let verifier: Arc<dyn TokenVerifier> = match (&config.jwt_secret, &supabase) {
        (Some(secret), _) => Arc::new(JwtVerifier::new(secret, &config.jwt_audience)),
        (None, Some(supabase)) => Arc::new(supabase.auth().clone()),
        (None, None) => {
            return Err(Error::general(
                "either SUPABASE_JWT_SECRET or a Supabase project is needed to verify tokens",
            ))
        }
    };

    let mut state = AppState::new(store, verifier)
        .with_policy(config.urgency_policy())
        .with_pages(config.pagination());

    match supabase {
        Some(supabase) => state = state.with_auth(supabase.auth().clone()),
        None => warn!("no Supabase project configured, registration is disabled"),
    }

    Ok(state)
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = ServerConfig::load();
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!(store = ?config.store, bind = %config.bind, "Initializing state...");
    let state = match build_state(&config).await {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "startup failed");
            return ExitCode::FAILURE;
        }
    };

    match server::serve(state, config.bind).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "server stopped");
            ExitCode::FAILURE
        }
    }
}
