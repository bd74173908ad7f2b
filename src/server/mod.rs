//! HTTP surface
//!
//! Every route except registration requires `Authorization: Bearer <token>`.
//! The [`AuthUser`](crate::access::AuthUser) extractor verifies the token and
//! resolves the role; handlers check permissions and ownership themselves.

pub mod extract;
pub mod handlers;
pub mod state;

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    routing::{get, post, put},
    Router,
};
use tokio::{net::TcpListener, signal};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::error::Error;
use handlers::{auth, parent, student, universities};
pub use state::AppState;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/setup-profile", post(auth::setup_profile))
        .route("/session", get(auth::session));

    let student_routes = Router::new()
        .route(
            "/applications",
            get(student::list_applications).post(student::create_application),
        )
        .route(
            "/applications/:id",
            get(student::get_application)
                .put(student::update_application)
                .delete(student::delete_application),
        )
        .route("/applications/:id/status", post(student::update_status))
        .route(
            "/applications/:id/requirements",
            get(student::list_requirements).post(student::create_requirement),
        )
        .route(
            "/requirements/:id",
            put(student::update_requirement).delete(student::delete_requirement),
        )
        .route(
            "/profile",
            get(student::get_profile).put(student::update_profile),
        )
        .route("/dashboard/stats", get(student::dashboard_stats))
        .route(
            "/dashboard/upcoming-deadlines",
            get(student::upcoming_deadlines),
        )
        .route("/notifications", get(student::notifications));

    let parent_routes = Router::new()
        .route(
            "/profile",
            get(parent::get_profile).put(parent::update_profile),
        )
        .route("/students", get(parent::list_students))
        .route(
            "/students/:id/applications",
            get(parent::student_applications),
        )
        .route("/applications/:id/notes", put(parent::add_note));

    let university_routes = Router::new()
        .route("/", get(universities::list))
        .route("/:id", get(universities::get));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/student", student_routes)
        .nest("/api/parent", parent_routes)
        .nest("/api/universities", university_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until Ctrl+C or SIGTERM
pub async fn serve(state: AppState, address: SocketAddr) -> Result<(), Error> {
    let app = router(state);

    let listener = TcpListener::bind(address)
        .await
        .map_err(|e| Error::general(format!("cannot bind {address}: {e}")))?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::general(format!("server error: {e}")))?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                tracing::error!(error = %e, "failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
