//! HTTP API.
//!
//! Public routes serve published content and accept page-view beacons.
//! Everything under `/api/admin` except `login` needs a bearer token from a
//! live session.

mod auth;
mod error;
mod routes;
mod state;

use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post, put};
use axum::{middleware, Router};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{CalendarEvent, GalleryPhoto, PageContent, TrainingProgram};

pub use auth::{bearer_token, SessionToken};
pub use error::ApiJson;
pub use state::AppState;

/// Body limit for JSON requests.
pub(crate) const JSON_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Room left for multipart framing on top of the upload limit.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the application router.
///
/// # Errors
///
/// Returns an error if a configured CORS origin is not a valid header value.
pub fn router(state: AppState) -> Result<Router> {
    let config = state.config();
    let cors = cors_layer(config)?;
    let upload_limit = config.uploads.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD);
    let uploads = ServeDir::new(config.upload_dir());
    let public_path = config.uploads.public_path.clone();

    let admin = Router::new()
        .route("/api/admin/logout", post(routes::logout))
        .route("/api/admin/pages", get(routes::list_pages))
        .route(
            "/api/admin/pages/{id}",
            put(routes::put_record::<PageContent>).delete(routes::delete_record::<PageContent>),
        )
        .route("/api/admin/programs", get(routes::list_all_programs))
        .route(
            "/api/admin/programs/{id}",
            put(routes::put_record::<TrainingProgram>)
                .delete(routes::delete_record::<TrainingProgram>),
        )
        .route(
            "/api/admin/events/{id}",
            put(routes::put_record::<CalendarEvent>).delete(routes::delete_record::<CalendarEvent>),
        )
        .route(
            "/api/admin/photos/{id}",
            put(routes::put_record::<GalleryPhoto>).delete(routes::delete_record::<GalleryPhoto>),
        )
        .route(
            "/api/admin/settings",
            get(routes::get_settings).put(routes::put_settings),
        )
        .route("/api/admin/analytics", get(routes::analytics))
        .route("/api/admin/analytics/chart.svg", get(routes::analytics_chart))
        .route(
            "/api/admin/uploads/{target}",
            post(routes::upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/admin/gallery/sync", post(routes::sync_gallery))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_session,
        ));

    let public = Router::new()
        .route("/api/health", get(routes::health))
        .route("/api/pages/{id}", get(routes::get_page))
        .route("/api/programs", get(routes::list_programs))
        .route("/api/programs/{id}", get(routes::get_program))
        .route("/api/events", get(routes::list_events))
        .route("/api/photos", get(routes::list_photos))
        .route("/api/settings", get(routes::public_settings))
        .route("/api/track", post(routes::track))
        .route("/api/admin/login", post(routes::login));

    Ok(Router::new()
        .merge(public)
        .merge(admin)
        .nest_service(&public_path, uploads)
        .layer(DefaultBodyLimit::max(JSON_BODY_LIMIT))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state))
}

fn cors_layer(config: &Config) -> Result<CorsLayer> {
    let origin = if config.server.allowed_origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        let origins = config
            .server
            .allowed_origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin).map_err(|_| Error::ConfigValidation {
                    message: format!("invalid CORS origin: {origin}"),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        AllowOrigin::list(origins)
    };

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60)))
}

/// Bind and serve until Ctrl-C or SIGTERM.
///
/// # Errors
///
/// Returns an error if the router cannot be built, the address cannot be
/// bound, or the server fails.
pub async fn serve(state: AppState) -> Result<()> {
    let address = state.config().bind_address();
    let app = router(state)?;

    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
