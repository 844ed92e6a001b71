//! REST API over the snapshot store and the monitor configuration
//!
//! ## Architecture
//!
//! - **Axum** web framework with Tower middleware
//! - **Shared state** holding the storage backend and the config source
//! - **Envelope** responses `{code, message, data}`, `code == 0` on success
//!
//! ## Endpoints
//!
//! - `GET /api/health` - Health check
//! - `GET /api/video/:id/stats?limit=` - History of one video, oldest first
//! - `GET /api/video/:id/latest` - Latest snapshot of one video
//! - `GET /api/videos` - Known video ids
//! - `GET /api/videos/info` - Known videos with their last title
//! - `GET /api/videos/compare?bv_ids=&limit=` - History of several videos
//! - `POST|DELETE /api/data/delete` - Filtered delete
//! - `GET|POST /api/config` - Interval and monitor list

pub mod error;
pub mod routes;
pub mod state;
pub mod types;

pub use error::{ApiError, ApiResult};
pub use state::ApiState;
pub use types::{DeleteResult, Envelope, HealthResponse, StatsRow, VideoInfo};

use std::net::SocketAddr;

use axum::{
    Router,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bind address (e.g., "0.0.0.0:5000")
    pub bind_addr: SocketAddr,

    /// Enable CORS for the dashboard
    pub enable_cors: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            enable_cors: true,
        }
    }
}

/// Build the router with every endpoint
pub fn router(state: ApiState, enable_cors: bool) -> Router {
    let mut app = Router::new()
        .route("/api/health", get(routes::health::health_check))
        .route("/api/video/:id/stats", get(routes::videos::get_video_stats))
        .route("/api/video/:id/latest", get(routes::videos::get_latest))
        .route("/api/videos", get(routes::videos::list_videos))
        .route("/api/videos/info", get(routes::videos::list_videos_info))
        .route("/api/videos/compare", get(routes::videos::compare_videos))
        .route(
            "/api/data/delete",
            post(routes::data::delete_by_body).delete(routes::data::delete_by_query),
        )
        .route(
            "/api/config",
            get(routes::config::get_config).post(routes::config::update_config),
        )
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    if enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    app
}

/// Spawn the API server
///
/// This starts an Axum HTTP server in a background task.
/// Returns the server's local address.
pub async fn spawn_api_server(config: ApiConfig, state: ApiState) -> anyhow::Result<SocketAddr> {
    info!("starting API server on {}", config.bind_addr);

    let app = router(state, config.enable_cors);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let addr = listener.local_addr()?;

    info!("API server listening on {}", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok(addr)
}
