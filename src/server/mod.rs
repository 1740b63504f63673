//! HTTP front end.
//!
//! Routes requests onto the shared [`CameraCoordinator`] and frames
//! pipeline output for the wire:
//!
//! | Method | Path                   | Response                                   |
//! |--------|------------------------|--------------------------------------------|
//! | GET    | `/`                    | JSON status                                |
//! | GET    | `/start_camera`        | Starts the camera                          |
//! | GET    | `/stop_camera`         | Stops the camera, ending all live streams  |
//! | GET    | `/video_feed`          | `multipart/x-mixed-replace` MJPEG stream   |
//! | GET    | `/capture_photos`      | `text/event-stream` capture progress       |
//! | GET    | `/download_photos`     | Zip of all captured images                 |
//! | POST   | `/delete_photos`       | Removes all captured images                |
//! | GET    | `/download_breakdowns` | Breakdown report CSV                       |
//! | GET    | `/metrics`             | Prometheus metrics                         |
//! | GET    | `/health`              | Liveness probe                             |

mod feed;
mod routes;

pub use feed::{multipart_part, spawn_producer, sse_event, MJPEG_BOUNDARY, MJPEG_CONTENT_TYPE};

use crate::config::{ServerConfig, SessionConfig, StreamConfig};
use crate::coordinator::CameraCoordinator;
use crate::storage::PhotoStore;
use axum::{
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::CorsLayer;

/// Errors that can occur while running the HTTP server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind to address: {0}")]
    Bind(#[from] std::io::Error),

    #[error("server error: {0}")]
    Server(String),
}

/// State shared by every request handler.
pub struct AppState {
    pub coordinator: Arc<CameraCoordinator>,
    pub store: PhotoStore,
    pub breakdowns: PathBuf,
    pub stream: StreamConfig,
    pub session: SessionConfig,
}

/// HTTP server exposing the camera.
pub struct CameraServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl CameraServer {
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self {
            config,
            state: Arc::new(state),
        }
    }

    /// Builds the router with all endpoints mounted.
    pub fn router(state: Arc<AppState>) -> Router {
        Router::new()
            .route("/", get(routes::index))
            .route("/start_camera", get(routes::start_camera))
            .route("/stop_camera", get(routes::stop_camera))
            .route("/video_feed", get(routes::video_feed))
            .route("/capture_photos", get(routes::capture_photos))
            .route("/download_photos", get(routes::download_photos))
            .route("/delete_photos", post(routes::delete_photos))
            .route("/download_breakdowns", get(routes::download_breakdowns))
            .route("/metrics", get(routes::metrics))
            .route("/health", get(routes::health))
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    /// Serves requests until `shutdown` resolves.
    ///
    /// On shutdown the camera is stopped first, which ends every live
    /// stream and capture session so open connections can drain.
    pub async fn run<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = Self::router(Arc::clone(&self.state));
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;

        tracing::info!(addr = %self.config.bind_addr, "Camera server listening");

        let coordinator = Arc::clone(&self.state.coordinator);
        let shutdown = async move {
            shutdown.await;
            tracing::info!("Shutting down, stopping camera");
            if let Err(e) = tokio::task::spawn_blocking(move || coordinator.stop()).await {
                tracing::warn!(error = %e, "Failed to stop camera during shutdown");
            }
        };

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Server(e.to_string()))?;

        Ok(())
    }
}
