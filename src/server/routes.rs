//! HTTP handlers.

use super::feed::{multipart_part, spawn_producer, sse_event, MJPEG_CONTENT_TYPE};
use super::AppState;
use crate::session::{CaptureSession, SessionError};
use crate::storage::{read_optional, DeleteOutcome, StorageError};
use crate::streaming::FrameStream;
use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{sse::Sse, IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::StreamExt;
use tracing::{debug, error, info};

/// Failure returned to the client as a JSON `{"error": ...}` body.
#[derive(Debug)]
pub(crate) enum ApiError {
    /// The camera could not be opened or started.
    Unavailable(String),
    /// Nothing to serve.
    NotFound(&'static str),
    /// Filesystem or internal failure.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.to_string()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("worker task failed: {e}"))
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        ApiError::Internal(format!("An error occurred: {e}"))
    }
}

/// Query string of `/capture_photos` as raw pairs, so repeated keys parse.
pub(crate) type CaptureQuery = Vec<(String, String)>;

/// First value given for `key`, if any.
fn first_param<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.as_str())
}

/// Interprets a client-supplied capture count.
///
/// Missing or unparseable values fall back to `default`; negative values
/// mean no captures.
pub(crate) fn parse_count(raw: Option<&str>, default: u32) -> u32 {
    match raw.map(str::trim).map(str::parse::<i64>) {
        Some(Ok(n)) => n.clamp(0, i64::from(u32::MAX)) as u32,
        _ => default,
    }
}

pub(crate) async fn index() -> impl IntoResponse {
    Json(json!({ "status": "ok", "message": "Camera server is running." }))
}

pub(crate) async fn start_camera(State(state): State<Arc<AppState>>) -> Result<&'static str, ApiError> {
    let coordinator = Arc::clone(&state.coordinator);
    tokio::task::spawn_blocking(move || coordinator.start(None))
        .await?
        .map_err(|e| ApiError::Unavailable(e.to_string()))?;
    Ok("Camera started")
}

pub(crate) async fn stop_camera(State(state): State<Arc<AppState>>) -> Result<&'static str, ApiError> {
    let coordinator = Arc::clone(&state.coordinator);
    tokio::task::spawn_blocking(move || coordinator.stop()).await?;
    Ok("Camera stopped")
}

pub(crate) async fn video_feed(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let coordinator = Arc::clone(&state.coordinator);
    let config = state.stream.clone();
    let frames = tokio::task::spawn_blocking(move || FrameStream::attach(coordinator, &config))
        .await?
        .map_err(|e| ApiError::Unavailable(e.to_string()))?;

    debug!("Live view requested");
    let body = spawn_producer("camstream-feed", frames, state.stream.buffer_frames)
        .map(|jpeg| Ok::<_, Infallible>(multipart_part(&jpeg)));

    Ok((
        [
            (header::CONTENT_TYPE, MJPEG_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache, no-store"),
        ],
        Body::from_stream(body),
    )
        .into_response())
}

pub(crate) async fn capture_photos(
    State(state): State<Arc<AppState>>,
    query: Option<Query<CaptureQuery>>,
) -> Result<Response, ApiError> {
    let raw = query
        .as_ref()
        .and_then(|Query(pairs)| first_param(pairs, "count"));
    let count = parse_count(raw, state.session.default_count);
    let coordinator = Arc::clone(&state.coordinator);
    let dir = state.store.dir().to_path_buf();
    let config = state.session.clone();

    let session = tokio::task::spawn_blocking(move || {
        CaptureSession::begin(coordinator, dir, count, &config)
    })
    .await?
    .map_err(|e| match e {
        SessionError::Camera(e) => ApiError::Unavailable(e.to_string()),
        e @ SessionError::CreateDir { .. } => ApiError::Internal(e.to_string()),
    })?;

    info!(count, "Photo capture requested");
    let events = spawn_producer("camstream-session", session, 1)
        .map(|event| Ok::<_, Infallible>(sse_event(event)));
    Ok(Sse::new(events).into_response())
}

pub(crate) async fn download_photos(
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let store = state.store.clone();
    let archive = tokio::task::spawn_blocking(move || store.archive())
        .await??
        .ok_or(ApiError::NotFound("No photos found to download."))?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"captured_photos.zip\"",
            ),
        ],
        archive,
    )
        .into_response())
}

pub(crate) async fn delete_photos(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let store = state.store.clone();
    let outcome = tokio::task::spawn_blocking(move || store.delete_all())
        .await?
        .map_err(|e| {
            error!(error = %e, "Photo deletion failed");
            ApiError::from(e)
        })?;

    let message = match outcome {
        DeleteOutcome::DirectoryMissing => "Directory not found, nothing to delete.",
        DeleteOutcome::Deleted(_) => "All photos have been deleted successfully.",
    };
    Ok(Json(json!({ "message": message })).into_response())
}

pub(crate) async fn download_breakdowns(
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let path = state.breakdowns.clone();
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("breakdowns.csv")
        .to_string();
    let csv = tokio::task::spawn_blocking(move || read_optional(&path))
        .await??
        .ok_or(ApiError::NotFound("No breakdowns recorded yet."))?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        csv,
    )
        .into_response())
}

pub(crate) async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.coordinator.metrics().encode() {
        Ok(output) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            output,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {}", e),
        ),
    }
}

pub(crate) async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{Camera, CaptureConfig, MockCamera};
    use crate::config::{SessionConfig, StreamConfig};
    use crate::coordinator::CameraCoordinator;
    use crate::metrics::MetricsRegistry;
    use crate::storage::PhotoStore;
    use proptest::prelude::*;
    use std::path::PathBuf;
    use std::time::Duration;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "camstream-routes-{}-{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    fn app_state(dir: &std::path::Path) -> Arc<AppState> {
        let coordinator = CameraCoordinator::new(
            || Ok(Box::new(MockCamera::new()) as Box<dyn Camera + Send>),
            CaptureConfig::with_dimensions(32, 24),
            MetricsRegistry::new().unwrap(),
        )
        .with_warmup(Duration::ZERO);

        Arc::new(AppState {
            coordinator: Arc::new(coordinator),
            store: PhotoStore::new(dir.join("captured_images")),
            breakdowns: dir.join("pallet_breakdowns.csv"),
            stream: StreamConfig {
                frame_interval_ms: 5,
                ..StreamConfig::default()
            },
            session: SessionConfig {
                capture_interval_ms: 1,
                ..SessionConfig::default()
            },
        })
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    fn query(uri: &str) -> Option<Query<CaptureQuery>> {
        Query::try_from_uri(&uri.parse::<axum::http::Uri>().unwrap()).ok()
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count(None, 10), 10);
        assert_eq!(parse_count(Some("5"), 10), 5);
        assert_eq!(parse_count(Some(" 7 "), 10), 7);
        assert_eq!(parse_count(Some("-3"), 10), 0);
        assert_eq!(parse_count(Some("abc"), 10), 10);
        assert_eq!(parse_count(Some("2.5"), 10), 10);
        assert_eq!(parse_count(Some(""), 10), 10);
    }

    proptest! {
        #[test]
        fn prop_parse_count_never_negative(n in any::<i64>()) {
            let parsed = parse_count(Some(&n.to_string()), 10);
            prop_assert_eq!(i64::from(parsed), n.clamp(0, i64::from(u32::MAX)));
        }
    }

    #[tokio::test]
    async fn test_start_and_stop_camera() {
        let dir = scratch_dir("lifecycle");
        let state = app_state(&dir);

        assert_eq!(start_camera(State(Arc::clone(&state))).await.unwrap(), "Camera started");
        assert!(state.coordinator.is_active());
        assert_eq!(start_camera(State(Arc::clone(&state))).await.unwrap(), "Camera started");

        assert_eq!(stop_camera(State(Arc::clone(&state))).await.unwrap(), "Camera stopped");
        assert!(!state.coordinator.is_active());
        assert_eq!(stop_camera(State(state)).await.unwrap(), "Camera stopped");
    }

    #[tokio::test]
    async fn test_capture_photos_streams_progress_events() {
        let dir = scratch_dir("capture");
        let state = app_state(&dir);

        let response = capture_photos(State(Arc::clone(&state)), query("/capture_photos?count=3"))
            .await
            .unwrap();
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );

        let text = body_text(response).await;
        let one = text.find("data: 1").unwrap();
        let three = text.find("data: 3").unwrap();
        let done = text.find("event: done").unwrap();
        assert!(one < three && three < done);
        assert!(text.contains("Capture complete"));
        assert_eq!(state.store.list().unwrap().len(), 3);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_first_count_wins() {
        let Query(pairs) = query("/capture_photos?count=1&count=2").unwrap();
        assert_eq!(first_param(&pairs, "count"), Some("1"));

        let Query(pairs) = query("/capture_photos?other=x").unwrap();
        assert_eq!(first_param(&pairs, "count"), None);
    }

    #[tokio::test]
    async fn test_capture_photos_repeated_count_uses_first() {
        let dir = scratch_dir("repeated");
        let state = app_state(&dir);

        let response = capture_photos(
            State(Arc::clone(&state)),
            query("/capture_photos?count=1&count=2"),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let text = body_text(response).await;
        assert!(text.contains("data: 1"));
        assert!(!text.contains("data: 2"));
        assert!(text.contains("event: done"));
        assert_eq!(state.store.list().unwrap().len(), 1);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_capture_photos_malformed_query_uses_default() {
        let dir = scratch_dir("malformed");
        let mut state = app_state(&dir);
        Arc::get_mut(&mut state).unwrap().session.default_count = 2;

        for uri in ["/capture_photos?count=%zz&&=", "/capture_photos?count"] {
            let response = capture_photos(State(Arc::clone(&state)), query(uri))
                .await
                .unwrap();
            let text = body_text(response).await;
            assert!(text.contains("data: 2"), "{uri}");
            assert!(text.contains("event: done"), "{uri}");
        }
        let response = capture_photos(State(Arc::clone(&state)), None)
            .await
            .unwrap();
        assert!(body_text(response).await.contains("data: 2"));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_capture_photos_negative_count_only_done() {
        let dir = scratch_dir("negative");
        let state = app_state(&dir);

        let response = capture_photos(State(Arc::clone(&state)), query("/capture_photos?count=-4"))
            .await
            .unwrap();
        let text = body_text(response).await;
        assert!(!text.contains("data: 1"));
        assert!(text.contains("event: done"));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_video_feed_ends_when_camera_stops() {
        let dir = scratch_dir("feed");
        let state = app_state(&dir);

        let response = video_feed(State(Arc::clone(&state))).await.unwrap();
        assert_eq!(response.headers()[header::CONTENT_TYPE], MJPEG_CONTENT_TYPE);

        let coordinator = Arc::clone(&state.coordinator);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            tokio::task::spawn_blocking(move || coordinator.stop())
                .await
                .unwrap();
        });

        let bytes = tokio::time::timeout(
            Duration::from_secs(5),
            axum::body::to_bytes(response.into_body(), usize::MAX),
        )
        .await
        .unwrap()
        .unwrap();

        let part_header = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n";
        assert!(bytes.starts_with(part_header));
        assert!(state.coordinator.metrics().frames_streamed() > 0);
    }

    #[tokio::test]
    async fn test_download_photos_missing_is_not_found() {
        let dir = scratch_dir("download-missing");
        let state = app_state(&dir);

        let response = download_photos(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_text(response).await.contains("No photos found"));
    }

    #[tokio::test]
    async fn test_download_photos_returns_zip() {
        let dir = scratch_dir("download");
        let state = app_state(&dir);
        std::fs::create_dir_all(state.store.dir()).unwrap();
        std::fs::write(state.store.dir().join("image_x.jpg"), b"jpeg").unwrap();

        let response = download_photos(State(Arc::clone(&state))).await.unwrap();
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/zip");
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..2], b"PK");
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_delete_photos() {
        let dir = scratch_dir("delete");
        let state = app_state(&dir);

        let response = delete_photos(State(Arc::clone(&state))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("nothing to delete"));

        std::fs::create_dir_all(state.store.dir()).unwrap();
        std::fs::write(state.store.dir().join("image_x.jpg"), b"jpeg").unwrap();
        let response = delete_photos(State(Arc::clone(&state))).await.unwrap();
        assert!(body_text(response).await.contains("deleted successfully"));
        assert!(state.store.list().unwrap().is_empty());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_download_breakdowns() {
        let dir = scratch_dir("breakdowns");
        let state = app_state(&dir);

        let response = download_breakdowns(State(Arc::clone(&state)))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(&state.breakdowns, b"pallet,count\n").unwrap();
        let response = download_breakdowns(State(Arc::clone(&state))).await.unwrap();
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"pallet_breakdowns.csv\""
        );
        assert_eq!(body_text(response).await, "pallet,count\n");
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let dir = scratch_dir("metrics");
        let state = app_state(&dir);

        let response = metrics(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("camstream_camera_active"));
    }
}
