//! Timed, sequential capture-to-file with progress events.

use super::naming::capture_filename;
use crate::capture::CameraError;
use crate::config::SessionConfig;
use crate::coordinator::CameraCoordinator;
use chrono::Local;
use serde::Serialize;
use std::iter::FusedIterator;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that prevent a capture session from starting.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to create capture directory {}: {}", path.display(), source)]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Camera(#[from] CameraError),
}

/// Progress reported by a [`CaptureSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "captured", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Number of files written so far, starting at 1.
    Progress(u32),
    /// Every requested capture was written.
    Done,
}

impl SessionEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionEvent::Done)
    }
}

/// One run of `count` timed captures.
///
/// Each iteration checks that the camera still delivers frames, writes the
/// next image file, and yields [`SessionEvent::Progress`]. After the last
/// capture a single [`SessionEvent::Done`] follows. If the camera stops
/// partway through, the sequence simply ends: no further progress and no
/// `Done`.
pub struct CaptureSession {
    coordinator: Arc<CameraCoordinator>,
    dir: PathBuf,
    extension: String,
    interval: Duration,
    count: u32,
    captured: u32,
    finished: bool,
}

impl CaptureSession {
    /// Creates the capture directory, starts the camera and returns a
    /// session ready to run.
    pub fn begin(
        coordinator: Arc<CameraCoordinator>,
        dir: impl Into<PathBuf>,
        count: u32,
        config: &SessionConfig,
    ) -> Result<Self, SessionError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| SessionError::CreateDir {
            path: dir.clone(),
            source,
        })?;
        coordinator.start(None)?;
        info!(count, dir = %dir.display(), "Capture session started");

        Ok(Self {
            coordinator,
            dir,
            extension: config.extension.clone(),
            interval: config.capture_interval(),
            count,
            captured: 0,
            finished: false,
        })
    }

    /// Directory the session writes into.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of files written so far.
    pub fn captured(&self) -> u32 {
        self.captured
    }

    fn abort(&mut self, reason: &str) -> Option<SessionEvent> {
        warn!(
            captured = self.captured,
            requested = self.count,
            reason,
            "Capture session stopped early"
        );
        self.finished = true;
        self.coordinator.metrics().record_session(false);
        None
    }

    fn capture_next(&mut self) -> Result<bool, CameraError> {
        if self.coordinator.get_frame()?.is_none() {
            return Ok(false);
        }

        let name = capture_filename(&Local::now(), self.captured, &self.extension);
        let path = self.dir.join(name);
        if !self.coordinator.capture_file(&path)? {
            return Ok(false);
        }
        debug!(path = %path.display(), index = self.captured, "Image captured");
        Ok(true)
    }
}

impl Iterator for CaptureSession {
    type Item = SessionEvent;

    fn next(&mut self) -> Option<SessionEvent> {
        if self.finished {
            return None;
        }
        if self.captured > 0 {
            std::thread::sleep(self.interval);
        }

        if self.captured >= self.count {
            self.finished = true;
            self.coordinator.metrics().record_session(true);
            info!(captured = self.captured, "Capture session complete");
            return Some(SessionEvent::Done);
        }

        match self.capture_next() {
            Ok(true) => {
                self.captured += 1;
                self.coordinator.metrics().record_capture();
                Some(SessionEvent::Progress(self.captured))
            }
            Ok(false) => self.abort("camera turned off"),
            Err(e) => self.abort(&e.to_string()),
        }
    }
}

impl FusedIterator for CaptureSession {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{Camera, CaptureConfig, MockCamera};
    use crate::metrics::MetricsRegistry;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "camstream-session-{}-{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    fn file_count(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    fn session_config() -> SessionConfig {
        SessionConfig {
            capture_interval_ms: 1,
            ..SessionConfig::default()
        }
    }

    fn mock_coordinator() -> Arc<CameraCoordinator> {
        Arc::new(
            CameraCoordinator::new(
                || Ok(Box::new(MockCamera::new()) as Box<dyn Camera + Send>),
                CaptureConfig::with_dimensions(32, 24),
                MetricsRegistry::new().unwrap(),
            )
            .with_warmup(Duration::ZERO),
        )
    }

    #[test]
    fn test_full_session_reports_progress_then_done() {
        let dir = scratch_dir("full");
        let session =
            CaptureSession::begin(mock_coordinator(), &dir, 5, &session_config()).unwrap();

        let events: Vec<_> = session.collect();
        assert_eq!(
            events,
            vec![
                SessionEvent::Progress(1),
                SessionEvent::Progress(2),
                SessionEvent::Progress(3),
                SessionEvent::Progress(4),
                SessionEvent::Progress(5),
                SessionEvent::Done,
            ]
        );
        assert_eq!(file_count(&dir), 5);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_stop_mid_session_aborts_without_done() {
        let dir = scratch_dir("abort");
        let coordinator = mock_coordinator();
        let mut session =
            CaptureSession::begin(Arc::clone(&coordinator), &dir, 5, &session_config()).unwrap();

        assert_eq!(session.next(), Some(SessionEvent::Progress(1)));
        assert_eq!(session.next(), Some(SessionEvent::Progress(2)));
        coordinator.stop();

        assert_eq!(session.next(), None);
        assert_eq!(session.next(), None);
        assert_eq!(session.captured(), 2);
        assert_eq!(file_count(&dir), 2);

        let output = coordinator.metrics().encode().unwrap();
        assert!(output.contains("camstream_sessions_aborted_total 1"));
        assert!(output.contains("camstream_captures_total 2"));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_zero_count_finishes_immediately() {
        let dir = scratch_dir("zero");
        let session =
            CaptureSession::begin(mock_coordinator(), &dir, 0, &session_config()).unwrap();

        assert_eq!(session.collect::<Vec<_>>(), vec![SessionEvent::Done]);
        assert!(dir.is_dir());
        assert_eq!(file_count(&dir), 0);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_begin_starts_camera_and_creates_dir() {
        let dir = scratch_dir("begin").join("nested");
        let coordinator = mock_coordinator();

        let session =
            CaptureSession::begin(Arc::clone(&coordinator), &dir, 1, &session_config()).unwrap();
        assert!(coordinator.is_active());
        assert!(session.dir().is_dir());
        std::fs::remove_dir_all(dir.parent().unwrap()).unwrap();
    }

    #[test]
    fn test_begin_fails_when_dir_is_a_file() {
        let dir = scratch_dir("blocked");
        std::fs::write(&dir, b"not a directory").unwrap();

        let result = CaptureSession::begin(mock_coordinator(), &dir, 1, &session_config());
        assert!(matches!(result, Err(SessionError::CreateDir { .. })));
        std::fs::remove_file(&dir).unwrap();
    }

    #[test]
    fn test_begin_fails_without_device() {
        let dir = scratch_dir("nodevice");
        let coordinator = Arc::new(
            CameraCoordinator::new(
                || Ok(Box::new(MockCamera::failing()) as Box<dyn Camera + Send>),
                CaptureConfig::default(),
                MetricsRegistry::new().unwrap(),
            )
            .with_warmup(Duration::ZERO),
        );

        let result = CaptureSession::begin(coordinator, &dir, 1, &session_config());
        assert!(matches!(result, Err(SessionError::Camera(_))));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_filenames_follow_capture_order() {
        let dir = scratch_dir("order");
        let session =
            CaptureSession::begin(mock_coordinator(), &dir, 3, &session_config()).unwrap();
        session.for_each(drop);

        let mut names: Vec<_> = std::fs::read_dir(&dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert!(names[0].starts_with("image_") && names[0].ends_with("_00.jpg"));
        assert!(names[2].ends_with("_02.jpg"));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_only_done_is_terminal() {
        assert!(SessionEvent::Done.is_terminal());
        assert!(!SessionEvent::Progress(1).is_terminal());
    }

    #[test]
    fn test_event_serialization() {
        assert_eq!(
            serde_json::to_string(&SessionEvent::Progress(3)).unwrap(),
            r#"{"event":"progress","captured":3}"#
        );
        assert_eq!(
            serde_json::to_string(&SessionEvent::Done).unwrap(),
            r#"{"event":"done"}"#
        );
    }
}
