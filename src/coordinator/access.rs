//! Exclusive, lock-scoped access to the camera device.

use crate::capture::{Camera, CameraError, CaptureConfig, Frame};
use crate::metrics::MetricsRegistry;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Creates a fresh, unopened device handle each time the camera starts.
pub type CameraFactory =
    Box<dyn Fn() -> Result<Box<dyn Camera + Send>, CameraError> + Send + Sync>;

/// Default pause between starting the device and handing out frames.
pub const DEFAULT_WARMUP: Duration = Duration::from_secs(1);

/// Result of a [`CameraCoordinator::start`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// This call opened and started the device.
    Started,
    /// The device was already running; nothing was done.
    AlreadyActive,
}

/// Device state guarded by the coordinator's lock.
///
/// The camera is active exactly when a started handle is present.
#[derive(Default)]
struct CoordinatorState {
    camera: Option<Box<dyn Camera + Send>>,
}

/// Sole owner of the camera device.
///
/// Every device operation runs under one mutex for the duration of that
/// operation only. Callers that find the camera inactive get `None` or
/// `false` back rather than an error, which is how the streaming and
/// capture loops learn they should stop.
pub struct CameraCoordinator {
    factory: CameraFactory,
    defaults: CaptureConfig,
    warmup: Duration,
    state: Mutex<CoordinatorState>,
    metrics: MetricsRegistry,
}

impl CameraCoordinator {
    /// Creates an inactive coordinator.
    ///
    /// `defaults` is applied when [`start`](Self::start) is called without
    /// an explicit configuration.
    pub fn new<F>(factory: F, defaults: CaptureConfig, metrics: MetricsRegistry) -> Self
    where
        F: Fn() -> Result<Box<dyn Camera + Send>, CameraError> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            defaults,
            warmup: DEFAULT_WARMUP,
            state: Mutex::new(CoordinatorState::default()),
            metrics,
        }
    }

    /// Overrides the warm-up pause applied after the device starts.
    pub fn with_warmup(mut self, warmup: Duration) -> Self {
        self.warmup = warmup;
        self
    }

    fn lock(&self) -> MutexGuard<'_, CoordinatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens, configures and starts the device if it is not already running.
    ///
    /// Any device failure leaves the coordinator inactive with no handle.
    pub fn start(&self, config: Option<&CaptureConfig>) -> Result<StartOutcome, CameraError> {
        let mut state = self.lock();
        if state.camera.is_some() {
            return Ok(StartOutcome::AlreadyActive);
        }

        let config = config.unwrap_or(&self.defaults);
        info!(
            width = config.width,
            height = config.height,
            format = ?config.format,
            "Starting camera"
        );

        let mut camera = (self.factory)()?;
        let started = camera.open(config).and_then(|()| camera.start());
        if let Err(e) = started {
            camera.close();
            warn!(error = %e, "Camera failed to start");
            return Err(e);
        }

        std::thread::sleep(self.warmup);
        state.camera = Some(camera);
        self.metrics.record_start();
        info!("Camera started");
        Ok(StartOutcome::Started)
    }

    /// Stops and releases the device.
    ///
    /// Returns `false` when the camera was not running.
    pub fn stop(&self) -> bool {
        let mut state = self.lock();
        let Some(mut camera) = state.camera.take() else {
            return false;
        };

        info!("Stopping camera");
        if let Err(e) = camera.stop() {
            warn!(error = %e, "Camera did not stop cleanly, closing anyway");
        }
        camera.close();
        self.metrics.record_stop();
        info!("Camera stopped");
        true
    }

    /// Captures one raw frame, or `None` when the camera is inactive.
    pub fn get_frame(&self) -> Result<Option<Frame>, CameraError> {
        let mut state = self.lock();
        match state.camera.as_mut() {
            Some(camera) => camera.capture().map(Some),
            None => Ok(None),
        }
    }

    /// Has the device write its current frame to `path`.
    ///
    /// Returns `false` without touching the filesystem when the camera is
    /// inactive.
    pub fn capture_file(&self, path: &Path) -> Result<bool, CameraError> {
        let mut state = self.lock();
        let Some(camera) = state.camera.as_mut() else {
            return Ok(false);
        };
        camera.capture_file(path)?;
        debug!(path = %path.display(), "Captured file");
        Ok(true)
    }

    /// Whether the device is currently running.
    pub fn is_active(&self) -> bool {
        self.lock().camera.is_some()
    }

    /// Metrics recorded by this coordinator and the pipelines using it.
    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }
}

impl std::fmt::Debug for CameraCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraCoordinator")
            .field("defaults", &self.defaults)
            .field("warmup", &self.warmup)
            .field("active", &self.is_active())
            .finish()
    }
}
