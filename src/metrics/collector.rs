//! Metrics collection and registry.

use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// Prometheus metrics registry for camera and pipeline activity.
///
/// Each coordinator owns its own registry, so independent instances (as in
/// tests) never share counters.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Registry,

    // Device metrics
    camera_active: IntGauge,
    camera_starts: IntCounter,

    // Streaming metrics
    frames_streamed: IntCounter,
    encode_failures: IntCounter,
    active_viewers: IntGauge,

    // Capture metrics
    captures: IntCounter,
    sessions_completed: IntCounter,
    sessions_aborted: IntCounter,
}

impl MetricsRegistry {
    /// Creates a new registry with all camera metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let camera_active = IntGauge::new(
            "camstream_camera_active",
            "Whether the camera is currently running (1=active, 0=inactive)",
        )?;
        let camera_starts = IntCounter::new(
            "camstream_camera_starts_total",
            "Number of times the camera device was opened and started",
        )?;

        let frames_streamed = IntCounter::new(
            "camstream_frames_streamed_total",
            "Encoded frames sent to live viewers",
        )?;
        let encode_failures = IntCounter::new(
            "camstream_encode_failures_total",
            "Frames skipped because JPEG encoding failed",
        )?;
        let active_viewers = IntGauge::new(
            "camstream_active_viewers",
            "Live view streams currently attached",
        )?;

        let captures = IntCounter::new(
            "camstream_captures_total",
            "Image files written by capture sessions",
        )?;
        let sessions_completed = IntCounter::new(
            "camstream_sessions_completed_total",
            "Capture sessions that ran to completion",
        )?;
        let sessions_aborted = IntCounter::new(
            "camstream_sessions_aborted_total",
            "Capture sessions cut short because the camera stopped",
        )?;

        registry.register(Box::new(camera_active.clone()))?;
        registry.register(Box::new(camera_starts.clone()))?;
        registry.register(Box::new(frames_streamed.clone()))?;
        registry.register(Box::new(encode_failures.clone()))?;
        registry.register(Box::new(active_viewers.clone()))?;
        registry.register(Box::new(captures.clone()))?;
        registry.register(Box::new(sessions_completed.clone()))?;
        registry.register(Box::new(sessions_aborted.clone()))?;

        Ok(Self {
            registry,
            camera_active,
            camera_starts,
            frames_streamed,
            encode_failures,
            active_viewers,
            captures,
            sessions_completed,
            sessions_aborted,
        })
    }

    pub(crate) fn record_start(&self) {
        self.camera_starts.inc();
        self.camera_active.set(1);
    }

    pub(crate) fn record_stop(&self) {
        self.camera_active.set(0);
    }

    pub(crate) fn record_frame(&self) {
        self.frames_streamed.inc();
    }

    pub(crate) fn record_encode_failure(&self) {
        self.encode_failures.inc();
    }

    pub(crate) fn viewer_attached(&self) {
        self.active_viewers.inc();
    }

    pub(crate) fn viewer_detached(&self) {
        self.active_viewers.dec();
    }

    pub(crate) fn record_capture(&self) {
        self.captures.inc();
    }

    pub(crate) fn record_session(&self, completed: bool) {
        if completed {
            self.sessions_completed.inc();
        } else {
            self.sessions_aborted.inc();
        }
    }

    /// Number of frames streamed so far.
    pub fn frames_streamed(&self) -> u64 {
        self.frames_streamed.get()
    }

    /// Number of live viewers currently attached.
    pub fn active_viewers(&self) -> i64 {
        self.active_viewers.get()
    }


    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
