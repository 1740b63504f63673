//! Pull-based live view: one encoded JPEG per iteration.

use super::encode_jpeg;
use crate::capture::CameraError;
use crate::config::StreamConfig;
use crate::coordinator::CameraCoordinator;
use std::iter::FusedIterator;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Live sequence of JPEG frames for a single viewer.
///
/// Each call to `next` pulls one frame from the coordinator, encodes it and
/// returns it. Consecutive pulls are spaced by the configured frame
/// interval. The sequence ends the first time the coordinator has no frame
/// to give, i.e. when the camera has been stopped.
///
/// `next` blocks for the frame interval and for the device capture, so the
/// stream should be driven from a blocking thread.
pub struct FrameStream {
    coordinator: Arc<CameraCoordinator>,
    interval: Duration,
    quality: u8,
    polled: bool,
    finished: bool,
}

impl FrameStream {
    /// Starts the camera if needed and attaches a new viewer.
    pub fn attach(
        coordinator: Arc<CameraCoordinator>,
        config: &StreamConfig,
    ) -> Result<Self, CameraError> {
        coordinator.start(None)?;
        coordinator.metrics().viewer_attached();
        debug!(interval = ?config.frame_interval(), "Viewer attached");

        Ok(Self {
            coordinator,
            interval: config.frame_interval(),
            quality: config.jpeg_quality,
            polled: false,
            finished: false,
        })
    }

    /// Whether the stream has ended.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl Iterator for FrameStream {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Vec<u8>> {
        if self.finished {
            return None;
        }

        loop {
            if self.polled {
                std::thread::sleep(self.interval);
            }
            self.polled = true;

            let frame = match self.coordinator.get_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    info!("Camera is off, ending video stream");
                    self.finished = true;
                    return None;
                }
                Err(e) => {
                    warn!(error = %e, "Frame capture failed, ending video stream");
                    self.finished = true;
                    return None;
                }
            };

            match encode_jpeg(&frame, self.quality) {
                Ok(jpeg) => {
                    self.coordinator.metrics().record_frame();
                    return Some(jpeg);
                }
                Err(e) => {
                    self.coordinator.metrics().record_encode_failure();
                    warn!(sequence = frame.sequence(), error = %e, "Skipping frame");
                }
            }
        }
    }
}

impl FusedIterator for FrameStream {}

impl Drop for FrameStream {
    fn drop(&mut self) {
        self.coordinator.metrics().viewer_detached();
        debug!("Viewer detached");
    }
}
