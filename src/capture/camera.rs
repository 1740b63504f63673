//! Camera abstraction for frame capture.
//!
//! This module provides a trait-based abstraction over camera hardware,
//! allowing for both real camera input and a synthetic implementation for
//! testing and demos.

use super::{CaptureConfig, Frame};
use crate::streaming::encode_jpeg;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during camera operations.
#[derive(Debug, Error)]
pub enum CameraError {
    #[error("camera device not found: {0}")]
    DeviceNotFound(String),
    #[error("failed to open camera: {0}")]
    OpenFailed(String),
    #[error("failed to configure camera: {0}")]
    ConfigFailed(String),
    #[error("failed to start camera: {0}")]
    StartFailed(String),
    #[error("failed to capture frame: {0}")]
    CaptureFailed(String),
    #[error("failed to stop camera: {0}")]
    StopFailed(String),
    #[error("failed to write capture: {0}")]
    Io(#[from] std::io::Error),
    #[error("camera not initialized")]
    NotInitialized,
}

/// Trait for camera implementations.
///
/// Lifecycle is `open` → `start` → (`capture` | `capture_file`)* → `stop`
/// → `close`. Implementations are driven by a single owner and need not be
/// internally synchronized.
pub trait Camera {
    /// Opens the device and applies the given configuration.
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError>;

    /// Starts frame delivery.
    fn start(&mut self) -> Result<(), CameraError>;

    /// Captures a single raw frame.
    fn capture(&mut self) -> Result<Frame, CameraError>;

    /// Encodes the current frame and writes it to `path`.
    fn capture_file(&mut self, path: &Path) -> Result<(), CameraError>;

    /// Stops frame delivery.
    fn stop(&mut self) -> Result<(), CameraError>;

    /// Closes the camera and releases resources.
    fn close(&mut self);
}

/// Shared counters a [`MockCamera`] reports device usage into.
#[derive(Debug, Default)]
pub struct DeviceCounters {
    opens: AtomicUsize,
    open_now: AtomicUsize,
    max_open: AtomicUsize,
}

impl DeviceCounters {
    /// Counters ready to hand to several cameras.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Total number of successful opens.
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Devices currently open.
    pub fn open_now(&self) -> usize {
        self.open_now.load(Ordering::SeqCst)
    }

    /// Highest number of devices that were ever open at the same time.
    pub fn max_open(&self) -> usize {
        self.max_open.load(Ordering::SeqCst)
    }

    fn record_open(&self) {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let now = self.open_now.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_open.fetch_max(now, Ordering::SeqCst);
    }

    fn record_close(&self) {
        self.open_now.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Synthetic camera that generates a moving test pattern.
#[derive(Debug)]
pub struct MockCamera {
    config: Option<CaptureConfig>,
    running: bool,
    sequence: u64,
    counters: Option<Arc<DeviceCounters>>,
    fail_open: bool,
}

impl MockCamera {
    pub fn new() -> Self {
        Self {
            config: None,
            running: false,
            sequence: 0,
            counters: None,
            fail_open: false,
        }
    }

    /// Reports opens and closes into `counters`.
    pub fn with_counters(counters: Arc<DeviceCounters>) -> Self {
        let mut camera = Self::new();
        camera.counters = Some(counters);
        camera
    }

    /// Makes every `open` call fail, simulating a missing device.
    pub fn failing() -> Self {
        let mut camera = Self::new();
        camera.fail_open = true;
        camera
    }
}

impl Default for MockCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl Camera for MockCamera {
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError> {
        if self.fail_open {
            return Err(CameraError::DeviceNotFound(format!(
                "mock device {}",
                config.device_id
            )));
        }
        config
            .validate()
            .map_err(|e| CameraError::ConfigFailed(e.to_string()))?;
        if self.config.is_none() {
            if let Some(counters) = &self.counters {
                counters.record_open();
            }
        }
        self.config = Some(config.clone());
        self.sequence = 0;
        tracing::debug!(?config, "MockCamera opened");
        Ok(())
    }

    fn start(&mut self) -> Result<(), CameraError> {
        if self.config.is_none() {
            return Err(CameraError::NotInitialized);
        }
        self.running = true;
        Ok(())
    }

    fn capture(&mut self) -> Result<Frame, CameraError> {
        let config = self.config.as_ref().ok_or(CameraError::NotInitialized)?;
        if !self.running {
            return Err(CameraError::CaptureFailed("camera not started".into()));
        }

        // Diagonal stripes that shift by one pixel per frame
        let bpp = config.format.bytes_per_pixel();
        let width = config.width as usize;
        let pixel_count = width * config.height as usize;
        let mut pixels = Vec::with_capacity(pixel_count * bpp);
        for i in 0..pixel_count {
            let (x, y) = (i % width, i / width);
            let value = ((x + y + self.sequence as usize) % 256) as u8;
            for channel in 0..bpp {
                pixels.push(value.wrapping_add((channel as u8).wrapping_mul(85)));
            }
        }

        self.sequence += 1;
        Ok(Frame::new(
            pixels,
            config.width,
            config.height,
            config.format,
            self.sequence,
        ))
    }

    fn capture_file(&mut self, path: &Path) -> Result<(), CameraError> {
        let quality = self
            .config
            .as_ref()
            .ok_or(CameraError::NotInitialized)?
            .jpeg_quality;
        let frame = self.capture()?;
        let jpeg =
            encode_jpeg(&frame, quality).map_err(|e| CameraError::CaptureFailed(e.to_string()))?;
        std::fs::write(path, jpeg)?;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), CameraError> {
        self.running = false;
        Ok(())
    }

    fn close(&mut self) {
        if self.config.take().is_some() {
            self.running = false;
            if let Some(counters) = &self.counters {
                counters.record_close();
            }
            tracing::debug!("MockCamera closed");
        }
    }
}

impl Drop for MockCamera {
    fn drop(&mut self) {
        self.close();
    }
}
