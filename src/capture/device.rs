//! Hardware camera backed by `nokhwa`.
//!
//! Frames are decoded to packed RGB regardless of the format the device
//! streams in, so [`Frame::format`] is always [`PixelFormat::Rgb24`].

use super::{Camera, CameraError, CaptureConfig, Frame, PixelFormat};
use crate::streaming::encode_jpeg;
use nokhwa::{
    pixel_format::RgbFormat,
    utils::{CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution},
};
use std::path::Path;

/// A physical camera opened through the platform's native capture API.
pub struct NokhwaCamera {
    device: Option<nokhwa::Camera>,
    jpeg_quality: u8,
    sequence: u64,
}

impl NokhwaCamera {
    pub fn new() -> Self {
        Self {
            device: None,
            jpeg_quality: CaptureConfig::default().jpeg_quality,
            sequence: 0,
        }
    }

    fn device(&mut self) -> Result<&mut nokhwa::Camera, CameraError> {
        self.device.as_mut().ok_or(CameraError::NotInitialized)
    }
}

impl Default for NokhwaCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl Camera for NokhwaCamera {
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError> {
        config
            .validate()
            .map_err(|e| CameraError::ConfigFailed(e.to_string()))?;

        let format = CameraFormat::new(
            Resolution::new(config.width, config.height),
            FrameFormat::MJPEG,
            config.fps,
        );
        let requested =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(format));
        let device = nokhwa::Camera::new(CameraIndex::Index(config.device_id), requested)
            .map_err(|e| CameraError::OpenFailed(e.to_string()))?;

        tracing::info!(
            device = config.device_id,
            format = ?device.camera_format(),
            "Camera device opened"
        );
        self.device = Some(device);
        self.jpeg_quality = config.jpeg_quality;
        self.sequence = 0;
        Ok(())
    }

    fn start(&mut self) -> Result<(), CameraError> {
        self.device()?
            .open_stream()
            .map_err(|e| CameraError::StartFailed(e.to_string()))
    }

    fn capture(&mut self) -> Result<Frame, CameraError> {
        let buffer = self
            .device()?
            .frame()
            .map_err(|e| CameraError::CaptureFailed(e.to_string()))?;
        let image = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| CameraError::CaptureFailed(e.to_string()))?;
        let (width, height) = image.dimensions();

        self.sequence += 1;
        Ok(Frame::new(
            image.into_raw(),
            width,
            height,
            PixelFormat::Rgb24,
            self.sequence,
        ))
    }

    fn capture_file(&mut self, path: &Path) -> Result<(), CameraError> {
        let frame = self.capture()?;
        let jpeg = encode_jpeg(&frame, self.jpeg_quality)
            .map_err(|e| CameraError::CaptureFailed(e.to_string()))?;
        std::fs::write(path, jpeg)?;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), CameraError> {
        self.device()?
            .stop_stream()
            .map_err(|e| CameraError::StopFailed(e.to_string()))
    }

    fn close(&mut self) {
        if self.device.take().is_some() {
            tracing::info!("Camera device closed");
        }
    }
}
