//! Service configuration file.

use crate::capture::{CaptureConfig, ConfigError};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind the server to.
    pub bind_addr: SocketAddr,
    /// Pause after starting the camera before frames are served.
    pub warmup_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: ([0, 0, 0, 0], 5000).into(),
            warmup_ms: 1000,
        }
    }
}

impl ServerConfig {
    pub fn warmup(&self) -> Duration {
        Duration::from_millis(self.warmup_ms)
    }
}

/// Where captured files live on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory capture sessions write images into.
    pub capture_dir: PathBuf,
    /// CSV report offered for download.
    pub breakdowns_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            capture_dir: PathBuf::from("static/captured_images"),
            breakdowns_file: PathBuf::from("static/pallet_breakdowns.csv"),
        }
    }
}

/// Live view pacing and quality.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Pause between frames (33ms is roughly 30 fps).
    pub frame_interval_ms: u64,
    /// JPEG quality for streamed frames (1-100).
    pub jpeg_quality: u8,
    /// Encoded frames buffered per viewer before the producer waits.
    pub buffer_frames: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 33,
            jpeg_quality: 80,
            buffer_frames: 2,
        }
    }
}

impl StreamConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

/// Capture session defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Number of captures when the client does not ask for a count.
    pub default_count: u32,
    /// Pause between captures.
    pub capture_interval_ms: u64,
    /// File extension of captured images.
    pub extension: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_count: 10,
            capture_interval_ms: 1000,
            extension: "jpg".to_string(),
        }
    }
}

impl SessionConfig {
    pub fn capture_interval(&self) -> Duration {
        Duration::from_millis(self.capture_interval_ms)
    }
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.capture.validate()?;
        if self.stream.frame_interval_ms == 0 {
            return Err(ConfigError::InvalidInterval("stream.frame_interval_ms"));
        }
        if self.stream.jpeg_quality == 0 || self.stream.jpeg_quality > 100 {
            return Err(ConfigError::InvalidQuality(self.stream.jpeg_quality));
        }
        Ok(())
    }
}
