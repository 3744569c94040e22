//! Session configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::common::{StreamConfig, StreamFormat};
use crate::error::{CalibError, Result};

/// Frames discarded before capture so auto-exposure can settle.
pub const DEFAULT_WARM_UP_FRAMES: u32 = 30;

/// Longest wait for a single frame set.
pub const DEFAULT_FRAME_TIMEOUT: Duration = Duration::from_secs(5);

/// How a [`CalibrationReader`](crate::CalibrationReader) opens and drives a session.
///
/// Loadable from JSON; missing fields take their defaults:
///
/// ```json
/// { "serial": "123456789", "depth": { "width": 848, "height": 480, "fps": 30 },
///   "warm_up_frames": 15, "frame_timeout_ms": 2000 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Serial number of the device to open; first attached device if unset
    pub serial: Option<String>,
    pub depth: StreamConfig,
    pub color: StreamConfig,
    pub warm_up_frames: u32,
    #[serde(rename = "frame_timeout_ms", with = "duration_ms")]
    pub frame_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            serial: None,
            depth: StreamConfig::default().with_format(StreamFormat::Z16),
            color: StreamConfig::default().with_format(StreamFormat::Rgb8),
            warm_up_frames: DEFAULT_WARM_UP_FRAMES,
            frame_timeout: DEFAULT_FRAME_TIMEOUT,
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            CalibError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&text)
    }

    pub fn serial(mut self, serial: impl Into<String>) -> Self {
        self.serial = Some(serial.into());
        self
    }

    /// Requested depth stream size and rate; the depth format is kept.
    pub fn depth(mut self, stream: StreamConfig) -> Self {
        self.depth = self.depth.with_geometry_of(stream);
        self
    }

    /// Requested color stream size and rate; the color format is kept.
    pub fn color(mut self, stream: StreamConfig) -> Self {
        self.color = self.color.with_geometry_of(stream);
        self
    }

    pub fn warm_up_frames(mut self, frames: u32) -> Self {
        self.warm_up_frames = frames;
        self
    }

    pub fn frame_timeout(mut self, timeout: Duration) -> Self {
        self.frame_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.frame_timeout.is_zero() {
            return Err(CalibError::Config("frame timeout must be positive".to_string()));
        }
        for (name, stream) in [("depth", &self.depth), ("color", &self.color)] {
            if (stream.width == 0) != (stream.height == 0) {
                return Err(CalibError::Config(format!(
                    "{name} stream needs both width and height, got {}x{}",
                    stream.width, stream.height
                )));
            }
        }
        Ok(())
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_capture_procedure() {
        let config = SessionConfig::default();
        assert_eq!(config.warm_up_frames, 30);
        assert_eq!(config.frame_timeout, Duration::from_secs(5));
        assert_eq!(config.depth.format, StreamFormat::Z16);
        assert_eq!(config.color.format, StreamFormat::Rgb8);
        assert!(config.depth.is_sdk_default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = SessionConfig::from_json_str(
            r#"{ "serial": "0123", "frame_timeout_ms": 250, "depth": { "width": 848, "height": 480, "fps": 30, "format": "z16" } }"#,
        )
        .unwrap();
        assert_eq!(config.serial.as_deref(), Some("0123"));
        assert_eq!(config.frame_timeout, Duration::from_millis(250));
        assert_eq!(config.depth, StreamConfig::new(848, 480, 30).with_format(StreamFormat::Z16));
        assert_eq!(config.warm_up_frames, DEFAULT_WARM_UP_FRAMES);
        assert_eq!(config.color.format, StreamFormat::Rgb8);
    }

    #[test]
    fn test_invalid_json_config_rejected() {
        assert!(matches!(
            SessionConfig::from_json_str(r#"{ "frame_timeout_ms": 0 }"#),
            Err(CalibError::Config(_))
        ));
        assert!(matches!(
            SessionConfig::from_json_str(r#"{ "depth": { "width": 640 } }"#),
            Err(CalibError::Config(_))
        ));
        assert!(matches!(
            SessionConfig::from_json_str("{ not json"),
            Err(CalibError::Json(_))
        ));
    }

    #[test]
    fn test_builder_overrides_geometry_only() {
        let config = SessionConfig::new()
            .serial("abc")
            .depth(StreamConfig::new(640, 480, 15))
            .warm_up_frames(0)
            .frame_timeout(Duration::from_millis(100));
        assert_eq!(config.depth.format, StreamFormat::Z16);
        assert_eq!(config.depth.width, 640);
        assert_eq!(config.warm_up_frames, 0);
        assert_eq!(config.serial.as_deref(), Some("abc"));
    }

    #[test]
    fn test_config_json_uses_millisecond_timeout() {
        let json = serde_json::to_value(SessionConfig::default()).unwrap();
        assert_eq!(json["frame_timeout_ms"], 5000);
        assert_eq!(json["warm_up_frames"], 30);
    }
}
