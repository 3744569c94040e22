use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CalibError;

/// Sensor stream of a depth+color device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Depth,
    Color,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Depth => write!(f, "depth"),
            StreamKind::Color => write!(f, "color"),
        }
    }
}

/// Pixel format requested for a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamFormat {
    /// Let the SDK pick
    #[default]
    Any,
    Z16,
    Rgb8,
    Bgr8,
}

/// Lens distortion model reported alongside the intrinsics.
///
/// Values follow `rs2_distortion`.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistortionModel {
    #[default]
    None = 0,
    ModifiedBrownConrady = 1,
    InverseBrownConrady = 2,
    FTheta = 3,
    BrownConrady = 4,
    KannalaBrandt4 = 5,
}

impl DistortionModel {
    pub fn as_raw(self) -> i32 {
        self as i32
    }

    pub fn from_raw(value: i32) -> Option<Self> {
        match value {
            0 => Some(DistortionModel::None),
            1 => Some(DistortionModel::ModifiedBrownConrady),
            2 => Some(DistortionModel::InverseBrownConrady),
            3 => Some(DistortionModel::FTheta),
            4 => Some(DistortionModel::BrownConrady),
            5 => Some(DistortionModel::KannalaBrandt4),
            _ => None,
        }
    }
}

impl fmt::Display for DistortionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Requested resolution/rate for one stream. Zero fields mean "SDK default".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub format: StreamFormat,
}

impl StreamConfig {
    pub fn new(width: u32, height: u32, fps: u32) -> Self {
        Self {
            width,
            height,
            fps,
            ..Default::default()
        }
    }

    pub fn with_format(mut self, format: StreamFormat) -> Self {
        self.format = format;
        self
    }

    /// Overwrite the geometry of `self` with `other`, keeping the format.
    pub fn with_geometry_of(mut self, other: StreamConfig) -> Self {
        self.width = other.width;
        self.height = other.height;
        self.fps = other.fps;
        self
    }

    pub fn is_sdk_default(&self) -> bool {
        self.width == 0 && self.height == 0 && self.fps == 0
    }
}

/// Parses `WIDTHxHEIGHT` or `WIDTHxHEIGHT@FPS`, e.g. `1280x720@30`.
impl FromStr for StreamConfig {
    type Err = CalibError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || CalibError::Config(format!("expected WIDTHxHEIGHT[@FPS], got '{s}'"));
        let (size, fps) = match s.split_once('@') {
            Some((size, fps)) => (size, fps.trim().parse::<u32>().map_err(|_| bad())?),
            None => (s, 0),
        };
        let (w, h) = size.split_once(['x', 'X']).ok_or_else(bad)?;
        let width = w.trim().parse::<u32>().map_err(|_| bad())?;
        let height = h.trim().parse::<u32>().map_err(|_| bad())?;
        Ok(StreamConfig::new(width, height, fps))
    }
}

impl fmt::Display for StreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_sdk_default() {
            write!(f, "default ({:?})", self.format)
        } else {
            write!(f, "{}x{}@{} ({:?})", self.width, self.height, self.fps, self.format)
        }
    }
}
