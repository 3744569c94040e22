pub mod backend;
pub mod calibration;
pub mod common;
pub mod config;
pub mod device;
pub mod device_info;
pub mod error;
pub mod report;
pub mod session;
#[cfg(feature = "rerun")]
pub mod visualization;

// Re-export main types for convenience
pub use crate::backend::{CameraBackend, FrameSet, FrameStream, SimulatedBackend, SimulatedDevice};
#[cfg(feature = "realsense")]
pub use crate::backend::RealSenseBackend;
pub use crate::calibration::{CalibrationSnapshot, Distortion, Extrinsics, Intrinsics};
pub use crate::common::{DistortionModel, StreamConfig, StreamFormat, StreamKind};
pub use crate::config::SessionConfig;
pub use crate::device_info::DeviceInfo;
pub use crate::error::{CalibError, Result};
pub use crate::report::{OutputFormat, ReportOptions};
pub use crate::session::{CalibrationReader, Session, SessionState};
