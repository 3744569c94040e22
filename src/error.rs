//! Error handling for the calibration reader

use std::time::Duration;

use thiserror::Error;

use crate::common::StreamKind;
use crate::session::SessionState;

/// Result type for calibration reader operations
pub type Result<T> = std::result::Result<T, CalibError>;

/// Errors that can occur while reading calibration from a depth camera.
///
/// Every variant is terminal for a single run: nothing is retried internally.
#[derive(Debug, Error)]
pub enum CalibError {
    /// No compatible depth+color device is attached
    #[error("no compatible device found: {0}")]
    DeviceNotFound(String),

    /// The device already has an open session
    #[error("device {serial} is busy: a session is already open on it")]
    DeviceBusy { serial: String },

    /// The requested stream configuration could not be started
    #[error("failed to start streaming: {0}")]
    StreamStart(String),

    /// No frame set arrived within the configured interval
    #[error("no frame arrived within {}ms", .0.as_millis())]
    FrameTimeout(Duration),

    /// A frame set lacked one of the required streams
    #[error("frame set has no {0} frame")]
    MissingStream(StreamKind),

    /// Operation called on a session in the wrong lifecycle state
    #[error("invalid session state: expected {expected}, session is {actual}")]
    InvalidState {
        expected: SessionState,
        actual: SessionState,
    },

    /// The SDK reported calibration values that cannot describe a camera
    #[error("invalid calibration data: {0}")]
    InvalidCalibration(String),

    /// Any other failure reported by the camera SDK
    #[error("camera backend error: {0}")]
    Backend(String),

    /// Invalid command line or configuration file input
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("failed to format report")]
    Fmt(#[from] std::fmt::Error),
}

impl CalibError {
    pub(crate) fn invalid_state(expected: SessionState, actual: SessionState) -> Self {
        CalibError::InvalidState { expected, actual }
    }

    /// Process exit status for this error.
    ///
    /// All errors abort the run; the distinct codes only help scripts tell
    /// "no hardware" apart from failures on a present device.
    pub fn exit_code(&self) -> i32 {
        match self {
            CalibError::DeviceNotFound(_) => 2,
            CalibError::DeviceBusy { .. } => 3,
            CalibError::Config(_) => 64,
            _ => 1,
        }
    }
}
