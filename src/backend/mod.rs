//! Seam between the calibration reader and a camera SDK.
//!
//! A backend enumerates devices and starts a depth+color stream
//! ([`CameraBackend`]), delivers frame sets with a bounded wait
//! ([`FrameStream`]), and answers calibration queries about the streams present
//! in one frame set ([`FrameSet`]). Answering from the frame set keeps the
//! intrinsics and extrinsics of one snapshot tied to the same frames.

use std::time::Duration;

use crate::calibration::{Extrinsics, Intrinsics};
use crate::common::{StreamConfig, StreamKind};
use crate::device_info::DeviceInfo;
use crate::error::Result;

#[cfg(feature = "realsense")]
pub mod realsense;
pub mod simulated;

#[cfg(feature = "realsense")]
pub use realsense::RealSenseBackend;
pub use simulated::{SimulatedBackend, SimulatedDevice, SimulatedStats};

/// Entry point into a camera SDK.
pub trait CameraBackend {
    type Stream: FrameStream;

    /// Devices currently attached and usable for depth+color capture.
    fn query_devices(&mut self) -> Result<Vec<DeviceInfo>>;

    /// Start streaming depth and color from `device`.
    ///
    /// Fails with [`CalibError::StreamStart`](crate::CalibError::StreamStart)
    /// when the hardware rejects the requested configuration.
    fn start(
        &mut self,
        device: &DeviceInfo,
        depth: &StreamConfig,
        color: &StreamConfig,
    ) -> Result<Self::Stream>;
}

/// An active depth+color stream.
pub trait FrameStream {
    type Frames: FrameSet;

    /// Block until the next frame set arrives, or fail with
    /// [`CalibError::FrameTimeout`](crate::CalibError::FrameTimeout) after `timeout`.
    fn wait_for_frames(&mut self, timeout: Duration) -> Result<Self::Frames>;

    /// Stop streaming. Called once; the stream is dropped afterwards.
    fn stop(&mut self) -> Result<()>;
}

/// Time-aligned frames delivered together.
pub trait FrameSet {
    fn frame_number(&self) -> u64;

    fn has_stream(&self, kind: StreamKind) -> bool;

    /// Intrinsics of the `kind` stream's profile in this frame set.
    fn intrinsics(&self, kind: StreamKind) -> Result<Intrinsics>;

    /// Transform from the `from` stream's frame to the `to` stream's frame.
    fn extrinsics(&self, from: StreamKind, to: StreamKind) -> Result<Extrinsics>;
}
