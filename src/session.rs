//! Capture sessions and the calibration reader driving them.

use std::fmt;
use std::time::Duration;

use crate::backend::{CameraBackend, FrameSet, FrameStream};
use crate::calibration::CalibrationSnapshot;
use crate::common::StreamKind;
use crate::config::SessionConfig;
use crate::device::DeviceLease;
use crate::device_info::DeviceInfo;
use crate::error::{CalibError, Result};

/// Lifecycle of a [`Session`]: `Unopened -> Streaming -> Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unopened,
    Streaming,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Unopened => write!(f, "unopened"),
            SessionState::Streaming => write!(f, "streaming"),
            SessionState::Closed => write!(f, "closed"),
        }
    }
}

/// An exclusive, streaming connection to one device.
///
/// Obtained from [`CalibrationReader::open_session`]. A session still
/// streaming when dropped is stopped and its device released.
pub struct Session<S: FrameStream> {
    state: SessionState,
    stream: Option<S>,
    lease: Option<DeviceLease>,
    device: Option<DeviceInfo>,
    frame_timeout: Duration,
    frames_received: u64,
}

/// A handle that was never opened.
impl<S: FrameStream> Default for Session<S> {
    fn default() -> Self {
        Self {
            state: SessionState::Unopened,
            stream: None,
            lease: None,
            device: None,
            frame_timeout: crate::config::DEFAULT_FRAME_TIMEOUT,
            frames_received: 0,
        }
    }
}

impl<S: FrameStream> Session<S> {
    fn streaming(stream: S, lease: DeviceLease, device: DeviceInfo, frame_timeout: Duration) -> Self {
        Self {
            state: SessionState::Streaming,
            stream: Some(stream),
            lease: Some(lease),
            device: Some(device),
            frame_timeout,
            frames_received: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_streaming(&self) -> bool {
        self.state == SessionState::Streaming
    }

    /// The device this session was opened on.
    pub fn device(&self) -> Option<&DeviceInfo> {
        self.device.as_ref()
    }

    /// Frame sets received so far, discarded or not.
    pub fn frames_received(&self) -> u64 {
        self.frames_received
    }

    fn require_streaming(&self) -> Result<()> {
        if self.state != SessionState::Streaming {
            return Err(CalibError::invalid_state(SessionState::Streaming, self.state));
        }
        Ok(())
    }

    fn next_frames(&mut self) -> Result<S::Frames> {
        self.require_streaming()?;
        let timeout = self.frame_timeout;
        let stream = self
            .stream
            .as_mut()
            .ok_or(CalibError::invalid_state(SessionState::Streaming, SessionState::Closed))?;
        let frames = stream.wait_for_frames(timeout)?;
        self.frames_received += 1;
        Ok(frames)
    }

    /// Stop the stream and release the device. The session ends `Closed`
    /// even when stopping fails.
    fn shutdown(&mut self) -> Result<()> {
        self.state = SessionState::Closed;
        let stopped = match self.stream.take() {
            Some(mut stream) => stream.stop(),
            None => Ok(()),
        };
        self.lease = None;
        stopped
    }
}

impl<S: FrameStream> Drop for Session<S> {
    fn drop(&mut self) {
        if self.state == SessionState::Streaming {
            let serial = self
                .device
                .as_ref()
                .map(|d| d.serial_number.clone())
                .unwrap_or_default();
            log::warn!("session on device {serial} dropped while streaming; stopping it");
            if let Err(e) = self.shutdown() {
                log::warn!("failed to stop stream on device {serial}: {e}");
            }
        }
    }
}

/// Reads a consistent calibration snapshot from a depth+color device.
pub struct CalibrationReader<B: CameraBackend> {
    backend: B,
    config: SessionConfig,
}

impl<B: CameraBackend> CalibrationReader<B> {
    pub fn new(backend: B, config: SessionConfig) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn select_device(&mut self) -> Result<DeviceInfo> {
        let devices = self.backend.query_devices()?;
        log::debug!("found {} device(s)", devices.len());
        match &self.config.serial {
            Some(serial) => devices
                .into_iter()
                .find(|d| &d.serial_number == serial)
                .ok_or_else(|| CalibError::DeviceNotFound(format!("no device with serial {serial}"))),
            None => devices
                .into_iter()
                .next()
                .ok_or_else(|| CalibError::DeviceNotFound("no depth camera attached".to_string())),
        }
    }

    /// Connect to the configured device and start streaming depth and color.
    pub fn open_session(&mut self) -> Result<Session<B::Stream>> {
        self.config.validate()?;
        let device = self.select_device()?;
        let lease = DeviceLease::acquire(&device.serial_number)?;

        if device.is_usb2() && !(self.config.depth.is_sdk_default() && self.config.color.is_sdk_default()) {
            log::warn!("{device} is on a USB 2 link; explicit stream sizes may be rejected");
        }

        let stream = self
            .backend
            .start(&device, &self.config.depth, &self.config.color)?;
        log::info!(
            "streaming from {device}: depth {}, color {}",
            self.config.depth,
            self.config.color
        );
        Ok(Session::streaming(stream, lease, device, self.config.frame_timeout))
    }

    /// Discard `frame_count` frame sets so auto-exposure can settle.
    ///
    /// Never waits when `frame_count` is zero.
    pub fn warm_up(&self, session: &mut Session<B::Stream>, frame_count: u32) -> Result<()> {
        session.require_streaming()?;
        for i in 0..frame_count {
            let frames = session.next_frames()?;
            log::debug!(
                "warm-up {}/{}: discarded frame set {}",
                i + 1,
                frame_count,
                frames.frame_number()
            );
        }
        Ok(())
    }

    /// Wait for one frame set holding both depth and color, and read the
    /// depth intrinsics and depth-to-color extrinsics from it.
    pub fn capture_snapshot(&self, session: &mut Session<B::Stream>) -> Result<CalibrationSnapshot> {
        let frames = session.next_frames()?;
        for kind in [StreamKind::Depth, StreamKind::Color] {
            if !frames.has_stream(kind) {
                return Err(CalibError::MissingStream(kind));
            }
        }

        let intrinsics = frames.intrinsics(StreamKind::Depth)?;
        let extrinsics = frames.extrinsics(StreamKind::Depth, StreamKind::Color)?;
        let device = session.device.clone().unwrap_or_default();

        let snapshot = CalibrationSnapshot::new(device, frames.frame_number(), intrinsics, extrinsics)?;
        log::info!(
            "captured calibration from frame set {} ({}x{})",
            snapshot.frame_number,
            snapshot.intrinsics.width,
            snapshot.intrinsics.height
        );
        Ok(snapshot)
    }

    /// Stop streaming and release the device. Valid once per opened session.
    pub fn close_session(&self, session: &mut Session<B::Stream>) -> Result<()> {
        session.require_streaming()?;
        let result = session.shutdown();
        log::info!(
            "closed session after {} frame set(s)",
            session.frames_received()
        );
        result
    }

    /// Open a session, warm up for the configured number of frames, capture
    /// one snapshot, and close the session on every path.
    pub fn read_calibration(&mut self) -> Result<CalibrationSnapshot> {
        let mut session = self.open_session()?;
        let warm_up_frames = self.config.warm_up_frames;

        let captured = self
            .warm_up(&mut session, warm_up_frames)
            .and_then(|()| self.capture_snapshot(&mut session));
        let closed = self.close_session(&mut session);

        match (captured, closed) {
            (Ok(snapshot), Ok(())) => Ok(snapshot),
            (Err(e), closed) => {
                if let Err(close_err) = closed {
                    log::warn!("closing session after failure also failed: {close_err}");
                }
                Err(e)
            }
            (Ok(_), Err(e)) => Err(e),
        }
    }
}
