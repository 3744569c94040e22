//! Deterministic in-process backend standing in for camera hardware.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::backend::{CameraBackend, FrameSet, FrameStream};
use crate::calibration::{Distortion, Extrinsics, Intrinsics};
use crate::common::{DistortionModel, StreamConfig, StreamKind};
use crate::device_info::DeviceInfo;
use crate::error::{CalibError, Result};

/// Counters shared between a [`SimulatedBackend`] and the streams it starts.
#[derive(Debug, Default)]
pub struct SimulatedStats {
    starts: AtomicU64,
    waits: AtomicU64,
    stops: AtomicU64,
}

impl SimulatedStats {
    pub fn starts(&self) -> u64 {
        self.starts.load(Ordering::SeqCst)
    }

    /// Number of `wait_for_frames` calls across all streams.
    pub fn waits(&self) -> u64 {
        self.waits.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> u64 {
        self.stops.load(Ordering::SeqCst)
    }
}

/// A simulated depth+color camera.
#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    info: DeviceInfo,
    depth: Intrinsics,
    color: Intrinsics,
    depth_to_color: Extrinsics,
    color_enabled: bool,
    max_resolution: (u32, u32),
    stall_after: Option<u64>,
}

impl SimulatedDevice {
    /// A D435-like device with factory-style calibration at 1280x720.
    pub fn d435(serial: impl Into<String>) -> Self {
        let brown_conrady = Distortion {
            model: DistortionModel::BrownConrady,
            coeffs: [0.0; 5],
        };
        Self {
            info: DeviceInfo::new("Simulated RealSense D435", serial)
                .with_firmware_version("5.16.0.1")
                .with_usb_type("3.2"),
            depth: Intrinsics::new(1280, 720, 640.5, 360.2, 920.1, 920.3),
            color: Intrinsics::new(1280, 720, 652.1, 362.8, 911.6, 910.9)
                .with_distortion(brown_conrady),
            depth_to_color: Extrinsics::new(
                [
                    0.99999, -0.00316, 0.00293, //
                    0.00317, 0.99999, -0.00283, //
                    -0.00292, 0.00284, 0.99999,
                ],
                [0.01476, 0.00017, 0.00032],
            ),
            color_enabled: true,
            max_resolution: (1280, 720),
            stall_after: None,
        }
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    pub fn with_depth_intrinsics(mut self, intrinsics: Intrinsics) -> Self {
        self.depth = intrinsics;
        self
    }

    pub fn with_color_intrinsics(mut self, intrinsics: Intrinsics) -> Self {
        self.color = intrinsics;
        self
    }

    pub fn with_extrinsics(mut self, depth_to_color: Extrinsics) -> Self {
        self.depth_to_color = depth_to_color;
        self
    }

    /// Frame sets from this device carry no color frame.
    pub fn without_color(mut self) -> Self {
        self.color_enabled = false;
        self
    }

    /// Largest stream size the device accepts.
    pub fn with_max_resolution(mut self, width: u32, height: u32) -> Self {
        self.max_resolution = (width, height);
        self
    }

    /// Deliver `frames` frame sets, then never deliver another.
    pub fn stall_after(mut self, frames: u64) -> Self {
        self.stall_after = Some(frames);
        self
    }

    fn check_supported(&self, kind: StreamKind, config: &StreamConfig) -> Result<()> {
        let (max_w, max_h) = self.max_resolution;
        if config.width > max_w || config.height > max_h {
            return Err(CalibError::StreamStart(format!(
                "{kind} stream {}x{} exceeds device maximum {max_w}x{max_h}",
                config.width, config.height
            )));
        }
        if config.fps > 90 {
            return Err(CalibError::StreamStart(format!(
                "{kind} stream does not support {} fps",
                config.fps
            )));
        }
        Ok(())
    }
}

/// Scale `intrinsics` to the stream size requested in `config`.
fn intrinsics_at(intrinsics: &Intrinsics, config: &StreamConfig) -> Intrinsics {
    if config.width == 0 || config.height == 0 {
        return *intrinsics;
    }
    let sx = config.width as f32 / intrinsics.width as f32;
    let sy = config.height as f32 / intrinsics.height as f32;
    Intrinsics {
        width: config.width,
        height: config.height,
        ppx: intrinsics.ppx * sx,
        ppy: intrinsics.ppy * sy,
        fx: intrinsics.fx * sx,
        fy: intrinsics.fy * sy,
        distortion: intrinsics.distortion,
    }
}

/// Backend over a fixed set of [`SimulatedDevice`]s.
#[derive(Debug, Clone, Default)]
pub struct SimulatedBackend {
    devices: Vec<SimulatedDevice>,
    stats: Arc<SimulatedStats>,
}

impl SimulatedBackend {
    /// A backend with no devices attached.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device(mut self, device: SimulatedDevice) -> Self {
        self.devices.push(device);
        self
    }

    pub fn stats(&self) -> Arc<SimulatedStats> {
        Arc::clone(&self.stats)
    }
}

impl CameraBackend for SimulatedBackend {
    type Stream = SimulatedStream;

    fn query_devices(&mut self) -> Result<Vec<DeviceInfo>> {
        Ok(self.devices.iter().map(|d| d.info.clone()).collect())
    }

    fn start(
        &mut self,
        device: &DeviceInfo,
        depth: &StreamConfig,
        color: &StreamConfig,
    ) -> Result<SimulatedStream> {
        let sim = self
            .devices
            .iter()
            .find(|d| d.info.serial_number == device.serial_number)
            .ok_or_else(|| CalibError::DeviceNotFound(format!("device {} detached", device.serial_number)))?;

        sim.check_supported(StreamKind::Depth, depth)?;
        sim.check_supported(StreamKind::Color, color)?;

        self.stats.starts.fetch_add(1, Ordering::SeqCst);
        Ok(SimulatedStream {
            depth: intrinsics_at(&sim.depth, depth),
            color: sim.color_enabled.then(|| intrinsics_at(&sim.color, color)),
            depth_to_color: sim.depth_to_color,
            stall_after: sim.stall_after,
            delivered: 0,
            stats: Arc::clone(&self.stats),
        })
    }
}

pub struct SimulatedStream {
    depth: Intrinsics,
    color: Option<Intrinsics>,
    depth_to_color: Extrinsics,
    stall_after: Option<u64>,
    delivered: u64,
    stats: Arc<SimulatedStats>,
}

impl FrameStream for SimulatedStream {
    type Frames = SimulatedFrameSet;

    fn wait_for_frames(&mut self, timeout: Duration) -> Result<SimulatedFrameSet> {
        self.stats.waits.fetch_add(1, Ordering::SeqCst);
        if self.stall_after.is_some_and(|n| self.delivered >= n) {
            return Err(CalibError::FrameTimeout(timeout));
        }
        self.delivered += 1;
        Ok(SimulatedFrameSet {
            frame_number: self.delivered,
            depth: Some(self.depth),
            color: self.color,
            depth_to_color: self.depth_to_color,
        })
    }

    fn stop(&mut self) -> Result<()> {
        self.stats.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SimulatedFrameSet {
    frame_number: u64,
    depth: Option<Intrinsics>,
    color: Option<Intrinsics>,
    depth_to_color: Extrinsics,
}

impl SimulatedFrameSet {
    fn stream(&self, kind: StreamKind) -> Option<&Intrinsics> {
        match kind {
            StreamKind::Depth => self.depth.as_ref(),
            StreamKind::Color => self.color.as_ref(),
        }
    }
}

impl FrameSet for SimulatedFrameSet {
    fn frame_number(&self) -> u64 {
        self.frame_number
    }

    fn has_stream(&self, kind: StreamKind) -> bool {
        self.stream(kind).is_some()
    }

    fn intrinsics(&self, kind: StreamKind) -> Result<Intrinsics> {
        self.stream(kind).copied().ok_or(CalibError::MissingStream(kind))
    }

    fn extrinsics(&self, from: StreamKind, to: StreamKind) -> Result<Extrinsics> {
        for kind in [from, to] {
            if !self.has_stream(kind) {
                return Err(CalibError::MissingStream(kind));
            }
        }
        Ok(match (from, to) {
            (StreamKind::Depth, StreamKind::Color) => self.depth_to_color,
            (StreamKind::Color, StreamKind::Depth) => invert(&self.depth_to_color),
            _ => Extrinsics::identity(),
        })
    }
}

/// Inverse of a rigid transform: `(R^T, -R^T t)`.
fn invert(ext: &Extrinsics) -> Extrinsics {
    let rt = ext.rotation_matrix().reversed_axes();
    let t = -rt.dot(&ext.translation_vector());
    let mut rotation = [0.0f32; 9];
    for (dst, src) in rotation.iter_mut().zip(rt.iter()) {
        *dst = *src;
    }
    Extrinsics::new(rotation, [t[0], t[1], t[2]])
}
