//! librealsense2 backend, via the `realsense-rust` bindings.

use std::collections::HashSet;
use std::convert::TryFrom;
use std::ffi::{CStr, CString};
use std::time::Duration;

use realsense_rust::{
    base::Rs2Intrinsics,
    config::Config,
    context::Context,
    device::Device,
    frame::{ColorFrame, CompositeFrame, DepthFrame, FrameEx},
    kind::{Rs2CameraInfo, Rs2Format, Rs2ProductLine, Rs2StreamKind},
    pipeline::{ActivePipeline, FrameWaitError, InactivePipeline},
    stream_profile::StreamProfile,
};

use crate::backend::{CameraBackend, FrameSet, FrameStream};
use crate::calibration::{Distortion, Extrinsics, Intrinsics};
use crate::common::{DistortionModel, StreamConfig, StreamFormat, StreamKind};
use crate::device_info::DeviceInfo;
use crate::error::{CalibError, Result};

fn info_string(device: &Device, info: Rs2CameraInfo) -> Option<String> {
    device
        .info(info)
        .map(|s: &CStr| s.to_string_lossy().into_owned())
}

fn rs2_format(format: StreamFormat) -> Rs2Format {
    match format {
        StreamFormat::Z16 => Rs2Format::Z16,
        StreamFormat::Rgb8 => Rs2Format::Rgb8,
        StreamFormat::Bgr8 => Rs2Format::Bgr8,
        StreamFormat::Any => Rs2Format::Any,
    }
}

fn convert_intrinsics(raw: &Rs2Intrinsics) -> Intrinsics {
    let distortion = raw.distortion();
    Intrinsics::new(
        raw.width() as u32,
        raw.height() as u32,
        raw.ppx(),
        raw.ppy(),
        raw.fx(),
        raw.fy(),
    )
    .with_distortion(Distortion {
        model: DistortionModel::from_raw(distortion.model as i32).unwrap_or_default(),
        coeffs: distortion.coeffs,
    })
}

/// Backend over the librealsense2 context of this process.
pub struct RealSenseBackend {
    context: Context,
}

impl RealSenseBackend {
    pub fn new() -> Result<Self> {
        let context = Context::new().map_err(|e| CalibError::Backend(e.to_string()))?;
        Ok(Self { context })
    }
}

impl CameraBackend for RealSenseBackend {
    type Stream = RealSenseStream;

    fn query_devices(&mut self) -> Result<Vec<DeviceInfo>> {
        let devices = self.context.query_devices(HashSet::from([Rs2ProductLine::Any]));
        let infos = devices
            .iter()
            .filter_map(|device| {
                let serial = info_string(device, Rs2CameraInfo::SerialNumber)?;
                let name = info_string(device, Rs2CameraInfo::Name).unwrap_or_else(|| "RealSense".to_string());
                let mut info = DeviceInfo::new(name, serial);
                info.firmware_version = info_string(device, Rs2CameraInfo::FirmwareVersion);
                info.usb_type = info_string(device, Rs2CameraInfo::UsbTypeDescriptor);
                Some(info)
            })
            .collect();
        Ok(infos)
    }

    fn start(
        &mut self,
        device: &DeviceInfo,
        depth: &StreamConfig,
        color: &StreamConfig,
    ) -> Result<RealSenseStream> {
        let pipeline =
            InactivePipeline::try_from(&self.context).map_err(|e| CalibError::Backend(e.to_string()))?;

        let serial = CString::new(device.serial_number.as_str())
            .map_err(|e| CalibError::Backend(format!("serial number contains NUL: {e}")))?;
        let start_err = |e: &dyn std::fmt::Display| CalibError::StreamStart(e.to_string());

        let mut config = Config::new();
        config
            .enable_device_from_serial(&serial)
            .map_err(|e| start_err(&e))?
            .disable_all_streams()
            .map_err(|e| start_err(&e))?
            .enable_stream(
                Rs2StreamKind::Depth,
                None,
                depth.width as usize,
                depth.height as usize,
                rs2_format(depth.format),
                depth.fps as usize,
            )
            .map_err(|e| start_err(&e))?
            .enable_stream(
                Rs2StreamKind::Color,
                None,
                color.width as usize,
                color.height as usize,
                rs2_format(color.format),
                color.fps as usize,
            )
            .map_err(|e| start_err(&e))?;

        let active = pipeline.start(Some(config)).map_err(|e| start_err(&e))?;
        Ok(RealSenseStream {
            pipeline: Some(active),
        })
    }
}

pub struct RealSenseStream {
    pipeline: Option<ActivePipeline>,
}

impl FrameStream for RealSenseStream {
    type Frames = RealSenseFrameSet;

    fn wait_for_frames(&mut self, timeout: Duration) -> Result<RealSenseFrameSet> {
        let pipeline = self
            .pipeline
            .as_mut()
            .ok_or_else(|| CalibError::Backend("pipeline already stopped".to_string()))?;
        match pipeline.wait(Some(timeout)) {
            Ok(frames) => Ok(RealSenseFrameSet::from_composite(frames)),
            Err(FrameWaitError::DidTimeoutBeforeFrameArrival) => Err(CalibError::FrameTimeout(timeout)),
            Err(e) => Err(CalibError::Backend(e.to_string())),
        }
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(active) = self.pipeline.take() {
            let _inactive = active.stop();
        }
        Ok(())
    }
}

pub struct RealSenseFrameSet {
    depth: Option<DepthFrame>,
    color: Option<ColorFrame>,
}

impl RealSenseFrameSet {
    fn from_composite(frames: CompositeFrame) -> Self {
        Self {
            depth: frames.frames_of_type::<DepthFrame>().pop(),
            color: frames.frames_of_type::<ColorFrame>().pop(),
        }
    }

    fn profile(&self, kind: StreamKind) -> Result<&StreamProfile> {
        let profile = match kind {
            StreamKind::Depth => self.depth.as_ref().map(|f| f.stream_profile()),
            StreamKind::Color => self.color.as_ref().map(|f| f.stream_profile()),
        };
        profile.ok_or(CalibError::MissingStream(kind))
    }
}

impl FrameSet for RealSenseFrameSet {
    fn frame_number(&self) -> u64 {
        match (&self.depth, &self.color) {
            (Some(depth), _) => depth.frame_number(),
            (None, Some(color)) => color.frame_number(),
            (None, None) => 0,
        }
    }

    fn has_stream(&self, kind: StreamKind) -> bool {
        match kind {
            StreamKind::Depth => self.depth.is_some(),
            StreamKind::Color => self.color.is_some(),
        }
    }

    fn intrinsics(&self, kind: StreamKind) -> Result<Intrinsics> {
        let raw = self
            .profile(kind)?
            .intrinsics()
            .map_err(|e| CalibError::Backend(format!("{kind} intrinsics: {e}")))?;
        Ok(convert_intrinsics(&raw))
    }

    fn extrinsics(&self, from: StreamKind, to: StreamKind) -> Result<Extrinsics> {
        let raw = self
            .profile(from)?
            .extrinsics(self.profile(to)?)
            .map_err(|e| CalibError::Backend(format!("{from} to {to} extrinsics: {e}")))?;
        // librealsense stores the rotation column-major.
        Ok(Extrinsics::from_column_major(raw.rotation(), raw.translation()))
    }
}
