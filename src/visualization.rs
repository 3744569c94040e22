use std::path::PathBuf;

use rerun::{RecordingStream, RecordingStreamBuilder, RecordingStreamResult};

use crate::calibration::CalibrationSnapshot;

/// Logs calibration snapshots to a Rerun viewer.
///
/// The color camera sits at `world/color`; the depth camera is its child at
/// `world/color/depth`, placed by the depth-to-color extrinsics and carrying
/// the depth pinhole model.
pub struct RerunVisualizer {
    rec: RecordingStream,
}

impl RerunVisualizer {
    /// Spawn a viewer (or connect to a running one) and stream to it
    pub fn spawn(app_name: &str) -> RecordingStreamResult<Self> {
        let rec = RecordingStreamBuilder::new(app_name).spawn()?;
        Ok(Self { rec })
    }

    /// Record to an `.rrd` file instead of a live viewer
    pub fn new_with_file(app_name: &str, file_path: impl Into<PathBuf>) -> RecordingStreamResult<Self> {
        let rec = RecordingStreamBuilder::new(app_name).save(file_path)?;
        Ok(Self { rec })
    }

    pub fn log_snapshot(&self, snapshot: &CalibrationSnapshot) -> RecordingStreamResult<()> {
        let intr = &snapshot.intrinsics;
        let ext = &snapshot.extrinsics;

        self.rec.log_static(
            "world/color/depth",
            &rerun::Transform3D::from_translation_mat3x3(
                ext.translation,
                rerun::datatypes::Mat3x3(ext.rotation_column_major()),
            ),
        )?;
        self.rec.log_static(
            "world/color/depth",
            &rerun::Pinhole::from_focal_length_and_resolution(
                [intr.fx, intr.fy],
                [intr.width as f32, intr.height as f32],
            )
            .with_principal_point([intr.ppx, intr.ppy]),
        )?;
        self.rec.log_static(
            "device",
            &rerun::TextDocument::new(format!(
                "{}\nframe set {}",
                snapshot.device, snapshot.frame_number
            )),
        )
    }
}
