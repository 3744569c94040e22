//! Calibration data captured from a depth+color device.

use ndarray::{Array1, Array2, array};
use serde::{Deserialize, Serialize};

use crate::common::DistortionModel;
use crate::device_info::DeviceInfo;
use crate::error::{CalibError, Result};

/// Lens distortion as reported by the SDK.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Distortion {
    pub model: DistortionModel,
    pub coeffs: [f32; 5],
}

/// Pinhole model of a stream at its current resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Intrinsics {
    pub width: u32,
    pub height: u32,
    /// Principal point x, in pixels
    pub ppx: f32,
    /// Principal point y, in pixels
    pub ppy: f32,
    /// Focal length x, in pixels
    pub fx: f32,
    /// Focal length y, in pixels
    pub fy: f32,
    #[serde(default)]
    pub distortion: Distortion,
}

impl Intrinsics {
    pub fn new(width: u32, height: u32, ppx: f32, ppy: f32, fx: f32, fy: f32) -> Self {
        Self {
            width,
            height,
            ppx,
            ppy,
            fx,
            fy,
            distortion: Distortion::default(),
        }
    }

    pub fn with_distortion(mut self, distortion: Distortion) -> Self {
        self.distortion = distortion;
        self
    }

    /// The 3x3 camera matrix `[[fx, 0, ppx], [0, fy, ppy], [0, 0, 1]]`.
    pub fn camera_matrix(&self) -> Array2<f32> {
        array![
            [self.fx, 0.0, self.ppx],
            [0.0, self.fy, self.ppy],
            [0.0, 0.0, 1.0],
        ]
    }

    /// Project a point in this camera's frame (meters) to pixel coordinates,
    /// ignoring distortion. Returns `None` for points at or behind the camera.
    pub fn project(&self, point: [f32; 3]) -> Option<[f32; 2]> {
        let [x, y, z] = point;
        if z <= 0.0 {
            return None;
        }
        Some([self.fx * x / z + self.ppx, self.fy * y / z + self.ppy])
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(CalibError::InvalidCalibration(format!(
                "intrinsics report a {}x{} image",
                self.width, self.height
            )));
        }
        let values = [self.ppx, self.ppy, self.fx, self.fy];
        if values.iter().chain(self.distortion.coeffs.iter()).any(|v| !v.is_finite()) {
            return Err(CalibError::InvalidCalibration(
                "intrinsics contain non-finite values".to_string(),
            ));
        }
        Ok(())
    }
}

/// Rigid transform from the depth frame to the color frame:
/// `p_color = rotation * p_depth + translation`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extrinsics {
    /// Row-major 3x3 rotation
    pub rotation: [f32; 9],
    /// Translation in meters
    pub translation: [f32; 3],
}

impl Default for Extrinsics {
    fn default() -> Self {
        Self::identity()
    }
}

impl Extrinsics {
    pub fn new(rotation: [f32; 9], translation: [f32; 3]) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    pub fn identity() -> Self {
        Self {
            rotation: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
            translation: [0.0; 3],
        }
    }

    /// Build from a column-major rotation, the layout librealsense uses.
    pub fn from_column_major(rotation: [f32; 9], translation: [f32; 3]) -> Self {
        let mut row_major = [0.0f32; 9];
        for row in 0..3 {
            for col in 0..3 {
                row_major[row * 3 + col] = rotation[col * 3 + row];
            }
        }
        Self::new(row_major, translation)
    }

    /// The rotation as column-major values.
    pub fn rotation_column_major(&self) -> [f32; 9] {
        let r = &self.rotation;
        [r[0], r[3], r[6], r[1], r[4], r[7], r[2], r[5], r[8]]
    }

    /// Iterator over the three rotation rows.
    pub fn rotation_rows(&self) -> impl Iterator<Item = &[f32]> {
        self.rotation.chunks_exact(3)
    }

    pub fn rotation_matrix(&self) -> Array2<f32> {
        Array2::from_shape_fn((3, 3), |(r, c)| self.rotation[r * 3 + c])
    }

    pub fn translation_vector(&self) -> Array1<f32> {
        Array1::from(self.translation.to_vec())
    }

    /// Map a point from the depth frame into the color frame.
    pub fn transform_point(&self, point: [f32; 3]) -> [f32; 3] {
        let p = Array1::from(point.to_vec());
        let out = self.rotation_matrix().dot(&p) + self.translation_vector();
        [out[0], out[1], out[2]]
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self
            .rotation
            .iter()
            .chain(self.translation.iter())
            .any(|v| !v.is_finite())
        {
            return Err(CalibError::InvalidCalibration(
                "extrinsics contain non-finite values".to_string(),
            ));
        }
        Ok(())
    }
}

/// Depth intrinsics and depth-to-color extrinsics read from one frame set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSnapshot {
    pub device: DeviceInfo,
    /// Frame number of the frame set both values were read from
    pub frame_number: u64,
    pub intrinsics: Intrinsics,
    pub extrinsics: Extrinsics,
}

impl CalibrationSnapshot {
    pub(crate) fn new(
        device: DeviceInfo,
        frame_number: u64,
        intrinsics: Intrinsics,
        extrinsics: Extrinsics,
    ) -> Result<Self> {
        intrinsics.validate()?;
        extrinsics.validate()?;
        Ok(Self {
            device,
            frame_number,
            intrinsics,
            extrinsics,
        })
    }

    pub fn intrinsics(&self) -> &Intrinsics {
        &self.intrinsics
    }

    pub fn extrinsics(&self) -> &Extrinsics {
        &self.extrinsics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_camera_matrix_layout() {
        let k = Intrinsics::new(1280, 720, 640.5, 360.2, 920.1, 920.3).camera_matrix();
        assert_eq!(k.shape(), &[3, 3]);
        assert_relative_eq!(k[[0, 0]], 920.1);
        assert_relative_eq!(k[[0, 2]], 640.5);
        assert_relative_eq!(k[[1, 1]], 920.3);
        assert_relative_eq!(k[[1, 2]], 360.2);
        assert_relative_eq!(k[[2, 2]], 1.0);
        assert_relative_eq!(k[[1, 0]], 0.0);
    }

    #[test]
    fn test_project_principal_axis() {
        let intr = Intrinsics::new(640, 480, 320.0, 240.0, 600.0, 600.0);
        let px = intr.project([0.0, 0.0, 2.0]).unwrap();
        assert_relative_eq!(px[0], 320.0);
        assert_relative_eq!(px[1], 240.0);
        assert!(intr.project([0.0, 0.0, -1.0]).is_none());
    }

    #[test]
    fn test_column_major_conversion() {
        // 90 degrees about z, column-major as librealsense reports it
        let col_major = [0.0, 1.0, 0.0, -1.0, 0.0, 0.0, 0.0, 0.0, 1.0];
        let ext = Extrinsics::from_column_major(col_major, [0.015, 0.0, 0.0]);
        assert_eq!(ext.rotation, [0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
        assert_eq!(ext.rotation_column_major(), col_major);

        let p = ext.transform_point([1.0, 0.0, 0.0]);
        assert_relative_eq!(p[0], 0.015);
        assert_relative_eq!(p[1], 1.0);
        assert_relative_eq!(p[2], 0.0);
    }

    #[test]
    fn test_rotation_rows() {
        let ext = Extrinsics::identity();
        let rows: Vec<&[f32]> = ext.rotation_rows().collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1], &[0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_validation_rejects_degenerate_values() {
        let zero = Intrinsics::new(0, 720, 640.0, 360.0, 900.0, 900.0);
        assert!(matches!(zero.validate(), Err(CalibError::InvalidCalibration(_))));

        let nan = Intrinsics::new(1280, 720, f32::NAN, 360.0, 900.0, 900.0);
        assert!(matches!(nan.validate(), Err(CalibError::InvalidCalibration(_))));

        let mut ext = Extrinsics::identity();
        ext.translation[2] = f32::INFINITY;
        assert!(matches!(ext.validate(), Err(CalibError::InvalidCalibration(_))));
    }

    #[test]
    fn test_snapshot_serializes_to_json() {
        let snapshot = CalibrationSnapshot::new(
            DeviceInfo::new("Simulated D435", "0001"),
            7,
            Intrinsics::new(1280, 720, 640.5, 360.2, 920.1, 920.3),
            Extrinsics::identity(),
        )
        .unwrap();
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["intrinsics"]["width"], 1280);
        assert_eq!(json["extrinsics"]["rotation"].as_array().unwrap().len(), 9);
        assert_eq!(json["extrinsics"]["translation"].as_array().unwrap().len(), 3);
        assert_eq!(json["device"]["serial_number"], "0001");
    }
}
