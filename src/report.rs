//! Console presentation of a calibration snapshot.

use std::fmt;
use std::io::Write;

use crate::calibration::{CalibrationSnapshot, Extrinsics, Intrinsics};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Labeled lines, one value per line
    #[default]
    Text,
    /// Pretty-printed JSON of the whole snapshot
    Json,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReportOptions {
    pub format: OutputFormat,
    /// Append the pinhole camera matrix and distortion coefficients (text only)
    pub camera_matrix: bool,
}

fn join(values: &[f32]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn write_intrinsics(out: &mut impl fmt::Write, intrinsics: &Intrinsics) -> fmt::Result {
    writeln!(out, "Depth Camera Intrinsics:")?;
    writeln!(out, "Width: {}", intrinsics.width)?;
    writeln!(out, "Height: {}", intrinsics.height)?;
    writeln!(out, "PPX: {}", intrinsics.ppx)?;
    writeln!(out, "PPY: {}", intrinsics.ppy)?;
    writeln!(out, "FX: {}", intrinsics.fx)?;
    writeln!(out, "FY: {}", intrinsics.fy)
}

fn write_extrinsics(out: &mut impl fmt::Write, extrinsics: &Extrinsics) -> fmt::Result {
    writeln!(out, "Extrinsics (Depth to Color):")?;
    writeln!(out, "Rotation Matrix:")?;
    for row in extrinsics.rotation_rows() {
        writeln!(out, "{}", join(row))?;
    }
    writeln!(out, "Translation Vector:")?;
    writeln!(out, "{}", join(&extrinsics.translation))
}

fn write_camera_matrix(out: &mut impl fmt::Write, intrinsics: &Intrinsics) -> fmt::Result {
    writeln!(out, "Camera Matrix:")?;
    for row in intrinsics.camera_matrix().rows() {
        writeln!(out, "{}", join(&row.to_vec()))?;
    }
    writeln!(out, "Distortion Model: {}", intrinsics.distortion.model)?;
    writeln!(out, "Distortion Coefficients:")?;
    writeln!(out, "{}", join(&intrinsics.distortion.coeffs))
}

fn write_text(
    out: &mut impl fmt::Write,
    snapshot: &CalibrationSnapshot,
    camera_matrix: bool,
) -> fmt::Result {
    write_intrinsics(out, &snapshot.intrinsics)?;
    writeln!(out)?;
    write_extrinsics(out, &snapshot.extrinsics)?;
    if camera_matrix {
        writeln!(out)?;
        write_camera_matrix(out, &snapshot.intrinsics)?;
    }
    Ok(())
}

/// The fixed text layout: intrinsics, a blank line, then extrinsics.
pub fn render_text(snapshot: &CalibrationSnapshot, camera_matrix: bool) -> Result<String> {
    let mut out = String::new();
    write_text(&mut out, snapshot, camera_matrix)?;
    Ok(out)
}

pub fn render_json(snapshot: &CalibrationSnapshot) -> Result<String> {
    let mut json = serde_json::to_string_pretty(snapshot)?;
    json.push('\n');
    Ok(json)
}

pub fn render(snapshot: &CalibrationSnapshot, options: &ReportOptions) -> Result<String> {
    match options.format {
        OutputFormat::Text => render_text(snapshot, options.camera_matrix),
        OutputFormat::Json => render_json(snapshot),
    }
}

/// Render fully before writing so a failure never leaves partial output.
pub fn write_report<W: Write>(
    writer: &mut W,
    snapshot: &CalibrationSnapshot,
    options: &ReportOptions,
) -> Result<()> {
    let rendered = render(snapshot, options)?;
    writer.write_all(rendered.as_bytes())?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device_info::DeviceInfo;

    /// Accepts a fixed number of writes, then fails.
    struct FailAfter(usize);

    impl fmt::Write for FailAfter {
        fn write_str(&mut self, _s: &str) -> fmt::Result {
            if self.0 == 0 {
                return Err(fmt::Error);
            }
            self.0 -= 1;
            Ok(())
        }
    }

    fn snapshot() -> CalibrationSnapshot {
        CalibrationSnapshot::new(
            DeviceInfo::new("Simulated D435", "0001"),
            1,
            Intrinsics::new(1280, 720, 640.5, 360.2, 920.1, 920.3),
            Extrinsics::identity(),
        )
        .unwrap()
    }

    #[test]
    fn test_write_text_propagates_writer_errors() {
        let snapshot = snapshot();
        assert!(write_text(&mut FailAfter(0), &snapshot, false).is_err());
        assert!(write_text(&mut FailAfter(10), &snapshot, false).is_err());
        assert!(write_extrinsics(&mut FailAfter(3), &snapshot.extrinsics).is_err());
        assert!(write_camera_matrix(&mut FailAfter(2), &snapshot.intrinsics).is_err());
    }

    #[test]
    fn test_write_text_succeeds_on_string() {
        let mut out = String::new();
        write_text(&mut out, &snapshot(), true).unwrap();
        assert!(out.starts_with("Depth Camera Intrinsics:\n"));
        assert!(out.contains("\nCamera Matrix:\n"));
    }
}
