use depth_calib::report::{self, OutputFormat, ReportOptions};
use depth_calib::{
    CalibrationReader, CalibrationSnapshot, Extrinsics, Intrinsics, SessionConfig, SimulatedBackend,
    SimulatedDevice,
};

fn scenario_snapshot(serial: &str) -> CalibrationSnapshot {
    let device = SimulatedDevice::d435(serial)
        .with_depth_intrinsics(Intrinsics::new(1280, 720, 640.5, 360.2, 920.1, 920.3))
        .with_extrinsics(Extrinsics::new(
            [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
            [0.015, 0.0001, -0.0002],
        ));
    let backend = SimulatedBackend::new().with_device(device);
    CalibrationReader::new(backend, SessionConfig::default().warm_up_frames(0))
        .read_calibration()
        .expect("simulated capture")
}

#[test]
fn text_report_lists_intrinsics_in_order() {
    let text = report::render_text(&scenario_snapshot("report-order"), false).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(
        &lines[..7],
        &[
            "Depth Camera Intrinsics:",
            "Width: 1280",
            "Height: 720",
            "PPX: 640.5",
            "PPY: 360.2",
            "FX: 920.1",
            "FY: 920.3",
        ]
    );
}

#[test]
fn text_report_full_layout() {
    let text = report::render_text(&scenario_snapshot("report-layout"), false).unwrap();
    let expected = "\
Depth Camera Intrinsics:
Width: 1280
Height: 720
PPX: 640.5
PPY: 360.2
FX: 920.1
FY: 920.3

Extrinsics (Depth to Color):
Rotation Matrix:
1 0 0
0 1 0
0 0 1
Translation Vector:
0.015 0.0001 -0.0002
";
    assert_eq!(text, expected);
}

#[test]
fn camera_matrix_section_is_appended() {
    let text = report::render_text(&scenario_snapshot("report-k"), true).unwrap();
    let tail = text.split("Camera Matrix:\n").nth(1).expect("camera matrix section");
    let lines: Vec<&str> = tail.lines().collect();
    assert_eq!(lines[0], "920.1 0 640.5");
    assert_eq!(lines[1], "0 920.3 360.2");
    assert_eq!(lines[2], "0 0 1");
    assert_eq!(lines[3], "Distortion Model: None");
    assert_eq!(lines[4], "Distortion Coefficients:");
    assert_eq!(lines[5], "0 0 0 0 0");
}

#[test]
fn json_report_round_trips() -> depth_calib::Result<()> {
    let snapshot = scenario_snapshot("report-json");
    let options = ReportOptions {
        format: OutputFormat::Json,
        camera_matrix: false,
    };
    let json = report::render(&snapshot, &options)?;
    let parsed: CalibrationSnapshot = serde_json::from_str(&json)?;
    assert_eq!(parsed, snapshot);
    Ok(())
}

#[test]
fn write_report_emits_rendered_text() -> depth_calib::Result<()> {
    let snapshot = scenario_snapshot("report-write");
    let mut out = Vec::new();
    report::write_report(&mut out, &snapshot, &ReportOptions::default())?;
    let written = String::from_utf8(out).expect("utf-8 report");
    assert_eq!(written, report::render_text(&snapshot, false)?);
    Ok(())
}
