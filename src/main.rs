use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{ArgAction, Parser};

use depth_calib::report::{self, OutputFormat, ReportOptions};
use depth_calib::{
    CalibError, CalibrationReader, CalibrationSnapshot, Result, SessionConfig, SimulatedBackend,
    SimulatedDevice, StreamConfig,
};

/// Print the depth intrinsics and depth-to-color extrinsics of a depth camera.
#[derive(Debug, Parser)]
#[command(name = "calibration_reader", version, about)]
struct Args {
    /// JSON session configuration; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Serial number of the device to open (default: first attached)
    #[arg(long)]
    serial: Option<String>,

    /// Frame sets discarded before capture
    #[arg(long)]
    warm_up_frames: Option<u32>,

    /// Longest wait for a single frame set, in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Depth stream as WIDTHxHEIGHT[@FPS]
    #[arg(long)]
    depth: Option<StreamConfig>,

    /// Color stream as WIDTHxHEIGHT[@FPS]
    #[arg(long)]
    color: Option<StreamConfig>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Also print the camera matrix and distortion coefficients
    #[arg(long)]
    camera_matrix: bool,

    /// Read from a simulated D435 instead of hardware
    #[arg(long)]
    simulate: bool,

    /// Log the snapshot to a Rerun viewer (requires the `rerun` feature)
    #[arg(long)]
    rerun: bool,

    /// Record the snapshot to an .rrd file instead of a live viewer (requires the `rerun` feature)
    #[arg(long, value_name = "FILE.rrd")]
    rerun_save: Option<PathBuf>,

    /// More log output (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn session_config(&self) -> Result<SessionConfig> {
        let mut config = match &self.config {
            Some(path) => SessionConfig::from_json_file(path)?,
            None => SessionConfig::default(),
        };
        if let Some(serial) = &self.serial {
            config = config.serial(serial.clone());
        }
        if let Some(frames) = self.warm_up_frames {
            config = config.warm_up_frames(frames);
        }
        if let Some(ms) = self.timeout_ms {
            config = config.frame_timeout(Duration::from_millis(ms));
        }
        if let Some(depth) = self.depth {
            config = config.depth(depth);
        }
        if let Some(color) = self.color {
            config = config.color(color);
        }
        config.validate()?;
        Ok(config)
    }

    fn wants_visualization(&self) -> bool {
        self.rerun || self.rerun_save.is_some()
    }

    fn report_options(&self) -> ReportOptions {
        ReportOptions {
            format: self.format,
            camera_matrix: self.camera_matrix,
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

#[cfg(feature = "realsense")]
fn read_from_hardware(config: SessionConfig) -> Result<CalibrationSnapshot> {
    let backend = depth_calib::RealSenseBackend::new()?;
    CalibrationReader::new(backend, config).read_calibration()
}

#[cfg(not(feature = "realsense"))]
fn read_from_hardware(_config: SessionConfig) -> Result<CalibrationSnapshot> {
    Err(CalibError::Config(
        "built without the `realsense` feature; rebuild with it or pass --simulate".to_string(),
    ))
}

#[cfg(feature = "rerun")]
fn visualize(snapshot: &CalibrationSnapshot, save: Option<&Path>) -> Result<()> {
    use depth_calib::visualization::RerunVisualizer;

    let rerun_err = |e: rerun::RecordingStreamError| CalibError::Backend(format!("rerun: {e}"));
    let viz = match save {
        Some(path) => RerunVisualizer::new_with_file("calibration_reader", path),
        None => RerunVisualizer::spawn("calibration_reader"),
    }
    .map_err(rerun_err)?;
    viz.log_snapshot(snapshot).map_err(rerun_err)
}

fn rerun_unavailable() -> CalibError {
    CalibError::Config("--rerun and --rerun-save require building with the `rerun` feature".to_string())
}

#[cfg(not(feature = "rerun"))]
fn visualize(_snapshot: &CalibrationSnapshot, _save: Option<&Path>) -> Result<()> {
    Err(rerun_unavailable())
}

fn run(args: &Args) -> Result<()> {
    let config = args.session_config()?;
    let options = args.report_options();
    if args.wants_visualization() && !cfg!(feature = "rerun") {
        // Reject before touching the device.
        return Err(rerun_unavailable());
    }

    let snapshot = if args.simulate {
        let backend = SimulatedBackend::new().with_device(SimulatedDevice::d435("000000000000"));
        CalibrationReader::new(backend, config).read_calibration()?
    } else {
        read_from_hardware(config)?
    };

    if args.wants_visualization() {
        if let Err(err) = visualize(&snapshot, args.rerun_save.as_deref()) {
            log::warn!("visualization failed, printing the report anyway: {err}");
        }
    }
    report::write_report(&mut io::stdout().lock(), &snapshot, &options)
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::debug!("{err:?}");
            eprintln!("error: {err}");
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
