//! Wrist Rehab Coach - live feedback for wrist rehabilitation exercises
//!
//! Replays (or pipes in) a stream of hand-landmark frames for one user,
//! runs the exercise their rotation points at, prints live feedback and
//! stores the result.

use clap::Parser;
use log::{info, LevelFilter};
use std::error::Error;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use wrist_rehab_coach::cli::Display;
use wrist_rehab_coach::exercise::ExerciseKind;
use wrist_rehab_coach::session::{
    FrameSource, JsonFileStore, JsonLinesSource, SessionConfig, SessionDriver, SessionOutcome,
};
use wrist_rehab_coach::tracking::{DistanceCalibrator, Handedness};

#[derive(Parser, Debug)]
#[command(name = "Wrist Rehab Coach")]
#[command(about = "Repetition detection and live feedback for wrist rehabilitation exercises")]
struct Args {
    /// Landmark frames as JSON lines ("-" for stdin)
    #[arg(short, long)]
    frames: String,

    /// User identifier
    #[arg(short, long)]
    user: String,

    /// Run this exercise instead of the user's next one
    #[arg(short, long, value_enum)]
    exercise: Option<ExerciseKind>,

    /// Record the user's exercised hand (tracked when more than one is visible)
    #[arg(long, value_enum)]
    hand: Option<Handedness>,

    /// Calibration coefficients written by `calibrate`
    #[arg(short, long)]
    calibration: Option<PathBuf>,

    /// Session store file
    #[arg(short, long, default_value = "data/sessions.json")]
    store: PathBuf,

    /// Session configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Exercise window in seconds
    #[arg(short, long)]
    window_secs: Option<f64>,

    /// Camera image is mirrored (swap handedness labels)
    #[arg(short, long)]
    mirror: bool,

    /// Print every event and enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(if args.debug {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .parse_default_env()
        .init();

    let mut config = match &args.config {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default(),
    };
    if let Some(window_secs) = args.window_secs {
        config.window_secs = window_secs;
    }
    config.mirror |= args.mirror;
    config.validate()?;

    let calibrator = DistanceCalibrator::load_or_default(args.calibration.as_deref())?;
    let coefficients = calibrator.coefficients();
    info!(
        "Calibration: a={:.6} b={:.6} c={:.4}",
        coefficients.a, coefficients.b, coefficients.c
    );

    let mut source: Box<dyn FrameSource> = if args.frames == "-" {
        Box::new(JsonLinesSource::new(BufReader::new(io::stdin())).mirrored(config.mirror))
    } else {
        Box::new(JsonLinesSource::open(Path::new(&args.frames))?.mirrored(config.mirror))
    };
    let mut store = JsonFileStore::open(&args.store)?;
    if let Some(hand) = args.hand {
        store.set_paralysed_hand(&args.user, hand)?;
    }

    let mut display = Display::stdout().with_events(args.debug);
    display.show_header(&args.user, args.exercise, config.window_secs)?;

    let driver = SessionDriver::new(config, calibrator, args.user.as_str()).with_exercise(args.exercise);
    let report = driver.run(source.as_mut(), &mut store, &mut display)?;

    display.show_summary(&report)?;
    info!("Session stored in {}", store.path().display());

    match report.outcome {
        SessionOutcome::StreamFailure(reason) => Err(format!("Stream failure: {}", reason).into()),
        _ => Ok(()),
    }
}
