//! Calibration binary for the hand distance estimator
//!
//! Fits `cm = A·px² + B·px + C` to a table of knuckle spans and writes the
//! coefficients for the main binary's `--calibration` flag.
//! Usage: cargo run --bin calibrate -- --table table.json --output data/calibration.json

use clap::Parser;
use log::{info, LevelFilter};
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use wrist_rehab_coach::tracking::{CalibrationTable, DistanceCalibrator};

#[derive(Parser, Debug)]
#[command(name = "Wrist Rehab Coach - Calibration")]
#[command(about = "Fit the pixel-to-centimetre distance curve")]
struct Args {
    /// Table of measurements: {"pixels": [...], "centimeters": [...]} (built-in table if omitted)
    #[arg(short, long)]
    table: Option<PathBuf>,

    /// Output file for the fitted coefficients
    #[arg(short, long, default_value = "data/calibration.json")]
    output: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(if args.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .parse_default_env()
        .init();

    let table = match &args.table {
        Some(path) => CalibrationTable::load(path)?,
        None => CalibrationTable::default(),
    };
    info!("Fitting {} calibration points", table.len());

    let calibrator = DistanceCalibrator::fit(&table)?;
    let c = calibrator.coefficients();
    println!("cm = {:.7}·px² + {:.7}·px + {:.4}", c.a, c.b, c.c);

    let residuals = calibrator.residuals(&table);
    if args.verbose {
        println!("{:>8} {:>8} {:>10} {:>9}", "px", "cm", "estimate", "residual");
        for ((px, cm), residual) in table.pixels.iter().zip(&table.centimeters).zip(&residuals) {
            println!(
                "{:>8.1} {:>8.1} {:>10.2} {:>+9.2}",
                px,
                cm,
                calibrator.estimate_from_pixels(*px),
                residual
            );
        }
    }
    let worst = residuals.iter().fold(0.0f64, |acc, r| acc.max(r.abs()));
    println!("Max residual: {:.2} cm", worst);

    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    calibrator.save(&args.output)?;
    println!("✓ Coefficients written to {}", args.output.display());

    Ok(())
}
