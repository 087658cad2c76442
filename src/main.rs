//! # wavecal
//!
//! Command-line front end for the wavenumber correction engine.
//!
//! ```bash
//! # List reference compounds
//! wavecal compounds
//!
//! # Compute a correction from a measurement of cyclohexane
//! wavecal calibrate --compound Cyclohexane --fwhm 9.5 cyclohexane.parquet
//!
//! # Expected-peak overlay as CSV
//! wavecal overlay --compound Cyclohexane cyclohexane.parquet -o overlay.csv
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use wavecal::config::Settings;
use wavecal::data::{loader, Measurement};
use wavecal::library::{self, Library};
use wavecal::{overlay, CorrectionEngine, DeviceState};

/// Wavenumber-axis correction against ASTM E1840 reference compounds
#[derive(Parser)]
#[command(name = "wavecal")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Compound library (JSON)
    #[arg(short, long, global = true, default_value = "data/compounds.json")]
    library: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the reference compounds in the library
    Compounds,

    /// Compute a wavenumber correction from a reference measurement
    Calibrate {
        /// Measurement file (.parquet, .json or .csv)
        #[arg(value_name = "SPECTRUM")]
        spectrum: PathBuf,

        /// Reference compound the sample contains
        #[arg(short, long)]
        compound: Option<String>,

        /// Which spectrum in the file to use
        #[arg(long, default_value = "0")]
        row: usize,

        /// Optical resolution (cm⁻¹); defaults to the file's `fwhm` column
        #[arg(long)]
        fwhm: Option<f64>,

        /// Correction already applied to the spectrum's axis (cm⁻¹)
        #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
        previous: f64,

        /// TOML settings file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override matcher.max_shift_threshold (cm⁻¹)
        #[arg(long)]
        max_shift: Option<f64>,

        /// Override matcher.min_matched_peaks
        #[arg(long)]
        min_matched: Option<usize>,
    },

    /// Write the expected-peak overlay for a measurement as CSV
    Overlay {
        /// Measurement file (.parquet, .json or .csv)
        #[arg(value_name = "SPECTRUM")]
        spectrum: PathBuf,

        /// Reference compound to draw
        #[arg(short, long)]
        compound: String,

        /// Which spectrum in the file to use
        #[arg(long, default_value = "0")]
        row: usize,

        /// Half width of each drawn spike (cm⁻¹)
        #[arg(long, default_value = "2.0")]
        half_width: f64,

        /// Output CSV (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let library = library::loader::load_file(&cli.library)
        .with_context(|| format!("loading {}", cli.library.display()))?;

    match cli.command {
        Commands::Compounds => {
            for compound in library.iter() {
                let primary = compound
                    .primary_peaks()
                    .map(|p| format!("{:.1}", p.wavenumber))
                    .collect::<Vec<_>>()
                    .join(", ");
                println!(
                    "{:<24} {:>3} peaks  primary: {}",
                    compound.name,
                    compound.peaks.len(),
                    if primary.is_empty() { "-" } else { primary.as_str() }
                );
            }
        }

        Commands::Calibrate {
            spectrum,
            compound,
            row,
            fwhm,
            previous,
            config,
            max_shift,
            min_matched,
        } => {
            let mut settings = match &config {
                Some(path) => Settings::from_file(path)?,
                None => Settings::default(),
            };
            if max_shift.is_some() {
                settings.matcher.max_shift_threshold = max_shift;
            }
            if min_matched.is_some() {
                settings.matcher.min_matched_peaks = min_matched;
            }
            let engine = CorrectionEngine::new(settings.engine_config()?);

            check_compound(&library, compound.as_deref())?;

            let measurement = load_row(&spectrum, row)?;
            let fwhm = fwhm
                .or(measurement.fwhm)
                .context("no resolution given: pass --fwhm or add a 'fwhm' column")?;

            calibrate(&engine, &library, &measurement, row, compound, fwhm, previous)?;
        }

        Commands::Overlay {
            spectrum,
            compound,
            row,
            half_width,
            output,
        } => {
            let compound = library
                .get(&compound)
                .with_context(|| format!("unknown compound '{compound}'"))?;
            let measurement = load_row(&spectrum, row)?;
            let (min, max) = measurement.intensity_range().unwrap_or((0.0, 1.0));
            let series = overlay::render(compound, &measurement.x, min, max, half_width);

            match output {
                Some(path) => write_series(csv::Writer::from_path(&path)?, &series)?,
                None => write_series(csv::Writer::from_writer(std::io::stdout()), &series)?,
            }
        }
    }

    Ok(())
}

/// A named compound must exist; leaving it out is the engine's to report.
fn check_compound(library: &Library, compound: Option<&str>) -> Result<()> {
    if let Some(name) = compound {
        if library.get(name).is_none() {
            bail!(
                "unknown compound '{name}' (known: {})",
                library.get_names().join(", ")
            );
        }
    }
    Ok(())
}

fn load_row(path: &Path, row: usize) -> Result<Measurement> {
    let mut measurements =
        loader::load_file(path).with_context(|| format!("loading {}", path.display()))?;
    let count = measurements.len();
    if row >= count {
        bail!("row {row} requested but {} has {count} spectra", path.display());
    }
    Ok(measurements.swap_remove(row))
}

fn calibrate(
    engine: &CorrectionEngine,
    library: &Library,
    measurement: &Measurement,
    row: usize,
    compound: Option<String>,
    fwhm: f64,
    previous: f64,
) -> Result<()> {
    let mut device = DeviceState::new(measurement.name(row), fwhm);
    device.selected_compound = compound;
    device.restore_correction(previous);

    let outcome = device.calibrate(engine, library, &measurement.y, &measurement.x);
    if let Some(message) = &device.status_message {
        println!("{}: {message}", device.serial);
    }

    let report = outcome?;
    for m in &report.matches {
        info!(
            "  {:>8.2} → {:>8.2} (shift {:+.3}){}",
            m.expected,
            m.measured,
            m.shift,
            if m.primary { " primary" } else { "" }
        );
    }
    println!("correction = {:.4}", device.correction());
    Ok(())
}

fn write_series<W: std::io::Write>(mut writer: csv::Writer<W>, series: &[(f64, f64)]) -> Result<()> {
    writer.write_record(["wavenumber", "intensity"])?;
    for (x, y) in series {
        writer.write_record([x.to_string(), y.to_string()])?;
    }
    writer.flush()?;
    Ok(())
}
