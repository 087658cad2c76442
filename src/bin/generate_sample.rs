use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, Float64Builder, ListBuilder, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use clap::Parser;
use parquet::arrow::ArrowWriter;

use wavecal::library::{loader, Compound};

/// Write synthetic measurements of a reference compound to Parquet
#[derive(Parser)]
#[command(name = "generate_sample")]
struct Args {
    /// Compound library (JSON)
    #[arg(short, long, default_value = "data/compounds.json")]
    library: PathBuf,

    /// Compound to simulate
    #[arg(short, long, default_value = "Cyclohexane")]
    compound: String,

    /// Axis errors to simulate (cm⁻¹); one spectrum per value
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, default_value = "0,3.5,-6")]
    offsets: Vec<f64>,

    /// Instrument resolution (cm⁻¹)
    #[arg(long, default_value = "9.0")]
    fwhm: f64,

    /// Noise standard deviation relative to the strongest line
    #[arg(long, default_value = "0.005")]
    noise: f64,

    #[arg(short, long, default_value = "sample_data.parquet")]
    output: PathBuf,
}

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

/// A measurement of `compound` on an axis that reads `offset` too low.
fn generate_spectrum(
    wavenumbers: &[f64],
    compound: &Compound,
    offset: f64,
    fwhm: f64,
    noise_level: f64,
    rng: &mut SimpleRng,
) -> Vec<f64> {
    let sigma = fwhm / (8.0_f64.ln() * 2.0).sqrt();
    wavenumbers
        .iter()
        .map(|&wn| {
            let signal: f64 = compound
                .peaks
                .iter()
                .map(|p| gaussian(wn, p.wavenumber - offset, sigma, f64::from(p.intensity) / 5.0))
                .sum();
            0.05 + signal + rng.gauss(0.0, noise_level)
        })
        .collect()
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let library = loader::load_file(&args.library)
        .with_context(|| format!("loading {}", args.library.display()))?;
    let compound = library
        .get(&args.compound)
        .with_context(|| format!("unknown compound '{}'", args.compound))?;

    let mut rng = SimpleRng::new(42);

    // Wavenumbers: 150 → 3350, roughly 1.5 cm⁻¹ per pixel
    let wavenumbers: Vec<f64> = (0..2048).map(|i| 150.0 + i as f64 * 1.5625).collect();

    let mut x_builder = ListBuilder::new(Float64Builder::new());
    let mut y_builder = ListBuilder::new(Float64Builder::new());
    let mut labels: Vec<String> = Vec::new();

    for &offset in &args.offsets {
        let y = generate_spectrum(
            &wavenumbers,
            compound,
            offset,
            args.fwhm,
            args.noise,
            &mut rng,
        );

        x_builder.values().append_slice(&wavenumbers);
        x_builder.append(true);
        y_builder.values().append_slice(&y);
        y_builder.append(true);
        labels.push(format!("{} offset {offset:+}", compound.name));
    }

    let label_array = StringArray::from(labels.iter().map(|s| s.as_str()).collect::<Vec<_>>());
    let fwhm_array = Float64Array::from(vec![args.fwhm; labels.len()]);

    let list_type = DataType::List(Arc::new(Field::new("item", DataType::Float64, true)));
    let schema = Arc::new(Schema::new(vec![
        Field::new("x", list_type.clone(), false),
        Field::new("y", list_type, false),
        Field::new("label", DataType::Utf8, false),
        Field::new("fwhm", DataType::Float64, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(x_builder.finish()),
            Arc::new(y_builder.finish()),
            Arc::new(label_array),
            Arc::new(fwhm_array),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing writer")?;

    println!(
        "Wrote {} spectra of {} ({} wavenumbers each) to {}",
        labels.len(),
        compound.name,
        wavenumbers.len(),
        args.output.display()
    );
    Ok(())
}
