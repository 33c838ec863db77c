use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use clap::Parser;
use log::info;
use parquet::arrow::ArrowWriter;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

/// Share of cells left empty in each numeric column.
const MISSING_RATE: f64 = 0.03;

/// (sport, height offset in cm, build factor applied to weight)
const SPORTS: [(&str, f64, f64); 8] = [
    ("Athletics", 2.0, 0.95),
    ("Swimming", 4.0, 1.0),
    ("Gymnastics", -12.0, 0.9),
    ("Basketball", 16.0, 1.02),
    ("Rowing", 8.0, 1.08),
    ("Weightlifting", -4.0, 1.3),
    ("Cycling", 0.0, 0.97),
    ("Judo", -2.0, 1.15),
];

/// Writes a reproducible synthetic athlete table.
#[derive(Parser)]
#[command(name = "generate_sample")]
#[command(about = "Write a synthetic athlete dataset (.parquet or .csv)")]
struct Args {
    /// Output file; the extension picks the format.
    #[arg(default_value = "athlete_events.parquet")]
    output: PathBuf,

    #[arg(long, default_value_t = 5000)]
    rows: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

struct Athlete {
    id: i64,
    sex: &'static str,
    sport: &'static str,
    age: Option<f64>,
    height: Option<f64>,
    weight: Option<f64>,
}

fn generate(rows: usize, seed: u64) -> Result<Vec<Athlete>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let age_dist: Normal<f64> = Normal::new(25.0, 4.5)?;
    let height_noise: Normal<f64> = Normal::new(0.0, 7.5)?;
    let weight_noise: Normal<f64> = Normal::new(0.0, 6.0)?;

    let mut athletes = Vec::with_capacity(rows);
    for id in 1..=rows as i64 {
        let (sport, height_offset, build) = SPORTS[rng.random_range(0..SPORTS.len())];
        let (sex, base_height) = if rng.random_bool(0.5) {
            ("M", 178.0)
        } else {
            ("F", 166.0)
        };

        let age = age_dist.sample(&mut rng).round().clamp(14.0, 60.0);
        let height = base_height + height_offset + height_noise.sample(&mut rng);
        // Body-mass index around 22, scaled by the sport's build.
        let weight = 22.0 * build * (height / 100.0).powi(2) + weight_noise.sample(&mut rng);

        let mut keep = |v: f64| (!rng.random_bool(MISSING_RATE)).then_some(v);
        athletes.push(Athlete {
            id,
            sex,
            sport,
            age: keep(age),
            height: keep((height * 10.0).round() / 10.0),
            weight: keep((weight.max(30.0) * 10.0).round() / 10.0),
        });
    }
    Ok(athletes)
}

fn to_batch(athletes: &[Athlete]) -> Result<RecordBatch> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("ID", DataType::Int64, false),
        Field::new("Sex", DataType::Utf8, false),
        Field::new("Sport", DataType::Utf8, false),
        Field::new("Age", DataType::Float64, true),
        Field::new("Height", DataType::Float64, true),
        Field::new("Weight", DataType::Float64, true),
    ]));

    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from_iter_values(athletes.iter().map(|a| a.id))),
        Arc::new(StringArray::from_iter_values(athletes.iter().map(|a| a.sex))),
        Arc::new(StringArray::from_iter_values(athletes.iter().map(|a| a.sport))),
        Arc::new(Float64Array::from_iter(athletes.iter().map(|a| a.age))),
        Arc::new(Float64Array::from_iter(athletes.iter().map(|a| a.height))),
        Arc::new(Float64Array::from_iter(athletes.iter().map(|a| a.weight))),
    ];

    RecordBatch::try_new(schema, columns).context("Failed to create RecordBatch")
}

fn write_parquet(path: &Path, batch: &RecordBatch) -> Result<()> {
    let file = std::fs::File::create(path).context("Failed to create output file")?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None).context("Failed to create writer")?;
    writer.write(batch).context("Failed to write batch")?;
    writer.close().context("Failed to close writer")?;
    Ok(())
}

fn write_csv(path: &Path, athletes: &[Athlete]) -> Result<()> {
    let cell = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();

    let mut writer = csv::Writer::from_path(path).context("Failed to create output file")?;
    writer.write_record(["ID", "Sex", "Sport", "Age", "Height", "Weight"])?;
    for a in athletes {
        writer.write_record([
            a.id.to_string(),
            a.sex.to_string(),
            a.sport.to_string(),
            cell(a.age),
            cell(a.height),
            cell(a.weight),
        ])?;
    }
    writer.flush().context("Failed to flush CSV")?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let athletes = generate(args.rows, args.seed)?;
    let batch = to_batch(&athletes)?;

    let ext = args
        .output
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "parquet" | "pq" => write_parquet(&args.output, &batch)?,
        "csv" => write_csv(&args.output, &athletes)?,
        other => bail!("Unsupported output extension: .{other}"),
    }
    info!("seed {} produced {} rows", args.seed, athletes.len());

    let preview = batch.slice(0, batch.num_rows().min(5));
    println!("{}", pretty_format_batches(&[preview])?);
    println!("Wrote {} athletes to {}", athletes.len(), args.output.display());
    Ok(())
}
