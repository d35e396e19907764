use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Date32Array, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Days, NaiveDate};
use clap::Parser;
use log::info;
use parquet::arrow::ArrowWriter;

/// Write a deterministic task-tracking dataset as CSV and Parquet.
#[derive(Parser, Debug)]
#[command(name = "generate-sample", version, about)]
struct Args {
    /// Directory the files are written to
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Number of tasks
    #[arg(long, default_value_t = 40)]
    tasks: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

const ASSIGNEES: [&str; 4] = ["Alice", "Bob", "Carol", "Dave"];
const PRIORITIES: [&str; 3] = ["Low", "Medium", "High"];
const HEADERS: [&str; 7] = [
    "Name",
    "Start Date",
    "Due Date",
    "Assignee",
    "Priority",
    "Hours",
    "Progress",
];

struct Task {
    name: String,
    start: NaiveDate,
    due: NaiveDate,
    assignee: &'static str,
    priority: &'static str,
    hours: f64,
    progress: i64,
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

    /// Uniform integer in `[low, high)`.
    fn range(&mut self, low: u64, high: u64) -> u64 {
        low + self.next_u64() % (high - low)
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[self.range(0, items.len() as u64) as usize]
    }
}

fn generate_tasks(count: usize, rng: &mut SimpleRng) -> Vec<Task> {
    // Tasks spread over the first quarter of 2024.
    let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default();
    (1..=count)
        .map(|i| {
            let start = base + Days::new(rng.range(0, 90));
            let due = start + Days::new(rng.range(1, 22));
            // Half-hour granularity, 0.5 to 40 hours.
            let hours = (1.0 + rng.next_f64() * 79.0).round() / 2.0;
            Task {
                name: format!("Task {i}"),
                start,
                due,
                assignee: rng.pick(&ASSIGNEES),
                priority: rng.pick(&PRIORITIES),
                hours,
                progress: rng.range(0, 21) as i64 * 5,
            }
        })
        .collect()
}

fn write_csv(path: &Path, tasks: &[Task]) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(HEADERS)?;
    for t in tasks {
        writer.write_record([
            t.name.clone(),
            t.start.to_string(),
            t.due.to_string(),
            t.assignee.to_string(),
            t.priority.to_string(),
            format!("{:.1}", t.hours),
            t.progress.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn days_since_epoch(day: NaiveDate) -> i32 {
    (day - NaiveDate::default()).num_days() as i32
}

fn write_parquet(path: &Path, tasks: &[Task]) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new(HEADERS[0], DataType::Utf8, false),
        Field::new(HEADERS[1], DataType::Date32, false),
        Field::new(HEADERS[2], DataType::Date32, false),
        Field::new(HEADERS[3], DataType::Utf8, false),
        Field::new(HEADERS[4], DataType::Utf8, false),
        Field::new(HEADERS[5], DataType::Float64, false),
        Field::new(HEADERS[6], DataType::Int64, false),
    ]));

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(tasks.iter().map(|t| t.name.as_str()))),
        Arc::new(Date32Array::from_iter_values(tasks.iter().map(|t| days_since_epoch(t.start)))),
        Arc::new(Date32Array::from_iter_values(tasks.iter().map(|t| days_since_epoch(t.due)))),
        Arc::new(StringArray::from_iter_values(tasks.iter().map(|t| t.assignee))),
        Arc::new(StringArray::from_iter_values(tasks.iter().map(|t| t.priority))),
        Arc::new(Float64Array::from_iter_values(tasks.iter().map(|t| t.hours))),
        Arc::new(Int64Array::from_iter_values(tasks.iter().map(|t| t.progress))),
    ];
    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;

    let file =
        std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut rng = SimpleRng::new(args.seed);
    let tasks = generate_tasks(args.tasks, &mut rng);

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("creating {}", args.out_dir.display()))?;
    let csv_path = args.out_dir.join("sample_tasks.csv");
    let parquet_path = args.out_dir.join("sample_tasks.parquet");
    write_csv(&csv_path, &tasks)?;
    write_parquet(&parquet_path, &tasks)?;
    info!("seed {}, {} tasks", args.seed, tasks.len());

    println!(
        "Wrote {} tasks to {} and {}",
        tasks.len(),
        csv_path.display(),
        parquet_path.display()
    );
    Ok(())
}
