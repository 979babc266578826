//! Command-line interface
//!
//! `run` executes the full benchmark and writes the markdown report;
//! `fetch` only downloads the datasets; `info` inspects a local CSV.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::data::{load_csv, DatasetSource, QUIZ_URL, TRAINING_URL};
use crate::pipeline::{run_on_frames, PipelineConfig};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString {
    s.truecolor(100, 100, 100)
}
fn accent(s: &str) -> ColoredString {
    s.truecolor(120, 170, 255)
}
fn muted(s: &str) -> ColoredString {
    s.truecolor(140, 140, 140)
}
fn ok(s: &str) -> ColoredString {
    s.truecolor(100, 210, 120)
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "harbench")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Benchmark classifiers on wearable-sensor exercise data")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full benchmark and write the report
    Run {
        /// Dataset cache directory
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,

        /// Report output path
        #[arg(short, long, default_value = "report.md")]
        output: PathBuf,

        /// Random seed for the split and every model
        #[arg(long, default_value = "1813")]
        seed: u64,

        /// Training share of the labeled data
        #[arg(long, default_value = "0.75")]
        train_fraction: f64,

        /// Trees in the forest / boosting rounds per class
        #[arg(long, default_value = "100")]
        n_estimators: usize,

        /// Number of cross-validation folds
        #[arg(long, default_value = "5")]
        cv_folds: usize,

        /// Save the winning model as JSON
        #[arg(long)]
        save_model: Option<PathBuf>,
    },

    /// Download both datasets into the cache directory
    Fetch {
        /// Dataset cache directory
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,
    },

    /// Show shape and missing-value summary for a local CSV
    Info {
        /// Input data file
        #[arg(short, long)]
        data: PathBuf,
    },
}

// ─── Commands ──────────────────────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
pub fn cmd_run(
    cache_dir: &Path,
    output: &Path,
    seed: u64,
    train_fraction: f64,
    n_estimators: usize,
    cv_folds: usize,
    save_model: Option<&Path>,
) -> anyhow::Result<()> {
    section("Benchmark");

    let mut config = PipelineConfig::default()
        .with_seed(seed)
        .with_train_fraction(train_fraction)
        .with_cache_dir(cache_dir);
    config.trainer.n_estimators = n_estimators;
    config.trainer.cv_folds = cv_folds;

    step_run("Fetching datasets");
    let start = Instant::now();
    let (training_path, quiz_path) = DatasetSource {
        training_url: config.training_url.clone(),
        quiz_url: config.quiz_url.clone(),
        cache_dir: config.cache_dir.clone(),
    }
    .ensure_local()?;
    step_done(&format!("{:?}", start.elapsed()));

    step_run("Loading data");
    let start = Instant::now();
    let training = load_csv(&training_path)?;
    let quiz = load_csv(&quiz_path)?;
    step_done(&format!(
        "{} rows × {} cols in {:?}",
        training.height(),
        training.width(),
        start.elapsed()
    ));

    step_run("Training and evaluating");
    let start = Instant::now();
    let outcome = run_on_frames(&config, &training, &quiz)?;
    step_done(&format!("{:?}", start.elapsed()));

    std::fs::write(output, outcome.report.render())?;

    if let Some(model_path) = save_model {
        std::fs::write(model_path, serde_json::to_string(&outcome.winner)?)?;
    }

    println!();
    for (i, eval) in outcome.report.evaluations.iter().enumerate() {
        let marker = if i == 0 { ok("★") } else { dim(" ") };
        println!(
            "  {} {:<20} {}",
            marker,
            muted(&eval.model_name),
            format!("{:.4}", eval.accuracy).white().bold()
        );
    }
    println!();
    println!(
        "  {:<16} {}",
        muted("Winner"),
        outcome.report.winner.white().bold()
    );
    println!(
        "  {:<16} {}",
        muted("Quiz"),
        outcome.report.quiz_predictions.join(" ").white()
    );
    println!(
        "  {:<16} {}",
        muted("Report"),
        output.display().to_string().white()
    );
    println!();

    Ok(())
}

pub fn cmd_fetch(cache_dir: &Path) -> anyhow::Result<()> {
    section("Fetch");

    for url in [TRAINING_URL, QUIZ_URL] {
        step_run(&format!("Fetching {}", url.cyan()));
        let start = Instant::now();
        let path = crate::data::fetch_dataset(url, cache_dir)?;
        step_done(&format!("{} in {:?}", path.display(), start.elapsed()));
    }
    println!();

    Ok(())
}

pub fn cmd_info(data_path: &Path) -> anyhow::Result<()> {
    section("Info");

    step_run("Loading data");
    let start = Instant::now();
    let df = load_csv(data_path)?;
    step_done(&format!(
        "{} rows × {} cols in {:?}",
        df.height(),
        df.width(),
        start.elapsed()
    ));

    let with_nulls = df
        .get_columns()
        .iter()
        .filter(|c| c.null_count() > 0)
        .count();
    let all_null = df
        .get_columns()
        .iter()
        .filter(|c| c.null_count() == df.height())
        .count();

    println!();
    println!("  {:<24} {}", muted("Rows"), df.height().to_string().white());
    println!("  {:<24} {}", muted("Columns"), df.width().to_string().white());
    println!(
        "  {:<24} {}",
        muted("Columns with nulls"),
        with_nulls.to_string().white()
    );
    println!(
        "  {:<24} {}",
        muted("Entirely-null columns"),
        all_null.to_string().white()
    );
    println!();

    Ok(())
}
