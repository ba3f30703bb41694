mod config;
mod journal;
mod report;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use gl_audit_sampling::{FormatMode, ingest_grid, run_sampling};
use log::{LevelFilter, Log, Metadata, Record, warn};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Auto,
    Flat,
    Hierarchical,
}

impl From<Format> for FormatMode {
    fn from(f: Format) -> Self {
        match f {
            Format::Auto => FormatMode::Auto,
            Format::Flat => FormatMode::Flat,
            Format::Hierarchical => FormatMode::Hierarchical,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "gl-sampler",
    version,
    about = "Select audit samples from a general-ledger export",
    long_about = "\
Reads a general-ledger export (CSV or Excel, flat or drill-down layout), keeps\n\
accounts whose total absolute balance exceeds the tolerable misstatement and\n\
picks up to --sample-size transactions per account: first every item above the\n\
testing scope, then the largest remaining items."
)]
struct Args {
    /// Ledger export (.csv, .xlsx, .xls, .ods)
    #[arg(long, value_name = "FILE")]
    ledger: PathBuf,

    /// JSON config file; command-line values take precedence
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Materiality threshold: accounts with a total above it are sampled
    #[arg(long, value_name = "AMOUNT")]
    tolerable_misstatement: Option<f64>,

    /// Items above this amount are selected first
    #[arg(long, value_name = "AMOUNT")]
    testing_scope: Option<f64>,

    /// Maximum samples per material account
    #[arg(long, value_name = "N", allow_hyphen_values = true)]
    sample_size: Option<i64>,

    /// Only accounts whose name contains one of these (case-insensitive)
    #[arg(long, num_args = 0.., value_name = "TEXT")]
    keywords: Vec<String>,

    /// Ledger layout; auto detects drill-down exports
    #[arg(long, value_enum, default_value_t = Format::Auto)]
    format: Format,

    /// Output file: .json for the full result, otherwise an Excel workbook
    #[arg(long, value_name = "FILE")]
    output: PathBuf,

    /// Log pipeline progress to stderr
    #[arg(long, default_value_t = false)]
    verbose: bool,
}

struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level().as_str().to_lowercase(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging(verbose: bool) {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(if verbose { LevelFilter::Debug } else { LevelFilter::Warn });
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let file_cfg = match &args.config {
        Some(p) => config::load_config(p).context("failed to load config file")?,
        None => config::ConfigFile::default(),
    };
    let cfg = config::resolve(
        file_cfg,
        args.tolerable_misstatement,
        args.testing_scope,
        args.keywords.clone(),
        args.sample_size,
    )?;

    let grid = journal::load_grid(&args.ledger)
        .with_context(|| format!("failed to read ledger: {}", args.ledger.display()))?;
    let ingested = ingest_grid(&grid, args.format.into());
    if ingested.transactions.is_empty() {
        if !ingested.warnings.is_empty() {
            bail!("no transactions could be read from {}", args.ledger.display());
        }
        warn!("ledger contains no transactions");
    }

    let results = run_sampling(ingested.transactions, &cfg);
    report::write_results(&results, &args.output)
        .with_context(|| format!("failed to write results: {}", args.output.display()))?;

    let s = &results.summary;
    println!(
        "{} samples from {} material accounts, {:.2}% coverage",
        results.samples.len(),
        s.total_material_accounts,
        s.coverage_percentage
    );
    println!("{}", args.output.display());
    Ok(())
}
