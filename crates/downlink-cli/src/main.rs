//! downlink: CubeSat ground-contact dataset generation, model training and
//! payload compression.
//!
//! This is the main entry point for the downlink planning tool.

mod config;
mod orchestrator;
mod output;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use lib_dataset::features::extract_all;
use lib_dataset::schema::PASS_ID;
use lib_dataset::{describe, parse_utc, read_records, Table};
use lib_types::profile::ProfileRow;
use orchestrator::Orchestrator;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "downlink")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Pipeline configuration file (TOML or JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured seed
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate aggregated and time-series pass tables
    Generate {
        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of aggregated passes
        #[arg(long)]
        rows: Option<usize>,

        /// Number of time-series passes
        #[arg(long)]
        passes: Option<usize>,
    },

    /// Extract per-pass SNR features from a profiles CSV
    ExtractFeatures {
        /// Long-format profiles CSV
        input: PathBuf,

        /// Features CSV to write
        #[arg(short, long, default_value = output::FEATURES_FILE)]
        output: PathBuf,
    },

    /// Left-join features onto the aggregated table with mean imputation
    Merge {
        /// Aggregated passes CSV
        aggregated: PathBuf,

        /// Features CSV
        features: PathBuf,

        /// Enriched CSV to write
        #[arg(short, long, default_value = output::ENRICHED_FILE)]
        output: PathBuf,
    },

    /// Generate, extract features and merge in one run
    Pipeline {
        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Train the send-all and compression-ratio models
    Train {
        /// Enriched dataset CSV
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Model directory
        #[arg(short, long)]
        models: Option<PathBuf>,
    },

    /// Recommend a downlink plan for the pass closest to a time
    Predict {
        /// UTC time of the communication window (prompted if omitted)
        #[arg(long)]
        date: Option<String>,

        /// Enriched dataset CSV
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Model directory
        #[arg(short, long)]
        models: Option<PathBuf>,
    },

    /// Compress files as recommended for the pass closest to a time
    Send {
        /// Files to send (prompted if omitted)
        files: Vec<PathBuf>,

        /// UTC time of the communication window (prompted if omitted)
        #[arg(long)]
        date: Option<String>,

        /// Enriched dataset CSV
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Model directory
        #[arg(short, long)]
        models: Option<PathBuf>,
    },

    /// Compress files with fixed settings and log the results
    CompressTest {
        /// Files to compress
        files: Vec<PathBuf>,

        /// Write sample payload files into this directory first
        #[arg(long)]
        make_samples: Option<PathBuf>,

        /// Compression log CSV
        #[arg(long)]
        log: Option<PathBuf>,
    },

    /// Simulate the power subsystem and battery state of charge
    Power {
        /// Output CSV
        #[arg(short, long, default_value = output::POWER_FILE)]
        output: PathBuf,

        /// Number of samples
        #[arg(long)]
        samples: Option<usize>,
    },

    /// Simulate a battery telemetry random walk
    Telemetry {
        /// Output CSV
        #[arg(short, long, default_value = output::TELEMETRY_FILE)]
        output: PathBuf,

        /// Number of steps
        #[arg(long)]
        samples: Option<usize>,
    },

    /// Print descriptive statistics for a numeric CSV column
    Describe {
        /// CSV file
        file: PathBuf,

        /// Column name
        column: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let mut config = config::load_or_default(cli.config.as_deref())?;
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }

    match cli.command {
        Commands::Generate { output, rows, passes } => {
            if let Some(dir) = output {
                config.output.dir = dir;
            }
            if let Some(n) = rows {
                config.generation.aggregated_rows = n;
            }
            if let Some(n) = passes {
                config.generation.timeseries_passes = n;
            }
            let orchestrator = Orchestrator::new(config)?;
            let data = orchestrator.generate()?;
            output::write_generated(&data, &orchestrator.config().output.dir)?;
            println!(
                "Generated {} aggregated passes and {} time-series passes in {:?}",
                data.passes.len(),
                data.profiles.len(),
                orchestrator.config().output.dir
            );
        }
        Commands::ExtractFeatures { input, output } => {
            extract_features(&input, &output)?;
        }
        Commands::Merge { aggregated, features, output } => {
            merge(Orchestrator::new(config)?, &aggregated, &features, &output)?;
        }
        Commands::Pipeline { output } => {
            if let Some(dir) = output {
                config.output.dir = dir;
            }
            let orchestrator = Orchestrator::new(config)?;
            let results = orchestrator.run()?;
            let cfg = orchestrator.config();
            output::write_pipeline(&results, &cfg.output.dir, &cfg.name)?;
            println!("Dataset written to {:?}", cfg.output.dir);
        }
        Commands::Train { data, models } => {
            let orchestrator = Orchestrator::new(config)?;
            let data = data.unwrap_or_else(|| orchestrator.dataset_path(output::ENRICHED_FILE));
            let models = models.unwrap_or_else(|| orchestrator.config().output.model_dir.clone());
            train(&orchestrator, &data, &models)?;
        }
        Commands::Predict { date, data, models } => {
            let orchestrator = Orchestrator::new(config)?;
            let when = resolve_date(date)?;
            let advice = advise(&orchestrator, data, models, when)?;
            output::print_advice(&advice);
        }
        Commands::Send { files, date, data, models } => {
            let orchestrator = Orchestrator::new(config)?;
            let files = if files.is_empty() {
                vec![PathBuf::from(prompt("Enter file path to send")?)]
            } else {
                files
            };
            let when = resolve_date(date)?;
            let advice = advise(&orchestrator, data, models, when)?;
            output::print_advice(&advice);
            send(&orchestrator, &files, &advice.recommendation)?;
        }
        Commands::CompressTest { files, make_samples, log } => {
            let orchestrator = Orchestrator::new(config)?;
            let log = log.unwrap_or_else(|| orchestrator.config().output.compression_log.clone());
            compress_test(&orchestrator, files, make_samples, &log)?;
        }
        Commands::Power { output, samples } => {
            let records = Orchestrator::new(config)?.simulate_power(samples)?;
            output::write_csv(&output, &records)?;
            println!("Wrote {} power samples to {:?}", records.len(), output);
        }
        Commands::Telemetry { output, samples } => {
            let records = Orchestrator::new(config)?.simulate_telemetry(samples)?;
            output::write_csv(&output, &records)?;
            println!("Wrote {} telemetry rows to {:?}", records.len(), output);
        }
        Commands::Describe { file, column } => {
            describe_column(&file, &column)?;
        }
    }

    Ok(())
}

fn extract_features(input: &Path, output_path: &Path) -> Result<()> {
    tracing::info!("Reading profiles from {:?}", input);
    let rows: Vec<ProfileRow> = read_records(input)
        .with_context(|| format!("Failed to read profiles {:?}", input))?;
    let features = extract_all(&rows)?;
    output::write_csv(output_path, &features)?;
    println!("Extracted features for {} passes into {:?}", features.len(), output_path);
    Ok(())
}

fn merge(orchestrator: Orchestrator, aggregated: &Path, features: &Path, output_path: &Path) -> Result<()> {
    let left = Table::read_csv_with_text(aggregated, &[PASS_ID])
        .with_context(|| format!("Failed to read {:?}", aggregated))?;
    let right = Table::read_csv_with_text(features, &[PASS_ID])
        .with_context(|| format!("Failed to read {:?}", features))?;
    let outcome = orchestrator.enrich(&left, &right)?;
    outcome.table.write_csv(output_path)?;
    println!(
        "Enriched {} rows ({} matched, {} imputed) into {:?}",
        outcome.table.len(),
        outcome.matched,
        outcome.imputed,
        output_path
    );
    Ok(())
}

fn train(orchestrator: &Orchestrator, data: &Path, models: &Path) -> Result<()> {
    tracing::info!("Loading training data from {:?}", data);
    let table = Table::read_csv(data).with_context(|| format!("Failed to read {:?}", data))?;
    let report = orchestrator.train(&table)?;
    output::print_training_report(&report);
    for path in output::save_models(&report, models)? {
        println!("Saved model: {:?}", path);
    }
    Ok(())
}

fn advise(
    orchestrator: &Orchestrator,
    data: Option<PathBuf>,
    models: Option<PathBuf>,
    when: DateTime<Utc>,
) -> Result<orchestrator::Advice> {
    let data = data.unwrap_or_else(|| orchestrator.dataset_path(output::ENRICHED_FILE));
    let models = models.unwrap_or_else(|| orchestrator.config().output.model_dir.clone());

    let advisor = orchestrator.load_advisor(&models)?;
    let table = Table::read_csv(&data).with_context(|| format!("Failed to read {:?}", data))?;
    orchestrator.advise(&table, &advisor, when)
}

fn send(orchestrator: &Orchestrator, files: &[PathBuf], recommendation: &lib_boost::Recommendation) -> Result<()> {
    let mut failures = 0;
    for file in files {
        println!();
        match orchestrator.send_file(file, recommendation) {
            Ok(outcome) => output::print_outcome(&outcome),
            Err(e) => {
                failures += 1;
                tracing::error!("Failed to process {:?}: {:#}", file, e);
                println!("Failed: {} ({:#})", file.display(), e);
            }
        }
    }
    if failures == files.len() {
        anyhow::bail!("No file could be prepared for transmission");
    }
    Ok(())
}

fn compress_test(
    orchestrator: &Orchestrator,
    mut files: Vec<PathBuf>,
    make_samples: Option<PathBuf>,
    log: &Path,
) -> Result<()> {
    if let Some(dir) = make_samples {
        let samples = lib_compress::write_sample_files(&dir)?;
        println!("Sample files written to {:?}", dir);
        files.extend(samples);
    }
    if files.is_empty() {
        files.push(PathBuf::from(prompt("Enter file path")?));
    }

    for file in &files {
        println!();
        match orchestrator.benchmark_file(file) {
            Ok(Some(outcome)) => {
                output::print_outcome(&outcome);
                output::append_compression_log(log, &outcome)?;
            }
            Ok(None) => println!("Unsupported type for {}; no compression.", file.display()),
            Err(e) => {
                tracing::error!("Failed to compress {:?}: {:#}", file, e);
                println!("Failed: {} ({:#})", file.display(), e);
            }
        }
    }
    Ok(())
}

fn describe_column(file: &Path, column: &str) -> Result<()> {
    let table = Table::read_csv(file).with_context(|| format!("Failed to read {:?}", file))?;
    let index = table.require_column(&file.display().to_string(), column)?;
    let values: Vec<f64> = table.numeric_column(index).into_iter().flatten().collect();
    let summary = describe(&values)?;
    println!("Column: {} ({} values)", column, summary.count);
    println!("{}", summary);
    Ok(())
}

fn resolve_date(date: Option<String>) -> Result<DateTime<Utc>> {
    let raw = match date {
        Some(d) => d,
        None => prompt("Enter UTC date for communication window")?,
    };
    parse_utc(raw.trim()).with_context(|| format!("Unrecognised UTC timestamp '{}'", raw.trim()))
}

fn prompt(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let value = line.trim().to_string();
    if value.is_empty() {
        anyhow::bail!("No input given for '{}'", label);
    }
    Ok(value)
}
