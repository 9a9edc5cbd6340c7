//! Result output formatting and writing.

use crate::orchestrator::{Advice, GeneratedData, PipelineResults, TrainingReport};
use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use lib_compress::CompressionOutcome;
use lib_dataset::write_records;
use lib_types::round_to;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const AGGREGATED_FILE: &str = "aggregated_passes.csv";
pub const PROFILES_FILE: &str = "timeseries_passes_profiles.csv";
pub const META_FILE: &str = "timeseries_passes_meta.csv";
pub const FEATURES_FILE: &str = "ts_features.csv";
pub const ENRICHED_FILE: &str = "aggregated_passes_enriched.csv";
pub const POWER_FILE: &str = "sim_power_data_enhanced.csv";
pub const TELEMETRY_FILE: &str = "synthetic_battery_prediction_data.csv";

/// Write typed records as CSV.
pub fn write_csv<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    write_records(BufWriter::new(file), records)?;
    tracing::info!("Wrote {} rows to {:?}", records.len(), path);
    Ok(())
}

/// Write the three raw generator tables.
pub fn write_generated(data: &GeneratedData, output_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(output_dir)?;
    write_csv(&output_dir.join(AGGREGATED_FILE), &data.passes)?;
    write_csv(&output_dir.join(PROFILES_FILE), &data.profile_rows())?;
    write_csv(&output_dir.join(META_FILE), &data.metas())?;
    Ok(())
}

/// Write every pipeline table plus a summary.
pub fn write_pipeline(results: &PipelineResults, output_dir: &Path, name: &str) -> Result<()> {
    write_generated(&results.data, output_dir)?;
    write_csv(&output_dir.join(FEATURES_FILE), &results.features)?;

    let enriched_path = output_dir.join(ENRICHED_FILE);
    results.enriched.table.write_csv(&enriched_path)?;
    tracing::info!("Wrote enriched dataset to {:?}", enriched_path);

    write_summary(results, output_dir, name)
}

fn write_summary(results: &PipelineResults, output_dir: &Path, name: &str) -> Result<()> {
    let summary_path = output_dir.join("summary.txt");
    let mut f = File::create(&summary_path)?;

    let passes = &results.data.passes;
    let send_all = passes.iter().filter(|p| p.sends_all()).count();
    let mean_ratio = if passes.is_empty() {
        0.0
    } else {
        passes.iter().map(|p| p.recommended_compression_ratio).sum::<f64>() / passes.len() as f64
    };

    writeln!(f, "Downlink Dataset Summary: {}", name)?;
    writeln!(f, "==========================")?;
    writeln!(f)?;
    writeln!(f, "Aggregated passes:   {}", passes.len())?;
    writeln!(f, "  Can send all:      {} ({:.1}%)", send_all, pct(send_all, passes.len()))?;
    writeln!(f, "  Mean ratio label:  {:.4}", mean_ratio)?;
    writeln!(f, "Time-series passes:  {}", results.data.profiles.len())?;
    writeln!(f, "Feature vectors:     {}", results.features.len())?;
    writeln!(f, "Enriched rows:       {}", results.enriched.table.len())?;
    writeln!(f, "  Matched:           {}", results.enriched.matched)?;
    writeln!(f, "  Imputed:           {}", results.enriched.imputed)?;

    tracing::info!("Wrote summary to {:?}", summary_path);
    Ok(())
}

fn pct(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        100.0 * part as f64 / whole as f64
    }
}

/// Save each artifact into `model_dir`.
pub fn save_models(report: &TrainingReport, model_dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(model_dir)?;
    report
        .artifacts
        .iter()
        .map(|artifact| {
            let path = lib_boost::ModelArtifact::path_in(model_dir, &artifact.target);
            artifact.save(&path)?;
            Ok(path)
        })
        .collect()
}

/// Print training scores to stdout.
pub fn print_training_report(report: &TrainingReport) {
    println!("\n=== Training Results ===\n");
    println!("Train rows: {}  Test rows: {}", report.train_rows, report.test_rows);
    for metrics in &report.metrics {
        println!("\n{}", metrics);
    }
    println!();
}

pub fn print_advice(advice: &Advice) {
    println!("Closest pass: {}", advice.pass_start.to_rfc3339_opts(SecondsFormat::Secs, true));
    println!("{}", advice.recommendation);
}

/// Print the size report for one compressed file.
pub fn print_outcome(outcome: &CompressionOutcome) {
    println!("File:            {}", outcome.input.display());
    println!("Data type:       {}", outcome.data_type);
    println!("Protocol:        {}", outcome.protocol);
    println!("Settings:        {}", outcome.settings);
    println!("Original size:   {:.2} MB", outcome.original_mb());
    println!("Compressed size: {:.2} MB", outcome.compressed_mb());
    println!("Saved:           {:.2} MB", outcome.saved_mb());
    println!("Ready for transmission: {}", outcome.output.display());
}

/// One row of the compression test log.
#[derive(Debug, Serialize)]
struct CompressionLogRow {
    filename: String,
    data_type: String,
    #[serde(rename = "original_size_MB")]
    original_size_mb: f64,
    #[serde(rename = "compressed_size_MB")]
    compressed_size_mb: f64,
    #[serde(rename = "saved_MB")]
    saved_mb: f64,
    compression_ratio: f64,
    output_file: String,
    timestamp: String,
}

impl From<&CompressionOutcome> for CompressionLogRow {
    fn from(outcome: &CompressionOutcome) -> Self {
        Self {
            filename: outcome
                .input
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            data_type: outcome.data_type.to_string(),
            original_size_mb: round_to(outcome.original_mb(), 3),
            compressed_size_mb: round_to(outcome.compressed_mb(), 3),
            saved_mb: round_to(outcome.saved_mb(), 3),
            compression_ratio: round_to(outcome.ratio(), 3),
            output_file: outcome.output.display().to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }
}

/// Append one outcome to the log, writing the header only for a new file.
pub fn append_compression_log(log_path: &Path, outcome: &CompressionOutcome) -> Result<()> {
    let is_new = !log_path.exists();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("Failed to open log {:?}", log_path))?;

    let mut writer = csv::WriterBuilder::new().has_headers(is_new).from_writer(file);
    writer.serialize(CompressionLogRow::from(outcome))?;
    writer.flush()?;

    tracing::info!("Results saved to {:?}", log_path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::orchestrator::Orchestrator;
    use chrono::TimeZone;
    use lib_compress::{DataType, Protocol, Settings};
    use tempfile::tempdir;

    fn outcome(dir: &Path) -> CompressionOutcome {
        CompressionOutcome {
            input: dir.join("telemetry.csv"),
            output: dir.join("telemetry.csv.lz4"),
            data_type: DataType::Telemetry,
            protocol: Protocol::Lz4,
            settings: Settings::Lz4 { level: 2 },
            original_bytes: 2 * 1024 * 1024,
            compressed_bytes: 512 * 1024,
        }
    }

    #[test]
    fn test_compression_log_header_once() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("compressed_files.csv");
        append_compression_log(&log, &outcome(dir.path())).unwrap();
        append_compression_log(&log, &outcome(dir.path())).unwrap();

        let content = std::fs::read_to_string(&log).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "filename,data_type,original_size_MB,compressed_size_MB,saved_MB,compression_ratio,output_file,timestamp"
        );
        assert!(lines[1].starts_with("telemetry.csv,telemetry,2.0,0.5,1.5,0.25,"));
        assert!(lines[2].ends_with('Z'));
    }

    #[test]
    fn test_write_pipeline_files() {
        let dir = tempdir().unwrap();
        let mut config = PipelineConfig::default();
        config.generation.aggregated_rows = 20;
        config.generation.timeseries_passes = 3;
        config.generation.epoch = Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        let results = Orchestrator::new(config).unwrap().run().unwrap();

        write_pipeline(&results, dir.path(), "test").unwrap();
        for file in [AGGREGATED_FILE, PROFILES_FILE, META_FILE, FEATURES_FILE, ENRICHED_FILE, "summary.txt"] {
            assert!(dir.path().join(file).exists(), "{} missing", file);
        }

        let aggregated = std::fs::read_to_string(dir.path().join(AGGREGATED_FILE)).unwrap();
        assert!(aggregated.starts_with("pass_id,pass_start_utc,pass_end_utc,pass_duration_s,"));
        assert!(aggregated.lines().next().unwrap().ends_with("predicted_mean_snr_db"));
        assert_eq!(aggregated.lines().count(), 21);

        let features = std::fs::read_to_string(dir.path().join(FEATURES_FILE)).unwrap();
        assert!(features.starts_with("pass_id,snr_mean,snr_min,snr_max,snr_std,"));

        let profiles = std::fs::read_to_string(dir.path().join(PROFILES_FILE)).unwrap();
        assert!(profiles.starts_with("pass_id,t_s,snr_db,range_km,elev_deg"));
    }
}
