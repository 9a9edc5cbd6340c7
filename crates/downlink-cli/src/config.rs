//! Pipeline configuration loading and validation.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use lib_boost::BoostParams;
use lib_compress::VideoEncoder;
use lib_link::budget::DEFAULT_SYSTEM_TEMP_K;
use lib_link::profile_gen::DEFAULT_SAMPLING_INTERVAL_S;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level pipeline configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Run name, echoed in the summary.
    #[serde(default = "default_name")]
    pub name: String,

    /// Master seed for every generator.
    #[serde(default = "default_seed")]
    pub seed: u64,

    #[serde(default)]
    pub generation: GenerationParams,

    #[serde(default)]
    pub training: TrainingParams,

    #[serde(default)]
    pub output: OutputConfig,

    /// External H.264 encoder for video payloads.
    #[serde(default)]
    pub video: VideoEncoder,
}

fn default_name() -> String { "cubesat-downlink".into() }
fn default_seed() -> u64 { 42 }

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            seed: default_seed(),
            generation: GenerationParams::default(),
            training: TrainingParams::default(),
            output: OutputConfig::default(),
            video: VideoEncoder::default(),
        }
    }
}

/// Dataset generation parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Rows in the aggregated pass table.
    #[serde(default = "default_aggregated_rows")]
    pub aggregated_rows: usize,

    /// Passes with a time-series profile.
    #[serde(default = "default_timeseries_passes")]
    pub timeseries_passes: usize,

    /// Profile sampling interval (seconds).
    #[serde(default = "default_sampling_interval")]
    pub sampling_interval_s: u32,

    /// Receiver system noise temperature (K).
    #[serde(default = "default_system_temp")]
    pub system_temp_k: f64,

    /// Reference time pass starts are drawn back from. Defaults to now.
    #[serde(default)]
    pub epoch: Option<DateTime<Utc>>,
}

fn default_aggregated_rows() -> usize { 50_000 }
fn default_timeseries_passes() -> usize { 5_000 }
fn default_sampling_interval() -> u32 { DEFAULT_SAMPLING_INTERVAL_S }
fn default_system_temp() -> f64 { DEFAULT_SYSTEM_TEMP_K }

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            aggregated_rows: default_aggregated_rows(),
            timeseries_passes: default_timeseries_passes(),
            sampling_interval_s: default_sampling_interval(),
            system_temp_k: default_system_temp(),
            epoch: None,
        }
    }
}

impl GenerationParams {
    pub fn epoch(&self) -> DateTime<Utc> {
        self.epoch.unwrap_or_else(Utc::now)
    }
}

/// Model training parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrainingParams {
    /// Fraction of the time-sorted rows used for training.
    #[serde(default = "default_train_fraction")]
    pub train_fraction: f64,

    #[serde(default)]
    pub model: BoostParams,
}

fn default_train_fraction() -> f64 { 0.8 }

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            train_fraction: default_train_fraction(),
            model: BoostParams::default(),
        }
    }
}

/// Output locations.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Dataset directory.
    #[serde(default = "default_dataset_dir")]
    pub dir: PathBuf,

    /// Model artifact directory.
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,

    /// Compression test log.
    #[serde(default = "default_compression_log")]
    pub compression_log: PathBuf,
}

fn default_dataset_dir() -> PathBuf { PathBuf::from("generated_dataset") }
fn default_model_dir() -> PathBuf { PathBuf::from("models") }
fn default_compression_log() -> PathBuf { PathBuf::from("compressed_files.csv") }

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_dataset_dir(),
            model_dir: default_model_dir(),
            compression_log: default_compression_log(),
        }
    }
}

/// Load configuration from a file.
pub fn load_config(path: &Path) -> Result<PipelineConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: PipelineConfig = if path.extension().map_or(false, |e| e == "json") {
        serde_json::from_str(&content).with_context(|| "Failed to parse config as JSON")?
    } else {
        toml::from_str(&content).with_context(|| "Failed to parse config as TOML")?
    };

    validate_config(&config)?;

    Ok(config)
}

/// Load `path` if given, otherwise the defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(p) => load_config(p),
        None => Ok(PipelineConfig::default()),
    }
}

/// Validate configuration.
pub fn validate_config(config: &PipelineConfig) -> Result<()> {
    let gen = &config.generation;
    if gen.aggregated_rows == 0 {
        anyhow::bail!("generation.aggregated_rows must be at least 1");
    }
    if gen.timeseries_passes == 0 {
        anyhow::bail!("generation.timeseries_passes must be at least 1");
    }
    if gen.sampling_interval_s == 0 {
        anyhow::bail!("generation.sampling_interval_s must be non-zero");
    }
    if !gen.system_temp_k.is_finite() || gen.system_temp_k <= 0.0 {
        anyhow::bail!(
            "generation.system_temp_k must be a positive temperature (got {})",
            gen.system_temp_k
        );
    }

    let fraction = config.training.train_fraction;
    if !(fraction > 0.0 && fraction < 1.0) {
        anyhow::bail!("training.train_fraction must be in (0, 1) (got {})", fraction);
    }
    config
        .training
        .model
        .validate()
        .context("Invalid training.model parameters")?;

    if config.video.program.trim().is_empty() {
        anyhow::bail!("video.program must name an encoder executable");
    }

    Ok(())
}
