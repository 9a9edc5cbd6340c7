//! Pipeline orchestration.

use crate::config::{validate_config, PipelineConfig};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use lib_boost::{
    DownlinkAdvisor, GradientBoostedRegressor, ModelArtifact, Recommendation, RegressionMetrics,
};
use lib_compress::{CompressionOutcome, Compressor, DataType, Protocol, Settings};
use lib_dataset::features::extract_profiles;
use lib_dataset::schema::{CAN_SEND_ALL, COMPRESSION_RATIO, PASS_ID};
use lib_dataset::{left_join_impute, DesignMatrix, MergeOutcome, Schema, Table};
use lib_link::{
    simulate_power, simulate_telemetry, stream_rng, GeneratedProfile, PassRowGenerator,
    PowerSimConfig, ProfileGenerator, TelemetryConfig,
};
use lib_types::power::{PowerRecord, TelemetryRecord};
use lib_types::profile::{FeatureVector, ProfileRow};
use lib_types::{PassRow, TimeSeriesMeta};
use std::path::{Path, PathBuf};

/// Seed offsets so each generator draws from its own sequence.
const PROFILE_SEED_OFFSET: u64 = 1;
const POWER_STREAM: u64 = 0x504f_5752;
const TELEMETRY_STREAM: u64 = 0x5445_4c4d;

/// Raw generator output.
pub struct GeneratedData {
    pub passes: Vec<PassRow>,
    pub profiles: Vec<GeneratedProfile>,
}

impl GeneratedData {
    /// Long-format samples of every profile.
    pub fn profile_rows(&self) -> Vec<ProfileRow> {
        self.profiles.iter().flat_map(|p| p.profile.to_rows()).collect()
    }

    pub fn metas(&self) -> Vec<TimeSeriesMeta> {
        self.profiles.iter().map(|p| p.meta.clone()).collect()
    }
}

/// Everything produced by a full dataset run.
pub struct PipelineResults {
    pub data: GeneratedData,
    pub features: Vec<FeatureVector>,
    pub enriched: MergeOutcome,
}

/// Fitted models and their scores.
pub struct TrainingReport {
    pub train_rows: usize,
    pub test_rows: usize,
    pub artifacts: Vec<ModelArtifact>,
    pub metrics: Vec<RegressionMetrics>,
}

/// Recommendation for the pass nearest a requested time.
pub struct Advice {
    pub pass_start: DateTime<Utc>,
    pub recommendation: Recommendation,
}

/// Pipeline orchestrator.
pub struct Orchestrator {
    config: PipelineConfig,
}

impl Orchestrator {
    /// Create a new orchestrator.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        validate_config(&config)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Generate the aggregated passes and the time-series passes.
    pub fn generate(&self) -> Result<GeneratedData> {
        let gen = &self.config.generation;
        tracing::info!(
            "Generating {} aggregated passes and {} time-series passes (seed {})",
            gen.aggregated_rows,
            gen.timeseries_passes,
            self.config.seed
        );

        let passes = PassRowGenerator::new(gen.system_temp_k, gen.epoch())?
            .generate_batch(gen.aggregated_rows, self.config.seed);
        let profiles = ProfileGenerator::new(gen.system_temp_k, gen.sampling_interval_s)?
            .generate_batch(gen.timeseries_passes, self.config.seed.wrapping_add(PROFILE_SEED_OFFSET));

        Ok(GeneratedData { passes, profiles })
    }

    /// Left-join features onto the aggregated table by pass id.
    pub fn enrich(&self, aggregated: &Table, features: &Table) -> Result<MergeOutcome> {
        let outcome = left_join_impute(aggregated, features, PASS_ID)
            .context("Failed to merge time-series features")?;
        tracing::info!(
            "Merged features: {} matched, {} imputed",
            outcome.matched,
            outcome.imputed
        );
        Ok(outcome)
    }

    /// Generate, extract features and merge.
    pub fn run(&self) -> Result<PipelineResults> {
        tracing::info!("Starting pipeline: {}", self.config.name);

        let data = self.generate()?;
        let profiles: Vec<_> = data.profiles.iter().map(|p| p.profile.clone()).collect();
        let features = extract_profiles(&profiles).context("Feature extraction failed")?;

        let aggregated = Table::from_records(&data.passes)?;
        let feature_table = Table::from_records(&features)?;
        let enriched = self.enrich(&aggregated, &feature_table)?;

        tracing::info!("Pipeline complete");
        Ok(PipelineResults {
            data,
            features,
            enriched,
        })
    }

    /// Fit one model per target on a temporal split of the enriched table.
    pub fn train(&self, table: &Table) -> Result<TrainingReport> {
        let matrix = DesignMatrix::from_table(table, &Schema::enriched_passes())
            .context("Enriched table does not match its schema")?;
        if matrix.n_rows() < 2 {
            anyhow::bail!("Need at least two labelled passes to train, got {}", matrix.n_rows());
        }
        let (train, test) = matrix.temporal_split(self.config.training.train_fraction)?;
        if train.n_rows() == 0 || test.n_rows() == 0 {
            anyhow::bail!(
                "Temporal split left an empty side ({} train, {} test)",
                train.n_rows(),
                test.n_rows()
            );
        }

        let params = &self.config.training.model;
        let mut artifacts = Vec::new();
        let mut metrics = Vec::new();

        for target in [CAN_SEND_ALL, COMPRESSION_RATIO] {
            tracing::info!("Training model for {}", target);
            let y_train = train.target(target)?;
            let y_test = test.target(target)?;

            let model = GradientBoostedRegressor::fit(train.features.view(), y_train.view(), params)?;
            let train_pred = model.predict(train.features.view())?;
            let test_pred = model.predict(test.features.view())?;

            metrics.push(RegressionMetrics::evaluate(
                target,
                (y_train.view(), train_pred.view()),
                (y_test.view(), test_pred.view()),
            ));
            artifacts.push(ModelArtifact::new(target, matrix.feature_names.clone(), model)?);
        }

        Ok(TrainingReport {
            train_rows: train.n_rows(),
            test_rows: test.n_rows(),
            artifacts,
            metrics,
        })
    }

    /// Load both models from `model_dir`.
    pub fn load_advisor(&self, model_dir: &Path) -> Result<DownlinkAdvisor> {
        let load = |target: &str| -> Result<ModelArtifact> {
            let path = ModelArtifact::path_in(model_dir, target);
            ModelArtifact::load(&path).with_context(|| format!("Failed to load model {:?}", path))
        };
        Ok(DownlinkAdvisor::new(load(CAN_SEND_ALL)?, load(COMPRESSION_RATIO)?))
    }

    /// Recommend for the pass whose start is closest to `when`.
    pub fn advise(&self, table: &Table, advisor: &DownlinkAdvisor, when: DateTime<Utc>) -> Result<Advice> {
        let matrix = DesignMatrix::from_table(table, &Schema::enriched_passes())?;
        let row = matrix
            .closest_row(when)
            .context("Dataset has no passes to choose from")?;
        let pass_start = matrix.start_times[row];
        tracing::info!("Closest pass starts at {}", pass_start);

        let recommendation = advisor.recommend(&matrix.row_map(row))?;
        Ok(Advice {
            pass_start,
            recommendation,
        })
    }

    /// Apply a recommendation to one file.
    pub fn send_file(&self, file: &Path, recommendation: &Recommendation) -> Result<CompressionOutcome> {
        let compressor = Compressor::new(self.config.video.clone());
        let outcome = match recommendation.compression_ratio {
            Some(ratio) => compressor.compress_for_ratio(file, ratio)?,
            None => compressor.compress(file, Settings::None)?,
        };
        Ok(outcome)
    }

    /// Compress one file with the fixed benchmark settings.
    ///
    /// Returns `None` for types the benchmark does not cover.
    pub fn benchmark_file(&self, file: &Path) -> Result<Option<CompressionOutcome>> {
        let protocol = Protocol::for_data_type(DataType::detect(file));
        let settings = Settings::benchmark(protocol);
        if settings.is_none() {
            tracing::warn!("Unsupported type for {:?}; no compression", file);
            return Ok(None);
        }
        let outcome = Compressor::new(self.config.video.clone()).compress(file, settings)?;
        Ok(Some(outcome))
    }

    pub fn simulate_power(&self, samples: Option<usize>) -> Result<Vec<PowerRecord>> {
        let mut config = PowerSimConfig::default();
        if let Some(n) = samples {
            config.samples = n;
        }
        let mut rng = stream_rng(self.config.seed, POWER_STREAM);
        Ok(simulate_power(&config, &mut rng)?)
    }

    pub fn simulate_telemetry(&self, samples: Option<usize>) -> Result<Vec<TelemetryRecord>> {
        let mut config = TelemetryConfig::default();
        if let Some(n) = samples {
            config.samples = n;
        }
        let mut rng = stream_rng(self.config.seed, TELEMETRY_STREAM);
        Ok(simulate_telemetry(&config, &mut rng)?)
    }

    pub fn dataset_path(&self, file: &str) -> PathBuf {
        self.config.output.dir.join(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use lib_dataset::Cell;

    fn small_config() -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.generation.aggregated_rows = 60;
        config.generation.timeseries_passes = 8;
        config.generation.epoch = Some(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap());
        config.training.model.n_estimators = 10;
        config
    }

    #[test]
    fn test_run_enriches_every_row() {
        let orchestrator = Orchestrator::new(small_config()).unwrap();
        let results = orchestrator.run().unwrap();

        assert_eq!(results.data.passes.len(), 60);
        assert_eq!(results.features.len(), 8);
        let table = &results.enriched.table;
        assert_eq!(table.len(), 60);
        assert_eq!(table.columns().len(), 47);
        // Aggregated and time-series ids never overlap.
        assert_eq!(results.enriched.matched, 0);
        assert!(Schema::enriched_passes().validate(table).is_ok());
    }

    #[test]
    fn test_run_is_reproducible() {
        let a = Orchestrator::new(small_config()).unwrap().generate().unwrap();
        let b = Orchestrator::new(small_config()).unwrap().generate().unwrap();
        assert_eq!(a.passes, b.passes);
        assert_eq!(a.metas(), b.metas());
    }

    #[test]
    fn test_train_and_advise() {
        let orchestrator = Orchestrator::new(small_config()).unwrap();
        let results = orchestrator.run().unwrap();
        let report = orchestrator.train(&results.enriched.table).unwrap();

        assert_eq!(report.train_rows, 48);
        assert_eq!(report.test_rows, 12);
        assert_eq!(report.artifacts.len(), 2);
        assert_eq!(report.artifacts[0].target, CAN_SEND_ALL);
        assert!(report.artifacts[0].feature_names.contains(&"pass_start_ts".to_string()));

        let mut artifacts = report.artifacts.into_iter();
        let advisor = DownlinkAdvisor::new(artifacts.next().unwrap(), artifacts.next().unwrap());
        let when = Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap();
        let advice = orchestrator.advise(&results.enriched.table, &advisor, when).unwrap();
        if let Some(ratio) = advice.recommendation.compression_ratio {
            assert!((0.05..=1.0).contains(&ratio));
        }
    }

    #[test]
    fn test_train_rejects_unlabelled_table() {
        let orchestrator = Orchestrator::new(small_config()).unwrap();
        let mut table = orchestrator.run().unwrap().enriched.table;
        let col = table.column_index(CAN_SEND_ALL).unwrap();
        let n = table.len();
        let mut blank = Table::new(table.columns().to_vec());
        for r in 0..n {
            let mut row = table.rows()[r].clone();
            row[col] = Cell::Missing;
            blank.push_row(row).unwrap();
        }
        table = blank;
        assert!(orchestrator.train(&table).is_err());
    }

    #[test]
    fn test_simulations_use_seed() {
        let orchestrator = Orchestrator::new(small_config()).unwrap();
        let power = orchestrator.simulate_power(Some(20)).unwrap();
        assert_eq!(power.len(), 20);
        assert_eq!(power, orchestrator.simulate_power(Some(20)).unwrap());
        assert_eq!(orchestrator.simulate_telemetry(Some(10)).unwrap().len(), 9);
    }
}
