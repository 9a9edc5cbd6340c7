//! File-level dispatch: classify, pick settings, run the codec, measure.

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::classify::{DataType, Protocol};
use crate::engine::{compress_jpeg, compress_lz4, compress_zstd, VideoEncoder};
use crate::error::{CompressError, CompressResult};
use crate::settings::Settings;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

pub fn megabytes(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB
}

/// Result of compressing one file.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CompressionOutcome {
    pub input: PathBuf,
    pub output: PathBuf,
    pub data_type: DataType,
    pub protocol: Protocol,
    pub settings: Settings,
    pub original_bytes: u64,
    pub compressed_bytes: u64,
}

impl CompressionOutcome {
    pub fn original_mb(&self) -> f64 {
        megabytes(self.original_bytes)
    }

    pub fn compressed_mb(&self) -> f64 {
        megabytes(self.compressed_bytes)
    }

    /// Negative when the codec grew the file.
    pub fn saved_mb(&self) -> f64 {
        self.original_mb() - self.compressed_mb()
    }

    /// Compressed over original size; 1.0 for an empty input.
    pub fn ratio(&self) -> f64 {
        if self.original_bytes == 0 {
            1.0
        } else {
            self.compressed_bytes as f64 / self.original_bytes as f64
        }
    }

    /// No compressed copy was produced.
    pub fn is_passthrough(&self) -> bool {
        self.settings.is_none()
    }
}

#[derive(Clone, Debug, Default)]
pub struct Compressor {
    video: VideoEncoder,
}

impl Compressor {
    pub fn new(video: VideoEncoder) -> Self {
        Self { video }
    }

    /// Compress `input` toward a target ratio in (0, 1].
    pub fn compress_for_ratio(&self, input: &Path, ratio: f64) -> CompressResult<CompressionOutcome> {
        let protocol = Protocol::for_data_type(DataType::detect(input));
        let settings = Settings::for_ratio(protocol, ratio)?;
        self.compress(input, settings)
    }

    /// Compress `input` with fixed settings.
    pub fn compress(&self, input: &Path, settings: Settings) -> CompressResult<CompressionOutcome> {
        if !input.is_file() {
            return Err(CompressError::NotFound(input.to_path_buf()));
        }
        let data_type = DataType::detect(input);
        let protocol = Protocol::for_data_type(data_type);
        let output = settings.output_path(input);

        match settings {
            Settings::Jpeg { quality } => compress_jpeg(input, &output, quality)?,
            Settings::H264 { bitrate_kbps } => self.video.compress(input, &output, bitrate_kbps)?,
            Settings::Lz4 { level } => compress_lz4(input, &output, level)?,
            Settings::Zstd { level } => compress_zstd(input, &output, level)?,
            Settings::None => warn!(input = %input.display(), "No compression applied"),
        }

        let original_bytes = file_len(input)?;
        let compressed_bytes = file_len(&output)?;
        info!(
            input = %input.display(),
            output = %output.display(),
            %data_type,
            %settings,
            original_bytes,
            compressed_bytes,
            "Compressed file"
        );

        Ok(CompressionOutcome {
            input: input.to_path_buf(),
            output,
            data_type,
            protocol,
            settings,
            original_bytes,
            compressed_bytes,
        })
    }
}

fn file_len(path: &Path) -> CompressResult<u64> {
    std::fs::metadata(path)
        .map(|m| m.len())
        .map_err(|e| CompressError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_ratio_drives_settings() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("science_data.bin");
        std::fs::write(&input, [0u8, 1, 2, 3].repeat(50_000)).unwrap();

        let outcome = Compressor::default().compress_for_ratio(&input, 0.3).unwrap();
        assert_eq!(outcome.data_type, DataType::Science);
        assert_eq!(outcome.settings, Settings::Zstd { level: 10 });
        assert_eq!(outcome.output, dir.path().join("science_data.bin.zst"));
        assert!(outcome.ratio() < 0.05);
        assert!(outcome.saved_mb() > 0.0);
    }

    #[test]
    fn test_unknown_type_passes_through() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("blob.xyz");
        std::fs::write(&input, b"abc").unwrap();

        let outcome = Compressor::default().compress_for_ratio(&input, 0.5).unwrap();
        assert!(outcome.is_passthrough());
        assert_eq!(outcome.output, input);
        assert_eq!(outcome.ratio(), 1.0);
    }

    #[test]
    fn test_missing_input() {
        let dir = tempdir().unwrap();
        let err = Compressor::default()
            .compress_for_ratio(&dir.path().join("gone.csv"), 0.5)
            .unwrap_err();
        assert!(matches!(err, CompressError::NotFound(_)));
    }

    #[test]
    fn test_megabytes() {
        assert_eq!(megabytes(1024 * 1024), 1.0);
        assert_eq!(megabytes(512 * 1024), 0.5);
    }
}
