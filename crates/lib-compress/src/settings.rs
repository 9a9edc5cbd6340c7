//! Mapping a target compression ratio to codec settings.
//!
//! A ratio near 1.0 means little compression is needed, so codecs run at
//! high quality or low effort; small ratios push toward aggressive settings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::classify::Protocol;
use crate::error::{CompressError, CompressResult};

/// Concrete codec configuration for one file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "codec", rename_all = "lowercase")]
pub enum Settings {
    Jpeg { quality: u8 },
    H264 { bitrate_kbps: u32 },
    Lz4 { level: u32 },
    Zstd { level: i32 },
    None,
}

pub fn jpeg_quality(ratio: f64) -> u8 {
    match ratio {
        r if r >= 0.9 => 95,
        r if r >= 0.7 => 85,
        r if r >= 0.5 => 75,
        r if r >= 0.3 => 50,
        _ => 30,
    }
}

pub fn zstd_level(ratio: f64) -> i32 {
    match ratio {
        r if r >= 0.9 => 1,
        r if r >= 0.6 => 3,
        r if r >= 0.4 => 6,
        _ => 10,
    }
}

pub fn lz4_level(ratio: f64) -> u32 {
    match ratio {
        r if r >= 0.8 => 1,
        r if r >= 0.5 => 2,
        _ => 4,
    }
}

pub fn video_bitrate_kbps(ratio: f64) -> u32 {
    (ratio * 2000.0).floor() as u32
}

impl Settings {
    /// Settings for a protocol at a target ratio in (0, 1].
    pub fn for_ratio(protocol: Protocol, ratio: f64) -> CompressResult<Self> {
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(CompressError::InvalidRatio(ratio));
        }
        Ok(match protocol {
            Protocol::Jpeg => Self::Jpeg {
                quality: jpeg_quality(ratio),
            },
            Protocol::H264 => Self::H264 {
                bitrate_kbps: video_bitrate_kbps(ratio),
            },
            Protocol::Lz4 => Self::Lz4 {
                level: lz4_level(ratio),
            },
            Protocol::Zstd => Self::Zstd {
                level: zstd_level(ratio),
            },
            Protocol::None => Self::None,
        })
    }

    /// Fixed settings used by the compression test harness. Video is skipped.
    pub fn benchmark(protocol: Protocol) -> Self {
        match protocol {
            Protocol::Jpeg => Self::Jpeg { quality: 40 },
            Protocol::Lz4 => Self::Lz4 { level: 2 },
            Protocol::Zstd => Self::Zstd { level: 5 },
            Protocol::H264 | Protocol::None => Self::None,
        }
    }

    /// Where the compressed copy of `input` is written.
    pub fn output_path(&self, input: &Path) -> PathBuf {
        let suffix = match self {
            Self::Jpeg { .. } => ".jpg_compressed.jpg",
            Self::H264 { .. } => "_compressed.mp4",
            Self::Lz4 { .. } => ".lz4",
            Self::Zstd { .. } => ".zst",
            Self::None => return input.to_path_buf(),
        };
        let mut name = input.as_os_str().to_os_string();
        name.push(suffix);
        PathBuf::from(name)
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jpeg { quality } => write!(f, "JPEG quality {}", quality),
            Self::H264 { bitrate_kbps } => write!(f, "H.264 bitrate {}k", bitrate_kbps),
            Self::Lz4 { level } => write!(f, "LZ4 level {}", level),
            Self::Zstd { level } => write!(f, "Zstd level {}", level),
            Self::None => f.write_str("no compression"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jpeg_quality_steps() {
        assert_eq!(jpeg_quality(0.95), 95);
        assert_eq!(jpeg_quality(0.9), 95);
        assert_eq!(jpeg_quality(0.7), 85);
        assert_eq!(jpeg_quality(0.6), 75);
        assert_eq!(jpeg_quality(0.3), 50);
        assert_eq!(jpeg_quality(0.2), 30);
    }

    #[test]
    fn test_lossless_levels() {
        assert_eq!(zstd_level(1.0), 1);
        assert_eq!(zstd_level(0.6), 3);
        assert_eq!(zstd_level(0.45), 6);
        assert_eq!(zstd_level(0.05), 10);
        assert_eq!(lz4_level(0.8), 1);
        assert_eq!(lz4_level(0.5), 2);
        assert_eq!(lz4_level(0.1), 4);
    }

    #[test]
    fn test_video_bitrate() {
        assert_eq!(video_bitrate_kbps(0.5), 1000);
        assert_eq!(video_bitrate_kbps(0.3337), 667);
    }

    #[test]
    fn test_ratio_bounds() {
        assert!(Settings::for_ratio(Protocol::Zstd, 0.0).is_err());
        assert!(Settings::for_ratio(Protocol::Zstd, 1.2).is_err());
        assert!(Settings::for_ratio(Protocol::Zstd, f64::NAN).is_err());
        assert_eq!(Settings::for_ratio(Protocol::None, 0.5).unwrap(), Settings::None);
    }

    #[test]
    fn test_output_names() {
        let p = Path::new("data/frame.png");
        assert_eq!(
            Settings::Jpeg { quality: 50 }.output_path(p),
            PathBuf::from("data/frame.png.jpg_compressed.jpg")
        );
        assert_eq!(Settings::Lz4 { level: 1 }.output_path(p), PathBuf::from("data/frame.png.lz4"));
        assert_eq!(Settings::Zstd { level: 1 }.output_path(p), PathBuf::from("data/frame.png.zst"));
        assert_eq!(
            Settings::H264 { bitrate_kbps: 1 }.output_path(Path::new("v.mp4")),
            PathBuf::from("v.mp4_compressed.mp4")
        );
        assert_eq!(Settings::None.output_path(p), p.to_path_buf());
    }
}
