//! Data classification and protocol selection.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Kind of payload, decided from the file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Image,
    Video,
    Telemetry,
    Science,
    Unknown,
}

impl DataType {
    pub fn detect(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "jpg" | "jpeg" | "png" | "tif" | "tiff" | "bmp" | "gif" => Self::Image,
            "mp4" | "avi" | "mov" | "mkv" => Self::Video,
            "csv" | "txt" | "log" => Self::Telemetry,
            "bin" | "dat" => Self::Science,
            _ => Self::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Telemetry => "telemetry",
            Self::Science => "science",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Codec family used for a data type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Jpeg,
    H264,
    /// Fast lossless.
    Lz4,
    /// High-ratio lossless.
    Zstd,
    None,
}

impl Protocol {
    pub fn for_data_type(data_type: DataType) -> Self {
        match data_type {
            DataType::Image => Self::Jpeg,
            DataType::Video => Self::H264,
            DataType::Telemetry => Self::Lz4,
            DataType::Science => Self::Zstd,
            DataType::Unknown => Self::None,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Jpeg => "jpeg",
            Self::H264 => "h264",
            Self::Lz4 => "lz4",
            Self::Zstd => "zstd",
            Self::None => "none",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_by_extension() {
        assert_eq!(DataType::detect(Path::new("img/1.JPG")), DataType::Image);
        assert_eq!(DataType::detect(Path::new("a.tiff")), DataType::Image);
        assert_eq!(DataType::detect(Path::new("clip.mkv")), DataType::Video);
        assert_eq!(DataType::detect(Path::new("log.txt")), DataType::Telemetry);
        assert_eq!(DataType::detect(Path::new("science_data.bin")), DataType::Science);
        assert_eq!(DataType::detect(Path::new("archive.tar.gz")), DataType::Unknown);
        assert_eq!(DataType::detect(Path::new("README")), DataType::Unknown);
    }

    #[test]
    fn test_protocol_selection() {
        assert_eq!(Protocol::for_data_type(DataType::Image), Protocol::Jpeg);
        assert_eq!(Protocol::for_data_type(DataType::Video), Protocol::H264);
        assert_eq!(Protocol::for_data_type(DataType::Telemetry), Protocol::Lz4);
        assert_eq!(Protocol::for_data_type(DataType::Science), Protocol::Zstd);
        assert_eq!(Protocol::for_data_type(DataType::Unknown), Protocol::None);
    }
}
