//! Codec backends. Each reads one file and writes one compressed file.

use image::codecs::jpeg::JpegEncoder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

use crate::error::{CompressError, CompressResult};

/// Re-encode any decodable image as baseline JPEG.
pub fn compress_jpeg(input: &Path, output: &Path, quality: u8) -> CompressResult<()> {
    let img = image::open(input).map_err(|e| CompressError::image(input, e))?;
    let rgb = img.to_rgb8();
    let mut writer = BufWriter::new(File::create(output).map_err(|e| CompressError::io(output, e))?);
    JpegEncoder::new_with_quality(&mut writer, quality)
        .encode_image(&rgb)
        .map_err(|e| CompressError::image(output, e))?;
    writer.flush().map_err(|e| CompressError::io(output, e))?;
    debug!(input = %input.display(), quality, "JPEG encoded");
    Ok(())
}

/// Zstandard frame.
pub fn compress_zstd(input: &Path, output: &Path, level: i32) -> CompressResult<()> {
    let reader = BufReader::new(File::open(input).map_err(|e| CompressError::io(input, e))?);
    let writer = BufWriter::new(File::create(output).map_err(|e| CompressError::io(output, e))?);
    zstd::stream::copy_encode(reader, writer, level).map_err(|e| CompressError::io(output, e))?;
    debug!(input = %input.display(), level, "Zstd encoded");
    Ok(())
}

/// LZ4 frame.
pub fn compress_lz4(input: &Path, output: &Path, level: u32) -> CompressResult<()> {
    let mut reader = BufReader::new(File::open(input).map_err(|e| CompressError::io(input, e))?);
    let writer = BufWriter::new(File::create(output).map_err(|e| CompressError::io(output, e))?);
    let mut encoder = lz4::EncoderBuilder::new()
        .level(level)
        .build(writer)
        .map_err(|e| CompressError::io(output, e))?;
    io::copy(&mut reader, &mut encoder).map_err(|e| CompressError::io(output, e))?;
    let (mut writer, result) = encoder.finish();
    result.map_err(|e| CompressError::io(output, e))?;
    writer.flush().map_err(|e| CompressError::io(output, e))?;
    debug!(input = %input.display(), level, "LZ4 encoded");
    Ok(())
}

/// External H.264 encoder invocation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoEncoder {
    /// Executable, looked up on `PATH`.
    pub program: String,
    /// Value passed to `-vcodec`.
    pub codec: String,
}

impl Default for VideoEncoder {
    fn default() -> Self {
        Self {
            program: "ffmpeg".into(),
            codec: "h264_omx".into(),
        }
    }
}

impl VideoEncoder {
    pub fn compress(&self, input: &Path, output: &Path, bitrate_kbps: u32) -> CompressResult<()> {
        let status = Command::new(&self.program)
            .arg("-y")
            .arg("-i")
            .arg(input)
            .arg("-vcodec")
            .arg(&self.codec)
            .arg("-b:v")
            .arg(format!("{}k", bitrate_kbps))
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|source| CompressError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !status.success() {
            return Err(CompressError::EncoderFailed {
                program: self.program.clone(),
                status,
            });
        }
        debug!(input = %input.display(), bitrate_kbps, codec = %self.codec, "Video encoded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::tempdir;

    fn read_all(path: &Path) -> Vec<u8> {
        let mut buf = Vec::new();
        File::open(path).unwrap().read_to_end(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_zstd_output_decodes() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("science.bin");
        let data: Vec<u8> = [0u8, 1, 2, 3].repeat(10_000);
        std::fs::write(&input, &data).unwrap();
        let output = dir.path().join("science.bin.zst");

        compress_zstd(&input, &output, 5).unwrap();
        let packed = read_all(&output);
        assert!(packed.len() < data.len() / 10);
        assert_eq!(zstd::stream::decode_all(&packed[..]).unwrap(), data);
    }

    #[test]
    fn test_lz4_output_decodes() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("log.txt");
        let data = "[INFO] System nominal\n".repeat(2_000).into_bytes();
        std::fs::write(&input, &data).unwrap();
        let output = dir.path().join("log.txt.lz4");

        compress_lz4(&input, &output, 2).unwrap();
        let mut decoder = lz4::Decoder::new(File::open(&output).unwrap()).unwrap();
        let mut restored = Vec::new();
        decoder.read_to_end(&mut restored).unwrap();
        assert_eq!(restored, data);
    }

    #[test]
    fn test_jpeg_keeps_dimensions() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("frame.png");
        image::RgbImage::from_fn(32, 24, |x, y| image::Rgb([(x * 8) as u8, (y * 10) as u8, 128]))
            .save(&input)
            .unwrap();
        let output = dir.path().join("frame.png.jpg_compressed.jpg");

        compress_jpeg(&input, &output, 40).unwrap();
        let decoded = image::open(&output).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 24));
    }

    #[test]
    fn test_jpeg_rejects_non_image() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("fake.jpg");
        std::fs::write(&input, b"not an image").unwrap();
        let err = compress_jpeg(&input, &dir.path().join("out.jpg"), 40).unwrap_err();
        assert!(err.is_input_error());
    }

    #[test]
    fn test_missing_encoder() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("clip.mp4");
        std::fs::write(&input, b"").unwrap();
        let encoder = VideoEncoder {
            program: "no-such-video-encoder-binary".into(),
            ..Default::default()
        };
        let err = encoder.compress(&input, &dir.path().join("out.mp4"), 500).unwrap_err();
        assert!(matches!(err, CompressError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_encoder_exit_status() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("clip.mp4");
        std::fs::write(&input, b"").unwrap();
        let encoder = VideoEncoder {
            program: "false".into(),
            ..Default::default()
        };
        let err = encoder.compress(&input, &dir.path().join("out.mp4"), 500).unwrap_err();
        assert!(matches!(err, CompressError::EncoderFailed { .. }));
    }
}
