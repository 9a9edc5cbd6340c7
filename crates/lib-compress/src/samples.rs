//! Sample payload files for exercising the codecs.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{CompressError, CompressResult};

pub const TELEMETRY_FILE: &str = "telemetry.csv";
pub const SCIENCE_FILE: &str = "science_data.bin";
pub const LOG_FILE: &str = "log.txt";

const TELEMETRY_ROWS: usize = 5_000;
const SCIENCE_REPEATS: usize = 500_000;
const LOG_LINES: usize = 30_000;

/// Write a telemetry CSV, a repetitive science binary and a log into `dir`.
pub fn write_sample_files(dir: &Path) -> CompressResult<Vec<PathBuf>> {
    fs::create_dir_all(dir).map_err(|e| CompressError::io(dir, e))?;

    let telemetry = dir.join(TELEMETRY_FILE);
    write_lines(&telemetry, |w| {
        writeln!(w, "temp,voltage,altitude")?;
        for i in 0..TELEMETRY_ROWS {
            writeln!(w, "{},{:.1},{}", 20 + i % 5, 7.4 + (i % 2) as f64, 400 + i % 10)?;
        }
        Ok(())
    })?;

    let science = dir.join(SCIENCE_FILE);
    fs::write(&science, [0u8, 1, 2, 3].repeat(SCIENCE_REPEATS)).map_err(|e| CompressError::io(&science, e))?;

    let log = dir.join(LOG_FILE);
    write_lines(&log, |w| {
        for i in 0..LOG_LINES {
            writeln!(w, "[INFO] Timestamp={} System nominal", i)?;
        }
        Ok(())
    })?;

    info!(dir = %dir.display(), "Wrote sample payload files");
    Ok(vec![telemetry, science, log])
}

fn write_lines<F>(path: &Path, body: F) -> CompressResult<()>
where
    F: FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
{
    let mut writer = BufWriter::new(File::create(path).map_err(|e| CompressError::io(path, e))?);
    body(&mut writer)
        .and_then(|_| writer.flush())
        .map_err(|e| CompressError::io(path, e))
}
