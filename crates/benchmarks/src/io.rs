//! I/O operations for benchmark results.
//!
//! Normalized results are exchanged as pretty-printed JSON arrays: dry runs
//! print them, and CI jobs hand them between steps as files.

use crate::markdown;
use crate::result::BenchResult;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Write benchmark results to a JSON file.
pub fn write_results_json(results: &[BenchResult], path: impl AsRef<Path>) -> io::Result<()> {
    let json = serde_json::to_string_pretty(results).map_err(io::Error::other)?;
    fs::write(path, json)
}

/// Write benchmark results as JSON to any writer.
pub fn write_results_to(results: &[BenchResult], mut writer: impl Write) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut writer, results).map_err(io::Error::other)?;
    writeln!(writer)
}

/// Read results from a JSON file.
///
/// Summaries are recomputed from the raw values on the way in.
pub fn read_results_json(path: impl AsRef<Path>) -> io::Result<Vec<BenchResult>> {
    let content = fs::read_to_string(path)?;
    let mut results: Vec<BenchResult> =
        serde_json::from_str(&content).map_err(io::Error::other)?;
    for result in &mut results {
        let values = result.values().to_vec();
        result
            .set_values(values)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    }
    Ok(results)
}

/// Append the publish summary to a markdown file, creating it if needed.
pub fn append_summary(results: &[BenchResult], path: impl AsRef<Path>) -> io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "{}", markdown::generate_summary(results))
}
