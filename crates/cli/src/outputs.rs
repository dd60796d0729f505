//! GitHub Actions step outputs.

use std::env;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Variable naming the step outputs file.
pub const GITHUB_OUTPUT: &str = "GITHUB_OUTPUT";

/// Variable naming the job summary file.
pub const GITHUB_STEP_SUMMARY: &str = "GITHUB_STEP_SUMMARY";

const DELIMITER: &str = "LANCE_BENCH_EOF";

/// Path from `var`, when set and non-empty.
pub fn env_path(var: &str) -> Option<PathBuf> {
    env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Append `pairs` to `$GITHUB_OUTPUT` if it is set.
pub fn emit(pairs: &[(&str, String)]) -> io::Result<()> {
    match env_path(GITHUB_OUTPUT) {
        Some(path) => append(&path, pairs),
        None => {
            debug!("GITHUB_OUTPUT not set, skipping step outputs");
            Ok(())
        }
    }
}

/// Append `pairs` to an outputs file.
///
/// Multi-line values use the heredoc form.
pub fn append(path: &Path, pairs: &[(&str, String)]) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    for (key, value) in pairs {
        if value.contains('\n') {
            writeln!(file, "{key}<<{DELIMITER}\n{value}\n{DELIMITER}")?;
        } else {
            writeln!(file, "{key}={value}")?;
        }
    }
    Ok(())
}
