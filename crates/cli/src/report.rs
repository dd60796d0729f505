//! Pull-request comparison and store merging.

use anyhow::{bail, Context};
use lance_bench_benchmarks::io::read_results_json;
use lance_bench_benchmarks::markdown::generate_comparison_report;
use lance_bench_benchmarks::{short_sha, BenchResult, Comparison};
use lance_bench_storage::location::RESULTS_FILE;
use lance_bench_storage::{ResultStore, StoreConfig};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct CompareRequest {
    pub pr_sha: String,
    pub pr_number: u64,
    /// Store directory or JSON file holding the PR run.
    pub local_results: PathBuf,
    pub baseline_limit: usize,
    pub min_baseline: usize,
    pub threshold: f64,
}

/// Compare a PR run against the baseline store and render the markdown report.
pub async fn compare(baseline: &ResultStore, request: &CompareRequest) -> anyhow::Result<String> {
    let pr_prefix = short_sha(&request.pr_sha)?;
    let pr_results = latest_per_benchmark(load_results(&request.local_results).await?);
    if pr_results.is_empty() {
        bail!("no PR results found in {}", request.local_results.display());
    }

    let mut comparisons = Vec::with_capacity(pr_results.len());
    for result in &pr_results {
        if result.dut.version.short_sha() != pr_prefix {
            warn!(
                benchmark = %result.benchmark_name,
                version = %result.dut.version,
                "PR result was built from a different commit"
            );
        }
        let history = baseline
            .history_excluding(&result.benchmark_name, &pr_prefix, request.baseline_limit)
            .await?;
        comparisons.push(Comparison::new(result, &history, request.min_baseline));
    }

    info!(
        pr_number = request.pr_number,
        benchmarks = comparisons.len(),
        "compared PR results against baseline"
    );
    Ok(generate_comparison_report(
        &request.pr_sha,
        request.pr_number,
        &comparisons,
        request.baseline_limit,
        request.threshold,
    ))
}

/// One row per benchmark name, keeping the newest run. Ordered by name.
fn latest_per_benchmark(results: Vec<BenchResult>) -> Vec<BenchResult> {
    let mut latest: BTreeMap<String, BenchResult> = BTreeMap::new();
    for result in results {
        match latest.get(&result.benchmark_name) {
            Some(kept) if kept.timestamp > result.timestamp => {}
            _ => {
                latest.insert(result.benchmark_name.clone(), result);
            }
        }
    }
    latest.into_values().collect()
}

async fn load_results(path: &Path) -> anyhow::Result<Vec<BenchResult>> {
    if path.extension().is_some_and(|ext| ext == "json") {
        return read_results_json(path).with_context(|| format!("failed to read {}", path.display()));
    }
    let store = ResultStore::connect(&StoreConfig::with_uri(path.display().to_string())).await?;
    Ok(store.all().await?)
}

/// Append every row of each result store under `source_dir` into `output`.
///
/// Returns the number of rows merged.
pub async fn merge(source_dir: &Path, output: &Path) -> anyhow::Result<usize> {
    let mut sources: Vec<PathBuf> = fs::read_dir(source_dir)
        .with_context(|| format!("failed to list {}", source_dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.join(RESULTS_FILE).is_file() && path != output)
        .collect();
    sources.sort();
    if sources.is_empty() {
        bail!("no result stores found under {}", source_dir.display());
    }

    let destination =
        ResultStore::connect(&StoreConfig::with_uri(output.display().to_string())).await?;
    let mut merged = 0;
    for source in &sources {
        let store = ResultStore::connect(&StoreConfig::with_uri(source.display().to_string())).await?;
        let rows = store.all().await?;
        destination.append(&rows).await?;
        info!(source = %source.display(), rows = rows.len(), "merged result store");
        merged += rows.len();
    }

    info!(
        stores = sources.len(),
        rows = merged,
        output = %output.display(),
        "merge complete"
    );
    Ok(merged)
}
