//! Ingest a harness report and append it to the results store.

use crate::settings::Settings;
use anyhow::Context;
use lance_bench_adapters::{ingest, DutSpec, IngestContext, ReportFormat};
use lance_bench_benchmarks::io::{append_summary, write_results_json, write_results_to};
use lance_bench_benchmarks::BenchResult;
use lance_bench_storage::ResultStore;
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing::info;

/// One publish invocation.
#[derive(Debug, Clone)]
pub struct PublishRequest {
    pub format: ReportFormat,
    pub path: PathBuf,
    pub testbed_name: Option<String>,
    pub dut: DutSpec,
    /// Print records instead of storing them.
    pub dry_run: bool,
    /// Dry-run destination; stdout when unset.
    pub output: Option<PathBuf>,
    /// Markdown file the publish summary is appended to.
    pub summary_path: Option<PathBuf>,
}

/// Parse the report, then store (or print) the normalized results.
///
/// Parsing fully succeeds before the store is opened, so a bad report never
/// leaves partial rows behind.
pub async fn publish(settings: &Settings, request: PublishRequest) -> anyhow::Result<Vec<BenchResult>> {
    let input = fs::read_to_string(&request.path)
        .with_context(|| format!("failed to read report {}", request.path.display()))?;
    let ctx = IngestContext::capture(request.testbed_name.as_deref(), request.dut);
    let results = ingest(request.format, &input, &ctx)?;

    if request.dry_run {
        match &request.output {
            Some(path) => write_results_json(&results, path)
                .with_context(|| format!("failed to write {}", path.display()))?,
            None => write_results_to(&results, io::stdout().lock())?,
        }
        info!(count = results.len(), "dry run, nothing stored");
        return Ok(results);
    }

    let store = ResultStore::connect(&settings.store()).await?;
    store.append(&results).await?;

    if let Some(path) = &request.summary_path {
        append_summary(&results, path)
            .with_context(|| format!("failed to append summary to {}", path.display()))?;
    }

    println!(
        "Published {} {} results to {}",
        results.len(),
        request.format,
        store.location()
    );
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lance_bench_storage::StoreConfig;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn criterion_report(dir: &TempDir) -> PathBuf {
        let line = |id: &str, values: &[f64]| {
            serde_json::json!({
                "reason": "benchmark-complete",
                "id": id,
                "iteration_count": vec![1; values.len()],
                "measured_values": values,
                "unit": "ns",
                "throughput": [],
            })
            .to_string()
        };
        let path = dir.path().join("criterion.jsonl");
        let body = [
            line("take/lance/random", &[120.0, 118.0, 125.0]),
            line("scan/lance/full", &[8_800.0]),
        ]
        .join("\n");
        fs::write(&path, body).unwrap();
        path
    }

    fn settings_for(store_dir: &TempDir) -> Settings {
        let vars = HashMap::from([(
            "LANCE_BENCH_URI".to_string(),
            store_dir.path().join("store").display().to_string(),
        )]);
        Settings::from_source(Some(vars)).unwrap()
    }

    fn request(path: PathBuf) -> PublishRequest {
        PublishRequest {
            format: ReportFormat::Criterion,
            path,
            testbed_name: Some("ci-runner".to_string()),
            dut: DutSpec {
                version: Some("0.21.1+a1b2c3d".to_string()),
                timestamp: Some(1_735_689_600),
                ..DutSpec::new("lance")
            },
            dry_run: false,
            output: None,
            summary_path: None,
        }
    }

    #[tokio::test]
    async fn publishes_into_local_store_and_summary() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_for(&dir);
        let summary = dir.path().join("summary.md");

        let mut req = request(criterion_report(&dir));
        req.summary_path = Some(summary.clone());
        let results = publish(&settings, req).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].test_bed.name, "ci-runner");

        let store = ResultStore::connect(&settings.store()).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 2);
        assert!(fs::read_to_string(summary).unwrap().contains("take/lance/random"));
    }

    #[tokio::test]
    async fn dry_run_writes_json_and_stores_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_for(&dir);
        let output = dir.path().join("dry-run.json");

        let mut req = request(criterion_report(&dir));
        req.dry_run = true;
        req.output = Some(output.clone());
        publish(&settings, req).await.unwrap();

        let written = lance_bench_benchmarks::io::read_results_json(&output).unwrap();
        assert_eq!(written.len(), 2);
        assert!(!dir.path().join("store").exists());
    }

    #[tokio::test]
    async fn missing_dut_version_fails_before_store_is_touched() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_for(&dir);

        let mut req = request(criterion_report(&dir));
        req.dut.version = None;
        let err = publish(&settings, req).await.unwrap_err();
        assert!(err.to_string().contains("DUT version could not be determined"));
        assert!(!dir.path().join("store").exists());

        let store_config = StoreConfig::with_uri(dir.path().join("store").display().to_string());
        let store = ResultStore::connect(&store_config).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
