// Copyright 2025 Lance Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! The `results` table and the operations the tooling needs on it.

use crate::location::StoreLocation;
use crate::retry::{RetryPolicy, Sleeper, TokioSleeper};
use crate::{Result, StoreConfig, StoreError};
use async_trait::async_trait;
use lance_bench_benchmarks::{BenchResult, DutBuild, DutVersion, TestBed, Throughput};
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Row};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS results (
    id TEXT PRIMARY KEY,
    dut_name TEXT NOT NULL,
    dut_version TEXT NOT NULL,
    dut_timestamp BIGINT NOT NULL,
    test_bed_name TEXT NOT NULL,
    test_bed_cpu TEXT NOT NULL,
    test_bed_memory_bytes BIGINT NOT NULL,
    test_bed_os TEXT NOT NULL,
    benchmark_name TEXT NOT NULL,
    values_json TEXT NOT NULL,
    summary_min DOUBLE PRECISION NOT NULL,
    summary_q1 DOUBLE PRECISION NOT NULL,
    summary_median DOUBLE PRECISION NOT NULL,
    summary_q3 DOUBLE PRECISION NOT NULL,
    summary_max DOUBLE PRECISION NOT NULL,
    summary_mean DOUBLE PRECISION NOT NULL,
    summary_standard_deviation DOUBLE PRECISION NOT NULL,
    units TEXT NOT NULL,
    throughput_per_iteration DOUBLE PRECISION,
    throughput_unit TEXT,
    metadata TEXT NOT NULL,
    timestamp BIGINT NOT NULL
)";

const CREATE_NAME_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS results_benchmark_name_idx ON results (benchmark_name, timestamp)";

const INSERT: &str = "INSERT INTO results (
    id, dut_name, dut_version, dut_timestamp,
    test_bed_name, test_bed_cpu, test_bed_memory_bytes, test_bed_os,
    benchmark_name, values_json,
    summary_min, summary_q1, summary_median, summary_q3, summary_max,
    summary_mean, summary_standard_deviation,
    units, throughput_per_iteration, throughput_unit, metadata, timestamp
) VALUES (
    $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
    $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22
)";

const COLUMNS: &str = "id, dut_name, dut_version, dut_timestamp, \
    test_bed_name, test_bed_cpu, test_bed_memory_bytes, test_bed_os, \
    benchmark_name, values_json, units, throughput_per_iteration, throughput_unit, \
    metadata, timestamp";

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// Answers whether results for a build are already stored.
///
/// Split out from [`ResultStore`] so scheduling logic can run against a
/// fake.
#[async_trait]
pub trait VersionIndex: Send + Sync {
    /// True if any stored `dut_version` contains `fragment`.
    async fn has_version_matching(&self, fragment: &str) -> Result<bool>;
}

/// Handle to an open results store.
#[derive(Debug, Clone)]
pub struct ResultStore {
    pool: AnyPool,
    location: StoreLocation,
}

impl ResultStore {
    /// Open the configured store with the default retry policy.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let location = StoreLocation::resolve(config)?;
        Self::connect_with(location, RetryPolicy::default(), &TokioSleeper).await
    }

    /// Open `location`, retrying per `policy`, and make sure the table exists.
    pub async fn connect_with(
        location: StoreLocation,
        policy: RetryPolicy,
        sleeper: &dyn Sleeper,
    ) -> Result<Self> {
        sqlx::any::install_default_drivers();
        location.prepare()?;

        let url = location.connection_url();
        let url = url.as_str();
        let pool = policy
            .run(sleeper, "open results store", |_| {
                AnyPoolOptions::new()
                    .max_connections(1)
                    .acquire_timeout(ACQUIRE_TIMEOUT)
                    .connect(url)
            })
            .await
            .map_err(|exhausted| StoreError::Connection {
                location: location.to_string(),
                attempts: exhausted.attempts,
                source: exhausted.last_error,
            })?;

        let store = Self { pool, location };
        store.ensure_schema().await?;
        info!(location = %store.location, "opened results store");
        Ok(store)
    }

    pub fn location(&self) -> &StoreLocation {
        &self.location
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        sqlx::query(CREATE_NAME_INDEX).execute(&self.pool).await?;
        Ok(())
    }

    /// Append results in a single transaction.
    ///
    /// Either every record is written or none is.
    pub async fn append(&self, results: &[BenchResult]) -> Result<()> {
        if results.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for result in results {
            let values_json = serde_json::to_string(result.values()).map_err(|e| {
                StoreError::CorruptRow {
                    id: result.id.to_string(),
                    reason: e.to_string(),
                }
            })?;
            let summary = result.summary();
            let (per_iteration, throughput_unit) = match &result.throughput {
                Some(t) => (Some(t.per_iteration), Some(t.unit.clone())),
                None => (None, None),
            };

            sqlx::query(INSERT)
                .bind(result.id.to_string())
                .bind(result.dut.name.clone())
                .bind(result.dut.version.to_string())
                .bind(result.dut.timestamp)
                .bind(result.test_bed.name.clone())
                .bind(result.test_bed.cpu.clone())
                .bind(i64::try_from(result.test_bed.memory_bytes).unwrap_or(i64::MAX))
                .bind(result.test_bed.os.clone())
                .bind(result.benchmark_name.clone())
                .bind(values_json)
                .bind(summary.min)
                .bind(summary.q1)
                .bind(summary.median)
                .bind(summary.q3)
                .bind(summary.max)
                .bind(summary.mean)
                .bind(summary.standard_deviation)
                .bind(result.units.clone())
                .bind(per_iteration)
                .bind(throughput_unit)
                .bind(result.metadata.clone())
                .bind(result.timestamp)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        info!(
            count = results.len(),
            location = %self.location,
            "appended benchmark results"
        );
        Ok(())
    }

    /// Most recent results for one benchmark, newest first.
    pub async fn history(&self, benchmark_name: &str, limit: usize) -> Result<Vec<BenchResult>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM results WHERE benchmark_name = $1 \
             ORDER BY timestamp DESC, id DESC LIMIT $2"
        );
        let rows = sqlx::query(&sql)
            .bind(benchmark_name.to_string())
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;
        debug!(benchmark = benchmark_name, rows = rows.len(), "loaded history");
        rows.iter().map(decode_row).collect()
    }

    /// Most recent results for one benchmark, newest first, leaving out rows
    /// built from `exclude_commit`.
    ///
    /// The exclusion happens before `limit` applies, so a PR's own rows never
    /// take baseline slots.
    pub async fn history_excluding(
        &self,
        benchmark_name: &str,
        exclude_commit: &str,
        limit: usize,
    ) -> Result<Vec<BenchResult>> {
        let commit = hex_fragment(exclude_commit)?;
        let sql = format!(
            "SELECT {COLUMNS} FROM results WHERE benchmark_name = $1 \
             AND dut_version NOT LIKE ('%+' || $2) \
             ORDER BY timestamp DESC, id DESC LIMIT $3"
        );
        let rows = sqlx::query(&sql)
            .bind(benchmark_name.to_string())
            .bind(commit)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;
        debug!(benchmark = benchmark_name, rows = rows.len(), "loaded baseline history");
        rows.iter().map(decode_row).collect()
    }

    /// Every stored result, oldest first.
    pub async fn all(&self) -> Result<Vec<BenchResult>> {
        let sql = format!("SELECT {COLUMNS} FROM results ORDER BY timestamp, id");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(decode_row).collect()
    }

    /// Number of stored results.
    pub async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM results")
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}

#[async_trait]
impl VersionIndex for ResultStore {
    async fn has_version_matching(&self, fragment: &str) -> Result<bool> {
        let fragment = hex_fragment(fragment)?;

        let matches: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM results WHERE dut_version LIKE '%' || $1 || '%'",
        )
        .bind(fragment.clone())
        .fetch_one(&self.pool)
        .await?;

        debug!(fragment = %fragment, matches, "checked for existing results");
        Ok(matches > 0)
    }
}

fn decode_row(row: &AnyRow) -> Result<BenchResult> {
    let id: String = row.try_get("id")?;
    let corrupt = |reason: String| StoreError::CorruptRow {
        id: id.clone(),
        reason,
    };

    let uuid = Uuid::parse_str(&id).map_err(|e| corrupt(e.to_string()))?;
    let version: String = row.try_get("dut_version")?;
    let version = DutVersion::parse(&version).map_err(|e| corrupt(e.to_string()))?;
    let values_json: String = row.try_get("values_json")?;
    let values: Vec<f64> =
        serde_json::from_str(&values_json).map_err(|e| corrupt(e.to_string()))?;

    let throughput = match (
        row.try_get::<Option<f64>, _>("throughput_per_iteration")?,
        row.try_get::<Option<String>, _>("throughput_unit")?,
    ) {
        (Some(per_iteration), Some(unit)) => Some(Throughput { per_iteration, unit }),
        _ => None,
    };

    let memory_bytes: i64 = row.try_get("test_bed_memory_bytes")?;
    let result = BenchResult::restore(
        uuid,
        DutBuild::new(
            row.try_get::<String, _>("dut_name")?,
            version,
            row.try_get("dut_timestamp")?,
        ),
        TestBed {
            name: row.try_get("test_bed_name")?,
            cpu: row.try_get("test_bed_cpu")?,
            memory_bytes: u64::try_from(memory_bytes).unwrap_or_default(),
            os: row.try_get("test_bed_os")?,
        },
        row.try_get("benchmark_name")?,
        values,
        row.try_get("units")?,
        throughput,
        row.try_get("metadata")?,
        row.try_get("timestamp")?,
    )?;
    Ok(result)
}

fn hex_fragment(fragment: &str) -> Result<String> {
    let fragment = fragment.trim().to_ascii_lowercase();
    if fragment.is_empty() || !fragment.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(StoreError::InvalidFragment(fragment));
    }
    Ok(fragment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::tests::RecordingSleeper;
    use lance_bench_benchmarks::UNITS_NANOSECONDS;
    use tempfile::TempDir;

    fn sample(name: &str, commit: &str, timestamp: i64, values: Vec<f64>) -> BenchResult {
        let dut = DutBuild::new(
            "lance",
            DutVersion::new("0.21.1", commit).unwrap(),
            1_735_689_600,
        );
        let bed = TestBed {
            name: "bench-runner-1".to_string(),
            cpu: "AMD EPYC 7763 64-Core Processor".to_string(),
            memory_bytes: 68_719_476_736,
            os: "Linux 22.04 Ubuntu".to_string(),
        };
        let mut result =
            BenchResult::new(dut, bed, name, values, UNITS_NANOSECONDS, None, "{}").unwrap();
        result.timestamp = timestamp;
        result
    }

    async fn open(dir: &TempDir) -> ResultStore {
        ResultStore::connect_with(
            StoreLocation::Directory(dir.path().join("store")),
            RetryPolicy::default(),
            &RecordingSleeper::default(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn append_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(&dir).await;
        assert_eq!(store.count().await.unwrap(), 0);

        let mut with_throughput = sample("scan/1000", "3f9c2d1e8b", 100, vec![10.0, 20.0, 30.0]);
        with_throughput.throughput = Some(Throughput {
            per_iteration: 4096.0,
            unit: "bytes".to_string(),
        });
        let plain = sample("take/10", "3f9c2d1e8b", 101, vec![5.0]);
        store.append(&[with_throughput.clone(), plain]).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 2);
        let all = store.all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, with_throughput.id);
        assert_eq!(all[0].values(), &[10.0, 20.0, 30.0]);
        assert_eq!(all[0].summary().median, 20.0);
        assert_eq!(all[0].dut.version.as_str(), "0.21.1+3f9c2d1");
        assert_eq!(all[0].test_bed.memory_bytes, 68_719_476_736);
        assert_eq!(all[0].throughput, with_throughput.throughput);
        assert_eq!(all[1].throughput, None);
    }

    #[tokio::test]
    async fn existence_check_matches_commit_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(&dir).await;
        store
            .append(&[sample("scan", "3f9c2d1e8b", 1, vec![1.0])])
            .await
            .unwrap();

        assert!(store.has_version_matching("3f9c2d1").await.unwrap());
        assert!(store.has_version_matching("3F9C2D1").await.unwrap());
        assert!(!store.has_version_matching("deadbee").await.unwrap());
        assert!(matches!(
            store.has_version_matching("").await,
            Err(StoreError::InvalidFragment(_))
        ));
        assert!(matches!(
            store.has_version_matching("%").await,
            Err(StoreError::InvalidFragment(_))
        ));
    }

    #[tokio::test]
    async fn history_is_newest_first_and_limited() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(&dir).await;
        let rows: Vec<_> = (0..5)
            .map(|i| sample("scan", "3f9c2d1e8b", 1_000 + i, vec![i as f64 + 1.0]))
            .chain([sample("other", "3f9c2d1e8b", 5_000, vec![9.0])])
            .collect();
        store.append(&rows).await.unwrap();

        let history = store.history("scan", 3).await.unwrap();
        let stamps: Vec<i64> = history.iter().map(|r| r.timestamp).collect();
        assert_eq!(stamps, vec![1_004, 1_003, 1_002]);
        assert!(store.history("missing", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn excluded_commit_does_not_use_history_slots() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(&dir).await;
        let rows: Vec<_> = (0..3)
            .map(|i| sample("scan", "3f9c2d1e8b", 1_000 + i, vec![1.0]))
            .chain((0..4).map(|i| sample("scan", "feedface00", 2_000 + i, vec![2.0])))
            .collect();
        store.append(&rows).await.unwrap();

        let history = store.history_excluding("scan", "FEEDFAC", 3).await.unwrap();
        let stamps: Vec<i64> = history.iter().map(|r| r.timestamp).collect();
        assert_eq!(stamps, vec![1_002, 1_001, 1_000]);
        assert!(matches!(
            store.history_excluding("scan", "100%", 3).await,
            Err(StoreError::InvalidFragment(_))
        ));
    }

    #[tokio::test]
    async fn reopening_keeps_existing_rows() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = open(&dir).await;
            store
                .append(&[sample("scan", "3f9c2d1e8b", 1, vec![1.0])])
                .await
                .unwrap();
        }
        let store = open(&dir).await;
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unreachable_store_is_retried_then_reported() {
        let sleeper = RecordingSleeper::default();
        let err = ResultStore::connect_with(
            StoreLocation::Url("sqlite:///nonexistent-lance-bench/missing/results.sqlite".into()),
            RetryPolicy::default(),
            &sleeper,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, StoreError::Connection { attempts: 3, .. }));
        assert_eq!(
            *sleeper.delays.lock().unwrap(),
            vec![Duration::from_secs(2), Duration::from_secs(4)]
        );
    }
}
