// Copyright 2025 Lance Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! pytest-benchmark adapter.
//!
//! Consumes the single JSON document written by `pytest --benchmark-json`.
//! Raw timings (`stats.data`, present when the run used
//! `--benchmark-save-data`) are in seconds and are converted to nanoseconds.
//! The document's `commit_info` can stand in for an explicit DUT version and
//! timestamp.

use crate::dut::EmbeddedCommit;
use crate::{AdapterError, IngestContext, ReportAdapter, ReportFormat, Result};
use chrono::{DateTime, NaiveDateTime};
use lance_bench_benchmarks::{BenchResult, UNITS_NANOSECONDS};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

const NANOS_PER_SECOND: f64 = 1e9;

#[derive(Debug, Deserialize)]
struct Report {
    #[serde(default)]
    commit_info: Option<CommitInfo>,
    benchmarks: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct CommitInfo {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    time: Option<String>,
    #[serde(default)]
    author_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Benchmark {
    name: String,
    #[serde(default)]
    fullname: Option<String>,
    stats: Stats,
}

#[derive(Debug, Deserialize)]
struct Stats {
    #[serde(default)]
    data: Option<Vec<f64>>,
}

impl CommitInfo {
    fn embedded(&self) -> EmbeddedCommit {
        let timestamp = self
            .time
            .as_deref()
            .or(self.author_time.as_deref())
            .and_then(|raw| {
                let parsed = parse_commit_time(raw);
                if parsed.is_none() {
                    warn!(time = raw, "could not parse commit_info time");
                }
                parsed
            });
        EmbeddedCommit {
            sha: self.id.clone().filter(|id| !id.is_empty()),
            timestamp,
        }
    }
}

/// Parse the commit time formats pytest-benchmark writes.
fn parse_commit_time(raw: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.timestamp())
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
                .map(|naive| naive.and_utc().timestamp())
        })
        .ok()
}

/// Adapter for pytest-benchmark JSON reports.
#[derive(Debug, Default, Clone, Copy)]
pub struct PytestAdapter;

impl ReportAdapter for PytestAdapter {
    fn format(&self) -> ReportFormat {
        ReportFormat::Pytest
    }

    fn parse(&self, input: &str, ctx: &IngestContext) -> Result<Vec<BenchResult>> {
        let report: Report = serde_json::from_str(input).map_err(AdapterError::MalformedDocument)?;
        let embedded = report.commit_info.as_ref().map(CommitInfo::embedded);
        let dut = ctx.dut.resolve(embedded.as_ref())?;

        let mut results = Vec::with_capacity(report.benchmarks.len());
        for raw in report.benchmarks {
            let bench: Benchmark =
                serde_json::from_value(raw.clone()).map_err(AdapterError::MalformedDocument)?;
            let name = bench.fullname.unwrap_or(bench.name);
            let seconds = bench.stats.data.ok_or_else(|| AdapterError::MissingField {
                benchmark: name.clone(),
                field: "stats.data",
            })?;
            let values: Vec<f64> = seconds.iter().map(|s| s * NANOS_PER_SECOND).collect();

            debug!(benchmark = %name, samples = values.len(), "parsed pytest benchmark");
            results.push(BenchResult::new(
                dut.clone(),
                ctx.test_bed.clone(),
                name,
                values,
                UNITS_NANOSECONDS,
                None,
                raw.to_string(),
            )?);
        }

        Ok(results)
    }
}
