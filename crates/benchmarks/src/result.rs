//! Benchmark result types.
//!
//! This module provides the normalized `BenchResult` record written to the
//! results store, together with the build and machine descriptions it
//! carries.

use crate::summary::SummaryValues;
use crate::version::DutVersion;
use crate::SchemaError;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unit label for wall-clock timings.
pub const UNITS_NANOSECONDS: &str = "nanoseconds";

/// Unit label for search-quality measurements.
pub const UNITS_RECALL: &str = "recall";

/// The build that was benchmarked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DutBuild {
    /// Project name, e.g. `lance` or `pylance`.
    pub name: String,
    /// `semver+short_sha`.
    pub version: DutVersion,
    /// Commit time of the build, unix seconds.
    pub timestamp: i64,
}

impl DutBuild {
    /// Describe a build from its name, version and commit time.
    pub fn new(name: impl Into<String>, version: DutVersion, timestamp: i64) -> Self {
        Self {
            name: name.into(),
            version,
            timestamp,
        }
    }
}

/// The machine the benchmark ran on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestBed {
    /// Runner name, defaulting to the hostname.
    pub name: String,
    /// CPU brand string.
    pub cpu: String,
    /// Total physical memory.
    pub memory_bytes: u64,
    /// Operating system name and version.
    pub os: String,
}

/// Secondary rate reported by some harnesses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Throughput {
    /// Amount processed by one iteration.
    pub per_iteration: f64,
    /// Unit of `per_iteration`, e.g. `bytes` or `elements`.
    pub unit: String,
}

/// One normalized benchmark measurement event.
///
/// `values` and `summary` are private so the summary can only change by
/// recomputation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchResult {
    /// Generated when the record is built.
    pub id: Uuid,
    /// Build under test.
    pub dut: DutBuild,
    /// Machine the run happened on.
    pub test_bed: TestBed,
    /// Fully-qualified benchmark name.
    pub benchmark_name: String,
    values: Vec<f64>,
    summary: SummaryValues,
    /// Unit label of the raw values.
    pub units: String,
    /// Optional rate information from the harness.
    pub throughput: Option<Throughput>,
    /// Serialized copy of the harness output this record came from.
    pub metadata: String,
    /// Ingestion time, unix seconds.
    pub timestamp: i64,
}

impl BenchResult {
    /// Build a new record, computing its summary and stamping id and
    /// ingestion time.
    pub fn new(
        dut: DutBuild,
        test_bed: TestBed,
        benchmark_name: impl Into<String>,
        values: Vec<f64>,
        units: impl Into<String>,
        throughput: Option<Throughput>,
        metadata: impl Into<String>,
    ) -> Result<Self, SchemaError> {
        let benchmark_name = benchmark_name.into();
        let summary = SummaryValues::from_values(&values)
            .ok_or_else(|| SchemaError::EmptyValues(benchmark_name.clone()))?;
        Ok(Self {
            id: Uuid::new_v4(),
            dut,
            test_bed,
            benchmark_name,
            values,
            summary,
            units: units.into(),
            throughput,
            metadata: metadata.into(),
            timestamp: Utc::now().timestamp(),
        })
    }

    /// Rebuild a record read back from storage.
    ///
    /// The summary is recomputed from `values`; stored summary columns are
    /// never trusted over the raw data.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: Uuid,
        dut: DutBuild,
        test_bed: TestBed,
        benchmark_name: String,
        values: Vec<f64>,
        units: String,
        throughput: Option<Throughput>,
        metadata: String,
        timestamp: i64,
    ) -> Result<Self, SchemaError> {
        let mut result = Self::new(dut, test_bed, benchmark_name, values, units, throughput, metadata)?;
        result.id = id;
        result.timestamp = timestamp;
        Ok(result)
    }

    /// Raw measurements, in harness order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Statistics computed from [`Self::values`].
    pub fn summary(&self) -> &SummaryValues {
        &self.summary
    }

    /// Replace the raw values and recompute the summary.
    pub fn set_values(&mut self, values: Vec<f64>) -> Result<(), SchemaError> {
        self.summary = SummaryValues::from_values(&values)
            .ok_or_else(|| SchemaError::EmptyValues(self.benchmark_name.clone()))?;
        self.values = values;
        Ok(())
    }
}
