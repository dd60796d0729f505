// Copyright 2025 Lance Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Benchmark harness adapters.
//!
//! This crate turns the native output of each benchmarking harness into
//! normalized [`BenchResult`] records:
//!
//! - **Criterion**: line-delimited JSON, nanosecond samples copied through
//! - **pytest-benchmark**: one JSON document, second samples scaled to nanoseconds
//! - **DBpedia**: recall lines from the vector-search benchmark
//!
//! All adapters share test-bed capture ([`testbed`]), DUT resolution
//! ([`dut`]) and record construction ([`BenchResult::new`]), so field
//! semantics cannot drift between harnesses.
//!
//! # Example
//!
//! ```ignore
//! use lance_bench_adapters::{ingest, DutSpec, IngestContext, ReportFormat};
//!
//! let ctx = IngestContext::capture(None, DutSpec::new("pylance"));
//! let results = ingest(ReportFormat::Pytest, &report_json, &ctx)?;
//! ```

#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod criterion;
pub mod dbpedia;
pub mod dut;
pub mod pytest;
pub mod testbed;

pub use criterion::CriterionAdapter;
pub use dbpedia::DbpediaAdapter;
pub use dut::{DutSpec, EmbeddedCommit};
pub use pytest::PytestAdapter;
pub use testbed::capture_test_bed;

use lance_bench_benchmarks::{BenchResult, SchemaError, TestBed};
use std::fmt;
use thiserror::Error;
use tracing::info;

/// Errors that can occur while ingesting a harness report.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// A line of a line-delimited report is not valid
    #[error("Malformed report line {line}: {source}")]
    MalformedLine {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// A JSON document report is not valid
    #[error("Malformed report: {0}")]
    MalformedDocument(#[source] serde_json::Error),

    /// Required field missing from a benchmark entry
    #[error("Benchmark '{benchmark}' is missing required field '{field}'")]
    MissingField {
        benchmark: String,
        field: &'static str,
    },

    /// Measurement unit the adapter does not store
    #[error("Benchmark '{benchmark}' reports unsupported unit '{unit}'")]
    UnsupportedUnit { benchmark: String, unit: String },

    /// Numeric field could not be parsed
    #[error("Invalid value '{value}' on line {line}")]
    InvalidValue { line: usize, value: String },

    /// No explicit version and no embedded commit metadata
    #[error("DUT version could not be determined: pass --dut-version (or --dut-commit with --dut-semver) or provide commit metadata in the report")]
    DutVersionUndetermined,

    /// No explicit timestamp and no embedded commit time
    #[error("DUT timestamp could not be determined: pass --dut-timestamp or provide commit metadata in the report")]
    DutTimestampUndetermined,

    /// The report produced no results at all
    #[error("No benchmark results found in {0} report")]
    EmptyReport(ReportFormat),

    /// Record construction failed
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Result type for adapter operations.
pub type Result<T> = std::result::Result<T, AdapterError>;

/// Supported harness output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Criterion,
    Pytest,
    Dbpedia,
}

impl ReportFormat {
    /// The adapter for this format.
    pub fn adapter(self) -> Box<dyn ReportAdapter> {
        match self {
            Self::Criterion => Box::new(CriterionAdapter),
            Self::Pytest => Box::new(PytestAdapter),
            Self::Dbpedia => Box::new(DbpediaAdapter),
        }
    }

    /// Conventional DUT name for results of this format.
    pub fn default_dut_name(self) -> &'static str {
        match self {
            Self::Criterion | Self::Dbpedia => "lance",
            Self::Pytest => "pylance",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Criterion => "criterion",
            Self::Pytest => "pytest-benchmark",
            Self::Dbpedia => "dbpedia",
        })
    }
}

/// Everything an adapter needs besides the report itself.
#[derive(Debug, Clone)]
pub struct IngestContext {
    pub test_bed: TestBed,
    pub dut: DutSpec,
}

impl IngestContext {
    /// Capture the local test bed and pair it with `dut`.
    pub fn capture(testbed_name: Option<&str>, dut: DutSpec) -> Self {
        Self {
            test_bed: capture_test_bed(testbed_name),
            dut,
        }
    }
}

/// A harness output parser.
///
/// Implementations must be all-or-nothing: any malformed entry fails the
/// whole report so nothing is partially published.
pub trait ReportAdapter {
    /// The format this adapter reads.
    fn format(&self) -> ReportFormat;

    /// Parse `input` into normalized results.
    fn parse(&self, input: &str, ctx: &IngestContext) -> Result<Vec<BenchResult>>;
}

/// Parse a report and require at least one result.
pub fn ingest(format: ReportFormat, input: &str, ctx: &IngestContext) -> Result<Vec<BenchResult>> {
    let results = format.adapter().parse(input, ctx)?;
    if results.is_empty() {
        return Err(AdapterError::EmptyReport(format));
    }
    info!(
        format = %format,
        count = results.len(),
        dut_version = %results[0].dut.version,
        test_bed = %ctx.test_bed.name,
        "ingested benchmark report"
    );
    Ok(results)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::context;

    #[test]
    fn empty_report_is_an_error() {
        let spec = DutSpec {
            version: Some("0.21.1+a1b2c3d".into()),
            timestamp: Some(1),
            ..DutSpec::new("lance")
        };
        let err = ingest(ReportFormat::Criterion, "\n\n", &context(spec.clone())).unwrap_err();
        assert!(matches!(err, AdapterError::EmptyReport(ReportFormat::Criterion)));

        let err = ingest(ReportFormat::Dbpedia, "nothing here", &context(spec)).unwrap_err();
        assert_eq!(err.to_string(), "No benchmark results found in dbpedia report");
    }

    #[test]
    fn adapters_report_their_format() {
        for format in [ReportFormat::Criterion, ReportFormat::Pytest, ReportFormat::Dbpedia] {
            assert_eq!(format.adapter().format(), format);
        }
        assert_eq!(ReportFormat::Pytest.default_dut_name(), "pylance");
    }
}
