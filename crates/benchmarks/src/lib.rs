//! Normalized benchmark results for lance-bench.
//!
//! This crate defines the record shape every harness adapter produces and
//! the results store persists, plus the reporting built on top of it.
//!
//! # Quick Start
//!
//! ```no_run
//! use lance_bench_benchmarks::{BenchResult, DutBuild, DutVersion, TestBed, UNITS_NANOSECONDS};
//!
//! let version = DutVersion::new("0.21.1", "3f9c2d1e8b7a6c5d4e3f")?;
//! let dut = DutBuild::new("lance", version, 1_735_689_600);
//! let bed = TestBed {
//!     name: "runner".into(),
//!     cpu: "AMD EPYC".into(),
//!     memory_bytes: 1 << 36,
//!     os: "Linux".into(),
//! };
//! let result = BenchResult::new(dut, bed, "take/lance", vec![120.0, 118.5], UNITS_NANOSECONDS, None, "{}")?;
//! println!("{}: {} ns", result.benchmark_name, result.summary().mean);
//! # Ok::<(), lance_bench_benchmarks::SchemaError>(())
//! ```
//!
//! # Modules
//!
//! - [`result`] - The `BenchResult` record and its parts
//! - [`summary`] - Summary statistics over raw values
//! - [`version`] - `semver+short_sha` build versions
//! - [`compare`] - PR-versus-baseline comparison
//! - [`io`] - Reading and writing results as JSON
//! - [`markdown`] - Markdown report generation

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod compare;
pub mod io;
pub mod markdown;
pub mod result;
pub mod summary;
pub mod version;

pub use compare::{Comparison, Status};
pub use result::{BenchResult, DutBuild, TestBed, Throughput, UNITS_NANOSECONDS, UNITS_RECALL};
pub use summary::SummaryValues;
pub use version::{short_sha, DutVersion, SHORT_SHA_LEN};

use thiserror::Error;

/// Errors raised while building or validating records.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A result must carry at least one measurement.
    #[error("Benchmark '{0}' has no measured values")]
    EmptyValues(String),

    /// Version string does not match `semver+short_sha`.
    #[error("Invalid DUT version '{0}': expected '<semver>+<7-char commit>'")]
    InvalidVersion(String),

    /// Commit identifier is not a hex SHA of at least 7 characters.
    #[error("Invalid commit SHA '{0}': expected at least 7 hex characters")]
    InvalidCommit(String),
}
