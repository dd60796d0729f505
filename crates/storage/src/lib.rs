// Copyright 2025 Lance Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Persistent results store.
//!
//! Results live in a single `results` table reachable either through a
//! database URL (`postgres://`, `sqlite://`) or a local directory that holds
//! a SQLite file. Opening the store retries transient connection failures
//! with a bounded linear backoff.
//!
//! ```ignore
//! use lance_bench_storage::{ResultStore, StoreConfig};
//!
//! let store = ResultStore::connect(&StoreConfig::with_uri("/tmp/bench")).await?;
//! store.append(&results).await?;
//! let seen = store.has_version_matching("a1b2c3d").await?;
//! ```

#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod location;
pub mod retry;
pub mod store;

pub use location::{StoreConfig, StoreLocation};
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
pub use store::{ResultStore, VersionIndex};

use lance_bench_benchmarks::SchemaError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the results store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store stayed unreachable after every retry
    #[error("Could not open results store at {location} after {attempts} attempts: {source}")]
    Connection {
        location: String,
        attempts: u32,
        #[source]
        source: sqlx::Error,
    },

    /// A query failed on an open store
    #[error("Results store query failed: {0}")]
    Database(#[from] sqlx::Error),

    /// Local store directory could not be created
    #[error("Could not prepare results directory {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No location configured and no home directory to default to
    #[error("No results location configured and the home directory is unknown; set LANCE_BENCH_URI")]
    NoHomeDirectory,

    /// Version fragment is not a usable commit prefix
    #[error("Invalid version fragment '{0}': expected a non-empty hex commit prefix")]
    InvalidFragment(String),

    /// A stored row could not be turned back into a result
    #[error("Stored result {id} is corrupt: {reason}")]
    CorruptRow { id: String, reason: String },

    /// A restored row violates the record schema
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
