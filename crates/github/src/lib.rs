// Copyright 2025 Lance Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! GitHub-facing pieces of lance-bench.
//!
//! - [`command`]: parse `@bench-bot benchmark ...` comments into a [`BenchCommand`]
//! - [`auth`]: decide whether a commenter may trigger a run
//! - [`comment`]: the end-to-end comment flow (reply, dispatch)
//! - [`client`]: the [`HostingApi`] seam and its REST implementation

#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod auth;
pub mod client;
pub mod command;
pub mod comment;

pub use auth::{Authorization, Authorizer};
pub use client::{CommitSummary, GitHubClient, GitHubConfig, HostingApi, Permission};
pub use command::BenchCommand;
pub use comment::{process_comment, CommentEvent, CommentOutcome, ProcessOptions, Rejection, RunRequest};

use thiserror::Error;

/// Repository benchmarks run against unless configured otherwise.
pub const DEFAULT_REPOSITORY: &str = "lance-format/lance";

/// Repository hosting the benchmark workflows.
pub const DEFAULT_WORKFLOW_REPOSITORY: &str = "lance-format/lance-bench";

/// Errors raised while talking to GitHub.
#[derive(Debug, Error)]
pub enum GitHubError {
    /// Transport-level failure
    #[error("GitHub request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response
    #[error("GitHub API returned {status} for {url}: {message}")]
    Api {
        status: u16,
        url: String,
        message: String,
    },

    /// Required credential absent
    #[error("GitHub {0} token is not configured")]
    MissingToken(&'static str),

    /// Trigger payload could not be decoded
    #[error("Invalid trigger payload: {0}")]
    InvalidPayload(#[source] serde_json::Error),

    /// Trigger payload decoded but is unusable
    #[error("Invalid trigger event: {0}")]
    InvalidEvent(String),
}

/// Result type for GitHub operations.
pub type Result<T> = std::result::Result<T, GitHubError>;
