// Copyright 2025 Lance Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Resolution of the build-under-test description.
//!
//! Every adapter goes through [`DutSpec::resolve`] so explicit arguments and
//! report-embedded commit metadata are combined the same way everywhere.

use crate::{AdapterError, Result};
use lance_bench_benchmarks::{DutBuild, DutVersion};
use tracing::{debug, warn};

/// Semantic version used when only a commit is known.
pub const PLACEHOLDER_SEMVER: &str = "0.0.0";

/// Caller-supplied DUT fields, as given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DutSpec {
    pub name: String,
    /// Full `semver+short_sha` version; wins over everything else.
    pub version: Option<String>,
    /// Semantic version to combine with a commit SHA.
    pub semver: Option<String>,
    /// Commit SHA to combine with `semver`.
    pub commit: Option<String>,
    /// Commit time, unix seconds.
    pub timestamp: Option<i64>,
}

/// Commit metadata some harnesses embed in their reports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbeddedCommit {
    pub sha: Option<String>,
    pub timestamp: Option<i64>,
}

impl DutSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Combine explicit fields with embedded metadata into a [`DutBuild`].
    ///
    /// Explicit values take precedence. Fails when neither source yields a
    /// version or a timestamp.
    pub fn resolve(&self, embedded: Option<&EmbeddedCommit>) -> Result<DutBuild> {
        let version = match (&self.version, &self.commit) {
            (Some(version), _) => DutVersion::parse(version)?,
            (None, Some(commit)) => DutVersion::new(self.semver_or_placeholder(), commit)?,
            (None, None) => match embedded.and_then(|e| e.sha.as_deref()) {
                Some(sha) => {
                    debug!(sha, "using commit id embedded in report");
                    DutVersion::new(self.semver_or_placeholder(), sha)?
                }
                None => return Err(AdapterError::DutVersionUndetermined),
            },
        };

        let timestamp = self
            .timestamp
            .or_else(|| embedded.and_then(|e| e.timestamp))
            .ok_or(AdapterError::DutTimestampUndetermined)?;

        Ok(DutBuild::new(self.name.clone(), version, timestamp))
    }

    fn semver_or_placeholder(&self) -> &str {
        match self.semver.as_deref() {
            Some(semver) => semver,
            None => {
                warn!(
                    placeholder = PLACEHOLDER_SEMVER,
                    "no semantic version given; storing placeholder semver with the commit"
                );
                PLACEHOLDER_SEMVER
            }
        }
    }
}
