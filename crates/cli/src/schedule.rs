//! Idempotent scheduling of benchmark runs.
//!
//! A commit is considered benchmarked when any stored result's version
//! contains its short SHA. Errors from the store are never turned into
//! "not benchmarked"; a failed check fails the run.

use lance_bench_benchmarks::{short_sha, SchemaError};
use lance_bench_github::{GitHubError, HostingApi};
use lance_bench_storage::{StoreError, VersionIndex};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error(transparent)]
    InvalidCommit(#[from] SchemaError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Hosting(#[from] GitHubError),
}

/// Whether results for `commit_sha` are already stored.
pub async fn has_results(index: &dyn VersionIndex, commit_sha: &str) -> Result<bool, ScheduleError> {
    let prefix = short_sha(commit_sha)?;
    let found = index.has_version_matching(&prefix).await?;
    debug!(commit = commit_sha, prefix = %prefix, found, "checked for existing results");
    Ok(found)
}

/// What to look at and where to dispatch.
#[derive(Debug, Clone)]
pub struct SchedulePlan {
    pub repository: String,
    pub branch: String,
    pub workflow_repository: String,
    pub workflow: String,
    pub workflow_ref: String,
    pub limit: usize,
    pub max_dispatch: usize,
    pub dry_run: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleReport {
    /// Commits that already had results.
    pub up_to_date: Vec<String>,
    /// Commits selected for a run (dispatched unless dry-run).
    pub scheduled: Vec<String>,
}

/// Dispatch runs for recent commits that have no results yet.
///
/// Commits are visited oldest first so history fills in chronologically.
pub async fn schedule_missing(
    api: &dyn HostingApi,
    index: &dyn VersionIndex,
    plan: &SchedulePlan,
) -> Result<ScheduleReport, ScheduleError> {
    let commits = api
        .recent_commits(&plan.repository, &plan.branch, plan.limit)
        .await?;
    info!(
        repository = %plan.repository,
        branch = %plan.branch,
        commits = commits.len(),
        "listed recent commits"
    );

    let mut report = ScheduleReport::default();
    for commit in commits.iter().rev() {
        if report.scheduled.len() >= plan.max_dispatch {
            break;
        }
        if has_results(index, &commit.sha).await? {
            report.up_to_date.push(commit.sha.clone());
            continue;
        }

        if plan.dry_run {
            info!(commit = %commit.sha, title = %commit.title, "dry run: would dispatch");
        } else {
            api.dispatch_workflow(
                &plan.workflow_repository,
                &plan.workflow,
                &plan.workflow_ref,
                &json!({ "commit_sha": commit.sha }),
            )
            .await?;
            info!(commit = %commit.sha, title = %commit.title, "dispatched benchmark run");
        }
        report.scheduled.push(commit.sha.clone());
    }

    Ok(report)
}
