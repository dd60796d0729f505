// Copyright 2025 Lance Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! End-to-end handling of a trigger comment.
//!
//! The comment arrives as a repository-dispatch payload. It is parsed,
//! the commenter is authorized, a reply is posted on the pull request and,
//! when a workflow is configured, the benchmark workflow is dispatched.
//! Only the accepted path dispatches anything.

use crate::auth::Authorizer;
use crate::client::HostingApi;
use crate::command::{BenchCommand, MENTION};
use crate::{GitHubError, Result, DEFAULT_REPOSITORY, DEFAULT_WORKFLOW_REPOSITORY};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use tracing::info;

/// A PR comment forwarded by the target repository.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommentEvent {
    #[serde(default)]
    pub comment_body: String,
    #[serde(default)]
    pub comment_user: String,
    #[serde(deserialize_with = "number_or_string")]
    pub pr_number: u64,
    #[serde(default)]
    pub pr_head_sha: String,
    #[serde(default = "default_repository")]
    pub repository: String,
}

fn default_repository() -> String {
    DEFAULT_REPOSITORY.to_string()
}

fn number_or_string<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }
    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

impl CommentEvent {
    /// Decode and validate a trigger payload.
    pub fn from_json(payload: &str) -> Result<Self> {
        let event: Self = serde_json::from_str(payload).map_err(GitHubError::InvalidPayload)?;
        if event.pr_number == 0 {
            return Err(GitHubError::InvalidEvent("pr_number must be positive".into()));
        }
        if event.comment_user.trim().is_empty() {
            return Err(GitHubError::InvalidEvent("comment_user is empty".into()));
        }
        if event.pr_head_sha.trim().is_empty() {
            return Err(GitHubError::InvalidEvent("pr_head_sha is empty".into()));
        }
        Ok(event)
    }
}

/// Where accepted runs are dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOptions {
    /// Workflow file to dispatch; `None` leaves running to the caller.
    pub workflow: Option<String>,
    pub workflow_repository: String,
    pub workflow_ref: String,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            workflow: None,
            workflow_repository: DEFAULT_WORKFLOW_REPOSITORY.to_string(),
            workflow_ref: "main".to_string(),
        }
    }
}

/// The run an accepted comment asks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunRequest {
    pub commit_sha: String,
    pub pr_number: u64,
    pub pr_repo: String,
    pub run_rust: bool,
    pub run_python: bool,
    pub crates: Vec<String>,
    pub user: String,
    pub summary: String,
}

impl RunRequest {
    fn new(event: &CommentEvent, command: &BenchCommand) -> Self {
        Self {
            commit_sha: event.pr_head_sha.clone(),
            pr_number: event.pr_number,
            pr_repo: event.repository.clone(),
            run_rust: command.runs_rust(),
            run_python: command.runs_python(),
            crates: command.crates.iter().cloned().collect(),
            user: event.comment_user.clone(),
            summary: command.summary(),
        }
    }

    /// `workflow_dispatch` inputs; GitHub only accepts strings.
    pub fn workflow_inputs(&self) -> Value {
        json!({
            "commit_sha": self.commit_sha,
            "pr_number": self.pr_number.to_string(),
            "run_rust": self.run_rust.to_string(),
            "run_python": self.run_python.to_string(),
            "crates": self.crates.join(","),
        })
    }

    /// Step outputs for the calling workflow job.
    pub fn github_outputs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("should_run", "true".to_string()),
            ("commit_sha", self.commit_sha.clone()),
            ("pr_number", self.pr_number.to_string()),
            ("run_rust", self.run_rust.to_string()),
            ("run_python", self.run_python.to_string()),
            ("crates", self.crates.join(",")),
            ("config_summary", self.summary.clone()),
        ]
    }
}

/// Why a command was turned down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Unauthorized,
    NotRunnable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentOutcome {
    /// Not addressed to the bot.
    Ignored,
    Rejected(Rejection),
    Accepted(RunRequest),
}

impl CommentOutcome {
    pub fn should_run(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }
}

/// Handle one trigger comment.
pub async fn process_comment(
    api: &dyn HostingApi,
    event: &CommentEvent,
    options: &ProcessOptions,
) -> Result<CommentOutcome> {
    let Some(command) = BenchCommand::parse(&event.comment_body) else {
        info!(user = %event.comment_user, pr_number = event.pr_number, "comment is not a benchmark command");
        return Ok(CommentOutcome::Ignored);
    };
    info!(user = %event.comment_user, pr_number = event.pr_number, ?command, "parsed benchmark command");

    let authorization = Authorizer::new(api)
        .authorize(&event.repository, event.pr_number, &event.comment_user)
        .await;
    if !authorization.is_granted() {
        api.post_comment(&event.repository, event.pr_number, &unauthorized_message(event))
            .await?;
        return Ok(CommentOutcome::Rejected(Rejection::Unauthorized));
    }

    if !command.is_runnable() {
        api.post_comment(&event.repository, event.pr_number, &not_runnable_message(event))
            .await?;
        return Ok(CommentOutcome::Rejected(Rejection::NotRunnable));
    }

    let request = RunRequest::new(event, &command);
    api.post_comment(&event.repository, event.pr_number, &accepted_message(&request))
        .await?;

    if let Some(workflow) = &options.workflow {
        api.dispatch_workflow(
            &options.workflow_repository,
            workflow,
            &options.workflow_ref,
            &request.workflow_inputs(),
        )
        .await?;
    }

    Ok(CommentOutcome::Accepted(request))
}

fn short(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}

fn unauthorized_message(event: &CommentEvent) -> String {
    format!(
        "❌ @{}, you are not authorized to trigger benchmarks. \
         Only collaborators with write access and the pull request author can use `{MENTION} benchmark`.",
        event.comment_user
    )
}

fn not_runnable_message(event: &CommentEvent) -> String {
    format!(
        "⚠️ @{}, `--rust-only` and `--python-only` together select no benchmarks. Nothing was started.",
        event.comment_user
    )
}

fn accepted_message(request: &RunRequest) -> String {
    format!(
        "🚀 Benchmarks requested by @{} for `{}`: {}",
        request.user,
        short(&request.commit_sha),
        request.summary
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{MockHostingApi, Permission};

    fn event(body: &str, user: &str) -> CommentEvent {
        CommentEvent {
            comment_body: body.to_string(),
            comment_user: user.to_string(),
            pr_number: 4021,
            pr_head_sha: "a1b2c3d4e5f60718293a4b5c6d7e8f9012345678".to_string(),
            repository: "lance-format/lance".to_string(),
        }
    }

    fn with_workflow() -> ProcessOptions {
        ProcessOptions {
            workflow: Some("pr-benchmarks.yml".to_string()),
            ..ProcessOptions::default()
        }
    }

    #[test]
    fn payload_accepts_string_pr_number() {
        let event = CommentEvent::from_json(
            r#"{"comment_body":"@bench-bot benchmark","comment_user":"alice",
                "pr_number":"4021","pr_head_sha":"a1b2c3d"}"#,
        )
        .unwrap();
        assert_eq!(event.pr_number, 4021);
        assert_eq!(event.repository, "lance-format/lance");
    }

    #[test]
    fn payload_without_head_sha_is_rejected() {
        let err = CommentEvent::from_json(r#"{"comment_user":"alice","pr_number":1}"#).unwrap_err();
        assert!(matches!(err, GitHubError::InvalidEvent(_)));
        assert!(matches!(
            CommentEvent::from_json("not json"),
            Err(GitHubError::InvalidPayload(_))
        ));
    }

    #[tokio::test]
    async fn unrelated_comment_is_ignored() {
        let api = MockHostingApi::new();
        let outcome = process_comment(&api, &event("LGTM", "alice"), &with_workflow())
            .await
            .unwrap();
        assert_eq!(outcome, CommentOutcome::Ignored);
    }

    #[tokio::test]
    async fn unauthorized_user_gets_rejection_and_no_dispatch() {
        let mut api = MockHostingApi::new();
        api.expect_collaborator_permission()
            .returning(|_, _| Ok(Permission::None));
        api.expect_pull_request_author()
            .returning(|_, _| Ok("alice".to_string()));
        api.expect_post_comment()
            .withf(|repo, number, body| {
                repo == "lance-format/lance"
                    && *number == 4021
                    && body.contains("not authorized")
                    && body.contains("@mallory")
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        api.expect_dispatch_workflow().times(0);

        let outcome = process_comment(
            &api,
            &event("@bench-bot benchmark --rust-only", "mallory"),
            &with_workflow(),
        )
        .await
        .unwrap();
        assert_eq!(outcome, CommentOutcome::Rejected(Rejection::Unauthorized));
        assert!(!outcome.should_run());
    }

    #[tokio::test]
    async fn conflicting_flags_post_notice_without_dispatch() {
        let mut api = MockHostingApi::new();
        api.expect_collaborator_permission()
            .returning(|_, _| Ok(Permission::Admin));
        api.expect_post_comment()
            .withf(|_, _, body| body.contains("--python-only"))
            .times(1)
            .returning(|_, _, _| Ok(()));
        api.expect_dispatch_workflow().times(0);

        let outcome = process_comment(
            &api,
            &event("@bench-bot benchmark --rust-only --python-only", "alice"),
            &with_workflow(),
        )
        .await
        .unwrap();
        assert_eq!(outcome, CommentOutcome::Rejected(Rejection::NotRunnable));
    }

    #[tokio::test]
    async fn accepted_command_acknowledges_and_dispatches() {
        let mut api = MockHostingApi::new();
        api.expect_collaborator_permission()
            .returning(|_, _| Ok(Permission::Write));
        api.expect_post_comment()
            .withf(|_, _, body| body.contains("a1b2c3d") && body.contains("Rust crates: lance-io"))
            .times(1)
            .returning(|_, _, _| Ok(()));
        api.expect_dispatch_workflow()
            .withf(|repo, workflow, git_ref, inputs| {
                repo == "lance-format/lance-bench"
                    && workflow == "pr-benchmarks.yml"
                    && git_ref == "main"
                    && inputs["crates"] == "lance-io"
                    && inputs["run_python"] == "false"
                    && inputs["pr_number"] == "4021"
            })
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        let outcome = process_comment(
            &api,
            &event("@bench-bot benchmark --crate lance-io", "alice"),
            &with_workflow(),
        )
        .await
        .unwrap();

        let CommentOutcome::Accepted(request) = outcome else {
            panic!("expected an accepted command");
        };
        assert!(request.run_rust);
        assert!(!request.run_python);
        assert_eq!(request.crates, vec!["lance-io".to_string()]);
        let outputs = request.github_outputs();
        assert_eq!(outputs[0], ("should_run", "true".to_string()));
        assert!(outputs.contains(&("config_summary", "Rust crates: lance-io".to_string())));
    }

    #[tokio::test]
    async fn no_workflow_means_no_dispatch() {
        let mut api = MockHostingApi::new();
        api.expect_collaborator_permission()
            .returning(|_, _| Ok(Permission::Write));
        api.expect_post_comment().returning(|_, _, _| Ok(()));
        api.expect_dispatch_workflow().times(0);

        let outcome = process_comment(
            &api,
            &event("@bench-bot benchmark", "alice"),
            &ProcessOptions::default(),
        )
        .await
        .unwrap();
        assert!(outcome.should_run());
    }
}
