// Copyright 2025 Lance Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! GitHub REST access.
//!
//! Everything the tooling needs from the hosting platform goes through
//! [`HostingApi`]; [`GitHubClient`] is the `reqwest` implementation.

use crate::{GitHubError, Result, DEFAULT_REPOSITORY, DEFAULT_WORKFLOW_REPOSITORY};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

/// Default REST endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = "lance-bench";

/// Collaborator permission level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Admin,
    Write,
    Read,
    #[serde(other)]
    None,
}

impl Permission {
    /// Whether this level may trigger benchmark runs.
    pub fn can_trigger(self) -> bool {
        matches!(self, Self::Admin | Self::Write)
    }
}

/// A commit on a branch, as listed by the commits endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitSummary {
    pub sha: String,
    /// First line of the commit message.
    pub title: String,
}

/// Hosting platform operations used by lance-bench.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HostingApi: Send + Sync {
    /// Permission of `user` on `repo`; users that are not collaborators
    /// have [`Permission::None`].
    async fn collaborator_permission(&self, repo: &str, user: &str) -> Result<Permission>;

    /// Login of the user who opened the pull request.
    async fn pull_request_author(&self, repo: &str, number: u64) -> Result<String>;

    async fn post_comment(&self, repo: &str, number: u64, body: &str) -> Result<()>;

    /// Start a `workflow_dispatch` run.
    async fn dispatch_workflow(
        &self,
        repo: &str,
        workflow: &str,
        git_ref: &str,
        inputs: &Value,
    ) -> Result<()>;

    /// Newest-first commits of `branch`.
    async fn recent_commits(
        &self,
        repo: &str,
        branch: &str,
        limit: usize,
    ) -> Result<Vec<CommitSummary>>;
}

/// Endpoint and credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubConfig {
    pub api_url: String,
    /// Token for reads and comments.
    pub token: Option<String>,
    /// Token allowed to start workflows.
    pub dispatch_token: Option<String>,
    /// Repository being benchmarked.
    pub repository: String,
    /// Repository that owns the benchmark workflows.
    pub workflow_repository: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            dispatch_token: None,
            repository: DEFAULT_REPOSITORY.to_string(),
            workflow_repository: DEFAULT_WORKFLOW_REPOSITORY.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PermissionResponse {
    permission: Permission,
}

#[derive(Debug, Deserialize)]
struct PullRequestResponse {
    user: UserResponse,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    login: String,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    sha: String,
    commit: CommitDetail,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    #[serde(default)]
    message: String,
}

/// [`HostingApi`] over the GitHub REST API.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    config: GitHubConfig,
}

impl GitHubClient {
    pub fn new(config: GitHubConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &GitHubConfig {
        &self.config
    }

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let url = format!(
            "{}/{}",
            self.config.api_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        let builder = self.http.request(method, url);
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn read_token(&self) -> Option<&str> {
        self.config.token.as_deref()
    }
}

async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().to_string();
    let message = response.text().await.unwrap_or_default();
    Err(GitHubError::Api {
        status: status.as_u16(),
        url,
        message,
    })
}

#[async_trait]
impl HostingApi for GitHubClient {
    async fn collaborator_permission(&self, repo: &str, user: &str) -> Result<Permission> {
        let path = format!("repos/{repo}/collaborators/{user}/permission");
        let response = self
            .request(Method::GET, &path, self.read_token())
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(repo, user, "user is not a collaborator");
            return Ok(Permission::None);
        }
        let body: PermissionResponse = check(response).await?.json().await?;
        debug!(repo, user, permission = ?body.permission, "fetched collaborator permission");
        Ok(body.permission)
    }

    async fn pull_request_author(&self, repo: &str, number: u64) -> Result<String> {
        let path = format!("repos/{repo}/pulls/{number}");
        let response = self
            .request(Method::GET, &path, self.read_token())
            .send()
            .await?;
        let body: PullRequestResponse = check(response).await?.json().await?;
        Ok(body.user.login)
    }

    async fn post_comment(&self, repo: &str, number: u64, body: &str) -> Result<()> {
        let token = self.read_token().ok_or(GitHubError::MissingToken("comment"))?;
        let path = format!("repos/{repo}/issues/{number}/comments");
        let response = self
            .request(Method::POST, &path, Some(token))
            .json(&json!({ "body": body }))
            .send()
            .await?;
        check(response).await?;
        info!(repo, pr_number = number, "posted comment");
        Ok(())
    }

    async fn dispatch_workflow(
        &self,
        repo: &str,
        workflow: &str,
        git_ref: &str,
        inputs: &Value,
    ) -> Result<()> {
        let token = self
            .config
            .dispatch_token
            .as_deref()
            .ok_or(GitHubError::MissingToken("dispatch"))?;
        let path = format!("repos/{repo}/actions/workflows/{workflow}/dispatches");
        let response = self
            .request(Method::POST, &path, Some(token))
            .json(&json!({ "ref": git_ref, "inputs": inputs }))
            .send()
            .await?;
        check(response).await?;
        info!(repo, workflow, git_ref, "dispatched workflow");
        Ok(())
    }

    async fn recent_commits(
        &self,
        repo: &str,
        branch: &str,
        limit: usize,
    ) -> Result<Vec<CommitSummary>> {
        let path = format!("repos/{repo}/commits");
        let per_page = limit.clamp(1, 100).to_string();
        let response = self
            .request(Method::GET, &path, self.read_token())
            .query(&[("sha", branch), ("per_page", per_page.as_str())])
            .send()
            .await?;
        let commits: Vec<CommitResponse> = check(response).await?.json().await?;
        Ok(commits
            .into_iter()
            .take(limit)
            .map(|c| CommitSummary {
                title: c.commit.message.lines().next().unwrap_or_default().to_string(),
                sha: c.sha,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GitHubClient {
        GitHubClient::new(GitHubConfig {
            api_url: "https://github.example.com/api/v3/".to_string(),
            token: Some("read-token".to_string()),
            ..GitHubConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn requests_are_rooted_at_the_api_url() {
        let request = client()
            .request(Method::GET, "/repos/lance-format/lance/pulls/7", Some("t0ken"))
            .build()
            .unwrap();
        assert_eq!(
            request.url().as_str(),
            "https://github.example.com/api/v3/repos/lance-format/lance/pulls/7"
        );
        assert_eq!(request.headers()["authorization"], "Bearer t0ken");
    }

    #[test]
    fn unauthenticated_requests_carry_no_token() {
        let request = client()
            .request(Method::GET, "rate_limit", None)
            .build()
            .unwrap();
        assert!(request.headers().get("authorization").is_none());
    }

    #[test]
    fn permission_levels() {
        let parse = |raw: &str| {
            serde_json::from_str::<PermissionResponse>(&format!(r#"{{"permission":"{raw}"}}"#))
                .unwrap()
                .permission
        };
        assert_eq!(parse("admin"), Permission::Admin);
        assert_eq!(parse("write"), Permission::Write);
        assert_eq!(parse("read"), Permission::Read);
        assert_eq!(parse("none"), Permission::None);
        assert_eq!(parse("triage"), Permission::None);
        assert!(Permission::Write.can_trigger());
        assert!(!Permission::Read.can_trigger());
    }

    #[tokio::test]
    async fn dispatch_without_token_is_a_config_error() {
        let err = client()
            .dispatch_workflow("lance-format/lance-bench", "run.yml", "main", &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, GitHubError::MissingToken("dispatch")));
    }
}
