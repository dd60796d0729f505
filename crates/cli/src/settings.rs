//! Process configuration, read once from the environment.

use config::{Config, ConfigError, Environment};
use lance_bench_github::client::DEFAULT_API_URL;
use lance_bench_github::{GitHubConfig, DEFAULT_REPOSITORY, DEFAULT_WORKFLOW_REPOSITORY};
use lance_bench_storage::StoreConfig;
use serde::Deserialize;
use std::collections::HashMap;

const ENV_PREFIX: &str = "LANCE_BENCH";
const GITHUB_TOKEN: &str = "GITHUB_TOKEN";

/// Resolved settings.
///
/// `LANCE_BENCH_<KEY>` variables map onto the lower-cased field names.
/// `GITHUB_TOKEN` is read as-is because CI provides it under that name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub db_username: Option<String>,
    #[serde(default)]
    pub db_password: Option<String>,
    #[serde(default)]
    pub github_token: Option<String>,
    #[serde(default)]
    pub dispatch_token: Option<String>,
    pub github_api_url: String,
    pub repository: String,
    pub workflow_repository: String,
}

impl Settings {
    /// Load from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_source(None)
    }

    /// Load from `source` instead of the process environment when given.
    pub fn from_source(source: Option<HashMap<String, String>>) -> Result<Self, ConfigError> {
        let github_token = match &source {
            Some(vars) => vars.get(GITHUB_TOKEN).cloned(),
            None => std::env::var(GITHUB_TOKEN).ok(),
        }
        .filter(|t| !t.is_empty());

        Config::builder()
            .set_default("github_api_url", DEFAULT_API_URL)?
            .set_default("repository", DEFAULT_REPOSITORY)?
            .set_default("workflow_repository", DEFAULT_WORKFLOW_REPOSITORY)?
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .source(source),
            )
            .set_override_option("github_token", github_token)?
            .build()?
            .try_deserialize()
    }

    pub fn store(&self) -> StoreConfig {
        StoreConfig {
            uri: self.uri.clone(),
            db_username: self.db_username.clone(),
            db_password: self.db_password.clone(),
        }
    }

    pub fn github(&self) -> GitHubConfig {
        GitHubConfig {
            api_url: self.github_api_url.clone(),
            token: self.github_token.clone(),
            dispatch_token: self.dispatch_token.clone(),
            repository: self.repository.clone(),
            workflow_repository: self.workflow_repository.clone(),
        }
    }

    /// Human-readable listing with secrets masked.
    pub fn describe(&self) -> Vec<(&'static str, String)> {
        let shown = |value: &Option<String>| value.clone().unwrap_or_else(|| "(unset)".to_string());
        let masked = |value: &Option<String>| match value {
            Some(_) => "***".to_string(),
            None => "(unset)".to_string(),
        };
        vec![
            ("uri", shown(&self.uri)),
            ("db_username", shown(&self.db_username)),
            ("db_password", masked(&self.db_password)),
            ("github_token", masked(&self.github_token)),
            ("dispatch_token", masked(&self.dispatch_token)),
            ("github_api_url", self.github_api_url.clone()),
            ("repository", self.repository.clone()),
            ("workflow_repository", self.workflow_repository.clone()),
        ]
    }
}
