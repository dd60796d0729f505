// Copyright 2025 Lance Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Who may trigger a benchmark run.
//!
//! A commenter is allowed when they have write or admin permission on the
//! repository, or when they opened the pull request. Both checks hit the
//! API on every call. A failed lookup only closes that path.

use crate::client::{HostingApi, Permission};
use tracing::{debug, info, warn};

/// Outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    Collaborator(Permission),
    PullRequestAuthor,
    Denied,
}

impl Authorization {
    pub fn is_granted(self) -> bool {
        !matches!(self, Self::Denied)
    }
}

/// Checks commenters against the hosting platform.
pub struct Authorizer<'a> {
    api: &'a dyn HostingApi,
}

impl<'a> Authorizer<'a> {
    pub fn new(api: &'a dyn HostingApi) -> Self {
        Self { api }
    }

    pub async fn authorize(&self, repo: &str, pr_number: u64, user: &str) -> Authorization {
        match self.api.collaborator_permission(repo, user).await {
            Ok(permission) if permission.can_trigger() => {
                info!(user, ?permission, "authorized as collaborator");
                return Authorization::Collaborator(permission);
            }
            Ok(permission) => debug!(user, ?permission, "collaborator permission insufficient"),
            Err(e) => warn!(user, repo, error = %e, "collaborator permission lookup failed"),
        }

        match self.api.pull_request_author(repo, pr_number).await {
            Ok(author) if author.eq_ignore_ascii_case(user) => {
                info!(user, pr_number, "authorized as pull request author");
                return Authorization::PullRequestAuthor;
            }
            Ok(author) => debug!(user, author = %author, "commenter is not the pull request author"),
            Err(e) => warn!(user, repo, pr_number, error = %e, "pull request lookup failed"),
        }

        info!(user, repo, pr_number, "user is not authorized");
        Authorization::Denied
    }
}
