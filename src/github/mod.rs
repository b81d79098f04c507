pub mod client;
pub mod error;
pub mod session;
pub mod workflow;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::raw::{RawIssueDetails, RawItemRecord, StatusOption};
use crate::project::ProjectRef;

pub use client::GitHubClient;
pub use error::GitHubError;
pub use session::Session;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid repository '{0}', expected owner/repo")]
pub struct ParseRepoError(pub String);

impl FromStr for RepoRef {
    type Err = ParseRepoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once('/') {
            Some((owner, name))
                if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(Self {
                    owner: owner.to_string(),
                    name: name.to_string(),
                })
            }
            _ => Err(ParseRepoError(s.to_string())),
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Items of a project board together with the board's identity.
#[derive(Debug, Clone)]
pub struct ProjectItems {
    pub project: ProjectRef,
    pub items: Vec<RawItemRecord>,
}

/// Remote operations the rest of the crate depends on.
///
/// Reads return empty/`None` for failures that don't need the caller's
/// attention; authentication problems always surface as errors.
#[async_trait]
pub trait ProjectApi: Send + Sync {
    async fn get_project_items(&self, project_id: &str) -> Result<ProjectItems, GitHubError>;

    /// `None` when the project has no single-select `Status` field.
    async fn get_status_field(
        &self,
        project_id: &str,
    ) -> Result<Option<Vec<StatusOption>>, GitHubError>;

    async fn get_issue_details(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<Option<RawIssueDetails>, GitHubError>;

    /// Replaces the whole body. `false` when GitHub rejected the write.
    async fn update_issue_body(
        &self,
        repo: &RepoRef,
        number: u64,
        body: &str,
    ) -> Result<bool, GitHubError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_owner_and_name() {
        let repo: RepoRef = "acme/web".parse().unwrap();
        assert_eq!(repo.owner, "acme");
        assert_eq!(repo.name, "web");
        assert_eq!(repo.to_string(), "acme/web");
    }

    #[test]
    fn rejects_malformed_repo() {
        for bad in ["acme", "/web", "acme/", "a/b/c"] {
            assert!(bad.parse::<RepoRef>().is_err(), "{bad}");
        }
    }
}
