//! Issue-body read-modify-write operations.
//!
//! Every write replaces the whole body. An edit made on GitHub between our
//! read and our write is lost; there is no compare-and-swap to detect it.

use anyhow::{bail, Context, Result};
use tracing::info;

use super::{ProjectApi, RepoRef};
use crate::body::{
    editable_template, merge_metadata, parse_branch_link, parse_metadata, remove_branch_link,
    set_branch_link, EmptyListPolicy, IssueMetadata,
};
use crate::git::{branch_name_for_issue, BranchCheckout};
use crate::model::item::NormalizedItem;
use crate::project::{normalize_items, sort_by_status, ProjectRef, StatusOrderIndex};

/// Normalized project items, ordered by status.
pub async fn load_board(
    api: &dyn ProjectApi,
    project_id: &str,
) -> Result<(ProjectRef, Vec<NormalizedItem>)> {
    let statuses = api
        .get_status_field(project_id)
        .await
        .context("Failed to fetch status field")?
        .map(|options| StatusOrderIndex::new(&options))
        .unwrap_or_else(StatusOrderIndex::empty);

    let fetched = api
        .get_project_items(project_id)
        .await
        .context("Failed to fetch project items")?;

    let mut items = normalize_items(fetched.items, &fetched.project, &statuses);
    sort_by_status(&mut items);
    Ok((fetched.project, items))
}

async fn read_body(api: &dyn ProjectApi, repo: &RepoRef, number: u64) -> Result<String> {
    let issue = api
        .get_issue_details(repo, number)
        .await
        .with_context(|| format!("Failed to read {repo}#{number}"))?;
    match issue {
        Some(issue) => Ok(issue.body),
        None => bail!("Issue {repo}#{number} not found"),
    }
}

async fn write_body(api: &dyn ProjectApi, repo: &RepoRef, number: u64, body: &str) -> Result<()> {
    let updated = api
        .update_issue_body(repo, number, body)
        .await
        .with_context(|| format!("Failed to update {repo}#{number}"))?;
    if !updated {
        bail!("GitHub did not accept the update to {repo}#{number}");
    }
    Ok(())
}

pub async fn linked_branch(
    api: &dyn ProjectApi,
    repo: &RepoRef,
    number: u64,
) -> Result<Option<String>> {
    Ok(api
        .get_issue_details(repo, number)
        .await
        .with_context(|| format!("Failed to read {repo}#{number}"))?
        .and_then(|issue| parse_branch_link(&issue.body)))
}

pub async fn link_branch(api: &dyn ProjectApi, repo: &RepoRef, number: u64, branch: &str) -> Result<()> {
    let body = read_body(api, repo, number).await?;
    write_body(api, repo, number, &set_branch_link(&body, branch)).await?;
    info!(repo = %repo, number, branch, "linked branch");
    Ok(())
}

/// Returns whether a link was present.
pub async fn unlink_branch(api: &dyn ProjectApi, repo: &RepoRef, number: u64) -> Result<bool> {
    let body = read_body(api, repo, number).await?;
    if parse_branch_link(&body).is_none() {
        return Ok(false);
    }
    write_body(api, repo, number, &remove_branch_link(&body)).await?;
    info!(repo = %repo, number, "unlinked branch");
    Ok(true)
}

/// Merges `overrides` into the issue's stored frontmatter and writes it back.
pub async fn apply_metadata(
    api: &dyn ProjectApi,
    repo: &RepoRef,
    number: u64,
    overrides: &IssueMetadata,
    policy: EmptyListPolicy,
) -> Result<IssueMetadata> {
    let body = read_body(api, repo, number).await?;
    let parsed = parse_metadata(&body);
    let merged = merge_metadata(&parsed.metadata, overrides, policy);
    write_body(api, repo, number, &editable_template(Some(&merged), &parsed.body)).await?;
    Ok(merged)
}

/// Checks out a branch for the issue and records it in the issue body.
/// An already linked branch is reused.
pub async fn start_work(
    api: &dyn ProjectApi,
    git: &dyn BranchCheckout,
    repo: &RepoRef,
    number: u64,
    prefix: Option<&str>,
) -> Result<String> {
    let issue = api
        .get_issue_details(repo, number)
        .await
        .with_context(|| format!("Failed to read {repo}#{number}"))?
        .with_context(|| format!("Issue {repo}#{number} not found"))?;

    if let Some(existing) = parse_branch_link(&issue.body) {
        git.checkout(&existing).await?;
        return Ok(existing);
    }

    let branch = branch_name_for_issue(prefix, issue.number, &issue.title);
    git.checkout(&branch).await?;
    write_body(api, repo, number, &set_branch_link(&issue.body, &branch)).await?;
    info!(repo = %repo, number, branch = %branch, "started work");
    Ok(branch)
}
