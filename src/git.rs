use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

/// Something that can put the working copy on a named branch.
#[async_trait]
pub trait BranchCheckout: Send + Sync {
    /// Creates `branch` if needed and checks it out.
    async fn checkout(&self, branch: &str) -> Result<()>;
}

pub fn slugify(title: &str) -> String {
    let mut slug = String::new();
    for c in title.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let trimmed: String = slug.trim_matches('-').chars().take(40).collect();
    trimmed.trim_end_matches('-').to_string()
}

/// `prefix/42-short-title`, or `42-short-title` without a prefix.
pub fn branch_name_for_issue(prefix: Option<&str>, number: u64, title: &str) -> String {
    let slug = slugify(title);
    let leaf = if slug.is_empty() {
        number.to_string()
    } else {
        format!("{number}-{slug}")
    };
    match prefix.map(|p| p.trim_matches('/')).filter(|p| !p.is_empty()) {
        Some(prefix) => format!("{prefix}/{leaf}"),
        None => leaf,
    }
}

pub struct GitCheckout {
    repo_root: PathBuf,
}

impl GitCheckout {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
        }
    }

    async fn run_git(&self, args: &[&str]) -> Result<()> {
        let output = tokio::process::Command::new("git")
            .args(args)
            .current_dir(&self.repo_root)
            .output()
            .await
            .with_context(|| format!("Failed to run git {}", args.join(" ")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("git {} failed: {}", args.join(" "), stderr.trim());
        }
        Ok(())
    }
}

#[async_trait]
impl BranchCheckout for GitCheckout {
    async fn checkout(&self, branch: &str) -> Result<()> {
        if self.run_git(&["checkout", "-b", branch]).await.is_ok() {
            debug!(branch, "created branch");
            return Ok(());
        }
        // Branch already exists
        self.run_git(&["checkout", branch]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Add login validation"), "add-login-validation");
        assert_eq!(slugify("Fix bug #42!"), "fix-bug-42");
        assert_eq!(slugify("  ---  "), "");
    }

    #[test]
    fn slug_is_capped_without_trailing_dash() {
        let slug = slugify("a very long title that keeps going well past the limit we allow");
        assert!(slug.len() <= 40);
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn test_branch_name_for_issue() {
        assert_eq!(
            branch_name_for_issue(Some("alice"), 42, "Add login"),
            "alice/42-add-login"
        );
        assert_eq!(branch_name_for_issue(None, 42, "Add login"), "42-add-login");
        assert_eq!(branch_name_for_issue(Some("/"), 7, "!!!"), "7");
    }
}
