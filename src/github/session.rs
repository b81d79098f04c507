use anyhow::{Context, Result};
use tracing::debug;

use crate::config::AppConfig;

const TOKEN_ENV_VARS: [&str; 2] = ["GITHUB_TOKEN", "GH_TOKEN"];

/// Authenticated access to GitHub. Passed explicitly to every remote call.
#[derive(Clone)]
pub struct Session {
    token: String,
}

impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("token", &"<redacted>").finish()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Token from config or environment, without shelling out.
pub fn token_from_config_or_env(config: &AppConfig) -> Option<String> {
    non_empty(config.token.clone()).or_else(|| {
        TOKEN_ENV_VARS
            .iter()
            .find_map(|var| non_empty(std::env::var(var).ok()))
    })
}

async fn token_from_gh_cli() -> Result<Option<String>> {
    let output = tokio::process::Command::new("gh")
        .args(["auth", "token"])
        .output()
        .await
        .context("Failed to run gh CLI")?;

    if !output.status.success() {
        return Ok(None);
    }
    Ok(non_empty(Some(
        String::from_utf8_lossy(&output.stdout).to_string(),
    )))
}

/// Establishes a session from config, environment, then `gh auth token`.
/// Returns `None` when no token is available anywhere.
pub async fn establish(config: &AppConfig) -> Option<Session> {
    if let Some(token) = token_from_config_or_env(config) {
        return Some(Session::new(token));
    }
    match token_from_gh_cli().await {
        Ok(token) => token.map(Session::new),
        Err(e) => {
            debug!(error = %e, "gh auth token unavailable");
            None
        }
    }
}
