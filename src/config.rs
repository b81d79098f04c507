use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::body::EmptyListPolicy;
use crate::github::client::DEFAULT_API_URL;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub token: Option<String>,
    pub api_url: String,
    /// Prepended to branch names created by `ghp start`.
    pub branch_prefix: Option<String>,
    pub empty_override: EmptyListPolicy,
    /// Short aliases for project node ids.
    pub projects: HashMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: DEFAULT_API_URL.to_string(),
            branch_prefix: None,
            empty_override: EmptyListPolicy::default(),
            projects: HashMap::new(),
        }
    }
}

impl AppConfig {
    /// Project node id for an alias, or the argument itself.
    pub fn resolve_project<'a>(&'a self, name: &'a str) -> &'a str {
        self.projects.get(name).map(String::as_str).unwrap_or(name)
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ghp")
        .join("config.toml")
}

pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config: AppConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(config)
}

pub fn load_config() -> Result<AppConfig> {
    load_config_from(&config_path())
}
