//! File-based target matrix
//!
//! Loads the list of endpoints and models to probe from a JSON file

use super::Settings;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Target matrix loaded from JSON file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetsFile {
    /// Endpoints to probe, in order
    pub targets: Vec<TargetConfig>,
}

/// One endpoint entry of the matrix
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Display name
    pub name: String,

    /// Base URL for the endpoint, including the version prefix
    #[serde(rename = "baseUrl")]
    pub base_url: String,

    /// API key (empty falls back to PROXY_API_KEY)
    #[serde(rename = "apiKey", default)]
    pub api_key: String,

    /// Models to run the battery against
    pub models: Vec<String>,
}

/// One resolved (endpoint, credential, model) triple
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub name: String,
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl TargetsFile {
    /// Load target matrix from JSON file
    pub fn load(path: &Path) -> Result<Self> {
        info!("Loading target matrix from: {:?}", path);

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read targets file: {:?}", path))?;

        let file: TargetsFile = serde_json::from_str(&content)
            .with_context(|| "Failed to parse targets JSON")?;

        file.validate()?;

        debug!("Loaded {} targets", file.targets.len());
        Ok(file)
    }

    /// Locate a target matrix file
    ///
    /// Searches in order:
    /// 1. the explicit path (PROBE_TARGETS_FILE), which must exist
    /// 2. ~/.config/chatprobe/targets.json
    /// 3. ./chatprobe.json
    ///
    /// Returns `None` when no file applies, so the run falls back to a single
    /// target built from the environment.
    pub fn locate(explicit: Option<&str>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            let path = PathBuf::from(path);
            if !path.exists() {
                anyhow::bail!("Targets file not found: {:?}", path);
            }
            return Ok(Some(path));
        }

        if let Some(home) = dirs::home_dir() {
            let config_path = home.join(".config").join("chatprobe").join("targets.json");
            if config_path.exists() {
                return Ok(Some(config_path));
            }
        }

        let local_path = Path::new("chatprobe.json");
        if local_path.exists() {
            return Ok(Some(local_path.to_path_buf()));
        }

        Ok(None)
    }

    /// Validate target matrix
    fn validate(&self) -> Result<()> {
        if self.targets.is_empty() {
            anyhow::bail!("At least one target must be configured");
        }

        for target in &self.targets {
            if !target.base_url.starts_with("http") {
                anyhow::bail!("Invalid base URL for target '{}': {}", target.name, target.base_url);
            }

            if target.models.is_empty() {
                anyhow::bail!("Target '{}' must have at least one model configured", target.name);
            }

            if target.models.iter().any(|m| m.trim().is_empty()) {
                anyhow::bail!("Target '{}' has an empty model name", target.name);
            }
        }

        Ok(())
    }

    /// Expand the matrix into one target per (endpoint, model)
    pub fn expand(&self, fallback_api_key: &str) -> Vec<Target> {
        self.targets
            .iter()
            .flat_map(|target| {
                let api_key = if target.api_key.is_empty() {
                    fallback_api_key.to_string()
                } else {
                    target.api_key.clone()
                };
                target.models.iter().map(move |model| Target {
                    name: target.name.clone(),
                    base_url: target.base_url.clone(),
                    api_key: api_key.clone(),
                    model: model.clone(),
                })
            })
            .collect()
    }
}

impl Target {
    /// Single target described by the environment settings
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            name: "default".to_string(),
            base_url: settings.endpoint.base_url.clone(),
            api_key: settings.endpoint.api_key.clone(),
            model: settings.endpoint.model.clone(),
        }
    }
}

/// Resolve every target the run should cover
pub fn resolve_targets(settings: &Settings) -> Result<Vec<Target>> {
    match TargetsFile::locate(settings.run.targets_file.as_deref())? {
        Some(path) => {
            let file = TargetsFile::load(&path)?;
            Ok(file.expand(&settings.endpoint.api_key))
        }
        None => Ok(vec![Target::from_settings(settings)]),
    }
}
