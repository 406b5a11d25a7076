//! Probe configuration settings
//!
//! Defines all configuration structures and loading logic

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Credential used when `PROXY_API_KEY` is not set
pub const DEFAULT_API_KEY: &str = "your_proxy_api_key";
/// Endpoint used when `PROXY_BASE_URL` is not set
pub const DEFAULT_BASE_URL: &str = "http://localhost:8003/v1";
/// Model used when `PROXY_MODEL` is not set
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";

/// Main probe configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Endpoint configuration
    pub endpoint: EndpointConfig,
    /// Timeout configuration
    pub timeouts: TimeoutConfig,
    /// Run configuration
    pub run: RunConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Bearer credential
    pub api_key: String,
    /// API base URL, including the version prefix
    pub base_url: String,
    /// Model identifier sent with every scenario
    pub model: String,
}

/// Timeout configuration, in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Buffered request timeout
    pub request: u64,
    /// Overall deadline for one streamed exchange
    pub stream: u64,
    /// Maximum gap between two stream chunks
    pub stream_idle: u64,
}

/// Run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Run the health preflight before the battery
    pub health_check: bool,
    /// Check that the model list advertises each target's model
    pub models_check: bool,
    /// Optional target matrix file
    pub targets_file: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log format (text/json)
    pub format: String,
}

impl Settings {
    /// Create a new configuration instance from the environment
    pub fn new() -> Result<Self> {
        // Load .env file if it exists
        dotenv::dotenv().ok();

        let settings = Self {
            endpoint: EndpointConfig {
                api_key: get_env_or_default("PROXY_API_KEY", DEFAULT_API_KEY),
                base_url: get_env_or_default("PROXY_BASE_URL", DEFAULT_BASE_URL),
                model: get_env_or_default("PROXY_MODEL", DEFAULT_MODEL),
            },
            timeouts: TimeoutConfig {
                request: get_env_or_default("REQUEST_TIMEOUT", "30")
                    .parse()
                    .context("Invalid request timeout")?,
                stream: get_env_or_default("STREAM_TIMEOUT", "300")
                    .parse()
                    .context("Invalid stream timeout")?,
                stream_idle: get_env_or_default("STREAM_IDLE_TIMEOUT", "60")
                    .parse()
                    .context("Invalid stream idle timeout")?,
            },
            run: RunConfig {
                health_check: get_env_or_default("PROBE_HEALTH_CHECK", "false")
                    .parse()
                    .context("Invalid health check flag")?,
                models_check: get_env_or_default("PROBE_MODELS_CHECK", "false")
                    .parse()
                    .context("Invalid models check flag")?,
                targets_file: std::env::var("PROBE_TARGETS_FILE")
                    .ok()
                    .filter(|s| !s.trim().is_empty()),
            },
            logging: LoggingConfig {
                level: get_env_or_default("RUST_LOG", "warn"),
                format: get_env_or_default("LOG_FORMAT", "text"),
            },
        };

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration validity
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.api_key.is_empty() {
            anyhow::bail!("API key cannot be empty");
        }

        if !self.endpoint.base_url.starts_with("http") {
            anyhow::bail!("Invalid base URL format, should start with 'http'");
        }

        if self.endpoint.model.is_empty() {
            anyhow::bail!("Model cannot be empty");
        }

        if self.timeouts.request == 0 || self.timeouts.stream == 0 || self.timeouts.stream_idle == 0 {
            anyhow::bail!("Timeout values cannot be 0");
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            anyhow::bail!("Invalid log level: {}", self.logging.level);
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            anyhow::bail!("Invalid log format: {}", self.logging.format);
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.request)
    }

    pub fn stream_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.stream)
    }

    pub fn stream_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.stream_idle)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: EndpointConfig {
                api_key: DEFAULT_API_KEY.to_string(),
                base_url: DEFAULT_BASE_URL.to_string(),
                model: DEFAULT_MODEL.to_string(),
            },
            timeouts: TimeoutConfig {
                request: 30,
                stream: 300,
                stream_idle: 60,
            },
            run: RunConfig {
                health_check: false,
                models_check: false,
                targets_file: None,
            },
            logging: LoggingConfig {
                level: "warn".to_string(),
                format: "text".to_string(),
            },
        }
    }
}

/// Get environment variable or default value
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
