//! Run settings, optionally loaded from a YAML file.
//!
//! Every field has a default, so a settings file only needs to name the
//! values it changes:
//!
//! ```yaml
//! default_url: https://example.com/blog
//! request_delay_secs: 5
//! crawl:
//!   limit: 25
//! ```

use crate::models::CrawlConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument};

/// URL crawled when no source is given.
pub const DEFAULT_URL: &str = "https://mendable.ai/blog";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid settings file {path}: {source}")]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

/// Top-level run settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// URL used for `--default` or when no source flag is given.
    pub default_url: String,
    /// Pause between successive crawls, in seconds.
    pub request_delay_secs: u64,
    /// Timeout for the sitemap download, in seconds.
    pub sitemap_timeout_secs: u64,
    pub crawl: CrawlSettings,
    pub firecrawl: FirecrawlSettings,
    pub llm: LlmSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_url: DEFAULT_URL.to_string(),
            request_delay_secs: 2,
            sitemap_timeout_secs: 30,
            crawl: CrawlSettings::default(),
            firecrawl: FirecrawlSettings::default(),
            llm: LlmSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CrawlSettings {
    pub limit: u32,
    pub only_main_content: bool,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        let config = CrawlConfig::default();
        Self {
            limit: config.limit,
            only_main_content: config.only_main_content,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FirecrawlSettings {
    pub api_url: String,
    /// Delay between crawl-status polls, in seconds.
    pub poll_interval_secs: u64,
}

impl Default for FirecrawlSettings {
    fn default() -> Self {
        Self {
            api_url: "https://api.firecrawl.dev".to_string(),
            poll_interval_secs: 2,
        }
    }
}

/// Settings for the optional article-selection step.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LlmSettings {
    pub api_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub max_retries: usize,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_url: "https://api.anthropic.com".to_string(),
            model: "claude-3-5-sonnet-20240620".to_string(),
            max_tokens: 4096,
            max_retries: 5,
        }
    }
}

impl Settings {
    /// Load settings from `path`, or return the defaults when no path is given.
    #[instrument(level = "info")]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_yaml(&raw).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "Loaded settings file");
        Ok(settings)
    }

    /// Parse settings from YAML text. An empty document yields the defaults.
    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }

    /// The crawl parameters for this run.
    pub fn crawl_config(&self) -> CrawlConfig {
        CrawlConfig {
            limit: self.crawl.limit,
            only_main_content: self.crawl.only_main_content,
        }
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_secs(self.request_delay_secs)
    }

    pub fn sitemap_timeout(&self) -> Duration {
        Duration::from_secs(self.sitemap_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.firecrawl.poll_interval_secs)
    }
}
