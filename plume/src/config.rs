use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Configuration stored in `.plume/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlumeConfig {
    #[serde(default)]
    pub redis: RedisSettings,
    #[serde(default)]
    pub keys: KeySettings,
    #[serde(default)]
    pub limits: Limits,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisSettings {
    #[serde(default = "default_redis_url")]
    pub url: String,
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
        }
    }
}

fn default_redis_url() -> String {
    "${REDIS_URL}".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeySettings {
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_service")]
    pub service: String,
}

impl Default for KeySettings {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            service: default_service(),
        }
    }
}

fn default_prefix() -> String {
    "plume".to_string()
}

fn default_service() -> String {
    "blog".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Limits {
    #[serde(default = "default_comment_max_chars")]
    pub comment_max_chars: usize,
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            comment_max_chars: default_comment_max_chars(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

fn default_comment_max_chars() -> usize {
    1000
}

fn default_page_size() -> u64 {
    20
}

fn default_max_page_size() -> u64 {
    100
}

impl Limits {
    /// Clamps a requested page size; zero means the default.
    pub fn page_size(&self, requested: u64) -> u64 {
        if requested == 0 {
            self.default_page_size
        } else {
            requested.min(self.max_page_size)
        }
    }
}

impl PlumeConfig {
    /// Default location relative to a project directory.
    pub fn default_path(root: &Path) -> PathBuf {
        root.join(".plume").join("config.toml")
    }

    /// Loads the config at `path`, or the defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let config: PlumeConfig =
            toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Get the Redis URL, expanding a `${VAR}` reference.
    pub fn redis_url(&self) -> Result<String> {
        let url = self.redis.url.as_str();
        if url.starts_with("${") && url.ends_with('}') {
            let var_name = &url[2..url.len() - 1];
            std::env::var(var_name).with_context(|| format!("Environment variable {var_name} not set"))
        } else {
            Ok(url.to_string())
        }
    }
}
