use std::path::PathBuf;

use anyhow::{Context, Result};
use plume::{Blog, ConnectionManager, PlumeConfig, RedisExecutor};

use crate::output::OutputManager;

/// Settings resolved from the config file and command-line overrides.
pub struct CliContext {
    pub config_path: PathBuf,
    pub config: PlumeConfig,
    redis_url: Option<String>,
}

impl CliContext {
    /// Loads `--config`, or `.plume/config.toml` under the current directory.
    pub fn load(config_path: Option<PathBuf>, redis_url: Option<String>, prefix: Option<String>) -> Result<Self> {
        let config_path = match config_path {
            Some(path) => path,
            None => {
                let current_dir = std::env::current_dir().context("Failed to get current directory")?;
                PlumeConfig::default_path(&current_dir)
            }
        };
        let mut config = PlumeConfig::load(&config_path)?;
        if let Some(prefix) = prefix {
            config.keys.prefix = prefix;
        }
        Ok(Self {
            config_path,
            config,
            redis_url,
        })
    }

    /// `--redis-url` / `REDIS_URL` first, then the config file.
    pub fn redis_url(&self) -> Result<String> {
        match &self.redis_url {
            Some(url) => Ok(url.clone()),
            None => self.config.redis_url(),
        }
    }

    pub async fn connect(&self, output: &OutputManager) -> Result<Blog<RedisExecutor<ConnectionManager>>> {
        let url = self
            .redis_url()
            .context("REDIS_URL environment variable not set. Set it or pass --redis-url.")?;
        log::debug!("connecting to {url} (config {})", self.config_path.display());
        let blog = Blog::from_config(&self.config, &url)
            .await
            .context("Failed to connect to Redis")?;
        output.info(&format!(
            "Connected to Redis ({}:{})",
            self.config.keys.prefix, self.config.keys.service
        ));
        Ok(blog)
    }
}
