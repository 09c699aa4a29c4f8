use crate::traits::FileSystem;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const CLOUDMAP_DIR: &str = ".cloudmap";
const CONFIG_FILE: &str = "config.yaml";

/// Engine configuration (`~/.cloudmap/config.yaml`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Timeout for URL content fetched by the content tags
    pub http_timeout_secs: u64,
    pub checker: CheckerConfig,
    pub image_cache: ImageCacheConfig,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    pub timeout_secs: u64,
    pub interval_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageCacheConfig {
    pub capacity: usize,
    /// `null` keeps entries until evicted
    pub ttl_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_millis: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_timeout_secs: 10,
            checker: CheckerConfig::default(),
            image_cache: ImageCacheConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 180,
            interval_secs: 5,
        }
    }
}

impl Default for ImageCacheConfig {
    fn default() -> Self {
        Self {
            capacity: 64,
            ttl_secs: Some(3600),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_millis: 200,
        }
    }
}

impl Config {
    /// Load from `path`, or from the default location when `None`.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(fs: &dyn FileSystem, path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match default_path() {
                Some(p) => (p, false),
                None => return Ok(Self::default()),
            },
        };

        if !fs.exists(&path) {
            if explicit {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            return Ok(Self::default());
        }

        let content = fs
            .read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn checker_timeout(&self) -> Duration {
        Duration::from_secs(self.checker.timeout_secs)
    }

    pub fn checker_interval(&self) -> Duration {
        Duration::from_secs(self.checker.interval_secs)
    }

    pub fn image_cache_ttl(&self) -> Option<Duration> {
        self.image_cache.ttl_secs.map(Duration::from_secs)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry.base_delay_millis)
    }
}

fn default_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CLOUDMAP_DIR).join(CONFIG_FILE))
}
