use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration table from spec.md §6, loaded from a TOML file and then
/// overridden by `PGCAT_`-prefixed environment variables (the file wins
/// over built-in defaults, the environment wins over the file).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database_url: String,
    #[serde(default = "default_namespaces")]
    pub namespaces: Vec<String>,
    #[serde(default)]
    pub excluded_objects: Vec<String>,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub watcher: WatcherConfig,
    #[serde(default)]
    pub request: RequestConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    pub min: usize,
    pub max: usize,
    pub max_lifetime_s: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min: 1,
            max: 10,
            max_lifetime_s: 1800,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    pub default_limit: i64,
    pub max_limit: i64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: 50,
            max_limit: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    pub debounce_ms: u64,
    pub heartbeat_s: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 250,
            heartbeat_s: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestConfig {
    pub timeout_s: u64,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self { timeout_s: 30 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Pretty,
    Json,
}

fn default_namespaces() -> Vec<String> {
    vec!["public".to_string()]
}

impl Config {
    pub fn from_path(path: &Path) -> Result<Self> {
        if path.extension().and_then(|s| s.to_str()) != Some("toml") {
            return Err(anyhow::anyhow!("only .toml config files are supported"));
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let mut config: Config =
            toml::from_str(&content).with_context(|| "failed to parse TOML config")?;
        config.apply_env_overrides();
        if config.database_url.is_empty() {
            return Err(anyhow::anyhow!(
                "database_url is not set in the config file or PGCAT_DATABASE_URL"
            ));
        }
        Ok(config)
    }

    /// Environment always wins over the file, matching a deployable
    /// service's usual precedence (the teacher's config is file-only since
    /// it is a developer CLI, not a long-running process).
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("PGCAT_DATABASE_URL") {
            self.database_url = url;
        }
        if let Ok(namespaces) = std::env::var("PGCAT_NAMESPACES") {
            self.namespaces = namespaces.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(level) = std::env::var("PGCAT_LOG_LEVEL") {
            self.log.level = level;
        }
        if let Ok(max) = std::env::var("PGCAT_POOL_MAX") {
            if let Ok(max) = max.parse() {
                self.pool.max = max;
            }
        }
    }

    pub fn compiled_excluded_objects(&self) -> Result<Vec<regex::Regex>> {
        self.excluded_objects
            .iter()
            .map(|pattern| regex::Regex::new(pattern).context("invalid excluded_objects regex"))
            .collect()
    }
}

pub fn find_config_file() -> Option<PathBuf> {
    let candidates = ["pgcat.toml"];
    candidates
        .into_iter()
        .map(PathBuf::from)
        .find(|path| path.exists())
}
