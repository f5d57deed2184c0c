//! TOML configuration.
//!
//! Every section is optional; a missing file yields [`Config::default`].
//! A file that exists but fails to parse or validate is an error.
//!
//! ```toml
//! [store]
//! path = "./data/memories.json"
//!
//! [server]
//! bind = "127.0.0.1:3737"
//!
//! [search]
//! default_limit = 50
//! max_limit = 1000
//!
//! [agent]
//! endpoint = "http://127.0.0.1:3737"
//! prefilter = true
//! timeout_secs = 10
//! queue_path = "./data/agent-queue.json"
//!
//! [scan]
//! include_globs = ["**/*.txt", "**/*.md", "**/*.html"]
//! exclude_globs = []
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub scan: ScanConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("./data/memories.json")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:3737".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

fn default_limit() -> usize {
    50
}
fn default_max_limit() -> usize {
    1000
}

#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_prefilter")]
    pub prefilter: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_queue_path")]
    pub queue_path: PathBuf,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            prefilter: default_prefilter(),
            timeout_secs: default_timeout_secs(),
            queue_path: default_queue_path(),
        }
    }
}

fn default_endpoint() -> String {
    "http://127.0.0.1:3737".to_string()
}
fn default_prefilter() -> bool {
    true
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_queue_path() -> PathBuf {
    PathBuf::from("./data/agent-queue.json")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScanConfig {
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
        }
    }
}

fn default_include_globs() -> Vec<String> {
    vec![
        "**/*.txt".to_string(),
        "**/*.md".to_string(),
        "**/*.html".to_string(),
    ]
}

/// Load and validate the configuration at `path`.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config = parse_config(&content)?;
    Ok(config)
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    if config.search.default_limit == 0 {
        anyhow::bail!("search.default_limit must be >= 1");
    }
    if config.search.max_limit < config.search.default_limit {
        anyhow::bail!("search.max_limit must be >= search.default_limit");
    }
    if config.agent.timeout_secs == 0 {
        anyhow::bail!("agent.timeout_secs must be > 0");
    }
    if !config.agent.endpoint.starts_with("http://") && !config.agent.endpoint.starts_with("https://")
    {
        anyhow::bail!(
            "agent.endpoint must be an http(s) URL, got '{}'",
            config.agent.endpoint
        );
    }

    Ok(config)
}
