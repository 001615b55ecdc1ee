//! TOML configuration.
//!
//! ```toml
//! [api]
//! addr = "127.0.0.1"
//! port = 8080
//! page_size = 100
//! request_delay_ms = 100
//!
//! [paths]
//! xml_dir = "works/xml"
//! text_dir = "works/text"
//! relations_csv = "blake-relations.csv"
//! output_csv = "blake_superfast_matches.csv"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

/// Connection settings for the Superfastmatch service.
#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub addr: String,
    pub port: u32,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_page_size() -> usize {
    100
}
fn default_request_delay_ms() -> u64 {
    100
}
fn default_timeout_secs() -> u64 {
    30
}

impl ApiConfig {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}/", self.addr, self.port)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PathsConfig {
    #[serde(default = "default_xml_dir")]
    pub xml_dir: PathBuf,
    #[serde(default = "default_text_dir")]
    pub text_dir: PathBuf,
    #[serde(default = "default_relations_csv")]
    pub relations_csv: PathBuf,
    #[serde(default = "default_output_csv")]
    pub output_csv: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            xml_dir: default_xml_dir(),
            text_dir: default_text_dir(),
            relations_csv: default_relations_csv(),
            output_csv: default_output_csv(),
        }
    }
}

fn default_xml_dir() -> PathBuf {
    PathBuf::from("works/xml")
}
fn default_text_dir() -> PathBuf {
    PathBuf::from("works/text")
}
fn default_relations_csv() -> PathBuf {
    PathBuf::from("blake-relations.csv")
}
fn default_output_csv() -> PathBuf {
    PathBuf::from("blake_superfast_matches.csv")
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    if config.api.addr.trim().is_empty() {
        anyhow::bail!("api.addr must not be empty");
    }

    if config.api.port == 0 || config.api.port > u16::MAX as u32 {
        anyhow::bail!("api.port must be in [1, 65535], got {}", config.api.port);
    }

    if config.api.page_size == 0 {
        anyhow::bail!("api.page_size must be >= 1");
    }

    Ok(config)
}
