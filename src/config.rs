pub mod database;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub use database::{DatabaseConfig, DatabaseType};

pub const DEFAULT_CONFIG_FILE: &str = "foodgram.yml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub media: MediaConfig,
    pub pagination: PaginationConfig,
    pub security: SecurityConfig,
    pub cors: CorsConfig,
    pub log_level: String,
    pub auto_migrate: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub root: PathBuf,
    pub url: String,
    /// Largest image, before base64 encoding, that a recipe body may carry.
    pub max_image_bytes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub page_size: u64,
    pub max_page_size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub password_iterations: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Empty means any origin.
    pub allowed_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            media: MediaConfig::default(),
            pagination: PaginationConfig::default(),
            security: SecurityConfig::default(),
            cors: CorsConfig::default(),
            log_level: "info".to_string(),
            auto_migrate: false,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("media"),
            url: "/media".to_string(),
            max_image_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: 6,
            max_page_size: 100,
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            password_iterations: 390_000,
        }
    }
}

impl MediaConfig {
    /// Request body limit that fits one base64-encoded image plus the rest of the JSON.
    pub fn body_limit(&self) -> usize {
        self.max_image_bytes.div_ceil(3).saturating_mul(4).saturating_add(64 * 1024)
    }
}

impl Config {
    /// Loads the YAML config at `path`, falling back to defaults when the file is absent.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let source = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&source).with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn parse(source: &str) -> Result<Self> {
        let mut config: Config = serde_yml::from_str(source)?;
        config.database.expand_credentials()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.pagination.page_size == 0 {
            anyhow::bail!("pagination.page_size must be at least 1");
        }
        if self.pagination.max_page_size < self.pagination.page_size {
            anyhow::bail!("pagination.max_page_size must not be smaller than page_size");
        }
        if !self.media.url.starts_with('/') || self.media.url.trim_end_matches('/').is_empty() {
            anyhow::bail!("media.url must be an absolute path such as /media");
        }
        if self.media.max_image_bytes == 0 {
            anyhow::bail!("media.max_image_bytes must be at least 1");
        }
        if self.security.password_iterations == 0 {
            anyhow::bail!("security.password_iterations must be at least 1");
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

pub(crate) fn expand_env_vars(value: &str) -> Result<String> {
    let mut result = value.to_string();

    while let Some(start) = result.find("${") {
        let end = result[start..]
            .find('}')
            .ok_or_else(|| anyhow::anyhow!("Unclosed environment variable reference in: {value}"))?;
        let end = start + end;

        let var_name = &result[start + 2..end];
        let env_value = std::env::var(var_name)
            .map_err(|_| anyhow::anyhow!("Environment variable not found: {var_name}"))?;

        result.replace_range(start..end + 1, &env_value);
    }

    Ok(result)
}
