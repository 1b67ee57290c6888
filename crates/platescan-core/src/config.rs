//! Configuration system for Platescan.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $PLATESCAN_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/platescan/config.toml
//!   3. ~/.config/platescan/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatescanConfig {
    pub api: ApiConfig,
    pub engine: EngineSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Address the HTTP API binds to.
    pub bind_addr: String,
    pub port: u16,
    /// Upload size ceiling for the analyze endpoint.
    pub max_upload_bytes: u64,
    /// Accepted upload file extensions, lowercase.
    pub allowed_extensions: Vec<String>,
    /// How many food logs the log listing returns.
    pub log_list_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Worker pool size. 0 = available parallelism.
    pub max_workers: u32,
    /// Evict finished tasks older than N seconds. 0 = never.
    pub retention_secs: u64,
    /// How often the retention sweep runs.
    pub sweep_interval_secs: u64,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 9101,
            max_upload_bytes: 16 * 1024 * 1024,
            allowed_extensions: ["png", "jpg", "jpeg", "webp", "gif"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            log_list_limit: 50,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_workers: 2,
            retention_secs: 0,
            sweep_interval_secs: 60,
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("platescan")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl PlatescanConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            PlatescanConfig::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
        toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("PLATESCAN_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&PlatescanConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply PLATESCAN_* overrides. Unparseable values are ignored.
    fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("PLATESCAN_API__BIND_ADDR") {
            self.api.bind_addr = v;
        }
        if let Some(p) = var("PLATESCAN_API__PORT").and_then(|v| v.parse().ok()) {
            self.api.port = p;
        }
        if let Some(n) = var("PLATESCAN_API__MAX_UPLOAD_BYTES").and_then(|v| v.parse().ok()) {
            self.api.max_upload_bytes = n;
        }
        if let Some(n) = var("PLATESCAN_ENGINE__MAX_WORKERS").and_then(|v| v.parse().ok()) {
            self.engine.max_workers = n;
        }
        if let Some(n) = var("PLATESCAN_ENGINE__RETENTION_SECS").and_then(|v| v.parse().ok()) {
            self.engine.retention_secs = n;
        }
        if let Some(n) = var("PLATESCAN_ENGINE__SWEEP_INTERVAL_SECS").and_then(|v| v.parse().ok()) {
            self.engine.sweep_interval_secs = n;
        }
    }
}
