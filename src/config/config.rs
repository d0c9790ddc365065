use crate::config::LoggingConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid XNAT host '{host}': {reason}")]
    InvalidHost { host: String, reason: String },

    #[error("Cache splitter must not be empty")]
    EmptySplitter,

    #[error("At least one DICOM file extension must be configured")]
    NoDicomExtensions,

    #[error("Log file path is required when log_to_file is enabled")]
    MissingLogFilePath,
}

/// Top-level application configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub xnat: XnatConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub scene: SceneConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote XNAT host
#[derive(Debug, Deserialize, Clone)]
pub struct XnatConfig {
    pub host: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Local download cache and reconciliation settings
#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
    /// Token after which remote and local paths are compared
    #[serde(default = "default_splitter")]
    pub splitter: String,
    #[serde(default = "default_dicom_extensions")]
    pub dicom_extensions: Vec<String>,
}

/// Local DICOM index. When `path` is unset no database is available and
/// downloads stop before extraction.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

/// Where loaded series are recorded
#[derive(Debug, Deserialize, Clone)]
pub struct SceneConfig {
    #[serde(default = "default_scene_dir")]
    pub dir: PathBuf,
}

/// Session tracking for later re-upload
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SessionConfig {
    pub log_path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            splitter: default_splitter(),
            dicom_extensions: default_dicom_extensions(),
        }
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            dir: default_scene_dir(),
        }
    }
}

impl Config {
    /// Read, parse and validate a TOML configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = url::Url::parse(&self.xnat.host).map_err(|e| ConfigError::InvalidHost {
            host: self.xnat.host.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidHost {
                host: self.xnat.host.clone(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        if self.cache.splitter.is_empty() {
            return Err(ConfigError::EmptySplitter);
        }
        if self.cache.dicom_extensions.is_empty() {
            return Err(ConfigError::NoDicomExtensions);
        }
        if self.logging.log_to_file && self.logging.log_file_path.trim().is_empty() {
            return Err(ConfigError::MissingLogFilePath);
        }
        Ok(())
    }
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./tmp/xnat")
}

fn default_splitter() -> String {
    "/experiments/".to_string()
}

fn default_dicom_extensions() -> Vec<String> {
    ["dcm", "ima", "dicom", "dic"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_scene_dir() -> PathBuf {
    PathBuf::from("./tmp/scene")
}
