mod tests;
mod logging_config;
pub mod config;

pub use config::{CacheConfig, Config, ConfigError, DatabaseConfig, SceneConfig, SessionConfig, XnatConfig};
pub use logging_config::LoggingConfig;

/// Structure representing application startup arguments or metadata.
#[derive(Debug)]
pub struct Cli {
    /// Path to the configuration file.
    pub config_path: String,
}

impl Cli {
    /// Creates a new `Cli` instance with the provided configuration path.
    pub fn new(config_path: String) -> Self {
        Self { config_path }
    }

    /// Reads and validates the configuration file this instance points at.
    pub fn load(&self) -> Result<Config, ConfigError> {
        Config::from_file(&self.config_path)
    }
}
