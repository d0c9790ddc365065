pub mod cache;
pub mod classify;
pub mod config;
pub mod database;
pub mod error;
pub mod plugins;
pub mod remote;
pub mod scene;
pub mod selection;
pub mod session;
pub mod staging;
pub mod uri;
pub mod workflow;

use crate::config::LoggingConfig;
use tracing_subscriber::{self, prelude::*, EnvFilter};

pub use error::{Result, WorkflowError};

/// Initialize logging; RUST_LOG overrides the configured level.
pub fn init_logging(config: &LoggingConfig) -> std::io::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    let file_appender = if config.log_to_file {
        let file = std::fs::File::create(&config.log_file_path)?;
        Some(
            tracing_subscriber::fmt::layer()
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file)),
        )
    } else {
        None
    };

    let stdout_appender = tracing_subscriber::fmt::layer()
        .with_file(true)
        .with_line_number(true);

    // A subscriber may already be installed (tests, embedding hosts)
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(file_appender)
        .with(stdout_appender)
        .try_init();
    Ok(())
}
