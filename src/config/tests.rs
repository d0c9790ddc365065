#![cfg(test)]

use std::path::PathBuf;

use crate::config::config::{Config, ConfigError};

/// Parse a TOML string into a `Config` and run the project's validation logic.
fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    let cfg: Config = toml::from_str(toml_str)?;
    cfg.validate()?;
    Ok(cfg)
}

#[test]
fn test_minimal_config_uses_defaults() {
    let toml = r#"
        [xnat]
        host = "https://central.xnat.org"
    "#;

    let config = load_config_from_str(toml).expect("minimal config should validate");

    assert_eq!(config.xnat.timeout_secs, 120);
    assert_eq!(config.cache.splitter, "/experiments/");
    assert_eq!(config.cache.dir, PathBuf::from("./tmp/xnat"));
    assert_eq!(config.cache.dicom_extensions, vec!["dcm", "ima", "dicom", "dic"]);
    assert!(config.database.path.is_none());
    assert!(config.session.log_path.is_none());
    assert!(!config.logging.log_to_file);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_full_config() {
    let toml = r#"
        [xnat]
        host = "http://localhost:8080"
        timeout_secs = 5

        [cache]
        dir = "/var/cache/xnat"
        splitter = "/subjects/"
        dicom_extensions = ["dcm"]

        [database]
        path = "/var/lib/xnat/dicom.redb"

        [scene]
        dir = "/var/lib/xnat/scene"

        [session]
        log_path = "/var/lib/xnat/sessions.jsonl"

        [logging]
        log_to_file = true
        log_file_path = "/var/log/xnat-loader.log"
        level = "debug"
    "#;

    let config = load_config_from_str(toml).expect("full config should validate");

    assert_eq!(config.xnat.timeout_secs, 5);
    assert_eq!(config.cache.splitter, "/subjects/");
    assert_eq!(
        config.database.path,
        Some(PathBuf::from("/var/lib/xnat/dicom.redb"))
    );
    assert_eq!(
        config.session.log_path,
        Some(PathBuf::from("/var/lib/xnat/sessions.jsonl"))
    );
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_invalid_host_rejected() {
    let toml = r#"
        [xnat]
        host = "ftp://example.org"
    "#;

    let err = load_config_from_str(toml).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidHost { .. }));
}

#[test]
fn test_empty_splitter_rejected() {
    let toml = r#"
        [xnat]
        host = "https://example.org"

        [cache]
        splitter = ""
    "#;

    let err = load_config_from_str(toml).unwrap_err();
    assert!(matches!(err, ConfigError::EmptySplitter));
}

#[test]
fn test_log_file_required_when_logging_to_file() {
    let toml = r#"
        [xnat]
        host = "https://example.org"

        [logging]
        log_to_file = true
    "#;

    let err = load_config_from_str(toml).unwrap_err();
    assert!(matches!(err, ConfigError::MissingLogFilePath));
}

#[test]
fn test_missing_xnat_section_fails_to_parse() {
    let err = load_config_from_str("[cache]\ndir = \"/tmp\"").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn test_from_file_reports_missing_file() {
    let err = Config::from_file("/no/such/config.toml").unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}
