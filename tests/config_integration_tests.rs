//! Integration tests for ConfigManager and the settings file
//!
//! These tests verify:
//! - Directory creation and default settings
//! - Partial YAML documents falling back per key
//! - Malformed files being reported instead of silently ignored
//! - Settings feeding the HTTP client

use cleandeck::config::SETTINGS_FILE;
use cleandeck::{ConfigManager, HttpCatalogClient, Settings};
use camino::Utf8PathBuf;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

fn create_test_config_dir() -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    (temp_dir, config_path)
}

#[test]
fn test_create_config_manager() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    assert_eq!(manager.config_dir(), config_path.as_path());
}

#[test]
fn test_creates_missing_config_dir() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let nested = config_path.join("cleandeck").join("conf");

    ConfigManager::new(&nested).unwrap();

    assert!(nested.is_dir());
}

#[test]
fn test_full_settings_file() {
    let (_temp_dir, config_path) = create_test_config_dir();
    fs::write(
        config_path.join(SETTINGS_FILE),
        r#"
backend:
  base_url: "http://127.0.0.1:9000/"
  request_timeout_ms: 500
  preview_path: "/api/preview"
ui:
  tick_interval_ms: 20
  status_reset_delay_ms: 800
logging:
  directory: "var/log"
  prefix: "deck"
  debug: true
  console: true
"#,
    )
    .unwrap();

    let settings = ConfigManager::new(&config_path)
        .unwrap()
        .load_settings()
        .unwrap();

    assert_eq!(settings.backend.base_url, "http://127.0.0.1:9000/");
    assert_eq!(settings.backend.request_timeout(), Duration::from_millis(500));
    assert_eq!(settings.backend.preview_path, "/api/preview");
    assert_eq!(settings.ui.tick_interval(), Duration::from_millis(20));
    assert_eq!(settings.ui.status_reset_delay(), Duration::from_millis(800));
    assert_eq!(settings.logging.directory, "var/log");
    assert!(settings.logging.debug);
    assert!(settings.logging.console);
}

#[test]
fn test_partial_settings_fall_back_per_key() {
    let (_temp_dir, config_path) = create_test_config_dir();
    fs::write(
        config_path.join(SETTINGS_FILE),
        "backend:\n  request_timeout_ms: 10000\n",
    )
    .unwrap();

    let settings = ConfigManager::new(&config_path)
        .unwrap()
        .load_settings()
        .unwrap();

    let defaults = Settings::default();
    assert_eq!(settings.backend.request_timeout_ms, 10000);
    assert_eq!(settings.backend.base_url, defaults.backend.base_url);
    assert_eq!(settings.backend.preview_path, "/api/analyze");
    assert_eq!(settings.ui, defaults.ui);
    assert_eq!(settings.logging, defaults.logging);
}

#[test]
fn test_malformed_settings_is_an_error() {
    let (_temp_dir, config_path) = create_test_config_dir();
    fs::write(
        config_path.join(SETTINGS_FILE),
        "backend:\n  request_timeout_ms: soon\n",
    )
    .unwrap();

    let err = ConfigManager::new(&config_path)
        .unwrap()
        .load_settings()
        .unwrap_err();

    assert!(
        err.to_string().contains("Failed to parse settings"),
        "unexpected error: {:#}",
        err
    );
}

#[test]
fn test_settings_build_http_client() {
    let (_temp_dir, config_path) = create_test_config_dir();
    fs::write(
        config_path.join(SETTINGS_FILE),
        "backend:\n  base_url: \"http://127.0.0.1:9000/\"\n",
    )
    .unwrap();

    let settings = ConfigManager::new(&config_path)
        .unwrap()
        .load_settings()
        .unwrap();
    let client = HttpCatalogClient::new(&settings.backend).unwrap();

    // Trailing slash is trimmed so joined paths don't double up
    assert_eq!(client.base_url(), "http://127.0.0.1:9000");
}
