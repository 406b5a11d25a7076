//! Configuration module unit tests

use chatprobe::config::settings::{Settings, DEFAULT_API_KEY, DEFAULT_BASE_URL, DEFAULT_MODEL};
use chatprobe::config::{resolve_targets, TargetsFile};
use std::env;
use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;
use tempfile::NamedTempFile;

/// Tests in this file share the process environment
static ENV_LOCK: Mutex<()> = Mutex::new(());

const VARS: [&str; 11] = [
    "PROXY_API_KEY",
    "PROXY_BASE_URL",
    "PROXY_MODEL",
    "REQUEST_TIMEOUT",
    "STREAM_TIMEOUT",
    "STREAM_IDLE_TIMEOUT",
    "PROBE_HEALTH_CHECK",
    "PROBE_MODELS_CHECK",
    "PROBE_TARGETS_FILE",
    "RUST_LOG",
    "LOG_FORMAT",
];

/// Setup test environment variables
fn setup_test_env() {
    env::set_var("PROXY_API_KEY", "sk-probe-test");
    env::set_var("PROXY_BASE_URL", "http://127.0.0.1:9100/v1");
    env::set_var("PROXY_MODEL", "gpt-4o-mini");
    env::set_var("REQUEST_TIMEOUT", "15");
    env::set_var("STREAM_TIMEOUT", "120");
    env::set_var("STREAM_IDLE_TIMEOUT", "20");
    env::set_var("PROBE_HEALTH_CHECK", "true");
    env::set_var("PROBE_MODELS_CHECK", "true");
    env::set_var("RUST_LOG", "info");
    env::set_var("LOG_FORMAT", "json");
}

/// Clean up test environment variables
fn cleanup_test_env() {
    for var in &VARS {
        env::remove_var(var);
    }
    // Pin logging so an ambient RUST_LOG like "chatprobe=debug" cannot fail validation
    env::set_var("RUST_LOG", "warn");
    env::set_var("LOG_FORMAT", "text");
}

fn lock() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

#[test]
fn test_settings_creation_with_valid_env() {
    let _guard = lock();
    cleanup_test_env();
    setup_test_env();

    let settings = Settings::new().unwrap();
    assert_eq!(settings.endpoint.api_key, "sk-probe-test");
    assert_eq!(settings.endpoint.base_url, "http://127.0.0.1:9100/v1");
    assert_eq!(settings.endpoint.model, "gpt-4o-mini");
    assert_eq!(settings.request_timeout(), Duration::from_secs(15));
    assert_eq!(settings.stream_timeout(), Duration::from_secs(120));
    assert_eq!(settings.stream_idle_timeout(), Duration::from_secs(20));
    assert!(settings.run.health_check);
    assert!(settings.run.models_check);
    assert_eq!(settings.logging.level, "info");
    assert_eq!(settings.logging.format, "json");

    cleanup_test_env();
}

#[test]
fn test_settings_defaults() {
    let _guard = lock();
    cleanup_test_env();

    let settings = Settings::new().unwrap();
    assert_eq!(settings.endpoint.api_key, DEFAULT_API_KEY);
    assert_eq!(settings.endpoint.base_url, DEFAULT_BASE_URL);
    assert_eq!(settings.endpoint.model, DEFAULT_MODEL);
    assert_eq!(settings.request_timeout(), Duration::from_secs(30));
    assert_eq!(settings.stream_timeout(), Duration::from_secs(300));
    assert!(!settings.run.health_check);
    assert!(!settings.run.models_check);
    assert!(settings.run.targets_file.is_none());
}

#[test]
fn test_invalid_timeout_is_rejected() {
    let _guard = lock();
    cleanup_test_env();

    env::set_var("REQUEST_TIMEOUT", "soon");
    assert!(Settings::new().is_err());

    env::set_var("REQUEST_TIMEOUT", "0");
    assert!(Settings::new().is_err());

    cleanup_test_env();
}

#[test]
fn test_invalid_base_url_is_rejected() {
    let _guard = lock();
    cleanup_test_env();

    env::set_var("PROXY_BASE_URL", "localhost:8003/v1");
    let err = Settings::new().unwrap_err();
    assert!(err.to_string().contains("base URL"));

    cleanup_test_env();
}

#[test]
fn test_invalid_log_settings_are_rejected() {
    let _guard = lock();
    cleanup_test_env();

    env::set_var("LOG_FORMAT", "xml");
    assert!(Settings::new().is_err());

    env::set_var("LOG_FORMAT", "text");
    env::set_var("RUST_LOG", "verbose");
    assert!(Settings::new().is_err());

    cleanup_test_env();
}

#[test]
fn test_resolve_targets_from_matrix_file() {
    let _guard = lock();
    cleanup_test_env();

    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "targets": [
                {{ "name": "local", "baseUrl": "http://localhost:8003/v1", "models": ["m1", "m2"] }},
                {{ "name": "staging", "baseUrl": "https://staging.example.com/v1", "apiKey": "sk-staging", "models": ["m3"] }}
            ]
        }}"#
    )
    .unwrap();

    env::set_var("PROXY_API_KEY", "sk-env");
    env::set_var("PROBE_TARGETS_FILE", file.path());

    let settings = Settings::new().unwrap();
    let targets = resolve_targets(&settings).unwrap();

    assert_eq!(targets.len(), 3);
    assert_eq!(targets[0].model, "m1");
    assert_eq!(targets[1].model, "m2");
    assert_eq!(targets[0].api_key, "sk-env");
    assert_eq!(targets[2].name, "staging");
    assert_eq!(targets[2].api_key, "sk-staging");

    cleanup_test_env();
}

#[test]
fn test_missing_explicit_targets_file_is_error() {
    let _guard = lock();
    cleanup_test_env();

    env::set_var("PROBE_TARGETS_FILE", "/nonexistent/chatprobe/targets.json");
    let settings = Settings::new().unwrap();
    assert!(resolve_targets(&settings).is_err());

    cleanup_test_env();
}

#[test]
fn test_invalid_matrix_is_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, r#"{{ "targets": [ {{ "name": "x", "baseUrl": "http://h/v1", "models": [] }} ] }}"#).unwrap();

    let err = TargetsFile::load(file.path()).unwrap_err();
    assert!(err.to_string().contains("at least one model"));

    let mut empty = NamedTempFile::new().unwrap();
    write!(empty, r#"{{ "targets": [] }}"#).unwrap();
    assert!(TargetsFile::load(empty.path()).is_err());
}
