use std::env;
use std::fs::write;

use lexdeck::config::{load_config, API_KEY_ENV};
use lexdeck::{Conformance, EngineConfig};
use serial_test::serial;
use tempfile::NamedTempFile;

fn config_file(yaml: &str) -> NamedTempFile {
    let file = NamedTempFile::new().expect("temp file");
    write(file.path(), yaml).unwrap();
    file
}

/// Static YAML plus the API key from the environment produces a full config.
#[tokio::test]
#[serial]
async fn test_load_config_success_injects_api_key() {
    let file = config_file(
        r#"
engine:
  default_timeout_ms: 30000
  deck_temperature: 0.3
provider:
  endpoint: "https://llm.example.com/v1"
  model: "legal-large"
  conformance: L2
"#,
    );
    env::set_var(API_KEY_ENV, "top-secret-test-key");

    let config = load_config(file.path()).expect("Config should load");

    assert_eq!(config.engine.default_timeout_ms, 30_000);
    assert_eq!(config.engine.deck_temperature, 0.3);
    // unspecified engine fields keep their defaults
    assert_eq!(config.engine.max_tokens, EngineConfig::default().max_tokens);
    assert_eq!(config.provider.endpoint, "https://llm.example.com/v1");
    assert_eq!(config.provider.model, "legal-large");
    assert_eq!(config.provider.conformance, Conformance::FreeText);
    assert_eq!(config.provider.api_key, "top-secret-test-key");
    assert!(!format!("{:?}", config.provider).contains("top-secret-test-key"));
}

/// Missing engine section and conformance fall back to defaults.
#[tokio::test]
#[serial]
async fn test_load_config_defaults() {
    let file = config_file(
        r#"
provider:
  endpoint: "https://llm.example.com/v1"
  model: "legal-large"
"#,
    );
    env::set_var(API_KEY_ENV, "key");

    let config = load_config(file.path()).unwrap();
    assert_eq!(config.engine, EngineConfig::default());
    assert_eq!(config.provider.conformance, Conformance::Strict);
}

#[tokio::test]
#[serial]
async fn test_load_config_errors_on_missing_api_key() {
    let file = config_file(
        r#"
provider:
  endpoint: "https://llm.example.com/v1"
  model: "legal-large"
"#,
    );
    env::remove_var(API_KEY_ENV);

    let err = load_config(file.path()).unwrap_err();
    assert!(
        err.to_string().contains(API_KEY_ENV),
        "Must error for missing env var, got: {err}"
    );
}

#[tokio::test]
#[serial]
async fn test_load_config_errors_for_invalid_file() {
    let file = config_file("provider: [this is: not valid");
    env::set_var(API_KEY_ENV, "key");

    let err = load_config(file.path()).unwrap_err();
    assert!(err.to_string().contains("YAML"), "got: {err}");
}

#[tokio::test]
#[serial]
async fn test_load_config_rejects_unknown_conformance() {
    let file = config_file(
        r#"
provider:
  endpoint: "https://llm.example.com/v1"
  model: "legal-large"
  conformance: telepathy
"#,
    );
    env::set_var(API_KEY_ENV, "key");

    let err = load_config(file.path()).unwrap_err();
    assert!(err.to_string().contains("telepathy"), "got: {err}");
}

#[tokio::test]
#[serial]
async fn test_load_config_rejects_zero_timeout() {
    let file = config_file(
        r#"
engine:
  default_timeout_ms: 0
provider:
  endpoint: "https://llm.example.com/v1"
  model: "legal-large"
"#,
    );
    env::set_var(API_KEY_ENV, "key");

    assert!(load_config(file.path()).is_err());
}

#[tokio::test]
#[serial]
async fn test_load_config_errors_for_missing_file() {
    env::set_var(API_KEY_ENV, "key");
    let err = load_config("/definitely/not/here.yaml").unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"), "got: {err}");
}
