use query_core::{ConfigError, OrchestratorConfig};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_partial_file_keeps_defaults() {
    let file = write_config(
        r#"
chunk_size = 25

[retry]
period_secs = 2
"#,
    );

    let config = OrchestratorConfig::load(file.path().to_str().unwrap()).unwrap();

    assert_eq!(config.chunk_size, 25);
    assert_eq!(config.max_page_size, 20);
    assert_eq!(config.retry.period_secs, 2);
    assert_eq!(config.retry.duration_secs, 240);
    assert_eq!(config.retry.initial_delay(), Duration::from_secs(2));
    assert_eq!(config.retry.policy().attempts(), 120);
    assert_eq!(config.logging.file_prefix, "query-core");
}

#[test]
fn test_load_rejects_zero_chunk_size() {
    let file = write_config("chunk_size = 0\n");

    let err = OrchestratorConfig::load(file.path().to_str().unwrap()).unwrap_err();

    assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "chunk_size"));
}

#[test]
fn test_load_rejects_budget_shorter_than_period() {
    let file = write_config(
        r#"
[retry]
period_secs = 30
duration_secs = 10
"#,
    );

    let err = OrchestratorConfig::load(file.path().to_str().unwrap()).unwrap_err();

    assert!(
        matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "retry.duration_secs")
    );
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    let err = OrchestratorConfig::load(path.to_str().unwrap()).unwrap_err();

    assert!(matches!(err, ConfigError::Load { .. }));
}

#[test]
fn test_environment_overrides_file() {
    let file = write_config("max_pages_per_chunk = 50\n");
    std::env::set_var("QUERY_CORE__MAX_PAGES_PER_CHUNK", "7");

    let config = OrchestratorConfig::load(file.path().to_str().unwrap());
    std::env::remove_var("QUERY_CORE__MAX_PAGES_PER_CHUNK");

    assert_eq!(config.unwrap().max_pages_per_chunk, 7);
}

#[test]
fn test_default_config_is_valid() {
    let config = OrchestratorConfig::default();
    assert!(config.validate().is_ok());

    let invalid = OrchestratorConfig {
        max_page_size: 0,
        ..OrchestratorConfig::default()
    };
    assert!(invalid.validate().is_err());
}
