//! Tests for service configuration

use super::*;
use serial_test::serial;
use std::collections::HashMap;
use tempfile::TempDir;

fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |name| vars.get(name).cloned()
}

#[test]
fn test_service_config_default() {
    let config = ServiceConfig::default();

    assert_eq!(config.log_format, LogFormat::Pretty);
    assert_eq!(config.server.port, crate::DEFAULT_PORT);
    assert_eq!(config.store.backend, StoreBackend::Memory);
    assert_eq!(config.store.sqlite_path, PathBuf::from("promotions.db"));
    assert!(config.config_service.base_url.is_none());
    assert!(config.config_service.typed_snapshots);
    assert!(config.smoke_tests.probes.is_empty());
    assert_eq!(config.execution.queue_capacity, 64);
}

#[test]
fn test_load_full_toml_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path().join("promotion.toml");
    fs::write(
        &path,
        r#"
log_format = "json"

[server]
host = "127.0.0.1"
port = 9090

[store]
backend = "sqlite"
sqlite_path = "/var/lib/promotions.db"

[config_service]
base_url = "http://config:8081/api/v1"
typed_snapshots = false

[smoke_tests.probes]
production = ["https://prod.example.com/health", "https://prod.example.com/ready"]
"#,
    )
    .unwrap();

    let config = ServiceConfig::load(&path).unwrap();

    assert_eq!(config.log_format, LogFormat::Json);
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 9090);
    assert_eq!(config.store.backend, StoreBackend::Sqlite);
    assert_eq!(
        config.config_service.base_url.as_deref(),
        Some("http://config:8081/api/v1")
    );
    assert!(!config.config_service.typed_snapshots);
    assert_eq!(config.smoke_tests.probes["production"].len(), 2);
}

#[test]
fn test_partial_toml_keeps_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("promotion.toml");
    fs::write(&path, "[server]\nport = 7000\n").unwrap();

    let config = ServiceConfig::load(&path).unwrap();

    assert_eq!(config.server.port, 7000);
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.store, StoreConfig::default());
}

#[test]
fn test_load_nonexistent_file() {
    let result = ServiceConfig::load(Path::new("does_not_exist.toml"));

    assert!(matches!(result, Err(ConfigError::NotFound { .. })));
}

#[test]
fn test_load_invalid_toml() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("invalid.toml");
    fs::write(&path, "invalid = toml = syntax").unwrap();

    let result = ServiceConfig::load(&path);

    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn test_unknown_backend_in_file_is_parse_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("backend.toml");
    fs::write(&path, "[store]\nbackend = \"postgres\"\n").unwrap();

    assert!(matches!(
        ServiceConfig::load(&path),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn test_overrides_replace_file_values() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("promotion.toml");
    fs::write(&path, "[server]\nport = 7000\n").unwrap();
    let path_str = path.to_str().unwrap().to_string();

    let config = ServiceConfig::resolve(lookup_from(&[
        ("PROMOTION_CONFIG", path_str.as_str()),
        ("API_PORT", "7100"),
        ("API_HOST", "127.0.0.1"),
        ("PROMOTION_STORE", "SQLite"),
        ("PROMOTION_DB_PATH", "/tmp/p.db"),
        ("CONFIG_SERVICE_URL", "http://config:8081"),
        ("LOG_FORMAT", "json"),
    ]))
    .unwrap();

    assert_eq!(config.server.port, 7100);
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.store.backend, StoreBackend::Sqlite);
    assert_eq!(config.store.sqlite_path, PathBuf::from("/tmp/p.db"));
    assert_eq!(
        config.config_service.base_url.as_deref(),
        Some("http://config:8081")
    );
    assert_eq!(config.log_format, LogFormat::Json);
}

#[test]
fn test_invalid_port_override() {
    let result = ServiceConfig::resolve(lookup_from(&[("API_PORT", "eighty")]));

    match result {
        Err(ConfigError::InvalidValue { name, value, .. }) => {
            assert_eq!(name, "API_PORT");
            assert_eq!(value, "eighty");
        }
        other => panic!("Expected InvalidValue, got {:?}", other),
    }
}

#[test]
fn test_invalid_log_format_override() {
    let result = ServiceConfig::resolve(lookup_from(&[("LOG_FORMAT", "xml")]));

    assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
}

#[test]
#[serial]
fn test_from_env_reads_process_environment() {
    std::env::remove_var(CONFIG_PATH_ENV);
    std::env::set_var("API_PORT", "8181");
    std::env::set_var("PROMOTION_STORE", "memory");

    let config = ServiceConfig::from_env();

    std::env::remove_var("API_PORT");
    std::env::remove_var("PROMOTION_STORE");

    let config = config.unwrap();
    assert_eq!(config.server.port, 8181);
    assert_eq!(config.store.backend, StoreBackend::Memory);
}

#[test]
#[serial]
fn test_from_env_with_missing_config_file_fails() {
    std::env::set_var(CONFIG_PATH_ENV, "/nonexistent/promotion.toml");

    let result = ServiceConfig::from_env();

    std::env::remove_var(CONFIG_PATH_ENV);
    assert!(matches!(result, Err(ConfigError::NotFound { .. })));
}
