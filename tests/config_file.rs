//! Integration tests for loading configuration from disk

use skillroute::cli::generate_config_template;
use skillroute::config::{Config, SecretStoreKind};
use skillroute::error::AppError;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[test]
fn test_template_loads_from_file() {
    let file = write_config(generate_config_template());
    let config = Config::from_file(file.path()).expect("template should load");

    assert_eq!(config.server.port, 3000);
    assert_eq!(config.classifier.model, "gpt-4o");
    assert_eq!(config.authorizer.secret_store, SecretStoreKind::Env);
    assert!(config.skills.contains_key("link_shortener"));
    assert!(config.functions.link_shortener.is_some());
}

#[test]
fn test_missing_file_reports_read_error_with_path() {
    let err = Config::from_file("/nonexistent/skillroute.toml").unwrap_err();
    match err {
        AppError::ConfigFileRead { path, .. } => assert!(path.contains("skillroute.toml")),
        other => panic!("expected ConfigFileRead, got {:?}", other),
    }
}

#[test]
fn test_invalid_toml_reports_parse_error() {
    let file = write_config("[server\nhost = ");
    let err = Config::from_file(file.path()).unwrap_err();
    assert!(matches!(err, AppError::ConfigParseFailed { .. }));
}

#[test]
fn test_invalid_values_report_validation_error() {
    let file = write_config(
        r#"
[server]
host = "127.0.0.1"
port = 3000

[skills.other]
function = "fallback"

[invoker]
base_url = "http://127.0.0.1:3000"

[authorizer]
secret_id = "ROUTER_BEARER_SECRET"
"#,
    );
    let err = Config::from_file(file.path()).unwrap_err();
    match err {
        AppError::ConfigValidationFailed { reason, .. } => assert!(reason.contains("catch-all")),
        other => panic!("expected ConfigValidationFailed, got {:?}", other),
    }
}
