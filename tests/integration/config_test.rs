//! Configuration loading tests.

use dbx_query::config::{Config, WorkspaceConfig, DEFAULT_TIMEOUT_SECS};
use dbx_query::error::QueryError;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_full_config_file() {
    let file = write_config(
        r#"
[workspace]
host = "https://adb-123.azuredatabricks.net/"
token = "dapi-secret"
warehouse_id = "wh-42"

[execution]
timeout_secs = 45
poll_interval_ms = 250
max_concurrent_fetches = 2
"#,
    );

    let config = Config::load_from_file(file.path()).unwrap();

    assert_eq!(config.workspace.warehouse_id.as_deref(), Some("wh-42"));
    assert_eq!(config.execution.timeout(), Duration::from_secs(45));
    assert_eq!(
        config.execution.poll_policy().interval,
        Duration::from_millis(250)
    );
    assert_eq!(config.execution.max_concurrent_fetches, 2);

    let creds = config.workspace.credentials().unwrap();
    assert_eq!(creds.host, "https://adb-123.azuredatabricks.net");
    assert_eq!(creds.token, "dapi-secret");
}

#[test]
fn test_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load_from_file(&dir.path().join("absent.toml")).unwrap();

    assert_eq!(
        config.execution.timeout(),
        Duration::from_secs(DEFAULT_TIMEOUT_SECS)
    );
    assert!(config.workspace.host.is_none());
}

#[test]
fn test_malformed_file_is_config_error() {
    let file = write_config("[workspace\nhost = ");

    let err = Config::load_from_file(file.path()).unwrap_err();

    assert!(matches!(err, QueryError::Config(_)));
    assert_eq!(err.category(), "Configuration Error");
}

#[test]
fn test_zero_poll_interval_is_rejected() {
    let file = write_config("[execution]\npoll_interval_ms = 0\n");

    let err = Config::load_from_file(file.path()).unwrap_err();

    assert!(err.to_string().contains("poll_interval_ms"));
}

#[test]
fn test_cli_values_override_file_values() {
    let file = write_config(
        r#"
[workspace]
host = "https://file.cloud.databricks.com"
warehouse_id = "file-wh"
"#,
    );
    let config = Config::load_from_file(file.path()).unwrap();

    let mut workspace = config.workspace.clone();
    workspace.merge(&WorkspaceConfig {
        warehouse_id: Some("cli-wh".to_string()),
        ..Default::default()
    });

    assert_eq!(
        workspace.host.as_deref(),
        Some("https://file.cloud.databricks.com")
    );
    assert_eq!(workspace.warehouse_id.as_deref(), Some("cli-wh"));
}

#[test]
fn test_debug_output_hides_token() {
    let workspace = WorkspaceConfig {
        host: Some("https://ws.cloud.databricks.com".to_string()),
        token: Some("dapi-very-secret".to_string()),
        warehouse_id: None,
    };

    let debug = format!("{:?} {:?}", workspace, workspace.credentials().unwrap());

    assert!(!debug.contains("dapi-very-secret"));
    assert!(debug.contains("<redacted>"));
}
