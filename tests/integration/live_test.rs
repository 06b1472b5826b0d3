//! Tests against a real Databricks workspace.
//!
//! Skipped unless DATABRICKS_HOST, DATABRICKS_TOKEN and DATABRICKS_WAREHOUSE_ID are set.

use dbx_query::config::{ExecutionConfig, WorkspaceConfig};
use dbx_query::error::QueryError;
use dbx_query::query::QueryExecutor;
use dbx_query::transport::HttpTransport;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Helper to create an executor and warehouse id from the environment.
fn get_test_executor() -> Option<(QueryExecutor, String)> {
    let mut workspace = WorkspaceConfig::default();
    workspace.apply_env_defaults();
    let warehouse = workspace.warehouse_id.clone()?;
    let credentials = workspace.credentials().ok()?;

    let execution = ExecutionConfig::default();
    let transport = HttpTransport::new(&credentials, execution.request_timeout()).ok()?;
    Some((
        QueryExecutor::new(Arc::new(transport), &execution),
        warehouse,
    ))
}

#[tokio::test]
async fn test_live_select_literal() {
    let Some((executor, warehouse)) = get_test_executor() else {
        eprintln!("Skipping test: DATABRICKS_* not set");
        return;
    };

    let result = executor
        .execute_sql_query(&warehouse, "SELECT 1 AS num, 'hello' AS greeting", 120)
        .await
        .unwrap();

    assert_eq!(result.row_count, 1);
    assert_eq!(result.schema.columns.len(), 2);
    assert_eq!(result.schema.columns[0].name, "num");
    // JSON_ARRAY results carry every cell as a string.
    assert_eq!(result.data_array[0][1], json!("hello"));
}

#[tokio::test]
async fn test_live_syntax_error() {
    let Some((executor, warehouse)) = get_test_executor() else {
        eprintln!("Skipping test: DATABRICKS_* not set");
        return;
    };

    let err = executor
        .execute(&warehouse, "SELEC nonsense", Duration::from_secs(120))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        QueryError::RemoteExecutionFailed { .. } | QueryError::RemoteRejection(_)
    ));
}
