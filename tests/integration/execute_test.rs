//! End-to-end execution tests.
//!
//! Submit, poll and assemble against the scripted transport.

use dbx_query::config::ExecutionConfig;
use dbx_query::error::QueryError;
use dbx_query::query::{PollPolicy, QueryExecutor};
use dbx_query::transport::{
    ColumnInfo, ExternalLink, MockCall, MockTransport, ResultManifest, ResultPayload,
    StatementRequest, StatementResponse, StatementState,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_test::{assert_err, assert_ok};

fn executor(mock: &Arc<MockTransport>) -> QueryExecutor {
    QueryExecutor::new(mock.clone(), &ExecutionConfig::default())
}

fn manifest() -> ResultManifest {
    ResultManifest::with_columns(vec![ColumnInfo::new("id", "INT")])
}

#[tokio::test(start_paused = true)]
async fn test_inline_result_needs_no_polling() {
    let mock = Arc::new(
        MockTransport::new().on_submit(
            StatementResponse::with_state("01ef-a", StatementState::Succeeded)
                .with_manifest(manifest())
                .with_inline_rows(vec![vec![json!(1)], vec![json!(2)]]),
        ),
    );

    let result = assert_ok!(
        executor(&mock)
            .execute_sql_query("wh-1", "SELECT id FROM range(2)", 30)
            .await
    );

    assert_eq!(result.data_array, vec![vec![json!(1)], vec![json!(2)]]);
    assert_eq!(result.row_count, 2);
    assert_eq!(result.schema.columns[0].name, "id");
    assert_eq!(mock.status_calls(), 0);
    assert!(mock.fetched_links().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_chunked_result_is_polled_and_reassembled_in_order() {
    let mock = Arc::new(
        MockTransport::new()
            .on_submit(StatementResponse::with_state("01ef-b", StatementState::Pending))
            .then_status(StatementResponse::with_state("01ef-b", StatementState::Running))
            .then_status(
                StatementResponse::with_state("01ef-b", StatementState::Succeeded)
                    .with_manifest(manifest().with_chunk_count(2))
                    .with_external_links(vec![
                        ExternalLink::new(1, "https://storage/chunk-1"),
                        ExternalLink::new(0, "https://storage/chunk-0"),
                    ]),
            )
            .with_chunk("https://storage/chunk-1", vec![vec![json!(3)]])
            .with_delayed_chunk(
                "https://storage/chunk-0",
                vec![vec![json!(1)], vec![json!(2)]],
                Duration::from_millis(500),
            ),
    );

    let outcome = assert_ok!(
        executor(&mock)
            .execute_detailed("wh-1", "SELECT id FROM t", Duration::from_secs(60))
            .await
    );

    assert_eq!(
        outcome.result.data_array,
        vec![vec![json!(1)], vec![json!(2)], vec![json!(3)]]
    );
    assert_eq!(outcome.result.row_count, 3);
    assert_eq!(
        outcome.observed,
        vec![
            StatementState::Pending,
            StatementState::Running,
            StatementState::Succeeded
        ]
    );
    assert_eq!(mock.status_calls(), 2);

    let mut fetched = mock.fetched_links();
    fetched.sort();
    assert_eq!(
        fetched,
        vec!["https://storage/chunk-0", "https://storage/chunk-1"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_submission_uses_async_external_links_request() {
    let mock = Arc::new(MockTransport::new().on_submit(
        StatementResponse::with_state("01ef-c", StatementState::Succeeded)
            .with_inline_rows(vec![]),
    ));

    assert_ok!(
        executor(&mock)
            .execute("wh-9", "SELECT 1", Duration::from_secs(5))
            .await
    );

    assert_eq!(
        mock.calls()[0],
        MockCall::Submit(StatementRequest::asynchronous("wh-9", "SELECT 1"))
    );
}

#[tokio::test(start_paused = true)]
async fn test_links_beyond_first_batch_are_requested() {
    let mock = Arc::new(
        MockTransport::new()
            .on_submit(
                StatementResponse::with_state("01ef-d", StatementState::Succeeded)
                    .with_manifest(manifest().with_chunk_count(2))
                    .with_external_links(vec![
                        ExternalLink::new(0, "https://storage/0").with_next(1)
                    ]),
            )
            .with_chunk_page(
                1,
                ResultPayload {
                    external_links: Some(vec![ExternalLink::new(1, "https://storage/1")]),
                    ..Default::default()
                },
            )
            .with_chunk("https://storage/0", vec![vec![json!("a")]])
            .with_chunk("https://storage/1", vec![vec![json!("b")]]),
    );

    let result = assert_ok!(
        executor(&mock)
            .execute("wh-1", "SELECT c FROM t", Duration::from_secs(10))
            .await
    );

    assert_eq!(result.data_array, vec![vec![json!("a")], vec![json!("b")]]);
    assert!(mock.calls().contains(&MockCall::GetResultChunk {
        statement_id: "01ef-d".into(),
        chunk_index: 1
    }));
}

#[tokio::test(start_paused = true)]
async fn test_remote_failure_surfaces_message() {
    let mock = Arc::new(
        MockTransport::new()
            .on_submit(StatementResponse::with_state("01ef-e", StatementState::Pending))
            .then_status(
                StatementResponse::with_state("01ef-e", StatementState::Failed)
                    .with_error("Table or view not found: missing_table"),
            ),
    );

    let err = assert_err!(
        executor(&mock)
            .execute("wh-1", "SELECT * FROM missing_table", Duration::from_secs(60))
            .await
    );

    match err {
        QueryError::RemoteExecutionFailed { state, message } => {
            assert_eq!(state, StatementState::Failed);
            assert!(message.contains("missing_table"));
        }
        other => panic!("Expected RemoteExecutionFailed, got {:?}", other),
    }
    assert!(mock.fetched_links().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_timeout_respects_budget_and_stops_polling() {
    let mock = Arc::new(
        MockTransport::new()
            .on_submit(StatementResponse::with_state("01ef-f", StatementState::Running))
            .then_status(StatementResponse::with_state("01ef-f", StatementState::Running)),
    );
    let interval = Duration::from_secs(1);
    let timeout = Duration::from_secs(3);
    let executor = executor(&mock).with_poll_policy(PollPolicy::new(interval));

    let start = Instant::now();
    let err = assert_err!(executor.execute("wh-1", "SELECT sleep()", timeout).await);
    let elapsed = start.elapsed();

    match err {
        QueryError::ExecutionTimeout {
            statement_id,
            timeout: reported,
        } => {
            assert_eq!(statement_id.as_deref(), Some("01ef-f"));
            assert_eq!(reported, timeout);
        }
        other => panic!("Expected ExecutionTimeout, got {:?}", other),
    }
    assert!(elapsed >= timeout, "timed out early after {:?}", elapsed);
    assert!(elapsed < timeout + interval, "timed out late after {:?}", elapsed);

    let polls = mock.status_calls();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(mock.status_calls(), polls);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_submission_keeps_body() {
    let body = r#"{"error_code":"BAD_REQUEST","message":"warehouse not found"}"#;
    let mock = Arc::new(MockTransport::new().reject_submit(body));

    let err = assert_err!(
        executor(&mock)
            .execute("missing-wh", "SELECT 1", Duration::from_secs(5))
            .await
    );

    assert!(matches!(err, QueryError::RemoteRejection(_)));
    assert!(err.to_string().contains("warehouse not found"));
    assert_eq!(mock.status_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_failed_chunk_download_fails_execution() {
    let mock = Arc::new(
        MockTransport::new()
            .on_submit(
                StatementResponse::with_state("01ef-g", StatementState::Succeeded)
                    .with_manifest(manifest().with_chunk_count(2))
                    .with_external_links(vec![
                        ExternalLink::new(0, "https://storage/0"),
                        ExternalLink::new(1, "https://storage/1"),
                    ]),
            )
            .with_chunk("https://storage/0", vec![vec![json!(1)]])
            .with_failing_chunk("https://storage/1", Duration::ZERO),
    );

    let err = assert_err!(
        executor(&mock)
            .execute("wh-1", "SELECT id FROM t", Duration::from_secs(5))
            .await
    );

    assert!(matches!(
        err,
        QueryError::ChunkFetchFailed { chunk_index: 1, .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_empty_input_is_rejected_before_any_request() {
    let mock = Arc::new(MockTransport::new());

    let err = assert_err!(
        executor(&mock)
            .execute("wh-1", "   ", Duration::from_secs(5))
            .await
    );

    assert!(matches!(err, QueryError::InvalidRequest(_)));
    assert!(mock.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_executions_are_independent() {
    let fast = Arc::new(MockTransport::new().on_submit(
        StatementResponse::with_state("fast", StatementState::Succeeded)
            .with_inline_rows(vec![vec![json!("fast")]]),
    ));
    let slow = Arc::new(
        MockTransport::new()
            .on_submit(StatementResponse::with_state("slow", StatementState::Pending))
            .then_status(
                StatementResponse::with_state("slow", StatementState::Succeeded)
                    .with_inline_rows(vec![vec![json!("slow")]]),
            ),
    );
    let fast_exec = executor(&fast);
    let slow_exec = executor(&slow);

    let (a, b) = tokio::join!(
        slow_exec.execute("wh-1", "SELECT 'slow'", Duration::from_secs(30)),
        fast_exec.execute("wh-1", "SELECT 'fast'", Duration::from_secs(30)),
    );

    assert_eq!(assert_ok!(a).data_array, vec![vec![json!("slow")]]);
    assert_eq!(assert_ok!(b).data_array, vec![vec![json!("fast")]]);
}
