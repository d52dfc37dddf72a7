//! Status polling tests against a scripted status endpoint

mod common;

use casecrafter::api::ApiClient;
use casecrafter::polling::{PollOptions, STATUS_CHECK_FAILED, StatusPoller};
use casecrafter::types::{AppError, ProcessingState};
use casecrafter::MemoryStorage;
use common::{api_url, signed_in_context, status_json};
use futures::StreamExt;
use rstest::rstest;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn poller(server: &MockServer, max_attempts: Option<u32>) -> StatusPoller {
    let client = ApiClient::with_base_url(api_url(server), Arc::new(MemoryStorage::new())).unwrap();
    StatusPoller::new(
        client,
        PollOptions {
            interval: Duration::from_millis(10),
            max_attempts,
            terminal: ProcessingState::is_terminal,
        },
    )
}

/// Answer `processing` for the first `processing_polls` queries, then `last`
async fn script_status(server: &MockServer, document_id: i64, processing_polls: u64, last: &str) {
    let status_path = format!("/api/documents/{}/status", document_id);
    if processing_polls > 0 {
        Mock::given(method("GET"))
            .and(path(status_path.clone()))
            .respond_with(ResponseTemplate::new(200).set_body_json(status_json("processing", 40)))
            .up_to_n_times(processing_polls)
            .mount(server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path(status_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_json(last, 100)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_watch_yields_until_completed() {
    let server = MockServer::start().await;
    script_status(&server, 7, 2, "completed").await;

    let stream = poller(&server, Some(10)).watch(7, CancellationToken::new());
    let snapshots: Vec<_> = stream.collect().await;

    assert_eq!(snapshots.len(), 3);
    let states: Vec<_> = snapshots
        .iter()
        .map(|s| s.as_ref().unwrap().state)
        .collect();
    assert_eq!(
        states,
        vec![
            ProcessingState::Processing,
            ProcessingState::Processing,
            ProcessingState::Completed
        ]
    );
    let last = snapshots[2].as_ref().unwrap();
    assert_eq!(last.attempt, 3);
    assert_eq!(last.progress, 100);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_wait_for_completion_returns_failed_snapshot() {
    let server = MockServer::start().await;
    script_status(&server, 8, 1, "failed").await;

    let snapshot = poller(&server, Some(10))
        .wait_for_completion(8, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(snapshot.state, ProcessingState::Failed);
    assert_eq!(snapshot.error.as_deref(), Some("Document processing failed"));
}

#[tokio::test]
async fn test_attempt_limit_ends_with_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/documents/9/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_json("processing", 10)))
        .expect(3)
        .mount(&server)
        .await;

    let err = poller(&server, Some(3))
        .wait_for_completion(9, CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Timeout(_)));
}

#[rstest]
#[case("uploaded", ProcessingState::Uploaded, None)]
#[case("error", ProcessingState::Failed, Some("Document processing failed"))]
#[case("queued", ProcessingState::Unknown, None)]
#[tokio::test]
async fn test_non_processing_state_ends_after_one_query(
    #[case] reported: &str,
    #[case] expected: ProcessingState,
    #[case] error: Option<&str>,
) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/documents/4/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_json(reported, 0)))
        .expect(1)
        .mount(&server)
        .await;

    let snapshot = poller(&server, Some(20))
        .wait_for_completion(4, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(snapshot.state, expected);
    assert_eq!(snapshot.attempt, 1);
    assert_eq!(snapshot.error.as_deref(), error);
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_query_failure_stops_the_poll() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/documents/5/status"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({ "detail": "Document not found" })))
        .expect(1)
        .mount(&server)
        .await;

    let stream = poller(&server, Some(10)).watch(5, CancellationToken::new());
    let items: Vec<_> = stream.collect().await;
    assert_eq!(items.len(), 1);
    let err = items.into_iter().next().unwrap().unwrap_err();
    assert_eq!(err.user_message(), "Document not found");
}

#[tokio::test]
async fn test_cancel_stops_without_more_queries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/documents/6/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_json("processing", 20)))
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let stream = poller(&server, None).watch(6, cancel.clone());
    futures::pin_mut!(stream);

    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.attempt, 1);
    cancel.cancel();
    assert!(stream.next().await.is_none());
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_wait_for_completion_reports_cancel() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/documents/6/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_json("processing", 20)))
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(35)).await;
        trigger.cancel();
    });

    let err = poller(&server, None)
        .wait_for_completion(6, cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Cancelled));
}

#[tokio::test]
async fn test_spawned_poll_publishes_view() {
    let server = MockServer::start().await;
    script_status(&server, 7, 2, "completed").await;

    let (ctx, _) = signed_in_context(&server);
    let handle = ctx.poller().spawn(7);
    let view = handle.finished().await;

    assert!(view.finished);
    assert_eq!(view.state, ProcessingState::Completed);
    assert_eq!(view.progress, 100);
    assert_eq!(view.attempts, 3);
    assert!(view.error.is_none());
}

#[tokio::test]
async fn test_spawned_poll_maps_query_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/documents/3/status"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let handle = poller(&server, Some(10)).spawn(3);
    let view = handle.finished().await;
    assert!(view.finished);
    assert_eq!(view.error.as_deref(), Some(STATUS_CHECK_FAILED));
}

#[tokio::test]
async fn test_dropping_handle_stops_polling() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/documents/2/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_json("processing", 5)))
        .mount(&server)
        .await;

    let handle = poller(&server, None).spawn(2);
    let mut updates = handle.subscribe();
    updates.changed().await.unwrap();
    drop(handle);

    tokio::time::sleep(Duration::from_millis(50)).await;
    let seen = server.received_requests().await.unwrap().len();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(server.received_requests().await.unwrap().len(), seen);
}
