//! Failure, cancellation and single-flight behaviour of chat streams.

mod common;

use std::time::Duration;

use common::*;
use kbchat::conversation::lock_conversation;
use kbchat::error::StreamError;
use kbchat::models::{ConversationTurn, MessageRole, TurnStatus};
use kbchat::session::{FailurePolicy, StreamGate, StreamOutcome, SubmitPolicy};

#[tokio::test]
async fn test_open_failure_rolls_back() {
    let harness = StreamHarness::new(MockResponse::StreamError(HttpError::ServerError {
        status: 503,
        message: "Service Unavailable".into(),
    }));

    let outcome = harness.run().await;
    match outcome {
        StreamOutcome::Failed {
            error, rolled_back, ..
        } => {
            assert_eq!(
                error,
                StreamError::OpenFailed {
                    status: Some(503),
                    message: "Service Unavailable".into()
                }
            );
            assert!(rolled_back);
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(harness.turns().is_empty());
}

#[tokio::test]
async fn test_connection_lost_mid_stream_rolls_back() {
    let harness = StreamHarness::new(MockResponse::StreamThenError(
        vec![bytes::Bytes::from(token_frame("partial"))],
        HttpError::Io("connection reset".into()),
    ));

    let outcome = harness.run().await;
    assert!(matches!(
        outcome.error(),
        Some(StreamError::ConnectionLost { .. })
    ));
    assert_eq!(outcome.stats().events_applied, 1);
    assert!(harness.turns().is_empty());
}

#[tokio::test]
async fn test_rollback_keeps_earlier_history() {
    let harness = StreamHarness::new(MockResponse::StreamError(HttpError::ConnectionFailed(
        "refused".into(),
    )));
    let history: Vec<ConversationTurn> = serde_json::from_value(serde_json::json!([
        {"id": "m1", "role": "user", "content": "earlier"},
        {"id": "m2", "role": "assistant", "content": "answer"}
    ]))
    .unwrap();
    lock_conversation(&harness.conversation).replace_all(history);

    harness.run().await;
    let ids: Vec<_> = harness.turns().into_iter().map(|t| t.id).collect();
    assert_eq!(ids, vec!["m1", "m2"]);
}

#[tokio::test]
async fn test_retain_policy_keeps_partial_reply() {
    let harness = StreamHarness::new(MockResponse::StreamThenError(
        vec![bytes::Bytes::from(token_frame("half an ans"))],
        HttpError::Io("reset".into()),
    ))
    .with_policy(FailurePolicy::Retain);

    let outcome = harness.run().await;
    assert!(matches!(
        outcome,
        StreamOutcome::Failed {
            rolled_back: false,
            ..
        }
    ));

    let turns = harness.turns();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].role, MessageRole::User);
    assert_eq!(turns[0].status, TurnStatus::Pending);
    assert_eq!(turns[1].content, "half an ans");
    assert_eq!(turns[1].status, TurnStatus::Interrupted);
    assert!(lock_conversation(&harness.conversation).is_closed(&turns[1].id));
}

#[tokio::test]
async fn test_cancel_during_stalled_stream() {
    let harness = StreamHarness::new(MockResponse::StreamThenStall(vec![bytes::Bytes::from(
        token_frame("thinking"),
    )]));
    let gate = harness.gate.clone();

    let lease = gate.acquire().await.unwrap();
    let task = tokio::spawn(harness.controller("q").run(lease));

    // Let the first chunk land, then cancel while the transport stalls
    tokio::time::timeout(Duration::from_secs(5), async {
        while harness.turns().get(1).map(|t| t.content.is_empty()).unwrap_or(true) {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("first chunk applied");
    assert!(gate.cancel_active());

    let outcome = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("controller honours cancellation")
        .unwrap();
    assert!(matches!(
        outcome,
        StreamOutcome::Cancelled {
            rolled_back: true,
            ..
        }
    ));
    assert!(harness.turns().is_empty());
    assert!(!gate.is_busy());
}

#[tokio::test]
async fn test_queue_policy_serialises_streams() {
    let harness = StreamHarness::new(MockResponse::chunks([token_frame("ok"), DONE_FRAME.into()]))
        .with_gate(StreamGate::new(SubmitPolicy::Queue));

    let first = harness.gate.acquire().await.unwrap();
    let second = {
        let gate = harness.gate.clone();
        let controller = harness.controller("second");
        tokio::spawn(async move {
            let lease = gate.acquire().await.unwrap();
            controller.run(lease).await
        })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    // The queued submission has not inserted anything yet
    assert!(harness.turns().is_empty());

    let outcome = harness.controller("first").run(first).await;
    assert!(outcome.is_completed());
    assert!(second.await.unwrap().is_completed());

    let contents: Vec<_> = harness.turns().into_iter().map(|t| t.content).collect();
    assert_eq!(contents, vec!["first", "ok", "second", "ok"]);
}

#[tokio::test]
async fn test_cancel_previous_policy_replaces_running_stream() {
    let harness = StreamHarness::new(MockResponse::StreamThenStall(vec![]))
        .with_gate(StreamGate::new(SubmitPolicy::CancelPrevious));

    let first_lease = harness.gate.acquire().await.unwrap();
    let first = tokio::spawn(harness.controller("first").run(first_lease));
    tokio::time::timeout(Duration::from_secs(5), async {
        while harness.mock.get_requests().is_empty() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();

    // Admission cancels the first stream
    let second_lease = harness.gate.acquire().await.unwrap();
    let first_outcome = first.await.unwrap();
    assert_eq!(first_outcome.error(), Some(StreamError::Cancelled));
    assert!(!second_lease.is_cancelled());
    assert!(harness.turns().is_empty());
}

#[tokio::test]
async fn test_reject_policy_leaves_running_stream_alone() {
    let gate = StreamGate::new(SubmitPolicy::Reject);
    let _running = gate.acquire().await.unwrap();
    assert_eq!(gate.acquire().await.unwrap_err(), StreamError::Busy);
    assert_eq!(
        StreamOutcome::not_admitted(StreamError::Busy).error(),
        Some(StreamError::Busy)
    );
}
