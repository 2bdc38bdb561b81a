use crate::fixtures::{bind_host, connect_client, connect_client_with};

use ipc_core::contract::{BatchResponse, decode_batch};
use ipc_core::error::{BatchError, CallError, REQUEST_NOT_HANDLED};
use ipc_core::transport::{HostTransport, InvokeHandler, PartyId};
use ipc_core::{MemoryBus, MessagingConfig};

use std::future::ready;
use std::sync::Arc;

use futures_util::FutureExt;
use serde_json::{Value, json};

/// A raw `batch:calc` handler that answers only the first `answered` requests.
fn partial_batch_handler(answered: usize) -> InvokeHandler {
    Arc::new(move |_party: PartyId, args: Vec<Value>| {
        let reply = decode_batch(args).map(|(_, requests)| {
            let responses: Vec<BatchResponse> = requests
                .iter()
                .take(answered)
                .map(|request| BatchResponse::from_result(request.id, Ok(json!(request.id * 100))))
                .collect();
            serde_json::to_value(responses).expect("responses encode")
        });
        ready(reply).boxed()
    })
}

// ============================================================================
// Batched execution
// ============================================================================

/// **VALUE**: Verifies a complete batch settles every slot with its own outcome.
///
/// **WHY THIS MATTERS**: Individual failures inside a batch are per-call data. They fail
/// their own slot and leave the batch as a whole successful.
///
/// **BUG THIS CATCHES**: Would catch one failing request aborting the rest of the batch on
/// the host, or the client mixing up results between ids.
#[tokio::test]
async fn given_complete_batch_with_one_failure_when_submitted_then_only_that_slot_fails() {
    // GIVEN: Host and client, three recorded calls, the middle one failing
    let bus = MemoryBus::new();
    let _host = bind_host(&bus);
    let (_transport, client) = connect_client(&bus);
    let mut batch = client.batch().expect("client has async methods");
    let first = batch.call("bar", vec![json!(1)]).expect("recorded");
    let failing = batch.call("fail", Vec::new()).expect("recorded");
    let third = batch.call("bar", vec![json!(3)]).expect("recorded");
    assert!(first.id() < failing.id() && failing.id() < third.id(), "Ids ascend");

    // WHEN: Submitting
    let sent_before = bus.sent_count();
    batch.submit().await.expect("no slot left unhandled");

    // THEN: Each slot has its own outcome
    assert_eq!(first.wait().await.expect("first"), json!(2));
    match failing.wait().await {
        Err(CallError::Remote { message, .. }) => assert_eq!(message, "calculator exploded"),
        other => panic!("Expected Remote error, got {other:?}"),
    }
    let third: i64 = third.wait_typed().await.expect("third");
    assert_eq!(third, 6);
    assert_eq!(bus.sent_count(), sent_before, "Batches never push host-to-client");
}

/// **VALUE**: Verifies the aggregate failure when the host answers 2 of 3 requests.
///
/// **WHY THIS MATTERS**: A missing response would otherwise leave a pending call hanging
/// forever. Every unanswered slot must be failed with "Request not handled." and the batch
/// itself must report the condition.
///
/// **BUG THIS CATCHES**: Would catch submit returning `Ok` on a short response list, or
/// failing the answered slots too.
#[tokio::test]
async fn given_host_answering_two_of_three_when_submitted_then_rejects_with_aggregate() {
    // GIVEN: A raw host that answers only two requests per batch
    let bus = MemoryBus::new();
    bus.host()
        .handle("batch:calc", partial_batch_handler(2))
        .expect("raw batch handler");
    let (_transport, client) = connect_client(&bus);
    let mut batch = client.batch().expect("client has async methods");
    let calls: Vec<_> = (1..=3)
        .map(|x| batch.call("bar", vec![json!(x)]).expect("recorded"))
        .collect();
    let missing_id = calls[2].id();

    // WHEN: Submitting
    let result = batch.submit().await;

    // THEN: Aggregate error listing exactly the unanswered slot
    match result {
        Err(BatchError::Aggregate { failures, .. }) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].request_id, missing_id);
            assert_eq!(failures[0].error.message(), REQUEST_NOT_HANDLED);
        }
        other => panic!("Expected Aggregate error, got {other:?}"),
    }

    // AND: Answered slots resolved, the missing one rejected individually
    let mut outcomes = Vec::new();
    for call in calls {
        outcomes.push(call.wait().await);
    }
    assert_eq!(outcomes[0].as_ref().expect("answered"), &json!(100));
    assert_eq!(outcomes[1].as_ref().expect("answered"), &json!(200));
    match &outcomes[2] {
        Err(error @ CallError::NotHandled { .. }) => {
            assert_eq!(error.message(), "Request not handled.");
        }
        other => panic!("Expected NotHandled, got {other:?}"),
    }
}

#[tokio::test]
async fn given_batch_at_configured_limit_when_recording_more_then_returns_too_large() {
    let bus = MemoryBus::new();
    let mut config = MessagingConfig::default();
    config.batch.max_requests = 2;
    let (_transport, client) = connect_client_with(&bus, &config);
    let mut batch = client.batch().expect("recorder");

    batch.call("bar", vec![json!(1)]).expect("first fits");
    batch.call("bar", vec![json!(2)]).expect("second fits");
    let overflow = batch.call("bar", vec![json!(3)]);

    assert!(matches!(overflow, Err(BatchError::TooLarge { .. })));
    assert_eq!(batch.len(), 2);
}

#[tokio::test]
async fn given_sync_method_name_when_recording_then_rejects_call() {
    let bus = MemoryBus::new();
    let (_transport, client) = connect_client(&bus);
    let mut batch = client.batch().expect("recorder");

    let result = batch.call("barSync", vec![json!(1)]);

    assert!(matches!(
        result,
        Err(BatchError::Rejected {
            source: CallError::Undeclared { .. },
            ..
        })
    ));
    assert!(batch.is_empty());
}

/// **VALUE**: Verifies a failed submission fails every slot with the transport error.
///
/// **BUG THIS CATCHES**: Would catch pending calls being left unresolved when the batch
/// never reached the host.
#[tokio::test]
async fn given_no_host_when_submitting_then_fails_submission_and_every_slot() {
    let bus = MemoryBus::new();
    let (_transport, client) = connect_client(&bus);
    let mut batch = client.batch().expect("recorder");
    let pending = batch.call("bar", vec![json!(1)]).expect("recorded");

    let result = batch.submit().await;

    assert!(matches!(
        result,
        Err(BatchError::Submit {
            source: CallError::Transport(_),
            ..
        })
    ));
    assert!(matches!(pending.wait().await, Err(CallError::Transport(_))));
}

#[tokio::test]
async fn given_recorder_dropped_without_submit_when_waiting_then_call_is_not_handled() {
    let bus = MemoryBus::new();
    let (_transport, client) = connect_client(&bus);
    let mut batch = client.batch().expect("recorder");
    let pending = batch.call("bar", vec![json!(1)]).expect("recorded");

    drop(batch);

    assert!(matches!(
        pending.wait().await,
        Err(CallError::NotHandled { .. })
    ));
}
