use crate::fixtures::{bind_host, connect_client};

use ipc_core::error::CallError;
use ipc_core::transport::ClientTransport;
use ipc_core::MemoryBus;

use serde_json::{Value, json};

// ============================================================================
// Async and sync call paths, end to end over the memory bus
// ============================================================================

/// **VALUE**: Verifies the async round trip: `bar(x) => x * 2` answers `10` for `5`.
///
/// **WHY THIS MATTERS**: This is the main path every UI action takes. The client tags the
/// payload with the message name, the host responder looks up the handler and the reply
/// travels back as the settled value.
///
/// **BUG THIS CATCHES**: Would catch payload tagging drift between caller and responder,
/// or the responder answering with the raw arguments.
#[tokio::test]
async fn given_bound_bar_handler_when_client_calls_bar_with_5_then_resolves_to_10() {
    // GIVEN: Host and client on one bus
    let bus = MemoryBus::new();
    let _host = bind_host(&bus);
    let (_transport, client) = connect_client(&bus);

    // WHEN: Calling bar(5)
    let result = client.call("bar", vec![json!(5)]).await;

    // THEN: Resolves to 10
    assert_eq!(result.expect("call succeeds"), json!(10));
}

#[tokio::test]
async fn given_bound_bar_handler_when_invoking_typed_then_decodes_result() {
    let bus = MemoryBus::new();
    let _host = bind_host(&bus);
    let (_transport, client) = connect_client(&bus);

    let doubled: i64 = client.invoke("bar", (21,)).await.expect("typed call");

    assert_eq!(doubled, 42);
}

/// **VALUE**: Verifies the sync round trip returns the reply directly, without a future.
///
/// **BUG THIS CATCHES**: Would catch sync calls being routed to the async responder
/// (`message:C` instead of `sync.message:C`), which has no `barSync` and answers `false`.
#[test]
fn given_bound_sync_handler_when_client_calls_sync_then_returns_immediately() {
    // GIVEN: Host and client on one bus
    let bus = MemoryBus::new();
    let host = bind_host(&bus);
    let (_transport, client) = connect_client(&bus);

    // WHEN/THEN: Sync call answers in place
    assert_eq!(
        client.call_sync("barSync", vec![json!(5)]).expect("sync call"),
        json!(10)
    );

    // AND: Sync reads see host state immediately
    host.instance().add(7);
    let total: i64 = client.invoke_sync("total", ()).expect("typed sync call");
    assert_eq!(total, 7);
}

/// **VALUE**: Verifies a failing handler fails only its own call.
///
/// **WHY THIS MATTERS**: Per-call failures are data. A handler error must reach its caller
/// as a failed call and must not poison other calls in flight.
///
/// **BUG THIS CATCHES**: Would catch a handler error tearing down the responder, or being
/// retried.
#[tokio::test]
async fn given_failing_handler_when_called_then_only_that_call_fails() {
    // GIVEN: Host and client
    let bus = MemoryBus::new();
    let _host = bind_host(&bus);
    let (_transport, client) = connect_client(&bus);

    // WHEN: A failing call and a good call run concurrently
    let (failed, succeeded) = tokio::join!(
        client.call("fail", Vec::new()),
        client.call("bar", vec![json!(2)])
    );

    // THEN: Failure carries the handler's message, the other call is unaffected
    match failed {
        Err(CallError::Remote { message, .. }) => assert_eq!(message, "calculator exploded"),
        other => panic!("Expected Remote error, got {other:?}"),
    }
    assert_eq!(succeeded.expect("unaffected call"), json!(4));
}

/// **VALUE**: Verifies unknown message names are soft no-ops answering `false`.
///
/// **WHY THIS MATTERS**: A newer client may call methods an older host does not have. The
/// host must answer rather than fail the channel.
///
/// **BUG THIS CATCHES**: Would catch the responder returning an error for unknown names.
#[tokio::test]
async fn given_unknown_message_name_when_sent_on_the_wire_then_host_answers_false() {
    let bus = MemoryBus::new();
    let _host = bind_host(&bus);
    let raw = bus.connect();

    let async_reply = raw
        .invoke("message:calc", vec![json!("doesNotExist"), json!(1)])
        .await
        .expect("soft no-op");
    let sync_reply = raw
        .send_sync("sync.message:calc", vec![json!("doesNotExist")])
        .expect("soft no-op");

    assert_eq!(async_reply, Value::Bool(false));
    assert_eq!(sync_reply, Value::Bool(false));
}

#[tokio::test]
async fn given_name_not_declared_as_kind_when_calling_then_fails_without_sending() {
    let bus = MemoryBus::new();
    let _host = bind_host(&bus);
    let (_transport, client) = connect_client(&bus);

    // "barSync" is a sync method, "nope" is not declared at all
    let wrong_kind = client.call("barSync", vec![json!(1)]).await;
    let unknown = client.call_sync("nope", Vec::new());

    assert!(matches!(wrong_kind, Err(CallError::Undeclared { .. })));
    assert!(matches!(unknown, Err(CallError::Undeclared { .. })));
}

#[tokio::test]
async fn given_no_host_when_calling_then_fails_with_transport_error() {
    let bus = MemoryBus::new();
    let (_transport, client) = connect_client(&bus);

    let result = client.call("bar", vec![json!(1)]).await;

    assert!(matches!(result, Err(CallError::Transport(_))));
}
