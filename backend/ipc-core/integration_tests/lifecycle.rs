use crate::fixtures::{Calculator, bind_host, connect_client, contract};

use ipc_core::affinity::{ProcessContext, clear_process_marker, mark_process};
use ipc_core::error::{
    AffinityError, CallError, ContractError, CoreError, EndpointError, TransportError,
};
use ipc_core::transport::{HostTransport, PartyId};
use ipc_core::{
    ClassBindings, Contract, Contracted, Declaration, EndpointState, HostEndpoint, LocalEvent,
    MemoryBus,
};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::FutureExt;
use serde_json::{Value, json};
use serial_test::serial;

// ============================================================================
// Disposal, duplicate endpoints and construction guards
// ============================================================================

/// **VALUE**: Verifies disposing a host endpoint twice is harmless and final.
///
/// **WHY THIS MATTERS**: Teardown paths run from several places (window close, app exit).
/// The second dispose must not error, and the endpoint must stop answering.
///
/// **BUG THIS CATCHES**: Would catch a second dispose removing handlers a newer endpoint
/// registered, or emit silently succeeding after dispose.
#[tokio::test]
async fn given_host_endpoint_when_disposed_twice_then_detaches_once_and_rejects_emit() {
    // GIVEN: A bound host and a connected client
    let bus = MemoryBus::new();
    let host = bind_host(&bus);
    let (_transport, client) = connect_client(&bus);

    // WHEN: Disposing twice
    host.dispose();
    host.dispose();

    // THEN: Disposed, emit fails loudly, calls no longer reach a handler
    assert_eq!(host.state(), EndpointState::Disposed);
    assert!(matches!(
        host.emit("changed", vec![json!(1)]),
        Err(EndpointError::Disposed { .. })
    ));
    assert!(matches!(
        client.call("bar", vec![json!(1)]).await,
        Err(CallError::Transport(TransportError::NoHandler { .. }))
    ));
}

/// **VALUE**: Verifies only one live host endpoint can serve a channel.
///
/// **WHY THIS MATTERS**: Two hosts answering one channel would race for every call.
///
/// **BUG THIS CATCHES**: Would catch the failed second bind tearing down the first
/// endpoint's handlers on its way out.
#[tokio::test]
async fn given_live_host_when_binding_second_on_same_channel_then_fails_and_first_survives() {
    // GIVEN: A live host on "calc"
    let bus = MemoryBus::new();
    let first = bind_host(&bus);
    let (_transport, client) = connect_client(&bus);

    // WHEN: Binding another instance on the same channel
    let second = HostEndpoint::bind(Arc::new(Calculator::new()), &contract(), Arc::new(bus.host()));

    // THEN: Rejected, and the first endpoint still answers
    assert!(matches!(
        second,
        Err(CoreError::Endpoint(EndpointError::ChannelTaken { .. }))
    ));
    assert_eq!(
        client.call("bar", vec![json!(4)]).await.expect("first still bound"),
        json!(8)
    );

    // AND: After disposing the first, the channel is free again
    first.dispose();
    let replacement = HostEndpoint::bind(Arc::new(Calculator::new()), &contract(), Arc::new(bus.host()));
    assert!(replacement.is_ok());
}

fn shared_contract() -> Contract {
    Contract::new("shared")
        .and_then(|c| c.with_async_method("a"))
        .and_then(|c| c.with_sync_method("s"))
        .and_then(|c| c.with_event("e"))
        .expect("valid contract")
}

/// **VALUE**: Verifies the channel is held as a whole, not per message kind.
///
/// **WHY THIS MATTERS**: A type with only async methods and a type with only sync methods
/// and events register disjoint handler names. Without a channel-wide claim both would
/// bind, and clients would talk to two different instances depending on call style.
///
/// **BUG THIS CATCHES**: Would catch one-host-per-channel relying on handler name
/// collisions, or dispose forgetting to release the channel.
#[test]
fn given_host_with_disjoint_kinds_when_binding_second_on_same_channel_then_channel_taken() {
    // GIVEN: One type binding only async "a", another binding only sync "s" and event "e"
    let bus = MemoryBus::new();
    let only_async = ClassBindings::new("OnlyAsync")
        .with(Declaration::async_method(
            "shared",
            "a",
            |_: &(), _: Vec<Value>| async { Ok::<_, CallError>(json!("a")) }.boxed(),
        ))
        .expect("valid bindings");
    let only_sync = ClassBindings::new("OnlySync")
        .with(Declaration::sync_method("shared", "s", |_: &(), _| Ok(json!("s"))))
        .and_then(|b| b.with(Declaration::event_source("shared", "e", |_: &()| LocalEvent::default())))
        .expect("valid bindings");
    let first = HostEndpoint::bind_with(
        Arc::new(()),
        &only_async,
        &shared_contract(),
        Arc::new(bus.host()),
    )
    .expect("first host binds");

    // WHEN: Binding the second type on the same channel
    let second = HostEndpoint::bind_with(
        Arc::new(()),
        &only_sync,
        &shared_contract(),
        Arc::new(bus.host()),
    );

    // THEN: Refused without touching the first endpoint
    assert!(matches!(
        second,
        Err(CoreError::Endpoint(EndpointError::ChannelTaken { .. }))
    ));
    assert_eq!(first.state(), EndpointState::Active);

    // AND: Once the first is disposed the channel can be bound again
    first.dispose();
    let replacement = HostEndpoint::bind_with(
        Arc::new(()),
        &only_sync,
        &shared_contract(),
        Arc::new(bus.host()),
    )
    .expect("channel released on dispose");
    assert_eq!(replacement.state(), EndpointState::Active);
}

/// **VALUE**: Verifies a failed bind gives the channel back.
///
/// **BUG THIS CATCHES**: Would catch the channel claim leaking when a later attach fails,
/// leaving the channel unusable for the rest of the process.
#[test]
fn given_attach_failure_when_binding_then_channel_released() {
    // GIVEN: The sync handler name of "shared" taken outside any host endpoint
    let bus = MemoryBus::new();
    let raw = bus.host();
    raw.handle_sync(
        "sync.message:shared",
        Arc::new(|_: PartyId, _: Vec<Value>| -> Result<Value, CallError> { Ok(Value::Null) }),
    )
    .expect("raw handler registers");
    let only_sync = ClassBindings::new("OnlySync")
        .with(Declaration::sync_method("shared", "s", |_: &(), _| Ok(json!("s"))))
        .expect("valid bindings");

    // WHEN: Binding fails on the taken handler name
    let failed = HostEndpoint::bind_with(
        Arc::new(()),
        &only_sync,
        &shared_contract(),
        Arc::new(bus.host()),
    );
    assert!(matches!(
        failed,
        Err(CoreError::Transport(TransportError::HandlerExists { .. }))
    ));

    // THEN: After freeing the name, the channel binds
    raw.remove_sync_handler("sync.message:shared");
    let endpoint = HostEndpoint::bind_with(
        Arc::new(()),
        &only_sync,
        &shared_contract(),
        Arc::new(bus.host()),
    );
    assert!(endpoint.is_ok());
}

/// **VALUE**: Verifies client disposal unsubscribes and makes further use fail.
///
/// **BUG THIS CATCHES**: Would catch the observer detaching its inbound handler without
/// telling the host, leaving the host sending to a party that no longer listens.
#[tokio::test]
async fn given_subscribed_client_when_disposed_then_unsubscribes_and_rejects_calls() {
    // GIVEN: A client listening on "changed"
    let bus = MemoryBus::new();
    let host = bind_host(&bus);
    let (_transport, client) = connect_client(&bus);
    client.on("changed", |_: &[Value]| {}).expect("subscribe");
    assert_eq!(host.subscriber_count("changed"), 1);

    // WHEN: Disposing twice
    client.dispose();
    client.dispose();

    // THEN: Host no longer lists the party, every client operation reports disposal
    assert_eq!(host.subscriber_count("changed"), 0);
    assert_eq!(client.state(), EndpointState::Disposed);
    assert!(matches!(
        client.call("bar", vec![json!(1)]).await,
        Err(CallError::Disposed { .. })
    ));
    assert!(matches!(
        client.call_sync("total", Vec::new()),
        Err(CallError::Disposed { .. })
    ));
    assert!(matches!(
        client.on("changed", |_: &[Value]| {}),
        Err(CallError::Disposed { .. })
    ));
    assert!(matches!(client.batch(), Err(EndpointError::Disposed { .. })));
}

#[test]
fn given_binding_outside_contract_when_binding_then_returns_not_in_contract() {
    let bus = MemoryBus::new();
    let narrow = Contract::new("calc")
        .and_then(|c| c.with_sync_method("total"))
        .expect("valid contract");
    let bindings = ClassBindings::new("Wide")
        .with(Declaration::sync_method("calc", "total", |_: &(), _| Ok(json!(0))))
        .and_then(|b| b.with(Declaration::sync_method("calc", "extra", |_: &(), _| Ok(json!(1)))))
        .expect("valid bindings");

    let result = HostEndpoint::bind_with(Arc::new(()), &bindings, &narrow, Arc::new(bus.host()));

    assert!(matches!(
        result,
        Err(CoreError::Contract(ContractError::NotInContract { .. }))
    ));
}

static GUARDED_CONSTRUCTED: AtomicBool = AtomicBool::new(false);

struct GuardedService;

impl GuardedService {
    fn new() -> Self {
        GUARDED_CONSTRUCTED.store(true, Ordering::SeqCst);
        Self
    }
}

impl Contracted for GuardedService {
    fn declare_bindings() -> Result<ClassBindings<Self>, ContractError> {
        ClassBindings::new("GuardedService")
            .host_only()
            .with(Declaration::sync_method(
                "guarded",
                "ping",
                |_: &GuardedService, _| Ok(json!("pong")),
            ))
    }
}

fn guarded_contract() -> Contract {
    Contract::new("guarded")
        .and_then(|c| c.with_sync_method("ping"))
        .expect("valid contract")
}

/// **VALUE**: Verifies a host-only type cannot be constructed without the host marker.
///
/// **WHY THIS MATTERS**: The guard is the only thing stopping host services from being
/// instantiated inside a client context.
///
/// **BUG THIS CATCHES**: Would catch `construct` running the constructor before the check.
#[test]
#[serial]
fn given_no_host_marker_when_constructing_host_service_then_fails_before_constructor() {
    // GIVEN: No host marker
    clear_process_marker(ProcessContext::Host);
    GUARDED_CONSTRUCTED.store(false, Ordering::SeqCst);
    let bus = MemoryBus::new();

    // WHEN: Constructing through the endpoint
    let result = HostEndpoint::construct(GuardedService::new, &guarded_contract(), Arc::new(bus.host()));

    // THEN: Context mismatch and no constructor side effect
    assert!(matches!(
        result,
        Err(CoreError::Affinity(AffinityError::ContextMismatch { .. }))
    ));
    assert!(!GUARDED_CONSTRUCTED.load(Ordering::SeqCst));
}

#[test]
#[serial]
fn given_host_marker_when_constructing_host_service_then_binds() {
    mark_process(ProcessContext::Host);
    GUARDED_CONSTRUCTED.store(false, Ordering::SeqCst);
    let bus = MemoryBus::new();

    let endpoint =
        HostEndpoint::construct(GuardedService::new, &guarded_contract(), Arc::new(bus.host()))
            .expect("host context marked");

    assert!(GUARDED_CONSTRUCTED.load(Ordering::SeqCst));
    assert_eq!(endpoint.state(), EndpointState::Active);
    clear_process_marker(ProcessContext::Host);
}
