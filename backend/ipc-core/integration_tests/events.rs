use crate::fixtures::{bind_host, connect_client};

use ipc_core::transport::{ClientTransport, HOST_PARTY, ListenerId};
use ipc_core::MemoryBus;

use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

fn recorder() -> (Arc<Mutex<Vec<i64>>>, impl Fn(&[Value]) + Send + Sync + 'static) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let listener = move |args: &[Value]| {
        let total = args.first().and_then(Value::as_i64).expect("numeric payload");
        sink.lock().expect("seen lock").push(total);
    };
    (seen, listener)
}

// ============================================================================
// Subscription bookkeeping and event broadcast
// ============================================================================

/// **VALUE**: Verifies broadcasting to nobody is free.
///
/// **WHY THIS MATTERS**: Host state changes fire events constantly. With no subscribers the
/// emit must not touch the transport at all.
///
/// **BUG THIS CATCHES**: Would catch emit sending to an empty set, or sending once
/// unconditionally before checking subscribers.
#[test]
fn given_no_subscribers_when_emitting_then_returns_false_and_sends_nothing() {
    // GIVEN: A bound host with no subscribers
    let bus = MemoryBus::new();
    let host = bind_host(&bus);

    // WHEN: Emitting directly and through the local event
    let emitted = host.emit("changed", vec![json!(1)]).expect("active endpoint");
    host.instance().add(1);

    // THEN: Nothing was sent
    assert!(!emitted);
    assert_eq!(bus.sent_count(), 0);
}

/// **VALUE**: Verifies subscribe and unsubscribe replies are `true` then `false`.
///
/// **WHY THIS MATTERS**: The replies tell a client whether it changed host state. Repeated
/// requests are informational, never errors, and never create duplicate entries.
///
/// **BUG THIS CATCHES**: Would catch duplicate subscriptions doubling delivery, or a
/// repeated unsubscribe being reported as an error.
#[test]
fn given_party_when_subscribing_and_unsubscribing_twice_then_replies_true_then_false() {
    // GIVEN: A bound host and a raw client party
    let bus = MemoryBus::new();
    let host = bind_host(&bus);
    let raw = bus.connect();
    let subscribe = |name: &str| {
        raw.send_sync(name, vec![json!("changed")])
            .expect("membership reply")
    };

    // WHEN/THEN: Subscribe twice
    assert_eq!(subscribe("event.subscribe:calc"), Value::Bool(true));
    assert_eq!(subscribe("event.subscribe:calc"), Value::Bool(false));
    assert_eq!(host.subscriber_count("changed"), 1);

    // WHEN/THEN: Unsubscribe twice
    assert_eq!(subscribe("event.unsubscribe:calc"), Value::Bool(true));
    assert_eq!(subscribe("event.unsubscribe:calc"), Value::Bool(false));
    assert_eq!(host.subscriber_count("changed"), 0);
}

/// **VALUE**: Verifies the client subscribes on the first listener and unsubscribes on the
/// last, and that local events reach remote listeners.
///
/// **WHY THIS MATTERS**: `off` of the last listener is the only way a live client tells the
/// host to stop sending. Subscribing per listener would also spam the host.
///
/// **BUG THIS CATCHES**: Would catch unsubscribe being sent while listeners remain, or the
/// broadcaster not forwarding `LocalEvent::fire`.
#[test]
fn given_two_listeners_when_removing_them_then_unsubscribes_only_after_last() {
    // GIVEN: Host, client and two listeners on "changed"
    let bus = MemoryBus::new();
    let host = bind_host(&bus);
    let (_transport, client) = connect_client(&bus);
    let (first_seen, first) = recorder();
    let (second_seen, second) = recorder();
    let first_id = client.on("changed", first).expect("first listener");
    let second_id = client.on("changed", second).expect("second listener");
    assert_eq!(host.subscriber_count("changed"), 1, "One subscription per party");

    // WHEN: The host state changes
    host.instance().add(5);

    // THEN: Both listeners received the new total
    assert_eq!(*first_seen.lock().expect("lock"), vec![5]);
    assert_eq!(*second_seen.lock().expect("lock"), vec![5]);

    // WHEN: Removing the first listener
    assert!(client.off("changed", first_id));

    // THEN: Still subscribed, only the second listener hears the next change
    assert_eq!(host.subscriber_count("changed"), 1);
    host.instance().add(1);
    assert_eq!(*first_seen.lock().expect("lock"), vec![5]);
    assert_eq!(*second_seen.lock().expect("lock"), vec![5, 6]);

    // WHEN: Removing the last listener
    assert!(client.off("changed", second_id));

    // THEN: The host no longer has the party subscribed
    assert_eq!(host.subscriber_count("changed"), 0);
    assert!(!client.off("changed", second_id), "Second removal is a no-op");
}

#[test]
fn given_typed_listener_when_event_fires_then_receives_decoded_payload() {
    let bus = MemoryBus::new();
    let host = bind_host(&bus);
    let (_transport, client) = connect_client(&bus);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    client
        .on_typed("changed", move |(total,): (i64,)| {
            sink.lock().expect("lock").push(total);
        })
        .expect("typed listener");
    host.instance().add(3);

    assert_eq!(*seen.lock().expect("lock"), vec![3]);
}

/// **VALUE**: Verifies a party may unsubscribe from inside a listener while the host is
/// still broadcasting the event.
///
/// **WHY THIS MATTERS**: "Notify me once" listeners remove themselves on the first
/// delivery. That unsubscribe reaches the host in the middle of its emit loop and must
/// neither deadlock nor cost the other subscribers their copy.
///
/// **BUG THIS CATCHES**: Would catch emit iterating the live subscriber set under its
/// lock, or the unsubscribe taking effect for parties already targeted by this emit.
#[test]
fn given_listener_unsubscribing_itself_when_host_emits_then_others_still_served() {
    // GIVEN: Two clients on "changed", the first removing itself on its first delivery
    let bus = MemoryBus::new();
    let host = bind_host(&bus);
    let (_once_transport, once_client) = connect_client(&bus);
    let once_client = Arc::new(once_client);
    let (_steady_transport, steady_client) = connect_client(&bus);

    let once_seen = Arc::new(Mutex::new(Vec::new()));
    let own_id: Arc<Mutex<Option<ListenerId>>> = Arc::new(Mutex::new(None));
    let listener = {
        let sink = Arc::clone(&once_seen);
        let own_id = Arc::clone(&own_id);
        let client = Arc::downgrade(&once_client);
        move |args: &[Value]| {
            sink.lock().expect("lock").push(args[0].as_i64().expect("numeric payload"));
            let id = own_id.lock().expect("lock").take();
            if let (Some(id), Some(client)) = (id, client.upgrade()) {
                assert!(client.off("changed", id));
            }
        }
    };
    let id = once_client.on("changed", listener).expect("subscribe once listener");
    *own_id.lock().expect("lock") = Some(id);

    let (steady_seen, steady_listener) = recorder();
    steady_client.on("changed", steady_listener).expect("subscribe steady listener");
    assert_eq!(host.subscriber_count("changed"), 2);

    // WHEN: The host state changes twice
    host.instance().add(2);
    host.instance().add(3);

    // THEN: The first change reached both, the second only the steady client
    assert_eq!(*once_seen.lock().expect("lock"), vec![2]);
    assert_eq!(*steady_seen.lock().expect("lock"), vec![2, 5]);
    assert_eq!(host.subscriber_count("changed"), 1);
}

/// **VALUE**: Verifies a party that vanished without unsubscribing is skipped and dropped.
///
/// **WHY THIS MATTERS**: Windows close without saying goodbye. Emit must keep serving the
/// remaining parties and must never fail because one of them is gone.
///
/// **BUG THIS CATCHES**: Would catch emit returning an error for a closed party, or dead
/// entries accumulating in the subscriber set.
#[test]
fn given_subscriber_closed_without_unsubscribing_when_emitting_then_delivers_to_live_only() {
    // GIVEN: Two subscribed clients
    let bus = MemoryBus::new();
    let host = bind_host(&bus);
    let (doomed_transport, doomed) = connect_client(&bus);
    let (_live_transport, live) = connect_client(&bus);
    let (doomed_seen, doomed_listener) = recorder();
    let (live_seen, live_listener) = recorder();
    doomed.on("changed", doomed_listener).expect("subscribe");
    live.on("changed", live_listener).expect("subscribe");
    assert_eq!(host.subscriber_count("changed"), 2);

    // WHEN: One party vanishes and the host emits
    doomed_transport.close();
    let before = bus.sent_count();
    let emitted = host.emit("changed", vec![json!(9)]).expect("emit does not fail");

    // THEN: Only the live party was sent the event, the dead one is gone
    assert!(emitted);
    assert_eq!(bus.sent_count() - before, 1);
    assert_eq!(*live_seen.lock().expect("lock"), vec![9]);
    assert!(doomed_seen.lock().expect("lock").is_empty());
    assert_eq!(host.subscriber_count("changed"), 1);
}

/// **VALUE**: Verifies event dispatch from a party other than the host is discarded.
///
/// **WHY THIS MATTERS**: On a shared bus another party can send `event:C` messages. Only
/// the host may drive a client's listeners.
///
/// **BUG THIS CATCHES**: Would catch the observer ignoring the origin of inbound events.
#[test]
fn given_event_from_foreign_party_when_delivered_then_listeners_are_not_called() {
    // GIVEN: A client listening on "changed"
    let bus = MemoryBus::new();
    let _host = bind_host(&bus);
    let (transport, client) = connect_client(&bus);
    let (seen, listener) = recorder();
    client.on("changed", listener).expect("subscribe");
    let impostor = bus.connect();

    // WHEN: The impostor forges an event, then the host sends a real one
    bus.deliver_as(
        impostor.party(),
        transport.party(),
        "event:calc",
        vec![json!("changed"), json!(666)],
    )
    .expect("delivered");
    bus.deliver_as(
        HOST_PARTY,
        transport.party(),
        "event:calc",
        vec![json!("changed"), json!(1)],
    )
    .expect("delivered");

    // THEN: Only the host's event reached the listener
    assert_eq!(*seen.lock().expect("lock"), vec![1]);
}
