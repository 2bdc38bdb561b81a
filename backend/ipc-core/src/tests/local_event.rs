use crate::host::LocalEvent;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::json;

#[test]
fn given_two_listeners_when_firing_then_both_receive_payload() {
    let event = LocalEvent::new();
    let seen = Arc::new(AtomicUsize::new(0));

    for _ in 0..2 {
        let seen = Arc::clone(&seen);
        event.subscribe(move |args| {
            assert_eq!(args, [json!(42)]);
            seen.fetch_add(1, Ordering::SeqCst);
        });
    }

    assert_eq!(event.fire(vec![json!(42)]), 2);
    assert_eq!(seen.load(Ordering::SeqCst), 2);
}

/// **VALUE**: Verifies a listener can unsubscribe itself while the event is firing.
///
/// **BUG THIS CATCHES**: Would catch `fire` holding the listener lock while calling out,
/// which deadlocks on the re-entrant `unsubscribe`.
#[test]
fn given_self_removing_listener_when_firing_then_does_not_deadlock() {
    let event = LocalEvent::new();
    let handle = event.clone();
    let own_id = Arc::new(AtomicUsize::new(usize::MAX));
    let id_for_listener = Arc::clone(&own_id);

    let id = event.subscribe(move |_| {
        handle.unsubscribe(id_for_listener.load(Ordering::SeqCst) as u64);
    });
    own_id.store(id as usize, Ordering::SeqCst);

    assert_eq!(event.fire(vec![]), 1);
    assert_eq!(event.listener_count(), 0);
    assert_eq!(event.fire(vec![]), 0);
}
