// Unit tests for EventObserver against a transport that dispatches inbound
// events while a sync reply is still pending

use crate::client::EventObserver;
use crate::contract::{Channel, join_message};
use crate::error::{CallError, TransportError};
use crate::transport::{ClientTransport, EventHandler, HOST_PARTY, ListenerId, PartyId};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use futures_util::future::{BoxFuture, ready};
use serde_json::{Value, json};

/// Answers every membership request, but first pushes `[event, 1]` to the
/// inbound handlers on the calling thread.
#[derive(Default)]
struct EagerTransport {
    next_id: AtomicU64,
    handlers: Mutex<Vec<(ListenerId, EventHandler)>>,
    fail_subscribe: bool,
}

impl ClientTransport for EagerTransport {
    fn party(&self) -> PartyId {
        1
    }

    fn invoke(&self, name: &str, _args: Vec<Value>) -> BoxFuture<'static, Result<Value, CallError>> {
        Box::pin(ready(Err(TransportError::no_handler(name).into())))
    }

    fn send_sync(&self, name: &str, args: Vec<Value>) -> Result<Value, CallError> {
        let handlers: Vec<EventHandler> = self
            .handlers
            .lock()
            .unwrap()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();
        let event = args[0].as_str().unwrap().to_string();
        for handler in handlers {
            handler(HOST_PARTY, join_message(&event, vec![json!(1)]));
        }

        if self.fail_subscribe && name.starts_with("event.subscribe:") {
            return Err(CallError::remote("subscribe refused"));
        }
        Ok(Value::Bool(true))
    }

    fn on(&self, _name: &str, handler: EventHandler) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.handlers.lock().unwrap().push((id, handler));
        id
    }

    fn off(&self, _name: &str, id: ListenerId) {
        self.handlers.lock().unwrap().retain(|(existing, _)| *existing != id);
    }
}

fn run_with_deadline<R: Send + 'static>(work: impl FnOnce() -> R + Send + 'static) -> R {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let _ = sender.send(work());
    });
    receiver
        .recv_timeout(Duration::from_secs(5))
        .expect("observer deadlocked on its listener table")
}

/// **VALUE**: Verifies `on` and `off` do not hold the listener table while waiting for
/// the host's sync reply.
///
/// **WHY THIS MATTERS**: A transport is free to deliver inbound events on the thread that
/// is blocked in `send_sync`. The inbound handler locks the same table, so holding it
/// across the reply deadlocks the client.
///
/// **BUG THIS CATCHES**: Would catch the subscribe or unsubscribe being sent from inside
/// the table's critical section.
#[test]
fn given_transport_dispatching_during_sync_reply_when_subscribing_then_no_deadlock() {
    let (seen, listeners_after_off) = run_with_deadline(|| {
        // GIVEN: An observer over a transport that dispatches during send_sync
        let observer = EventObserver::attach(
            Channel::new("eager").unwrap(),
            Arc::new(EagerTransport::default()),
        );
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        // WHEN: Adding the first listener, then removing it
        let id = observer
            .on(
                "tick",
                Arc::new(move |args: &[Value]| sink.lock().unwrap().push(args.to_vec())),
            )
            .unwrap();
        assert!(observer.off("tick", id));

        let seen = seen.lock().unwrap().clone();
        (seen, observer.listener_count("tick"))
    });

    // THEN: The event delivered during subscribe reached the new listener exactly once
    assert_eq!(seen, vec![vec![json!(1)]]);
    assert_eq!(listeners_after_off, 0);
}

#[test]
fn given_failing_subscribe_when_adding_listener_then_listener_rolled_back() {
    let (result, count) = run_with_deadline(|| {
        let observer = EventObserver::attach(
            Channel::new("eager").unwrap(),
            Arc::new(EagerTransport {
                fail_subscribe: true,
                ..EagerTransport::default()
            }),
        );

        let result = observer.on("tick", Arc::new(|_: &[Value]| {}));
        (result.map(|_| ()), observer.listener_count("tick"))
    });

    assert!(matches!(result, Err(CallError::Remote { .. })));
    assert_eq!(count, 0);
}
