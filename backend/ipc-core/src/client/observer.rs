//! Client event observer.
//!
//! Keeps the local listeners per event name and owns the one inbound handler
//! on `event:C`. The host hears about an event name exactly twice: when its
//! first listener is added (subscribe) and when its last one is removed
//! (unsubscribe).

use crate::contract::{Channel, split_message};
use crate::error::CallError;
use crate::transport::{ClientTransport, EventHandler, HOST_PARTY, ListenerId};

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use log::{debug, error, info, warn};
use serde_json::Value;

pub type EventListener = Arc<dyn Fn(&[Value]) + Send + Sync>;

#[derive(Default)]
struct ListenerTable {
    next_id: u64,
    by_event: HashMap<String, Vec<(ListenerId, EventListener)>>,
}

pub struct EventObserver {
    channel: Channel,
    transport: Arc<dyn ClientTransport>,
    table: Arc<Mutex<ListenerTable>>,
    inbound: ListenerId,
    disposed: AtomicBool,
}

impl EventObserver {
    pub(crate) fn attach(channel: Channel, transport: Arc<dyn ClientTransport>) -> Self {
        let table = Arc::new(Mutex::new(ListenerTable::default()));
        let handler = inbound_handler(channel.clone(), Arc::downgrade(&table));
        let inbound = transport.on(&channel.event_name(), handler);
        debug!("Event observer attached on '{channel}'");

        Self {
            channel,
            transport,
            table,
            inbound,
            disposed: AtomicBool::new(false),
        }
    }

    /// Register `listener` for `event`.
    ///
    /// The first listener for a name subscribes with the host. If that
    /// subscribe fails the listener is not kept.
    #[track_caller]
    pub fn on(&self, event: &str, listener: EventListener) -> Result<ListenerId, CallError> {
        if self.is_disposed() {
            error!("on('{event}') on disposed observer for '{}'", self.channel);
            return Err(CallError::disposed(self.channel.as_str()));
        }

        let (id, first) = {
            let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
            let id = ListenerId(table.next_id);
            table.next_id += 1;

            let listeners = table.by_event.entry(event.to_string()).or_default();
            let first = listeners.is_empty();
            listeners.push((id, listener));
            (id, first)
        };

        // Never hold the table across send_sync: a transport may dispatch
        // inbound events on this thread before the reply returns.
        if first {
            match self.send_membership(&self.channel.subscribe_name(), event) {
                Ok(true) => debug!("Subscribed to '{event}' on '{}'", self.channel),
                Ok(false) => debug!("Host already had '{event}' subscribed on '{}'", self.channel),
                Err(e) => {
                    self.forget(event, id);
                    error!("Subscribe to '{event}' on '{}' failed: {e}", self.channel);
                    return Err(e);
                }
            }
        }
        Ok(id)
    }

    /// Remove one listener. Returns `false` if it was not registered.
    pub fn off(&self, event: &str, id: ListenerId) -> bool {
        let (removed, emptied) = self.forget(event, id);

        if emptied
            && !self.is_disposed()
            && let Err(e) = self.send_membership(&self.channel.unsubscribe_name(), event)
        {
            warn!("Unsubscribe from '{event}' on '{}' failed: {e}", self.channel);
        }
        removed
    }

    /// Drop `id` from the table. Returns whether it was there and whether the
    /// event name is left without listeners.
    fn forget(&self, event: &str, id: ListenerId) -> (bool, bool) {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(listeners) = table.by_event.get_mut(event) else {
            return (false, false);
        };

        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        let removed = listeners.len() != before;

        let emptied = listeners.is_empty();
        if emptied {
            table.by_event.remove(event);
        }
        (removed, emptied)
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .by_event
            .get(event)
            .map_or(0, Vec::len)
    }

    fn send_membership(&self, wire_name: &str, event: &str) -> Result<bool, CallError> {
        let reply = self
            .transport
            .send_sync(wire_name, vec![Value::String(event.to_string())])?;
        Ok(reply.as_bool().unwrap_or(false))
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Unsubscribe every event name that still has listeners and detach the
    /// inbound handler. Repeated calls do nothing.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        let events: Vec<String> = self
            .table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .by_event
            .drain()
            .map(|(event, _)| event)
            .collect();

        for event in &events {
            if let Err(e) = self.send_membership(&self.channel.unsubscribe_name(), event) {
                debug!("Unsubscribe from '{event}' during dispose failed: {e}");
            }
        }

        self.transport.off(&self.channel.event_name(), self.inbound);
        info!(
            "Event observer on '{}' disposed ({} subscriptions dropped)",
            self.channel,
            events.len()
        );
    }
}

fn inbound_handler(channel: Channel, table: Weak<Mutex<ListenerTable>>) -> EventHandler {
    Arc::new(move |origin, payload| {
        if origin != HOST_PARTY {
            warn!("Discarded event on '{channel}' from foreign party {origin}");
            return;
        }
        let Some(table) = table.upgrade() else {
            return;
        };

        let (event, args) = match split_message(payload) {
            Ok(split) => split,
            Err(e) => {
                warn!("Discarded malformed event on '{channel}': {e}");
                return;
            }
        };

        let listeners: Vec<EventListener> = table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .by_event
            .get(&event)
            .map(|listeners| {
                listeners
                    .iter()
                    .map(|(_, listener)| Arc::clone(listener))
                    .collect()
            })
            .unwrap_or_default();

        if listeners.is_empty() {
            debug!("No listeners for '{event}' on '{channel}'");
        }
        for listener in listeners {
            listener(&args);
        }
    })
}
