//! Event broadcaster: re-broadcasts host-local events to remote subscribers.
//!
//! Clients subscribe and unsubscribe per event name through two sync
//! messages. All events of a contract travel on the one shared dispatch name
//! `event:C`, with the event name as the first argument.

use crate::contract::{Channel, join_message, split_message};
use crate::error::{EndpointError, TransportError};
use crate::host::LocalEvent;
use crate::host::subscribers::SubscriberSet;
use crate::transport::{HostTransport, PartyId, SyncHandler};

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use log::{debug, error, info, warn};
use serde_json::Value;

pub struct EventBroadcaster {
    channel: Channel,
    transport: Arc<dyn HostTransport>,
    subscribers: Mutex<HashMap<String, SubscriberSet>>,
    forwards: Mutex<Vec<(LocalEvent, u64)>>,
    disposed: AtomicBool,
}

impl EventBroadcaster {
    /// Create the broadcaster and register its subscribe/unsubscribe handlers.
    pub(crate) fn attach(
        channel: Channel,
        transport: Arc<dyn HostTransport>,
    ) -> Result<Arc<Self>, TransportError> {
        let broadcaster = Arc::new(Self {
            channel,
            transport,
            subscribers: Mutex::new(HashMap::new()),
            forwards: Mutex::new(Vec::new()),
            disposed: AtomicBool::new(false),
        });

        let subscribe_name = broadcaster.channel.subscribe_name();
        let unsubscribe_name = broadcaster.channel.unsubscribe_name();

        broadcaster.transport.handle_sync(
            &subscribe_name,
            Self::membership_handler(&broadcaster, |broadcaster, party, event| {
                broadcaster.subscribe(party, event)
            }),
        )?;

        if let Err(e) = broadcaster.transport.handle_sync(
            &unsubscribe_name,
            Self::membership_handler(&broadcaster, |broadcaster, party, event| {
                broadcaster.unsubscribe(party, event)
            }),
        ) {
            broadcaster.transport.remove_sync_handler(&subscribe_name);
            return Err(e);
        }

        debug!("Event broadcaster attached on '{}'", broadcaster.channel);
        Ok(broadcaster)
    }

    fn membership_handler(
        broadcaster: &Arc<Self>,
        apply: fn(&EventBroadcaster, PartyId, &str) -> bool,
    ) -> SyncHandler {
        let weak: Weak<Self> = Arc::downgrade(broadcaster);
        Arc::new(move |party, args| {
            let Some(broadcaster) = weak.upgrade() else {
                return Ok(Value::Bool(false));
            };
            let (event, _) = split_message(args)?;
            Ok(Value::Bool(apply(&broadcaster, party, &event)))
        })
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Add `party` to the subscribers of `event`.
    ///
    /// Returns `false` for a repeated subscription, which is informational.
    pub fn subscribe(&self, party: PartyId, event: &str) -> bool {
        let added = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(event.to_string())
            .or_default()
            .insert(party);

        if added {
            debug!("Party {party} subscribed to '{event}' on '{}'", self.channel);
        } else {
            debug!(
                "Party {party} already subscribed to '{event}' on '{}'",
                self.channel
            );
        }
        added
    }

    /// Remove `party` from the subscribers of `event`.
    ///
    /// Returns `false` if it was not subscribed. An emptied set is discarded.
    pub fn unsubscribe(&self, party: PartyId, event: &str) -> bool {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let Some(set) = subscribers.get_mut(event) else {
            return false;
        };
        let removed = set.remove(party);
        if set.is_empty() {
            subscribers.remove(event);
        }

        if removed {
            debug!(
                "Party {party} unsubscribed from '{event}' on '{}'",
                self.channel
            );
        }
        removed
    }

    /// Send `event` to every live subscriber.
    ///
    /// Returns `Ok(false)` without touching the transport when nobody live is
    /// listening. Subscribers that vanished are dropped here, and a delivery
    /// that fails because a party vanished mid-emit is ignored.
    ///
    /// # Errors
    ///
    /// [`EndpointError::Disposed`] after [`dispose`](Self::dispose).
    #[track_caller]
    pub fn emit(&self, event: &str, args: Vec<Value>) -> Result<bool, EndpointError> {
        if self.disposed.load(Ordering::SeqCst) {
            error!(
                "emit('{event}') on disposed broadcaster for '{}'",
                self.channel
            );
            return Err(EndpointError::disposed(self.channel.as_str(), "emit"));
        }

        let targets = {
            let mut subscribers = self
                .subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let Some(set) = subscribers.get_mut(event) else {
                return Ok(false);
            };
            let live = set.live(|party| self.transport.is_alive(party));
            if set.is_empty() {
                subscribers.remove(event);
            }
            live
        };

        if targets.is_empty() {
            return Ok(false);
        }

        let payload = join_message(event, args);

        let wire_name = self.channel.event_name();
        for party in targets {
            if let Err(e) = self.transport.send_to(party, &wire_name, payload.clone()) {
                debug!("Skipped '{event}' delivery to party {party}: {e}");
            }
        }
        Ok(true)
    }

    /// Subscribers of `event` that are currently alive. Does not prune.
    pub fn subscriber_count(&self, event: &str) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event)
            .map(|set| {
                set.iter()
                    .filter(|&party| self.transport.is_alive(party))
                    .count()
            })
            .unwrap_or(0)
    }

    /// Re-broadcast every firing of `source` as `event`.
    pub(crate) fn forward(self: &Arc<Self>, event: &str, source: LocalEvent) {
        let weak = Arc::downgrade(self);
        let event_name = event.to_string();
        let id = source.subscribe(move |args| {
            let Some(broadcaster) = weak.upgrade() else {
                return;
            };
            if let Err(e) = broadcaster.emit(&event_name, args.to_vec()) {
                warn!("Dropped local '{event_name}' event: {e}");
            }
        });
        self.forwards
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((source, id));
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Detach both membership handlers, stop forwarding local events and clear
    /// every subscriber set. Repeated calls do nothing.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        self.transport
            .remove_sync_handler(&self.channel.subscribe_name());
        self.transport
            .remove_sync_handler(&self.channel.unsubscribe_name());

        for (source, id) in self
            .forwards
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
        {
            source.unsubscribe(id);
        }

        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();

        info!("Event broadcaster for '{}' disposed", self.channel);
    }
}
