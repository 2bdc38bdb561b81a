//! In-process transport.
//!
//! A [`MemoryBus`] connects one host to any number of client parties inside a
//! single process. Handlers run on the caller's task and no bus lock is held
//! while a handler runs, so handlers may call back into the bus.
//!
//! Besides backing the panel app, the bus gives tests the levers a real
//! transport would not: [`MemoryClient::close`] makes a party vanish without
//! unsubscribing, [`MemoryBus::deliver_as`] forges the origin of a message, and
//! [`MemoryBus::sent_count`] counts host-to-client sends.

use crate::error::{CallError, TransportError};
use crate::transport::{
    ClientTransport, EventHandler, HOST_PARTY, HostTransport, InvokeHandler, ListenerId, PartyId,
    SyncHandler,
};

use std::collections::HashMap;
use std::future::ready;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use futures_util::future::BoxFuture;
use log::{debug, info, trace};
use serde_json::Value;

const FIRST_CLIENT_PARTY: PartyId = 1;

struct PartyState {
    alive: bool,
    listeners: HashMap<String, Vec<(ListenerId, EventHandler)>>,
}

struct BusInner {
    invoke_handlers: RwLock<HashMap<String, InvokeHandler>>,
    sync_handlers: RwLock<HashMap<String, SyncHandler>>,
    parties: RwLock<HashMap<PartyId, PartyState>>,
    next_party: AtomicU64,
    next_listener: AtomicU64,
    sent: AtomicUsize,
}

/// Shared in-memory bus. Clones refer to the same bus.
#[derive(Clone)]
pub struct MemoryBus {
    inner: Arc<BusInner>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                invoke_handlers: RwLock::new(HashMap::new()),
                sync_handlers: RwLock::new(HashMap::new()),
                parties: RwLock::new(HashMap::new()),
                next_party: AtomicU64::new(FIRST_CLIENT_PARTY),
                next_listener: AtomicU64::new(0),
                sent: AtomicUsize::new(0),
            }),
        }
    }

    /// The host side of the bus.
    pub fn host(&self) -> MemoryHost {
        MemoryHost { bus: self.clone() }
    }

    /// Register a new client party.
    pub fn connect(&self) -> MemoryClient {
        let party = self.inner.next_party.fetch_add(1, Ordering::SeqCst);
        self.inner
            .parties
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                party,
                PartyState {
                    alive: true,
                    listeners: HashMap::new(),
                },
            );
        info!("Memory bus: party {party} connected");
        MemoryClient {
            bus: self.clone(),
            party,
        }
    }

    /// Number of host-to-client sends attempted so far.
    pub fn sent_count(&self) -> usize {
        self.inner.sent.load(Ordering::SeqCst)
    }

    /// Deliver a one-way message to `target` claiming to come from `origin`.
    pub fn deliver_as(
        &self,
        origin: PartyId,
        target: PartyId,
        name: &str,
        args: Vec<Value>,
    ) -> Result<(), TransportError> {
        self.deliver(origin, target, name, args)
    }

    fn is_alive(&self, party: PartyId) -> bool {
        if party == HOST_PARTY {
            return true;
        }
        self.inner
            .parties
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&party)
            .is_some_and(|state| state.alive)
    }

    fn deliver(
        &self,
        origin: PartyId,
        target: PartyId,
        name: &str,
        args: Vec<Value>,
    ) -> Result<(), TransportError> {
        let handlers: Vec<EventHandler> = {
            let parties = self
                .inner
                .parties
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            match parties.get(&target) {
                Some(state) if state.alive => state
                    .listeners
                    .get(name)
                    .map(|listeners| listeners.iter().map(|(_, h)| Arc::clone(h)).collect())
                    .unwrap_or_default(),
                _ => return Err(TransportError::party_closed(target)),
            }
        };

        trace!(
            "Memory bus: {name} from {origin} to {target} ({} listeners)",
            handlers.len()
        );

        for handler in handlers {
            handler(origin, args.clone());
        }
        Ok(())
    }

    fn invoke_handler(&self, name: &str) -> Option<InvokeHandler> {
        self.inner
            .invoke_handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    fn sync_handler(&self, name: &str) -> Option<SyncHandler> {
        self.inner
            .sync_handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Host side of a [`MemoryBus`].
#[derive(Clone)]
pub struct MemoryHost {
    bus: MemoryBus,
}

impl HostTransport for MemoryHost {
    fn handle(&self, name: &str, handler: InvokeHandler) -> Result<(), TransportError> {
        let mut handlers = self
            .bus
            .inner
            .invoke_handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if handlers.contains_key(name) {
            return Err(TransportError::handler_exists(name));
        }
        handlers.insert(name.to_string(), handler);
        debug!("Memory bus: async handler registered for {name}");
        Ok(())
    }

    fn handle_sync(&self, name: &str, handler: SyncHandler) -> Result<(), TransportError> {
        let mut handlers = self
            .bus
            .inner
            .sync_handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if handlers.contains_key(name) {
            return Err(TransportError::handler_exists(name));
        }
        handlers.insert(name.to_string(), handler);
        debug!("Memory bus: sync handler registered for {name}");
        Ok(())
    }

    fn remove_handler(&self, name: &str) {
        self.bus
            .inner
            .invoke_handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
    }

    fn remove_sync_handler(&self, name: &str) {
        self.bus
            .inner
            .sync_handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
    }

    fn send_to(&self, party: PartyId, name: &str, args: Vec<Value>) -> Result<(), TransportError> {
        self.bus.inner.sent.fetch_add(1, Ordering::SeqCst);
        self.bus.deliver(HOST_PARTY, party, name, args)
    }

    fn is_alive(&self, party: PartyId) -> bool {
        self.bus.is_alive(party)
    }
}

/// One client party of a [`MemoryBus`].
#[derive(Clone)]
pub struct MemoryClient {
    bus: MemoryBus,
    party: PartyId,
}

impl MemoryClient {
    /// Make this party vanish: it stops being alive and loses its listeners,
    /// without telling anybody.
    pub fn close(&self) {
        let mut parties = self
            .bus
            .inner
            .parties
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(state) = parties.get_mut(&self.party) {
            state.alive = false;
            state.listeners.clear();
            info!("Memory bus: party {} closed", self.party);
        }
    }

    pub fn is_closed(&self) -> bool {
        !self.bus.is_alive(self.party)
    }

    pub fn bus(&self) -> &MemoryBus {
        &self.bus
    }
}

impl ClientTransport for MemoryClient {
    fn party(&self) -> PartyId {
        self.party
    }

    fn invoke(&self, name: &str, args: Vec<Value>) -> BoxFuture<'static, Result<Value, CallError>> {
        if self.is_closed() {
            let error = CallError::from(TransportError::party_closed(self.party));
            return Box::pin(ready(Err(error)));
        }

        match self.bus.invoke_handler(name) {
            Some(handler) => handler(self.party, args),
            None => {
                let error = CallError::from(TransportError::no_handler(name));
                Box::pin(ready(Err(error)))
            }
        }
    }

    fn send_sync(&self, name: &str, args: Vec<Value>) -> Result<Value, CallError> {
        if self.is_closed() {
            return Err(TransportError::party_closed(self.party).into());
        }

        match self.bus.sync_handler(name) {
            Some(handler) => handler(self.party, args),
            None => Err(TransportError::no_handler(name).into()),
        }
    }

    fn on(&self, name: &str, handler: EventHandler) -> ListenerId {
        let id = ListenerId(self.bus.inner.next_listener.fetch_add(1, Ordering::SeqCst));
        let mut parties = self
            .bus
            .inner
            .parties
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(state) = parties.get_mut(&self.party) {
            state
                .listeners
                .entry(name.to_string())
                .or_default()
                .push((id, handler));
        }
        id
    }

    fn off(&self, name: &str, id: ListenerId) {
        let mut parties = self
            .bus
            .inner
            .parties
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(state) = parties.get_mut(&self.party)
            && let Some(listeners) = state.listeners.get_mut(name)
        {
            listeners.retain(|(existing, _)| *existing != id);
            if listeners.is_empty() {
                state.listeners.remove(name);
            }
        }
    }
}
