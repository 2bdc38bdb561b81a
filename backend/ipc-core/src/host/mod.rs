//! Host side of a contract.
//!
//! A [`HostEndpoint`] binds one instance of a contract-bearing type to one
//! channel. It walks the type's resolved bindings once and creates, only for
//! the kinds that actually have bindings, an [`AsyncResponder`], a
//! [`SyncResponder`] and an [`EventBroadcaster`]. The three are disposed
//! together.
//!
//! Before attaching any of them the endpoint claims `host:C` with the
//! transport, so a second host on the channel is refused even when the two
//! bind disjoint kinds. The claim is released last on dispose.

pub mod broadcaster;
pub mod local_event;
pub mod responder;
pub mod subscribers;

pub use broadcaster::EventBroadcaster;
pub use local_event::LocalEvent;
pub use responder::{AsyncResponder, SyncResponder};
pub use subscribers::SubscriberSet;

use crate::contract::{Channel, Contract, MessageKind};
use crate::error::{CallError, CoreError, EndpointError, TransportError};
use crate::registry::{ClassBindings, Contracted, Member, bindings_for};
use crate::transport::{HostTransport, PartyId, SyncHandler};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{error, info, warn};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EndpointState {
    Active,
    Disposed,
}

pub struct HostEndpoint<T: Send + Sync + 'static> {
    contract: Contract,
    instance: Arc<T>,
    async_responder: Option<Arc<AsyncResponder<T>>>,
    sync_responder: Option<Arc<SyncResponder<T>>>,
    broadcaster: Option<Arc<EventBroadcaster>>,
    transport: Arc<dyn HostTransport>,
    disposed: AtomicBool,
}

impl<T: Send + Sync + 'static> HostEndpoint<T> {
    /// Construct an instance behind its context guard and bind it.
    ///
    /// The guard is checked before `constructor` runs.
    pub fn construct<F>(
        constructor: F,
        contract: &Contract,
        transport: Arc<dyn HostTransport>,
    ) -> Result<Self, CoreError>
    where
        T: Contracted,
        F: FnOnce() -> T,
    {
        let bindings = bindings_for::<T>()?;
        let instance = bindings.guard().construct(constructor)?;
        Self::bind_with(Arc::new(instance), &bindings, contract, transport)
    }

    /// Bind an existing instance using its registered bindings.
    pub fn bind(
        instance: Arc<T>,
        contract: &Contract,
        transport: Arc<dyn HostTransport>,
    ) -> Result<Self, CoreError>
    where
        T: Contracted,
    {
        let bindings = bindings_for::<T>()?;
        Self::bind_with(instance, &bindings, contract, transport)
    }

    /// Bind an instance with explicitly supplied bindings.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Affinity`] if the bindings are guarded for a context
    ///   this process is not marked with
    /// - [`CoreError::Contract`] if a binding is not in `contract` or has the
    ///   wrong kind there
    /// - [`CoreError::Endpoint`] with [`EndpointError::ChannelTaken`] if another
    ///   live host endpoint serves the channel
    /// - [`CoreError::Transport`] if a handler name of the channel is taken
    ///   outside of any host endpoint
    pub fn bind_with(
        instance: Arc<T>,
        bindings: &ClassBindings<T>,
        contract: &Contract,
        transport: Arc<dyn HostTransport>,
    ) -> Result<Self, CoreError> {
        bindings.guard().check()?;

        let channel = contract.channel().clone();
        let resolved = bindings.resolve(channel.as_str());
        if resolved.is_empty() {
            warn!(
                "{} has no bindings on channel '{channel}'",
                bindings.class_name()
            );
        }

        let mut async_responder: Option<AsyncResponder<T>> = None;
        let mut sync_responder: Option<SyncResponder<T>> = None;
        let mut sources = Vec::new();

        for binding in resolved {
            contract.check(&binding.name, binding.entry.kind)?;
            match binding.entry.member {
                Member::Async(member) => async_responder
                    .get_or_insert_with(|| {
                        AsyncResponder::new(
                            channel.clone(),
                            Arc::clone(&instance),
                            Arc::clone(&transport),
                        )
                    })
                    .bind(&binding.name, member),
                Member::Sync(member) => sync_responder
                    .get_or_insert_with(|| {
                        SyncResponder::new(
                            channel.clone(),
                            Arc::clone(&instance),
                            Arc::clone(&transport),
                        )
                    })
                    .bind(&binding.name, member),
                Member::Event(source) => sources.push((binding.name, source(&*instance))),
                Member::Stub => warn!(
                    "{} declares '{}' as a client stub, ignored on the host",
                    binding.declared_by, binding.name
                ),
            }
        }

        claim_channel(&channel, transport.as_ref())?;

        let mut endpoint = Self {
            contract: contract.clone(),
            instance,
            async_responder: None,
            sync_responder: None,
            broadcaster: None,
            transport: Arc::clone(&transport),
            disposed: AtomicBool::new(false),
        };

        // A failed attach leaves earlier sub-endpoints attached; dispose
        // detaches them again before the error propagates.
        if let Some(responder) = async_responder {
            endpoint.async_responder = Some(endpoint.attach_or_dispose(responder.attach())?);
        }
        if let Some(responder) = sync_responder {
            endpoint.sync_responder = Some(endpoint.attach_or_dispose(responder.attach())?);
        }
        if !sources.is_empty() {
            let broadcaster = endpoint.attach_or_dispose(EventBroadcaster::attach(
                channel.clone(),
                Arc::clone(&transport),
            ))?;
            for (name, source) in sources {
                broadcaster.forward(&name, source);
            }
            endpoint.broadcaster = Some(broadcaster);
        }

        info!(
            "{} bound on channel '{channel}' ({} async, {} sync, events: {})",
            bindings.guard().display_name(),
            endpoint
                .async_responder
                .as_ref()
                .map_or(0, |responder| responder.method_count()),
            endpoint
                .sync_responder
                .as_ref()
                .map_or(0, |responder| responder.method_count()),
            endpoint.broadcaster.is_some()
        );
        Ok(endpoint)
    }

    fn attach_or_dispose<S>(
        &self,
        attached: Result<S, TransportError>,
    ) -> Result<S, CoreError> {
        attached.map_err(|e| {
            error!(
                "Failed to attach to channel '{}': {e}",
                self.contract.channel()
            );
            self.dispose();
            CoreError::from(e)
        })
    }

    pub fn contract(&self) -> &Contract {
        &self.contract
    }

    pub fn instance(&self) -> &Arc<T> {
        &self.instance
    }

    pub fn state(&self) -> EndpointState {
        if self.disposed.load(Ordering::SeqCst) {
            EndpointState::Disposed
        } else {
            EndpointState::Active
        }
    }

    pub fn async_responder(&self) -> Option<&Arc<AsyncResponder<T>>> {
        self.async_responder.as_ref()
    }

    pub fn sync_responder(&self) -> Option<&Arc<SyncResponder<T>>> {
        self.sync_responder.as_ref()
    }

    pub fn broadcaster(&self) -> Option<&Arc<EventBroadcaster>> {
        self.broadcaster.as_ref()
    }

    /// Broadcast `event` to its live subscribers.
    ///
    /// Returns whether anybody was sent the event.
    ///
    /// # Errors
    ///
    /// - [`EndpointError::Disposed`] after [`dispose`](Self::dispose)
    /// - [`EndpointError::NotBound`] if the type binds no events on this channel
    #[track_caller]
    pub fn emit(&self, event: &str, args: Vec<Value>) -> Result<bool, EndpointError> {
        let channel = self.contract.channel().as_str();
        if self.disposed.load(Ordering::SeqCst) {
            error!("emit('{event}') on disposed host endpoint for '{channel}'");
            return Err(EndpointError::disposed(channel, "emit"));
        }
        match &self.broadcaster {
            Some(broadcaster) => broadcaster.emit(event, args),
            None => Err(EndpointError::not_bound(channel, MessageKind::Event)),
        }
    }

    pub fn subscriber_count(&self, event: &str) -> usize {
        self.broadcaster
            .as_ref()
            .map_or(0, |broadcaster| broadcaster.subscriber_count(event))
    }

    /// Detach every sub-endpoint. Repeated calls do nothing.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(responder) = &self.async_responder {
            responder.dispose();
        }
        if let Some(responder) = &self.sync_responder {
            responder.dispose();
        }
        if let Some(broadcaster) = &self.broadcaster {
            broadcaster.dispose();
        }
        self.transport
            .remove_sync_handler(&self.contract.channel().host_claim_name());
        info!(
            "Host endpoint on '{}' disposed",
            self.contract.channel()
        );
    }
}

fn claim_channel(channel: &Channel, transport: &dyn HostTransport) -> Result<(), CoreError> {
    let claim: SyncHandler =
        Arc::new(|_: PartyId, _: Vec<Value>| -> Result<Value, CallError> { Ok(Value::Bool(true)) });
    match transport.handle_sync(&channel.host_claim_name(), claim) {
        Ok(()) => Ok(()),
        Err(TransportError::HandlerExists { .. }) => {
            error!("Channel '{channel}' already has a live host endpoint");
            Err(EndpointError::channel_taken(channel.as_str()).into())
        }
        Err(e) => Err(e.into()),
    }
}

impl<T: Send + Sync + 'static> Drop for HostEndpoint<T> {
    fn drop(&mut self) {
        self.dispose();
    }
}
