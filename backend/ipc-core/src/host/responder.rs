//! Host responders for async and sync method calls.
//!
//! Each responder owns one transport name and multiplexes every method of its
//! kind over it: the first argument of an inbound payload is the message name,
//! the rest are the arguments. A name the host never bound is answered with
//! `false` rather than an error, so an older host tolerates newer clients.

use crate::contract::{BatchResponse, Channel, decode_batch, split_message};
use crate::error::{CallError, TransportError};
use crate::registry::{AsyncMember, SyncMember};
use crate::transport::{HostTransport, InvokeHandler, PartyId, SyncHandler};

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::FutureExt;
use log::{debug, error, info, warn};
use serde_json::Value;

/// Answers `message:C` invokes, plus batches on `batch:C`.
pub struct AsyncResponder<T> {
    channel: Channel,
    instance: Arc<T>,
    transport: Arc<dyn HostTransport>,
    methods: HashMap<String, AsyncMember<T>>,
    disposed: AtomicBool,
}

impl<T: Send + Sync + 'static> AsyncResponder<T> {
    pub(crate) fn new(channel: Channel, instance: Arc<T>, transport: Arc<dyn HostTransport>) -> Self {
        Self {
            channel,
            instance,
            transport,
            methods: HashMap::new(),
            disposed: AtomicBool::new(false),
        }
    }

    pub(crate) fn bind(&mut self, name: &str, member: AsyncMember<T>) {
        self.methods.insert(name.to_string(), member);
    }

    /// Register the call and batch handlers. Nothing stays registered on failure.
    pub(crate) fn attach(self) -> Result<Arc<Self>, TransportError> {
        let responder = Arc::new(self);
        let call_name = responder.channel.async_call_name();
        let batch_name = responder.channel.batch_name();

        let for_calls = Arc::clone(&responder);
        let call_handler: InvokeHandler = Arc::new(move |party: PartyId, args: Vec<Value>| {
            let responder = Arc::clone(&for_calls);
            async move { responder.handle(party, args).await }.boxed()
        });
        responder.transport.handle(&call_name, call_handler)?;

        let for_batches = Arc::clone(&responder);
        let batch_handler: InvokeHandler = Arc::new(move |party: PartyId, args: Vec<Value>| {
            let responder = Arc::clone(&for_batches);
            async move { responder.handle_batch(party, args).await }.boxed()
        });
        if let Err(e) = responder.transport.handle(&batch_name, batch_handler) {
            responder.transport.remove_handler(&call_name);
            return Err(e);
        }

        debug!(
            "Async responder on '{}' answers {} methods",
            responder.channel,
            responder.methods.len()
        );
        Ok(responder)
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    /// Decode one inbound invoke and dispatch it.
    pub async fn handle(&self, party: PartyId, args: Vec<Value>) -> Result<Value, CallError> {
        let (name, args) = split_message(args)?;
        debug!("Party {party} calls '{name}' on '{}'", self.channel);
        self.dispatch(&name, args).await
    }

    /// Run the handler bound to `name`, or answer `false` if there is none.
    pub async fn dispatch(&self, name: &str, args: Vec<Value>) -> Result<Value, CallError> {
        let Some(member) = self.methods.get(name).cloned() else {
            warn!(
                "No async handler for '{name}' on '{}', answering false",
                self.channel
            );
            return Ok(Value::Bool(false));
        };

        let result = member(&*self.instance, args).await;
        if let Err(e) = &result {
            error!("Async handler '{name}' on '{}' failed: {e}", self.channel);
        }
        result
    }

    /// Execute a batch in request order and answer one response per request.
    ///
    /// A failing request is reported in its own response; it never stops the
    /// rest of the batch.
    pub async fn handle_batch(&self, party: PartyId, args: Vec<Value>) -> Result<Value, CallError> {
        let (batch_id, requests) = decode_batch(args)?;
        info!(
            "Party {party} submitted batch {batch_id} with {} requests on '{}'",
            requests.len(),
            self.channel
        );

        let mut responses = Vec::with_capacity(requests.len());
        for request in requests {
            let result = self.dispatch(&request.name, request.args).await;
            responses.push(BatchResponse::from_result(request.id, result));
        }

        serde_json::to_value(responses)
            .map_err(|e| CallError::conversion(format!("failed to encode batch responses: {e}")))
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Detach from the transport. Repeated calls do nothing.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.transport.remove_handler(&self.channel.async_call_name());
        self.transport.remove_handler(&self.channel.batch_name());
        debug!("Async responder on '{}' detached", self.channel);
    }
}

/// Answers `sync.message:C` messages.
pub struct SyncResponder<T> {
    channel: Channel,
    instance: Arc<T>,
    transport: Arc<dyn HostTransport>,
    methods: HashMap<String, SyncMember<T>>,
    disposed: AtomicBool,
}

impl<T: Send + Sync + 'static> SyncResponder<T> {
    pub(crate) fn new(channel: Channel, instance: Arc<T>, transport: Arc<dyn HostTransport>) -> Self {
        Self {
            channel,
            instance,
            transport,
            methods: HashMap::new(),
            disposed: AtomicBool::new(false),
        }
    }

    pub(crate) fn bind(&mut self, name: &str, member: SyncMember<T>) {
        self.methods.insert(name.to_string(), member);
    }

    pub(crate) fn attach(self) -> Result<Arc<Self>, TransportError> {
        let responder = Arc::new(self);
        let for_calls = Arc::clone(&responder);
        let handler: SyncHandler = Arc::new(move |party: PartyId, args: Vec<Value>| {
            for_calls.handle(party, args)
        });
        responder
            .transport
            .handle_sync(&responder.channel.sync_call_name(), handler)?;

        debug!(
            "Sync responder on '{}' answers {} methods",
            responder.channel,
            responder.methods.len()
        );
        Ok(responder)
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    pub fn handle(&self, party: PartyId, args: Vec<Value>) -> Result<Value, CallError> {
        let (name, args) = split_message(args)?;
        debug!("Party {party} sync-calls '{name}' on '{}'", self.channel);
        self.dispatch(&name, args)
    }

    /// Run the handler bound to `name`, or answer `false` if there is none.
    pub fn dispatch(&self, name: &str, args: Vec<Value>) -> Result<Value, CallError> {
        let Some(member) = self.methods.get(name) else {
            warn!(
                "No sync handler for '{name}' on '{}', answering false",
                self.channel
            );
            return Ok(Value::Bool(false));
        };

        let result = member(&*self.instance, args);
        if let Err(e) = &result {
            error!("Sync handler '{name}' on '{}' failed: {e}", self.channel);
        }
        result
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.transport
            .remove_sync_handler(&self.channel.sync_call_name());
        debug!("Sync responder on '{}' detached", self.channel);
    }
}
