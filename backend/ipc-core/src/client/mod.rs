//! Client side of a contract.
//!
//! A [`ClientEndpoint`] is the proxy a client-context type talks through. It
//! knows the stub bindings of its client type, so every call is checked
//! against what the type declared before anything reaches the wire.

pub mod batch;
pub mod caller;
pub mod observer;

pub use batch::{BatchRecorder, PendingCall};
pub use caller::{AsyncCaller, SyncCaller};
pub use observer::{EventListener, EventObserver};

use crate::config::MessagingConfig;
use crate::contract::{Contract, Converter, MessageKind, decode_args, decode_result, encode_args};
use crate::error::{CallError, CoreError, EndpointError};
use crate::host::EndpointState;
use crate::registry::{ClassBindings, Contracted, bindings_for};
use crate::transport::{ClientTransport, ListenerId};

use std::collections::HashMap;
use std::future::ready;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::future::BoxFuture;
use log::{error, info, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

#[derive(Clone)]
struct ClientBinding {
    kind: MessageKind,
    converter: Option<Converter>,
}

pub struct ClientEndpoint {
    contract: Contract,
    bindings: Arc<HashMap<String, ClientBinding>>,
    async_caller: Option<Arc<AsyncCaller>>,
    sync_caller: Option<SyncCaller>,
    observer: Option<EventObserver>,
    max_batch_requests: usize,
    disposed: AtomicBool,
}

impl ClientEndpoint {
    /// Connect the client type `C` to `contract` using its registered bindings.
    pub fn connect<C: Contracted>(
        contract: &Contract,
        transport: Arc<dyn ClientTransport>,
        config: &MessagingConfig,
    ) -> Result<Self, CoreError> {
        let bindings = bindings_for::<C>()?;
        Self::connect_with(&bindings, contract, transport, config)
    }

    /// Connect with explicitly supplied bindings.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Affinity`] if the bindings are guarded for a context
    ///   this process is not marked with
    /// - [`CoreError::Contract`] if a stub is not in `contract` or has the
    ///   wrong kind there
    pub fn connect_with<C: Send + Sync + 'static>(
        bindings: &ClassBindings<C>,
        contract: &Contract,
        transport: Arc<dyn ClientTransport>,
        config: &MessagingConfig,
    ) -> Result<Self, CoreError> {
        bindings.guard().check()?;

        let channel = contract.channel().clone();
        let mut declared = HashMap::new();
        for binding in bindings.resolve(channel.as_str()) {
            contract.check(&binding.name, binding.entry.kind)?;
            declared.insert(
                binding.name,
                ClientBinding {
                    kind: binding.entry.kind,
                    converter: binding.entry.converter,
                },
            );
        }
        if declared.is_empty() {
            warn!(
                "{} declares no stubs on channel '{channel}'",
                bindings.class_name()
            );
        }

        let has = |kind: MessageKind| declared.values().any(|binding| binding.kind == kind);
        let async_caller = has(MessageKind::AsyncMethod)
            .then(|| Arc::new(AsyncCaller::new(channel.clone(), Arc::clone(&transport))));
        let sync_caller = has(MessageKind::SyncMethod).then(|| {
            SyncCaller::new(
                channel.clone(),
                Arc::clone(&transport),
                config.calls.slow_sync_call(),
            )
        });
        let observer = has(MessageKind::Event)
            .then(|| EventObserver::attach(channel.clone(), Arc::clone(&transport)));

        info!(
            "{} connected to channel '{channel}' as party {} ({} stubs)",
            bindings.guard().display_name(),
            transport.party(),
            declared.len()
        );

        Ok(Self {
            contract: contract.clone(),
            bindings: Arc::new(declared),
            async_caller,
            sync_caller,
            observer,
            max_batch_requests: config.batch.max_requests,
            disposed: AtomicBool::new(false),
        })
    }

    pub fn contract(&self) -> &Contract {
        &self.contract
    }

    pub fn state(&self) -> EndpointState {
        if self.disposed.load(Ordering::SeqCst) {
            EndpointState::Disposed
        } else {
            EndpointState::Active
        }
    }

    fn channel_name(&self) -> &str {
        self.contract.channel().as_str()
    }

    #[track_caller]
    fn ensure_active(&self, operation: &str) -> Result<(), CallError> {
        if self.disposed.load(Ordering::SeqCst) {
            error!("{operation} on disposed client endpoint for '{}'", self.channel_name());
            return Err(CallError::disposed(self.channel_name()));
        }
        Ok(())
    }

    #[track_caller]
    fn declared(&self, name: &str, kind: MessageKind) -> Result<Option<Converter>, CallError> {
        lookup(&self.bindings, self.channel_name(), name, kind)
    }

    /// Call an async method with raw arguments.
    #[track_caller]
    pub fn call(&self, name: &str, args: Vec<Value>) -> BoxFuture<'static, Result<Value, CallError>> {
        let prepared = self.ensure_active("call").and_then(|()| {
            let converter = self.declared(name, MessageKind::AsyncMethod)?;
            let caller = self
                .async_caller
                .as_ref()
                .ok_or_else(|| CallError::undeclared(self.channel_name(), name, MessageKind::AsyncMethod))?;
            Ok((caller.call(name, args), converter))
        });

        match prepared {
            Ok((reply, converter)) => Box::pin(async move {
                let value = reply.await?;
                match converter {
                    Some(convert) => convert(value),
                    None => Ok(value),
                }
            }),
            Err(e) => Box::pin(ready(Err(e))),
        }
    }

    /// Call an async method with typed arguments and result.
    ///
    /// A tuple spreads into one argument per element; `()` sends none.
    pub async fn invoke<A, R>(&self, name: &str, args: A) -> Result<R, CallError>
    where
        A: Serialize,
        R: DeserializeOwned,
    {
        let args = encode_args(args)?;
        decode_result(self.call(name, args).await?)
    }

    /// Call a sync method with raw arguments. Blocks until the host answers.
    #[track_caller]
    pub fn call_sync(&self, name: &str, args: Vec<Value>) -> Result<Value, CallError> {
        self.ensure_active("call_sync")?;
        let converter = self.declared(name, MessageKind::SyncMethod)?;
        let caller = self
            .sync_caller
            .as_ref()
            .ok_or_else(|| CallError::undeclared(self.channel_name(), name, MessageKind::SyncMethod))?;

        let value = caller.call(name, args)?;
        match converter {
            Some(convert) => convert(value),
            None => Ok(value),
        }
    }

    pub fn invoke_sync<A, R>(&self, name: &str, args: A) -> Result<R, CallError>
    where
        A: Serialize,
        R: DeserializeOwned,
    {
        let args = encode_args(args)?;
        decode_result(self.call_sync(name, args)?)
    }

    /// Listen for `event` with the raw payload.
    #[track_caller]
    pub fn on<F>(&self, event: &str, listener: F) -> Result<ListenerId, CallError>
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        self.ensure_active("on")?;
        let converter = self.declared(event, MessageKind::Event)?;
        let observer = self
            .observer
            .as_ref()
            .ok_or_else(|| CallError::undeclared(self.channel_name(), event, MessageKind::Event))?;

        let listener: EventListener = match converter {
            None => Arc::new(listener),
            Some(convert) => {
                let event_name = event.to_string();
                Arc::new(move |args: &[Value]| match convert(Value::Array(args.to_vec())) {
                    Ok(Value::Array(converted)) => listener(&converted),
                    Ok(other) => listener(std::slice::from_ref(&other)),
                    Err(e) => warn!("Dropped '{event_name}' payload: {e}"),
                })
            }
        };
        observer.on(event, listener)
    }

    /// Listen for `event`, decoding the payload as `A` (usually a tuple).
    ///
    /// Payloads that do not decode are logged and skipped.
    #[track_caller]
    pub fn on_typed<A, F>(&self, event: &str, listener: F) -> Result<ListenerId, CallError>
    where
        A: DeserializeOwned + 'static,
        F: Fn(A) + Send + Sync + 'static,
    {
        let event_name = event.to_string();
        self.on(event, move |args: &[Value]| {
            match decode_args::<A>(args.to_vec()) {
                Ok(decoded) => listener(decoded),
                Err(e) => warn!("Dropped undecodable '{event_name}' payload: {e}"),
            }
        })
    }

    /// Remove a listener. Removing the last one for `event` unsubscribes.
    pub fn off(&self, event: &str, id: ListenerId) -> bool {
        self.observer
            .as_ref()
            .is_some_and(|observer| observer.off(event, id))
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.observer
            .as_ref()
            .map_or(0, |observer| observer.listener_count(event))
    }

    /// Start recording a batch of async calls.
    ///
    /// # Errors
    ///
    /// - [`EndpointError::Disposed`] after [`dispose`](Self::dispose)
    /// - [`EndpointError::NotBound`] if the type declares no async methods
    #[track_caller]
    pub fn batch(&self) -> Result<BatchRecorder, EndpointError> {
        if self.disposed.load(Ordering::SeqCst) {
            error!("batch() on disposed client endpoint for '{}'", self.channel_name());
            return Err(EndpointError::disposed(self.channel_name(), "batch"));
        }
        let caller = self
            .async_caller
            .as_ref()
            .ok_or_else(|| EndpointError::not_bound(self.channel_name(), MessageKind::AsyncMethod))?;

        let bindings = Arc::clone(&self.bindings);
        let channel = self.channel_name().to_string();
        Ok(BatchRecorder::new(
            Arc::clone(caller),
            self.max_batch_requests,
            move |name| lookup(&bindings, &channel, name, MessageKind::AsyncMethod),
        ))
    }

    /// Dispose every sub-endpoint. Repeated calls do nothing.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(caller) = &self.async_caller {
            caller.dispose();
        }
        if let Some(caller) = &self.sync_caller {
            caller.dispose();
        }
        if let Some(observer) = &self.observer {
            observer.dispose();
        }
        info!("Client endpoint on '{}' disposed", self.channel_name());
    }
}

impl Drop for ClientEndpoint {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[track_caller]
fn lookup(
    bindings: &HashMap<String, ClientBinding>,
    channel: &str,
    name: &str,
    kind: MessageKind,
) -> Result<Option<Converter>, CallError> {
    match bindings.get(name) {
        Some(binding) if binding.kind == kind => Ok(binding.converter.clone()),
        _ => Err(CallError::undeclared(channel, name, kind)),
    }
}
