//! Client callers for async and sync method calls.
//!
//! The plain call path does no correlation of its own; the transport pairs
//! every invoke with its single reply.

use crate::contract::{Channel, join_message};
use crate::error::CallError;
use crate::transport::ClientTransport;

use std::future::ready;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use futures_util::future::BoxFuture;
use log::{error, trace, warn};
use serde_json::Value;

pub struct AsyncCaller {
    channel: Channel,
    transport: Arc<dyn ClientTransport>,
    disposed: AtomicBool,
}

impl AsyncCaller {
    pub(crate) fn new(channel: Channel, transport: Arc<dyn ClientTransport>) -> Self {
        Self {
            channel,
            transport,
            disposed: AtomicBool::new(false),
        }
    }

    /// Send `name` with `args` on `message:C` and resolve with the reply.
    #[track_caller]
    pub fn call(&self, name: &str, args: Vec<Value>) -> BoxFuture<'static, Result<Value, CallError>> {
        if self.is_disposed() {
            error!("call('{name}') on disposed async caller for '{}'", self.channel);
            return Box::pin(ready(Err(CallError::disposed(self.channel.as_str()))));
        }
        trace!("Calling '{name}' on '{}'", self.channel);
        self.transport
            .invoke(&self.channel.async_call_name(), join_message(name, args))
    }

    /// Send an encoded batch on `batch:C`.
    #[track_caller]
    pub(crate) fn submit_batch(&self, args: Vec<Value>) -> BoxFuture<'static, Result<Value, CallError>> {
        if self.is_disposed() {
            error!("batch submitted on disposed async caller for '{}'", self.channel);
            return Box::pin(ready(Err(CallError::disposed(self.channel.as_str()))));
        }
        self.transport.invoke(&self.channel.batch_name(), args)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }
}

/// Blocking caller. Meant for reads of in-memory host state only; every call
/// stalls the calling context until the host answers.
pub struct SyncCaller {
    channel: Channel,
    transport: Arc<dyn ClientTransport>,
    slow_call: Duration,
    disposed: AtomicBool,
}

impl SyncCaller {
    pub(crate) fn new(
        channel: Channel,
        transport: Arc<dyn ClientTransport>,
        slow_call: Duration,
    ) -> Self {
        Self {
            channel,
            transport,
            slow_call,
            disposed: AtomicBool::new(false),
        }
    }

    #[track_caller]
    pub fn call(&self, name: &str, args: Vec<Value>) -> Result<Value, CallError> {
        if self.is_disposed() {
            error!("call_sync('{name}') on disposed sync caller for '{}'", self.channel);
            return Err(CallError::disposed(self.channel.as_str()));
        }

        let started = Instant::now();
        let result = self
            .transport
            .send_sync(&self.channel.sync_call_name(), join_message(name, args));
        let elapsed = started.elapsed();

        if elapsed > self.slow_call {
            warn!(
                "Sync call '{name}' on '{}' blocked for {}",
                self.channel,
                humantime::format_duration(elapsed)
            );
        }
        result
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }
}
