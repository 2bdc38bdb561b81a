//! The duplex transport boundary.
//!
//! The messaging layer never touches sockets or windows itself. It talks to a
//! transport through these two traits: [`HostTransport`] on the host side,
//! [`ClientTransport`] on each client. The transport is responsible for
//! moving values between contexts, for request/response correlation of plain
//! invokes, for in-order delivery per channel, and for knowing whether a
//! remote party is still alive.
//!
//! [`MemoryBus`] implements both sides in-process.

pub mod memory;

pub use memory::{MemoryBus, MemoryClient, MemoryHost};

use crate::error::{CallError, TransportError};

use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::Value;

/// Stable identity of a communicating party.
pub type PartyId = u64;

/// The host context's party id. Event dispatch from any other origin is foreign.
pub const HOST_PARTY: PartyId = 0;

/// Identifies a listener registered with [`ClientTransport::on`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Answers an async invoke; the settled value is the reply.
pub type InvokeHandler =
    Arc<dyn Fn(PartyId, Vec<Value>) -> BoxFuture<'static, Result<Value, CallError>> + Send + Sync>;

/// Answers a synchronous message; the return value is the sender's sync reply.
pub type SyncHandler = Arc<dyn Fn(PartyId, Vec<Value>) -> Result<Value, CallError> + Send + Sync>;

/// Receives one-way messages together with their origin party.
pub type EventHandler = Arc<dyn Fn(PartyId, Vec<Value>) + Send + Sync>;

/// Host side of the transport.
pub trait HostTransport: Send + Sync {
    /// Register the single async handler for `name`.
    ///
    /// # Errors
    ///
    /// [`TransportError::HandlerExists`] if `name` already has one.
    fn handle(&self, name: &str, handler: InvokeHandler) -> Result<(), TransportError>;

    /// Register the single sync handler for `name`.
    fn handle_sync(&self, name: &str, handler: SyncHandler) -> Result<(), TransportError>;

    fn remove_handler(&self, name: &str);

    fn remove_sync_handler(&self, name: &str);

    /// Deliver a one-way message to one party.
    fn send_to(&self, party: PartyId, name: &str, args: Vec<Value>) -> Result<(), TransportError>;

    /// Whether `party` still exists. Parties can vanish without saying goodbye.
    fn is_alive(&self, party: PartyId) -> bool;
}

/// Client side of the transport.
pub trait ClientTransport: Send + Sync {
    fn party(&self) -> PartyId;

    /// Send an async invoke and resolve with the single matching reply.
    fn invoke(&self, name: &str, args: Vec<Value>) -> BoxFuture<'static, Result<Value, CallError>>;

    /// Send a synchronous message and block until the reply is available.
    fn send_sync(&self, name: &str, args: Vec<Value>) -> Result<Value, CallError>;

    fn on(&self, name: &str, handler: EventHandler) -> ListenerId;

    fn off(&self, name: &str, id: ListenerId);
}
