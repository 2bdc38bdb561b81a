//! Typed messaging between a host context and its client contexts.
//!
//! A contract names the async methods, sync methods and events one channel
//! carries. Host types bind members to those names and are served by a
//! [`HostEndpoint`]; client types declare matching stubs and talk through a
//! [`ClientEndpoint`]. All traffic flows over a [`transport`] that only moves
//! `serde_json::Value`s between parties.

pub mod affinity;
pub mod client;
pub mod config;
pub mod contract;
pub mod error;
pub mod host;
pub mod registry;
pub mod transport;

#[cfg(test)]
mod tests;

pub use affinity::{ContextGuard, ProcessContext, mark_process};
pub use client::{BatchRecorder, ClientEndpoint, PendingCall};
pub use config::MessagingConfig;
pub use contract::{Channel, Contract, MessageKind};
pub use error::{BatchError, CallError, ContractError, CoreError, EndpointError};
pub use host::{EndpointState, HostEndpoint, LocalEvent};
pub use registry::{ClassBindings, Contracted, Declaration, MemberKey, bindings_for};
pub use transport::{ClientTransport, HostTransport, MemoryBus, PartyId};
