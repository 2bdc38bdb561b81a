//! The display service: its contract, host implementation and client.
//!
//! [`DisplayService`] embeds [`ServiceInfo`] and inherits its bindings,
//! overriding `ping`. [`DisplayClient`] wraps a client endpoint with typed
//! calls.

pub mod client;
pub mod display;
pub mod info;

pub use client::{DisplayClient, ServiceVersion};
pub use display::DisplayService;
pub use info::ServiceInfo;

use ipc_core::Contract;
use ipc_core::error::ContractError;

pub const CHANNEL: &str = "display";

/// Everything the display channel carries.
pub fn display_contract() -> Result<Contract, ContractError> {
    Contract::new(CHANNEL)?
        .with_async_method("ping")?
        .with_sync_method("version")?
        .with_sync_method("uptime")?
        .with_async_method("setBrightness")?
        .with_sync_method("getBrightness")?
        .with_event("brightnessChanged")
}
