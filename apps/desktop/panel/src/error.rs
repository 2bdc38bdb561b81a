use common::ErrorLocation;

use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by panel commands.
///
/// These cross into the UI layer as JSON, so they carry the message and
/// location only, never the underlying error values.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum PanelError {
    /// Error from this App
    #[error("Panel Error: {message} {location}")]
    Panel {
        message: String,
        location: ErrorLocation,
    },

    /// Error while wiring endpoints (contract, affinity, transport)
    #[error("Messaging Error: {message} {location}")]
    Messaging {
        message: String,
        location: ErrorLocation,
    },

    /// A call to the display service failed
    #[error("Call Error: {message} {location}")]
    Call {
        message: String,
        location: ErrorLocation,
    },

    /// No display client is currently connected
    #[error("Not Connected Error: {message} {location}")]
    NotConnected {
        message: String,
        location: ErrorLocation,
    },

    #[error("Config Error: {message} {location}")]
    Config {
        message: String,
        location: ErrorLocation,
    },
}
