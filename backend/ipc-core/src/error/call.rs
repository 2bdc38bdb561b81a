//! Per-call failures.
//!
//! A `CallError` is data: it is returned to the one caller whose call failed
//! and never affects other calls in flight. It is `Clone` so a batch can hand
//! the same failure to a pending slot and to the aggregate report.

use crate::error::TransportError;

use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;

/// Message used for batch slots the host never answered.
pub const REQUEST_NOT_HANDLED: &str = "Request not handled.";

#[derive(Debug, Clone, ThisError)]
pub enum CallError {
    /// The bound handler failed. Never retried.
    #[error("Call Error: {message} {location}")]
    Remote {
        message: String,
        location: ErrorLocation,
    },

    #[error("Not Handled Error: {message} {location}")]
    NotHandled {
        message: String,
        location: ErrorLocation,
    },

    #[error("Undeclared Call Error: {message} {location}")]
    Undeclared {
        message: String,
        location: ErrorLocation,
    },

    #[error("Disposed Caller Error: {message} {location}")]
    Disposed {
        message: String,
        location: ErrorLocation,
    },

    #[error("Argument Error: {message} {location}")]
    Argument {
        message: String,
        location: ErrorLocation,
    },

    #[error("Conversion Error: {message} {location}")]
    Conversion {
        message: String,
        location: ErrorLocation,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl CallError {
    #[track_caller]
    pub fn remote(message: impl Into<String>) -> Self {
        CallError::Remote {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn not_handled() -> Self {
        CallError::NotHandled {
            message: REQUEST_NOT_HANDLED.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn undeclared(channel: &str, name: &str, kind: impl std::fmt::Display) -> Self {
        CallError::Undeclared {
            message: format!("'{name}' is not declared as {kind} on channel '{channel}'"),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn disposed(channel: &str) -> Self {
        CallError::Disposed {
            message: format!("client endpoint for channel '{channel}' is disposed"),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn argument(message: impl Into<String>) -> Self {
        CallError::Argument {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn conversion(message: impl Into<String>) -> Self {
        CallError::Conversion {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// The bare message, without the location suffix.
    ///
    /// This is what goes on the wire when a failure is reported inside a batch response.
    pub fn message(&self) -> String {
        match self {
            CallError::Remote { message, .. }
            | CallError::NotHandled { message, .. }
            | CallError::Undeclared { message, .. }
            | CallError::Disposed { message, .. }
            | CallError::Argument { message, .. }
            | CallError::Conversion { message, .. } => message.clone(),
            CallError::Transport(error) => error.to_string(),
        }
    }
}
