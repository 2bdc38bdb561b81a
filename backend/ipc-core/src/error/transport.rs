use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;

/// Failures reported by a duplex transport implementation.
#[derive(Debug, Clone, ThisError)]
pub enum TransportError {
    #[error("Handler Exists Error: {message} {location}")]
    HandlerExists {
        name: String,
        message: String,
        location: ErrorLocation,
    },

    #[error("No Handler Error: {message} {location}")]
    NoHandler {
        name: String,
        message: String,
        location: ErrorLocation,
    },

    #[error("Party Closed Error: {message} {location}")]
    PartyClosed {
        party: u64,
        message: String,
        location: ErrorLocation,
    },
}

impl TransportError {
    #[track_caller]
    pub fn handler_exists(name: &str) -> Self {
        TransportError::HandlerExists {
            name: name.to_string(),
            message: format!("a handler for '{name}' is already registered"),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn no_handler(name: &str) -> Self {
        TransportError::NoHandler {
            name: name.to_string(),
            message: format!("no handler registered for '{name}'"),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn party_closed(party: u64) -> Self {
        TransportError::PartyClosed {
            party,
            message: format!("party {party} is closed"),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
