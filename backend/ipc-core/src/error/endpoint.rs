use crate::contract::MessageKind;
use crate::error::TransportError;

use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;

/// Lifecycle and wiring errors of host and client endpoints.
#[derive(Debug, ThisError)]
pub enum EndpointError {
    /// An endpoint was used after `dispose()`. This is a lifecycle bug in the caller.
    #[error("Disposed Endpoint Error: {message} {location}")]
    Disposed {
        message: String,
        location: ErrorLocation,
    },

    #[error("Endpoint Not Bound Error: {message} {location}")]
    NotBound {
        kind: MessageKind,
        message: String,
        location: ErrorLocation,
    },

    /// Another live host endpoint already serves the channel.
    #[error("Channel Taken Error: {message} {location}")]
    ChannelTaken {
        message: String,
        location: ErrorLocation,
    },

    #[error("Endpoint Wiring Error: {message} {location}")]
    Wiring {
        message: String,
        location: ErrorLocation,
    },
}

impl EndpointError {
    #[track_caller]
    pub fn disposed(channel: &str, operation: &str) -> Self {
        EndpointError::Disposed {
            message: format!("{operation} on channel '{channel}' after dispose"),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn not_bound(channel: &str, kind: MessageKind) -> Self {
        EndpointError::NotBound {
            kind,
            message: format!("channel '{channel}' has no {kind} bindings"),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn channel_taken(channel: &str) -> Self {
        EndpointError::ChannelTaken {
            message: format!("channel '{channel}' already has a live host endpoint"),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<TransportError> for EndpointError {
    #[track_caller]
    fn from(error: TransportError) -> Self {
        EndpointError::Wiring {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
