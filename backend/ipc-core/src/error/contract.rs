//! Errors raised while declaring contracts and bindings.
//!
//! These are defects in the declaring code. They surface once, at
//! declaration or wiring time, and are never recovered from.

use crate::contract::MessageKind;

use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum ContractError {
    #[error("Contract Conflict Error: {message} {location}")]
    Conflict {
        channel: String,
        name: String,
        existing: MessageKind,
        message: String,
        location: ErrorLocation,
    },

    #[error("Contract Kind Error: {message} {location}")]
    KindConflict {
        channel: String,
        name: String,
        existing: MessageKind,
        requested: MessageKind,
        message: String,
        location: ErrorLocation,
    },

    #[error("Unnamed Member Error: {message} {location}")]
    UnnamedMember {
        message: String,
        location: ErrorLocation,
    },

    #[error("Not In Contract Error: {message} {location}")]
    NotInContract {
        channel: String,
        name: String,
        message: String,
        location: ErrorLocation,
    },

    #[error("Invalid Channel Error: {message} {location}")]
    InvalidChannel {
        message: String,
        location: ErrorLocation,
    },
}

impl ContractError {
    #[track_caller]
    pub fn conflict(
        class_name: &str,
        channel: &str,
        name: &str,
        existing: MessageKind,
        requested: MessageKind,
    ) -> Self {
        ContractError::Conflict {
            channel: channel.to_string(),
            name: name.to_string(),
            existing,
            message: format!(
                "{class_name} cannot bind '{name}' on channel '{channel}' as {requested}: \
                 already bound as {existing}"
            ),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn kind_conflict(
        channel: &str,
        name: &str,
        existing: MessageKind,
        requested: MessageKind,
    ) -> Self {
        ContractError::KindConflict {
            channel: channel.to_string(),
            name: name.to_string(),
            existing,
            requested,
            message: format!(
                "'{name}' on channel '{channel}' is declared as {existing}, not {requested}"
            ),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn unnamed_member(class_name: &str, description: &str) -> Self {
        ContractError::UnnamedMember {
            message: format!(
                "{class_name}: symbol member '{description}' needs an explicit message name"
            ),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn not_in_contract(channel: &str, name: &str) -> Self {
        ContractError::NotInContract {
            channel: channel.to_string(),
            name: name.to_string(),
            message: format!("'{name}' is not part of the contract for channel '{channel}'"),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn invalid_channel(channel: &str) -> Self {
        ContractError::InvalidChannel {
            message: format!("'{channel}' is not a valid channel name"),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
