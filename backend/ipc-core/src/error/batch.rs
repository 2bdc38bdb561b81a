use crate::error::CallError;

use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;

/// Message carried by the aggregate error when some requests went unanswered.
pub const BATCH_UNHANDLED: &str = "batch contained unhandled requests";

/// One failed slot inside a batch.
#[derive(Debug, Clone)]
pub struct BatchFailure {
    pub request_id: u64,
    pub name: String,
    pub error: CallError,
}

#[derive(Debug, ThisError)]
pub enum BatchError {
    /// Some requests were never answered. `failures` lists every failed slot of
    /// the batch, answered-with-error and unanswered alike.
    #[error("Batch Error: {message} ({} failed) {location}", failures.len())]
    Aggregate {
        message: String,
        failures: Vec<BatchFailure>,
        location: ErrorLocation,
    },

    /// The whole submission failed before any response arrived.
    #[error("Batch Submit Error: {source} {location}")]
    Submit {
        #[source]
        source: CallError,
        location: ErrorLocation,
    },

    #[error("Batch Too Large Error: {message} {location}")]
    TooLarge {
        message: String,
        location: ErrorLocation,
    },

    /// A call could not be recorded, for example because its name is not
    /// declared as an async method.
    #[error("Batch Rejected Error: {source} {location}")]
    Rejected {
        #[source]
        source: CallError,
        location: ErrorLocation,
    },
}

impl BatchError {
    #[track_caller]
    pub fn aggregate(failures: Vec<BatchFailure>) -> Self {
        BatchError::Aggregate {
            message: BATCH_UNHANDLED.to_string(),
            failures,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn submit(source: CallError) -> Self {
        BatchError::Submit {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn too_large(max: usize) -> Self {
        BatchError::TooLarge {
            message: format!("a batch holds at most {max} requests"),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn rejected(source: CallError) -> Self {
        BatchError::Rejected {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
