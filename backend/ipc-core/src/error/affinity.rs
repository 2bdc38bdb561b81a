use crate::affinity::ProcessContext;

use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum AffinityError {
    #[error("Context Mismatch Error: {message} {location}")]
    ContextMismatch {
        class_name: String,
        required: ProcessContext,
        message: String,
        location: ErrorLocation,
    },
}

impl AffinityError {
    #[track_caller]
    pub fn context_mismatch(class_name: &str, required: ProcessContext) -> Self {
        AffinityError::ContextMismatch {
            class_name: class_name.to_string(),
            required,
            message: format!(
                "{class_name} can only be constructed in the {required} context, \
                 but no {required} marker is present in this process"
            ),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
