//! Shared leaf types for the control-panel workspace.
//!
//! Every error enum in the workspace carries an [`ErrorLocation`] so a
//! failure that crosses the host/client boundary still points at the line
//! that raised it.

pub mod error;

pub use error::error_location::ErrorLocation;

#[cfg(test)]
mod tests;
