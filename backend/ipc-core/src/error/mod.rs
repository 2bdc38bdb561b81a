pub mod affinity;
pub mod batch;
pub mod call;
pub mod config;
pub mod contract;
pub mod endpoint;
pub mod transport;

pub use affinity::AffinityError;
pub use batch::{BatchError, BatchFailure};
pub use call::{CallError, REQUEST_NOT_HANDLED};
pub use config::ConfigError;
pub use contract::ContractError;
pub use endpoint::EndpointError;
pub use transport::TransportError;

use thiserror::Error;

/// Structural failures raised while wiring endpoints.
///
/// Per-call failures are [`CallError`] and travel back to the individual caller
/// instead.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Contract(#[from] ContractError),

    #[error(transparent)]
    Affinity(#[from] AffinityError),

    #[error(transparent)]
    Endpoint(#[from] EndpointError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
