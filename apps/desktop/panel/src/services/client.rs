use crate::error::PanelError;
use crate::services::CHANNEL;

use ipc_core::contract::{converter, encode_args};
use ipc_core::error::{BatchError, CallError, ContractError};
use ipc_core::transport::ListenerId;
use ipc_core::{
    ClassBindings, ClientEndpoint, ClientTransport, Contract, Contracted, CoreError, Declaration,
    MessageKind, MessagingConfig,
};

use common::ErrorLocation;

use std::panic::Location;
use std::sync::Arc;

use log::{debug, error};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Semantic version reported by a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

/// Reshape a `"major.minor.patch"` reply into a [`ServiceVersion`] object.
#[track_caller]
pub fn parse_version(raw: Value) -> Result<Value, CallError> {
    let text = raw
        .as_str()
        .ok_or_else(|| CallError::conversion(format!("version is not a string: {raw}")))?;

    let parts: Vec<u64> = text
        .trim_start_matches('v')
        .split('.')
        .map(str::parse::<u64>)
        .collect::<Result<_, _>>()
        .map_err(|e| CallError::conversion(format!("invalid version '{text}': {e}")))?;

    match parts.as_slice() {
        [major, minor, patch] => Ok(json!({ "major": major, "minor": minor, "patch": patch })),
        _ => Err(CallError::conversion(format!(
            "invalid version '{text}': expected major.minor.patch"
        ))),
    }
}

/// Typed client for the display channel.
pub struct DisplayClient {
    endpoint: ClientEndpoint,
}

impl DisplayClient {
    pub fn connect(
        contract: &Contract,
        transport: Arc<dyn ClientTransport>,
        config: &MessagingConfig,
    ) -> Result<Self, CoreError> {
        let endpoint = ClientEndpoint::connect::<DisplayClient>(contract, transport, config)?;
        Ok(Self { endpoint })
    }

    pub fn endpoint(&self) -> &ClientEndpoint {
        &self.endpoint
    }

    pub async fn ping(&self) -> Result<String, CallError> {
        self.endpoint.invoke("ping", ()).await
    }

    pub fn version(&self) -> Result<ServiceVersion, CallError> {
        self.endpoint.invoke_sync("version", ())
    }

    /// Host uptime, human readable.
    pub fn uptime(&self) -> Result<String, CallError> {
        self.endpoint.invoke_sync("uptime", ())
    }

    pub async fn set_brightness(&self, level: u8) -> Result<u8, CallError> {
        self.endpoint.invoke("setBrightness", (level,)).await
    }

    pub fn brightness(&self) -> Result<u8, CallError> {
        self.endpoint.invoke_sync("getBrightness", ())
    }

    pub fn on_brightness_changed<F>(&self, listener: F) -> Result<ListenerId, CallError>
    where
        F: Fn(u8) + Send + Sync + 'static,
    {
        self.endpoint
            .on_typed("brightnessChanged", move |(level,): (u8,)| listener(level))
    }

    pub fn off_brightness_changed(&self, id: ListenerId) -> bool {
        self.endpoint.off("brightnessChanged", id)
    }

    /// Step through `levels` in one batch.
    ///
    /// Returns one result per level, in order. A rejected step does not stop
    /// the others.
    ///
    /// # Errors
    ///
    /// [`PanelError::Messaging`] if the batch cannot be started, and
    /// [`PanelError::Call`] if it cannot be recorded or submitted.
    pub async fn fade(&self, levels: &[u8]) -> Result<Vec<Result<u8, CallError>>, PanelError> {
        let location = ErrorLocation::from(Location::caller());
        let mut batch = self.endpoint.batch().map_err(|e| PanelError::Messaging {
            message: e.to_string(),
            location,
        })?;

        let batch_failed = |e: BatchError| {
            error!("Brightness fade failed: {e}");
            PanelError::Call {
                message: e.to_string(),
                location,
            }
        };

        let mut pending = Vec::with_capacity(levels.len());
        for &level in levels {
            let args = encode_args((level,))
                .map_err(BatchError::rejected)
                .map_err(&batch_failed)?;
            pending.push(batch.call("setBrightness", args).map_err(&batch_failed)?);
        }

        debug!("Fading through {} levels in batch {}", levels.len(), batch.batch_id());
        batch.submit().await.map_err(&batch_failed)?;

        let mut results = Vec::with_capacity(pending.len());
        for call in pending {
            results.push(call.wait_typed::<u8>().await);
        }
        Ok(results)
    }

    pub fn dispose(&self) {
        self.endpoint.dispose();
    }
}

impl Contracted for DisplayClient {
    fn declare_bindings() -> Result<ClassBindings<Self>, ContractError> {
        ClassBindings::<Self>::new("DisplayClient")
            .client_only()
            .with(Declaration::stub(CHANNEL, "ping", MessageKind::AsyncMethod))?
            .with(
                Declaration::stub(CHANNEL, "version", MessageKind::SyncMethod)
                    .converter(converter(parse_version)),
            )?
            .with(Declaration::stub(CHANNEL, "uptime", MessageKind::SyncMethod))?
            .with(Declaration::stub(CHANNEL, "setBrightness", MessageKind::AsyncMethod))?
            .with(Declaration::stub(CHANNEL, "getBrightness", MessageKind::SyncMethod))?
            .with(Declaration::stub(CHANNEL, "brightnessChanged", MessageKind::Event))
    }
}
