use crate::services::CHANNEL;

use ipc_core::contract::encode_result;
use ipc_core::error::{CallError, ContractError};
use ipc_core::{ClassBindings, Contracted, Declaration};

use std::time::{Duration, Instant};

use futures_util::FutureExt;
use humantime::format_duration;
use serde_json::Value;

/// Identity every panel service answers with.
pub struct ServiceInfo {
    name: String,
    version: String,
    started: Instant,
}

impl ServiceInfo {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            started: Instant::now(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Uptime truncated to whole seconds.
    pub fn uptime(&self) -> Duration {
        Duration::from_secs(self.started.elapsed().as_secs())
    }

    async fn handle_ping(&self, _args: Vec<Value>) -> Result<Value, CallError> {
        encode_result(format!("pong from {}", self.name))
    }

    fn handle_version(&self, _args: Vec<Value>) -> Result<Value, CallError> {
        encode_result(&self.version)
    }

    fn handle_uptime(&self, _args: Vec<Value>) -> Result<Value, CallError> {
        encode_result(format_duration(self.uptime()).to_string())
    }
}

impl Contracted for ServiceInfo {
    fn declare_bindings() -> Result<ClassBindings<Self>, ContractError> {
        ClassBindings::new("ServiceInfo")
            .host_only()
            .with(Declaration::async_method(
                CHANNEL,
                "ping",
                |info: &ServiceInfo, args: Vec<Value>| info.handle_ping(args).boxed(),
            ))?
            .with(Declaration::sync_method(
                CHANNEL,
                "version",
                |info: &ServiceInfo, args| info.handle_version(args),
            ))?
            .with(Declaration::sync_method(
                CHANNEL,
                "uptime",
                |info: &ServiceInfo, args| info.handle_uptime(args),
            ))
    }
}
