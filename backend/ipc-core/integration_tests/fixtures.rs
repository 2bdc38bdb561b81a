//! Shared fixtures: a calculator host type, its client stub type and helpers
//! that wire both over a fresh in-memory bus.

use ipc_core::contract::{decode_args, encode_result};
use ipc_core::error::{CallError, ContractError};
use ipc_core::transport::MemoryClient;
use ipc_core::{
    ClassBindings, ClientEndpoint, Contract, Contracted, Declaration, HostEndpoint, LocalEvent,
    MemoryBus, MessageKind, MessagingConfig,
};

use std::sync::{Arc, Mutex};

use futures_util::FutureExt;
use serde_json::{Value, json};

pub const CHANNEL: &str = "calc";

pub fn contract() -> Contract {
    Contract::new(CHANNEL)
        .and_then(|c| c.with_async_method("bar"))
        .and_then(|c| c.with_async_method("fail"))
        .and_then(|c| c.with_sync_method("barSync"))
        .and_then(|c| c.with_sync_method("total"))
        .and_then(|c| c.with_event("changed"))
        .expect("calculator contract is valid")
}

#[derive(Default)]
pub struct Calculator {
    total: Mutex<i64>,
    pub changed: LocalEvent,
}

impl Calculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add to the running total and fire `changed` with the new total.
    pub fn add(&self, amount: i64) -> i64 {
        let total = {
            let mut total = self.total.lock().expect("total lock");
            *total += amount;
            *total
        };
        self.changed.fire(vec![json!(total)]);
        total
    }

    async fn bar(&self, args: Vec<Value>) -> Result<Value, CallError> {
        let (x,): (i64,) = decode_args(args)?;
        encode_result(x * 2)
    }

    async fn fail(&self, _args: Vec<Value>) -> Result<Value, CallError> {
        Err(CallError::remote("calculator exploded"))
    }

    fn bar_sync(&self, args: Vec<Value>) -> Result<Value, CallError> {
        let (x,): (i64,) = decode_args(args)?;
        encode_result(x * 2)
    }

    fn total(&self, _args: Vec<Value>) -> Result<Value, CallError> {
        encode_result(*self.total.lock().expect("total lock"))
    }
}

impl Contracted for Calculator {
    fn declare_bindings() -> Result<ClassBindings<Self>, ContractError> {
        ClassBindings::new("Calculator")
            .with(Declaration::async_method(
                CHANNEL,
                "bar",
                |calc: &Calculator, args: Vec<Value>| calc.bar(args).boxed(),
            ))?
            .with(Declaration::async_method(
                CHANNEL,
                "fail",
                |calc: &Calculator, args: Vec<Value>| calc.fail(args).boxed(),
            ))?
            .with(
                Declaration::sync_method(CHANNEL, "bar_sync", |calc: &Calculator, args| {
                    calc.bar_sync(args)
                })
                .named("barSync"),
            )?
            .with(Declaration::sync_method(
                CHANNEL,
                "total",
                |calc: &Calculator, args| calc.total(args),
            ))?
            .with(Declaration::event_source(
                CHANNEL,
                "changed",
                |calc: &Calculator| calc.changed.clone(),
            ))
    }
}

/// Client-side stubs for the calculator.
pub struct CalculatorClient;

impl Contracted for CalculatorClient {
    fn declare_bindings() -> Result<ClassBindings<Self>, ContractError> {
        ClassBindings::<Self>::new("CalculatorClient")
            .with(Declaration::stub(CHANNEL, "bar", MessageKind::AsyncMethod))?
            .with(Declaration::stub(CHANNEL, "fail", MessageKind::AsyncMethod))?
            .with(Declaration::stub(CHANNEL, "barSync", MessageKind::SyncMethod))?
            .with(Declaration::stub(CHANNEL, "total", MessageKind::SyncMethod))?
            .with(Declaration::stub(CHANNEL, "changed", MessageKind::Event))
    }
}

pub fn bind_host(bus: &MemoryBus) -> HostEndpoint<Calculator> {
    HostEndpoint::bind(Arc::new(Calculator::new()), &contract(), Arc::new(bus.host()))
        .expect("calculator binds")
}

pub fn connect_client(bus: &MemoryBus) -> (MemoryClient, ClientEndpoint) {
    connect_client_with(bus, &MessagingConfig::default())
}

pub fn connect_client_with(
    bus: &MemoryBus,
    config: &MessagingConfig,
) -> (MemoryClient, ClientEndpoint) {
    let transport = bus.connect();
    let endpoint = ClientEndpoint::connect::<CalculatorClient>(
        &contract(),
        Arc::new(transport.clone()),
        config,
    )
    .expect("calculator client connects");
    (transport, endpoint)
}
