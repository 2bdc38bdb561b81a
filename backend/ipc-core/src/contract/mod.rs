//! Contract model: the structural shape of a message-based interface.
//!
//! A [`Contract`] belongs to exactly one [`Channel`] and records, for every
//! message name, whether it is an async call, a sync call, or an event. It has
//! no runtime state; host and client endpoints consult it when they wire up so
//! both sides agree on the same names and kinds.
//!
//! # Wire names
//!
//! Every transport message name is derived from the channel name `C`:
//!
//! | Purpose | Name |
//! |---|---|
//! | async call | `message:C` |
//! | sync call | `sync.message:C` |
//! | event subscribe | `event.subscribe:C` |
//! | event unsubscribe | `event.unsubscribe:C` |
//! | event dispatch | `event:C` |
//! | batched calls | `batch:C` |
//! | host claim | `host:C` |

pub mod batch;
pub mod convert;

pub use batch::{BatchOutcome, BatchRequest, BatchResponse, decode_batch, encode_batch};
pub use convert::{Converter, converter, decode_args, decode_result, encode_args, encode_result};

use crate::error::{CallError, ContractError};

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FormatResult};
use std::sync::OnceLock;

use const_format::concatcp;
use log::debug;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

const EVENT_BASE: &str = "event";

pub const ASYNC_CALL_PREFIX: &str = "message:";
pub const SYNC_CALL_PREFIX: &str = concatcp!("sync.", ASYNC_CALL_PREFIX);
pub const EVENT_SUBSCRIBE_PREFIX: &str = concatcp!(EVENT_BASE, ".subscribe:");
pub const EVENT_UNSUBSCRIBE_PREFIX: &str = concatcp!(EVENT_BASE, ".unsubscribe:");
pub const EVENT_DISPATCH_PREFIX: &str = concatcp!(EVENT_BASE, ":");
pub const BATCH_PREFIX: &str = "batch:";
pub const HOST_CLAIM_PREFIX: &str = "host:";

const CHANNEL_NAME_PATTERN: &str = r"^[A-Za-z][A-Za-z0-9_.\-]*$";

static CHANNEL_NAME_REGEX: OnceLock<Regex> = OnceLock::new();

pub(crate) fn get_channel_regex() -> &'static Regex {
    CHANNEL_NAME_REGEX.get_or_init(|| Regex::new(CHANNEL_NAME_PATTERN).expect("valid regex pattern"))
}

/// The three kinds of contract member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MessageKind {
    AsyncMethod,
    SyncMethod,
    Event,
}

impl Display for MessageKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        let label = match self {
            MessageKind::AsyncMethod => "async method",
            MessageKind::SyncMethod => "sync method",
            MessageKind::Event => "event",
        };
        formatter.write_str(label)
    }
}

/// A validated channel name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Channel(String);

impl Channel {
    /// Validate and wrap a channel name.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::InvalidChannel`] unless the name starts with a
    /// letter and contains only letters, digits, `_`, `.` and `-`.
    #[track_caller]
    pub fn new(name: impl Into<String>) -> Result<Self, ContractError> {
        let name = name.into();
        if !get_channel_regex().is_match(&name) {
            return Err(ContractError::invalid_channel(&name));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn async_call_name(&self) -> String {
        format!("{ASYNC_CALL_PREFIX}{}", self.0)
    }

    pub fn sync_call_name(&self) -> String {
        format!("{SYNC_CALL_PREFIX}{}", self.0)
    }

    pub fn subscribe_name(&self) -> String {
        format!("{EVENT_SUBSCRIBE_PREFIX}{}", self.0)
    }

    pub fn unsubscribe_name(&self) -> String {
        format!("{EVENT_UNSUBSCRIBE_PREFIX}{}", self.0)
    }

    /// The single shared dispatch name. All events of the contract are
    /// multiplexed on it, tagged with their event name.
    pub fn event_name(&self) -> String {
        format!("{EVENT_DISPATCH_PREFIX}{}", self.0)
    }

    pub fn batch_name(&self) -> String {
        format!("{BATCH_PREFIX}{}", self.0)
    }

    /// Held by the live host endpoint of the channel, whatever kinds it binds.
    pub fn host_claim_name(&self) -> String {
        format!("{HOST_CLAIM_PREFIX}{}", self.0)
    }
}

impl Display for Channel {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        formatter.write_str(&self.0)
    }
}

/// Message names and kinds of one channel.
#[derive(Debug, Clone)]
pub struct Contract {
    channel: Channel,
    messages: BTreeMap<String, MessageKind>,
}

impl Contract {
    #[track_caller]
    pub fn new(channel: &str) -> Result<Self, ContractError> {
        Ok(Self {
            channel: Channel::new(channel)?,
            messages: BTreeMap::new(),
        })
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Record `name` as a member of `kind`.
    ///
    /// Declaring the same name again with the same kind is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::KindConflict`] if `name` is already declared
    /// with a different kind.
    #[track_caller]
    pub fn declare(&mut self, name: &str, kind: MessageKind) -> Result<(), ContractError> {
        match self.messages.get(name) {
            Some(existing) if *existing == kind => Ok(()),
            Some(existing) => Err(ContractError::kind_conflict(
                self.channel.as_str(),
                name,
                *existing,
                kind,
            )),
            None => {
                debug!("Contract '{}': {name} declared as {kind}", self.channel);
                self.messages.insert(name.to_string(), kind);
                Ok(())
            }
        }
    }

    #[track_caller]
    pub fn with_async_method(mut self, name: &str) -> Result<Self, ContractError> {
        self.declare(name, MessageKind::AsyncMethod)?;
        Ok(self)
    }

    #[track_caller]
    pub fn with_sync_method(mut self, name: &str) -> Result<Self, ContractError> {
        self.declare(name, MessageKind::SyncMethod)?;
        Ok(self)
    }

    #[track_caller]
    pub fn with_event(mut self, name: &str) -> Result<Self, ContractError> {
        self.declare(name, MessageKind::Event)?;
        Ok(self)
    }

    pub fn kind_of(&self, name: &str) -> Option<MessageKind> {
        self.messages.get(name).copied()
    }

    /// Verify that a binding for `name` of `kind` belongs to this contract.
    #[track_caller]
    pub fn check(&self, name: &str, kind: MessageKind) -> Result<(), ContractError> {
        match self.messages.get(name) {
            Some(existing) if *existing == kind => Ok(()),
            Some(existing) => Err(ContractError::kind_conflict(
                self.channel.as_str(),
                name,
                *existing,
                kind,
            )),
            None => Err(ContractError::not_in_contract(self.channel.as_str(), name)),
        }
    }

    pub fn messages(&self) -> impl Iterator<Item = (&str, MessageKind)> {
        self.messages
            .iter()
            .map(|(name, kind)| (name.as_str(), *kind))
    }
}

/// Build a multiplexed payload: `name` first, then `args`.
pub(crate) fn join_message(name: &str, args: Vec<Value>) -> Vec<Value> {
    let mut payload = Vec::with_capacity(args.len() + 1);
    payload.push(Value::String(name.to_string()));
    payload.extend(args);
    payload
}

/// Split a multiplexed payload into its leading message name and the rest.
///
/// Every per-contract wire name carries the member or event name as its first
/// argument.
#[track_caller]
pub(crate) fn split_message(mut args: Vec<Value>) -> Result<(String, Vec<Value>), CallError> {
    if args.is_empty() {
        return Err(CallError::argument("payload carries no message name"));
    }
    match args.remove(0) {
        Value::String(name) => Ok((name, args)),
        other => Err(CallError::argument(format!(
            "message name must be a string, got {other}"
        ))),
    }
}
