//! Value conversion at the boundary.
//!
//! Arguments and results cross the transport as `serde_json::Value`. These
//! helpers move between typed Rust values and that representation; a
//! [`Converter`] additionally reshapes a raw reply on the client side before
//! it is decoded.

use crate::error::CallError;

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Client-side reshaping of a raw value, applied before typed decoding.
pub type Converter = Arc<dyn Fn(Value) -> Result<Value, CallError> + Send + Sync>;

pub fn converter<F>(f: F) -> Converter
where
    F: Fn(Value) -> Result<Value, CallError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Turn typed arguments into an argument list.
///
/// Tuples (and any value serializing to an array) spread into one argument per
/// element, `()` becomes an empty list, anything else is a single argument.
#[track_caller]
pub fn encode_args<A: Serialize>(args: A) -> Result<Vec<Value>, CallError> {
    let value = serde_json::to_value(args)
        .map_err(|e| CallError::argument(format!("failed to encode arguments: {e}")))?;

    Ok(match value {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    })
}

/// Decode an argument list into a tuple (or any type deserializable from a sequence).
#[track_caller]
pub fn decode_args<A: DeserializeOwned>(args: Vec<Value>) -> Result<A, CallError> {
    serde_json::from_value(Value::Array(args))
        .map_err(|e| CallError::argument(format!("failed to decode arguments: {e}")))
}

#[track_caller]
pub fn encode_result<R: Serialize>(result: R) -> Result<Value, CallError> {
    serde_json::to_value(result)
        .map_err(|e| CallError::conversion(format!("failed to encode result: {e}")))
}

#[track_caller]
pub fn decode_result<R: DeserializeOwned>(value: Value) -> Result<R, CallError> {
    serde_json::from_value(value)
        .map_err(|e| CallError::conversion(format!("failed to decode result: {e}")))
}
