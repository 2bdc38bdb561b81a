//! Wire format of batched execution.
//!
//! A batch is sent as one async invoke on `batch:C` carrying
//! `[batchId, [{id, name, args}, ...]]`. The host answers with
//! `[{id, ok: value} | {id, error: message}, ...]`, one entry per request it
//! handled.

use crate::error::CallError;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchOutcome {
    Ok(Value),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResponse {
    pub id: u64,
    #[serde(flatten)]
    pub outcome: BatchOutcome,
}

impl BatchResponse {
    pub fn from_result(id: u64, result: Result<Value, CallError>) -> Self {
        let outcome = match result {
            Ok(value) => BatchOutcome::Ok(value),
            Err(error) => BatchOutcome::Error(error.message()),
        };
        Self { id, outcome }
    }
}

/// Build the argument list of a batch invoke.
#[track_caller]
pub fn encode_batch(batch_id: &str, requests: &[BatchRequest]) -> Result<Vec<Value>, CallError> {
    let requests = serde_json::to_value(requests)
        .map_err(|e| CallError::argument(format!("failed to encode batch: {e}")))?;
    Ok(vec![Value::String(batch_id.to_string()), requests])
}

/// Split a batch invoke back into its id and requests.
#[track_caller]
pub fn decode_batch(mut args: Vec<Value>) -> Result<(String, Vec<BatchRequest>), CallError> {
    if args.len() != 2 {
        return Err(CallError::argument(format!(
            "batch expects [id, requests], got {} arguments",
            args.len()
        )));
    }
    let requests = args.pop().unwrap_or(Value::Null);
    let batch_id = match args.pop() {
        Some(Value::String(id)) => id,
        other => {
            return Err(CallError::argument(format!(
                "batch id must be a string, got {other:?}"
            )));
        }
    };
    let requests = serde_json::from_value(requests)
        .map_err(|e| CallError::argument(format!("failed to decode batch requests: {e}")))?;
    Ok((batch_id, requests))
}
