//! Batched execution.
//!
//! A [`BatchRecorder`] queues calls instead of sending them, then submits
//! them as one invoke on `batch:C`. Each recorded call hands back a
//! [`PendingCall`] that settles when the batch response arrives.

use crate::client::caller::AsyncCaller;
use crate::contract::{BatchOutcome, BatchRequest, BatchResponse, Converter, decode_result, encode_batch};
use crate::error::{BatchError, BatchFailure, CallError};

use std::collections::BTreeMap;
use std::sync::Arc;

use log::{debug, error, info, warn};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::oneshot;
use uuid::Uuid;

type Slot = oneshot::Sender<Result<Value, CallError>>;

struct PendingEntry {
    name: String,
    converter: Option<Converter>,
    slot: Slot,
}

/// Request id to unresolved result slot. Every entry leaves the table exactly
/// once, through [`resolve`](Self::resolve) or [`sweep`](Self::sweep).
#[derive(Default)]
pub(crate) struct PendingCallTable {
    entries: BTreeMap<u64, PendingEntry>,
}

impl PendingCallTable {
    fn insert(&mut self, id: u64, name: &str, converter: Option<Converter>, slot: Slot) {
        self.entries.insert(
            id,
            PendingEntry {
                name: name.to_string(),
                converter,
                slot,
            },
        );
    }

    /// Settle the slot for `id`. `None` if there is no such slot (unknown id
    /// or an id answered twice); otherwise the failure the slot settled with,
    /// if any.
    fn resolve(&mut self, id: u64, result: Result<Value, CallError>) -> Option<Option<BatchFailure>> {
        let entry = self.entries.remove(&id)?;
        let result = match (result, &entry.converter) {
            (Ok(value), Some(convert)) => convert(value),
            (result, _) => result,
        };

        let failure = result.as_ref().err().map(|error| BatchFailure {
            request_id: id,
            name: entry.name.clone(),
            error: error.clone(),
        });
        // A dropped PendingCall simply never looks at its result.
        let _ = entry.slot.send(result);
        Some(failure)
    }

    /// Fail every remaining slot with `error`.
    fn sweep(&mut self, error: &CallError) -> Vec<BatchFailure> {
        std::mem::take(&mut self.entries)
            .into_iter()
            .map(|(id, entry)| {
                let _ = entry.slot.send(Err(error.clone()));
                BatchFailure {
                    request_id: id,
                    name: entry.name,
                    error: error.clone(),
                }
            })
            .collect()
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The eventual result of one batched call.
#[derive(Debug)]
pub struct PendingCall {
    id: u64,
    name: String,
    receiver: oneshot::Receiver<Result<Value, CallError>>,
}

impl PendingCall {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wait for the batch to settle this call.
    ///
    /// A recorder dropped without submitting settles its calls as not handled.
    pub async fn wait(self) -> Result<Value, CallError> {
        self.receiver
            .await
            .unwrap_or_else(|_| Err(CallError::not_handled()))
    }

    pub async fn wait_typed<R: DeserializeOwned>(self) -> Result<R, CallError> {
        decode_result(self.wait().await?)
    }
}

pub struct BatchRecorder {
    caller: Arc<AsyncCaller>,
    resolve_call: Box<dyn Fn(&str) -> Result<Option<Converter>, CallError> + Send + Sync>,
    batch_id: String,
    next_id: u64,
    max_requests: usize,
    requests: Vec<BatchRequest>,
    pending: PendingCallTable,
}

impl BatchRecorder {
    /// `resolve_call` vets a name before it is recorded and yields the
    /// converter for its result.
    pub(crate) fn new<F>(caller: Arc<AsyncCaller>, max_requests: usize, resolve_call: F) -> Self
    where
        F: Fn(&str) -> Result<Option<Converter>, CallError> + Send + Sync + 'static,
    {
        Self {
            caller,
            resolve_call: Box::new(resolve_call),
            batch_id: Uuid::new_v4().to_string(),
            next_id: 1,
            max_requests,
            requests: Vec::new(),
            pending: PendingCallTable::default(),
        }
    }

    pub fn batch_id(&self) -> &str {
        &self.batch_id
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Record a call. Nothing is sent until [`submit`](Self::submit).
    ///
    /// # Errors
    ///
    /// - [`BatchError::TooLarge`] once the batch holds its maximum
    /// - [`BatchError::Rejected`] if `name` is not callable on this endpoint
    #[track_caller]
    pub fn call(&mut self, name: &str, args: Vec<Value>) -> Result<PendingCall, BatchError> {
        if self.requests.len() >= self.max_requests {
            return Err(BatchError::too_large(self.max_requests));
        }
        let converter = (self.resolve_call)(name).map_err(BatchError::rejected)?;

        let id = self.next_id;
        self.next_id += 1;

        let (slot, receiver) = oneshot::channel();
        self.pending.insert(id, name, converter, slot);
        self.requests.push(BatchRequest {
            id,
            name: name.to_string(),
            args,
        });

        Ok(PendingCall {
            id,
            name: name.to_string(),
            receiver,
        })
    }

    /// Send the batch and settle every pending call.
    ///
    /// # Errors
    ///
    /// - [`BatchError::Submit`] if the submission itself failed; every call
    ///   settles with that error
    /// - [`BatchError::Aggregate`] if the host did not answer every request;
    ///   the unanswered calls settle as not handled, and the error lists them
    ///   together with the calls that failed individually
    ///
    /// Calls that failed individually in an otherwise complete batch only
    /// fail their own [`PendingCall`]; `submit` then returns `Ok`.
    pub async fn submit(mut self) -> Result<(), BatchError> {
        if self.requests.is_empty() {
            debug!("Batch {} is empty, nothing to submit", self.batch_id);
            return Ok(());
        }

        let request_count = self.requests.len();
        info!("Submitting batch {} with {request_count} requests", self.batch_id);

        let responses = match self.exchange().await {
            Ok(responses) => responses,
            Err(e) => {
                error!("Batch {} failed: {e}", self.batch_id);
                self.pending.sweep(&e);
                return Err(BatchError::submit(e));
            }
        };

        let response_count = responses.len();
        let mut failures = Vec::new();
        for response in responses {
            let result = match response.outcome {
                BatchOutcome::Ok(value) => Ok(value),
                BatchOutcome::Error(message) => Err(CallError::remote(message)),
            };
            match self.pending.resolve(response.id, result) {
                Some(Some(failure)) => failures.push(failure),
                Some(None) => {}
                None => warn!(
                    "Batch {} answered unknown request {}",
                    self.batch_id, response.id
                ),
            }
        }

        if response_count != request_count || !self.pending.is_empty() {
            let unhandled = self.pending.sweep(&CallError::not_handled());
            error!(
                "Batch {}: {response_count} responses for {request_count} requests, {} unhandled",
                self.batch_id,
                unhandled.len()
            );
            failures.extend(unhandled);
            return Err(BatchError::aggregate(failures));
        }

        if !failures.is_empty() {
            warn!(
                "Batch {}: {} of {request_count} requests failed",
                self.batch_id,
                failures.len()
            );
        }
        Ok(())
    }

    async fn exchange(&self) -> Result<Vec<BatchResponse>, CallError> {
        let args = encode_batch(&self.batch_id, &self.requests)?;
        let reply = self.caller.submit_batch(args).await?;
        serde_json::from_value(reply)
            .map_err(|e| CallError::conversion(format!("malformed batch response: {e}")))
    }
}
