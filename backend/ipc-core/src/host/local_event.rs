//! Host-local event sources.
//!
//! A host type exposes each contract event as a [`LocalEvent`]. Firing it
//! notifies local listeners; the event broadcaster is one such listener and
//! re-broadcasts the payload to remote subscribers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;

pub type LocalListener = Arc<dyn Fn(&[Value]) + Send + Sync>;

#[derive(Default)]
struct LocalEventInner {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(u64, LocalListener)>>,
}

/// Cloneable handle to a local event. Clones share listeners.
#[derive(Clone, Default)]
pub struct LocalEvent {
    inner: Arc<LocalEventInner>,
}

impl LocalEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, listener: F) -> u64
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: u64) -> bool {
        let mut listeners = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Call every listener with `args`; returns how many were called.
    ///
    /// Listeners run on a snapshot, so one may unsubscribe itself (or others)
    /// while the event is firing.
    pub fn fire(&self, args: Vec<Value>) -> usize {
        let snapshot: Vec<LocalListener> = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in &snapshot {
            listener(&args);
        }
        snapshot.len()
    }

    pub fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
