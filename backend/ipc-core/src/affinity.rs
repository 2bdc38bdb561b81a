//! Process-affinity guard.
//!
//! Host-only types must never be constructed in a client context and vice
//! versa. Each process announces which context(s) it runs with
//! [`mark_process`]; a [`ContextGuard`] refuses construction when the marker
//! for its context is missing, before the constructor runs.

use crate::error::AffinityError;

use std::fmt::{Display, Formatter, Result as FormatResult};
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, error, info};
use serde::Serialize;

static HOST_MARKER: AtomicBool = AtomicBool::new(false);
static CLIENT_MARKER: AtomicBool = AtomicBool::new(false);

/// The two execution contexts of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ProcessContext {
    Host,
    Client,
}

impl ProcessContext {
    fn marker(self) -> &'static AtomicBool {
        match self {
            ProcessContext::Host => &HOST_MARKER,
            ProcessContext::Client => &CLIENT_MARKER,
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            ProcessContext::Host => "Host",
            ProcessContext::Client => "Client",
        }
    }
}

impl Display for ProcessContext {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        match self {
            ProcessContext::Host => formatter.write_str("host"),
            ProcessContext::Client => formatter.write_str("client"),
        }
    }
}

/// Announce that this process runs the given context.
pub fn mark_process(context: ProcessContext) {
    if !context.marker().swap(true, Ordering::SeqCst) {
        info!("Process marked as {context} context");
    }
}

/// Remove a context marker. Mostly useful in tests.
pub fn clear_process_marker(context: ProcessContext) {
    context.marker().store(false, Ordering::SeqCst);
}

pub fn is_marked(context: ProcessContext) -> bool {
    context.marker().load(Ordering::SeqCst)
}

/// Construction guard for a context-bound type.
///
/// Guarding is idempotent: once a guard is bound to a context, guarding it
/// again (with any context) leaves it unchanged. The display name is prefixed
/// with the context (`Host`/`Client`) unless the class name already starts
/// with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextGuard {
    class_name: String,
    display_name: String,
    context: Option<ProcessContext>,
}

impl ContextGuard {
    /// A guard that allows construction anywhere.
    pub fn unguarded(class_name: &str) -> Self {
        Self {
            class_name: class_name.to_string(),
            display_name: class_name.to_string(),
            context: None,
        }
    }

    pub fn guard(mut self, context: ProcessContext) -> Self {
        if let Some(existing) = self.context {
            debug!(
                "{} is already guarded for the {existing} context",
                self.display_name
            );
            return self;
        }

        if !self.class_name.starts_with(context.prefix()) {
            self.display_name = format!("{}{}", context.prefix(), self.class_name);
        }
        self.context = Some(context);
        self
    }

    pub fn host_only(self) -> Self {
        self.guard(ProcessContext::Host)
    }

    pub fn client_only(self) -> Self {
        self.guard(ProcessContext::Client)
    }

    pub fn context(&self) -> Option<ProcessContext> {
        self.context
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Fail unless the current process carries this guard's context marker.
    #[track_caller]
    pub fn check(&self) -> Result<(), AffinityError> {
        match self.context {
            Some(context) if !is_marked(context) => {
                error!(
                    "Refusing to construct {} outside the {context} context",
                    self.display_name
                );
                Err(AffinityError::context_mismatch(&self.display_name, context))
            }
            _ => Ok(()),
        }
    }

    /// Run `constructor` only if the context check passes.
    #[track_caller]
    pub fn construct<T, F>(&self, constructor: F) -> Result<T, AffinityError>
    where
        F: FnOnce() -> T,
    {
        self.check()?;
        Ok(constructor())
    }
}
