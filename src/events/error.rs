// Listener failure types
//
// A listener can fail in two ways: by returning Err from a fallible callback,
// or by panicking. Both end up as a ListenerFailure handed to the bus error
// handler and collected into the EmitReport of that emission.

use std::error::Error as StdError;
use thiserror::Error;

use super::event_types::SubscriptionId;

/// Error produced by a single listener invocation.
#[derive(Error, Debug)]
pub enum ListenerError {
    /// The listener reported a failure through its return value
    #[error("listener failed: {0}")]
    Failed(String),

    /// The listener panicked; the panic message is kept when it was a string
    #[error("listener panicked: {0}")]
    Panicked(String),

    /// The downstream consumer of a relay has gone away
    #[error("relay target disconnected: {0}")]
    Disconnected(String),

    #[error(transparent)]
    Other(#[from] Box<dyn StdError + Send + Sync>),
}

impl ListenerError {
    pub fn failed(message: impl Into<String>) -> Self {
        ListenerError::Failed(message.into())
    }

    /// Build a `Panicked` error from a `catch_unwind` payload.
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        ListenerError::Panicked(message)
    }

    pub fn is_panic(&self) -> bool {
        matches!(self, ListenerError::Panicked(_))
    }
}

/// One listener that failed during an emission.
#[derive(Debug)]
pub struct ListenerFailure {
    pub event_name: String,
    pub subscription: SubscriptionId,
    pub error: ListenerError,
}

impl std::fmt::Display for ListenerFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} on '{}': {}",
            self.subscription, self.event_name, self.error
        )
    }
}

/// Aggregated outcome of one `emit` call.
#[derive(Debug, Default)]
pub struct EmitReport {
    /// Number of listeners invoked, failed ones included
    pub invoked: usize,
    pub failures: Vec<ListenerFailure>,
}

impl EmitReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }

    /// True when nobody was listening for the event.
    pub fn is_unhandled(&self) -> bool {
        self.invoked == 0
    }

    pub fn succeeded(&self) -> usize {
        self.invoked.saturating_sub(self.failures.len())
    }
}
