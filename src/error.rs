//! Canonical error and result types for the crate.
//!
//! [`HarnessError`] is the single failure surface of a scripted scenario. It
//! separates wiring failures (no consumer, a failing service) from assertion
//! failures so test output can show the right kind of diagnostic.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use crate::{codec::CodecError, matching::Mismatch};

/// Boxed error used at collaborator seams (services, handlers).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Outbound call history inspected by [`HarnessError::Unconsumed`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallKind {
    /// Calls to `publish`.
    Publish,
    /// Calls to `send_to_queue`.
    Reply,
}

impl std::fmt::Display for CallKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Publish => f.write_str("publish"),
            Self::Reply => f.write_str("reply"),
        }
    }
}

/// Errors raised while starting a service or running scripted steps.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum HarnessError {
    /// The service never registered a consumer for its queue.
    #[error("handler not found for queue `{queue}`")]
    HandlerNotFound {
        /// Queue the delivery targeted.
        queue: String,
    },
    /// The service's consumer returned an error.
    #[error("handler for queue `{queue}` failed")]
    Handler {
        /// Queue the delivery targeted.
        queue: String,
        /// Error returned by the handler.
        #[source]
        source: BoxError,
    },
    /// No unmatched publish was recorded.
    #[error("event `{event}` was not emitted (expected payload {expected})")]
    NotEmitted {
        /// Routing key the test expected.
        event: String,
        /// Payload the test expected.
        expected: Value,
    },
    /// No unmatched reply was recorded.
    #[error("reply was not sent (expected payload {expected})")]
    NotReplied {
        /// Payload the test expected.
        expected: Value,
    },
    /// The oldest unmatched publish carries a different routing key.
    #[error("expected event `{expected}` but `{actual}` was emitted")]
    UnexpectedEvent {
        /// Routing key the test expected.
        expected: String,
        /// Routing key actually published.
        actual: String,
    },
    /// The decoded payload differs from the expected value.
    #[error("{0}")]
    Mismatch(Box<Mismatch>),
    /// Outbound calls remain that no expectation consumed.
    #[error("{count} unmatched {kind} call(s) remain")]
    Unconsumed {
        /// History holding the leftovers.
        kind: CallKind,
        /// Number of leftover records.
        count: usize,
    },
    /// The completion check passed to `end` panicked.
    #[error("completion check failed: {0}")]
    Callback(String),
    /// The service failed to start.
    #[error("service failed to start")]
    Start(#[source] BoxError),
    /// A step did not complete within its timeout.
    #[error("step `{step}` timed out after {timeout:?}")]
    StepTimeout {
        /// Label of the step that stalled.
        step: String,
        /// Timeout in force for the step.
        timeout: Duration,
    },
    /// Scripted data could not be turned into a value.
    #[error("failed to serialize scripted data")]
    Serialize(#[from] serde_json::Error),
    /// Encoding or decoding a payload failed.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// The harness was already finalised by `end`.
    #[error("harness has ended; no further steps may run")]
    Ended,
}

impl HarnessError {
    /// Returns true if this error is an assertion failure rather than a
    /// wiring or runtime failure.
    #[must_use]
    pub fn is_assertion(&self) -> bool {
        matches!(
            self,
            Self::NotEmitted { .. }
                | Self::NotReplied { .. }
                | Self::UnexpectedEvent { .. }
                | Self::Mismatch(_)
                | Self::Unconsumed { .. }
        )
    }

    /// Return the structural mismatch carried by this error, if any.
    #[must_use]
    pub fn mismatch(&self) -> Option<&Mismatch> {
        match self {
            Self::Mismatch(mismatch) => Some(mismatch),
            _ => None,
        }
    }
}

impl From<Mismatch> for HarnessError {
    fn from(mismatch: Mismatch) -> Self { Self::Mismatch(Box::new(mismatch)) }
}

/// Result alias used by harness operations.
pub type Result<T, E = HarnessError> = std::result::Result<T, E>;
