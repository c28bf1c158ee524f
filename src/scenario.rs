//! Fluent scenario builder.
//!
//! A [`Scenario`] borrows its [`Harness`] mutably and queues scripted steps.
//! Nothing runs until the scenario is awaited or finalised with
//! [`Scenario::end`] / [`Scenario::finish`]; steps then execute one at a
//! time in the order they were chained, each fully settling before the next
//! starts. The chain is scoped to the harness borrow, so no scripting state
//! outlives the test that built it.

use std::{
    any::Any,
    future::IntoFuture,
    panic::{AssertUnwindSafe, catch_unwind},
    time::Duration,
};

use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;

use crate::{
    error::{HarnessError, Result},
    harness::{Harness, HarnessState},
};

/// A single scripted step.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Step {
    Emit { event: String, data: Value },
    Request { event: String, data: Value },
    ExpectEmitted { event: String, data: Value },
    ExpectReplied { data: Value },
    ExpectQuiet,
}

impl Step {
    /// Short description used in spans and timeout errors.
    pub(crate) fn label(&self) -> String {
        match self {
            Self::Emit { event, .. } => format!("emit {event}"),
            Self::Request { event, .. } => format!("request {event}"),
            Self::ExpectEmitted { event, .. } => format!("expect_emitted {event}"),
            Self::ExpectReplied { .. } => "expect_replied".to_owned(),
            Self::ExpectQuiet => "expect_quiet".to_owned(),
        }
    }
}

/// Chainable sequence of scripted steps bound to one [`Harness`].
///
/// Await the scenario to run its steps and keep the harness usable, or call
/// [`end`](Self::end) to run them, check the outcome and retire the harness.
///
/// ```rust,ignore
/// harness
///     .request("quote.requested", json!({"sku": "X"}))
///     .expect_replied(json!({"price": 42}))
///     .within(Duration::from_millis(200))
///     .await?;
/// ```
#[must_use = "a scenario does nothing unless awaited or ended"]
pub struct Scenario<'h> {
    harness: &'h mut Harness,
    steps: Vec<Step>,
    timeout: Duration,
    error: Option<HarnessError>,
}

impl<'h> Scenario<'h> {
    pub(crate) fn new(harness: &'h mut Harness) -> Self {
        let timeout = harness.config().step_timeout();
        Self {
            harness,
            steps: Vec::new(),
            timeout,
            error: None,
        }
    }

    /// Queue delivery of `event` with `data` to the service's queue.
    pub fn emit(self, event: impl Into<String>, data: impl Serialize) -> Self {
        let event = event.into();
        self.push_with(data, |data| Step::Emit { event, data })
    }

    /// Queue delivery of `event` with `data` and a reply queue.
    pub fn request(self, event: impl Into<String>, data: impl Serialize) -> Self {
        let event = event.into();
        self.push_with(data, |data| Step::Request { event, data })
    }

    /// Queue an expectation that the oldest unmatched publish is `event`
    /// carrying `data`.
    pub fn expect_emitted(self, event: impl Into<String>, data: impl Serialize) -> Self {
        let event = event.into();
        self.push_with(data, |data| Step::ExpectEmitted { event, data })
    }

    /// Queue an expectation that the oldest unmatched reply carries `data`.
    pub fn expect_replied(self, data: impl Serialize) -> Self {
        self.push_with(data, |data| Step::ExpectReplied { data })
    }

    /// Queue an expectation that every publish and reply has been matched.
    pub fn expect_quiet(mut self) -> Self {
        self.steps.push(Step::ExpectQuiet);
        self
    }

    /// Override the per-step timeout for every step of this scenario.
    pub fn within(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Number of queued steps.
    #[must_use]
    pub fn len(&self) -> usize { self.steps.len() }

    /// Whether no step has been queued.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.steps.is_empty() }

    /// Run the queued steps in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first step's error, or the serialization error of any
    /// scripted value before a step runs.
    pub async fn run(self) -> Result<()> {
        let Self {
            harness,
            steps,
            timeout,
            error,
        } = self;
        run_steps(harness, steps, timeout, error).await
    }

    /// Run the queued steps, then `check`, then retire the harness.
    ///
    /// `check` only runs when every step succeeded; a panic inside it is
    /// caught and reported as [`HarnessError::Callback`]. The harness moves
    /// to [`HarnessState::Ended`] whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error, [`HarnessError::Callback`] if
    /// `check` panicked, or [`HarnessError::Ended`] if the harness had
    /// already ended.
    pub async fn end<F>(self, check: F) -> Result<()>
    where
        F: FnOnce(),
    {
        let Self {
            harness,
            steps,
            timeout,
            error,
        } = self;
        if harness.state() == HarnessState::Ended {
            return Err(HarnessError::Ended);
        }

        let outcome = match run_steps(harness, steps, timeout, error).await {
            Ok(()) => catch_unwind(AssertUnwindSafe(check))
                .map_err(|payload| HarnessError::Callback(panic_message(payload.as_ref()))),
            Err(err) => Err(err),
        };
        harness.finalize();
        outcome
    }

    /// Callback-style variant of [`end`](Self::end).
    ///
    /// `done` receives `None` on success and the error otherwise, so a
    /// failure is always handed to the caller.
    pub async fn finish<F, D>(self, check: F, done: D)
    where
        F: FnOnce(),
        D: FnOnce(Option<HarnessError>),
    {
        done(self.end(check).await.err());
    }
}

/// Text of a caught panic, or a placeholder for non-string payloads.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| payload.downcast_ref::<&str>().map(|message| (*message).to_owned()))
        .unwrap_or_else(|| "non-string panic payload".to_owned())
}

async fn run_steps(
    harness: &mut Harness,
    steps: Vec<Step>,
    timeout: Duration,
    error: Option<HarnessError>,
) -> Result<()> {
    if let Some(err) = error {
        return Err(err);
    }
    for step in steps {
        harness.run_step(step, timeout).await?;
    }
    Ok(())
}

impl Scenario<'_> {
    fn push_with<T, F>(mut self, data: T, step: F) -> Self
    where
        T: Serialize,
        F: FnOnce(Value) -> Step,
    {
        if self.error.is_none() {
            match serde_json::to_value(data) {
                Ok(value) => self.steps.push(step(value)),
                Err(err) => self.error = Some(err.into()),
            }
        }
        self
    }
}

impl<'h> IntoFuture for Scenario<'h> {
    type Output = Result<()>;
    type IntoFuture = BoxFuture<'h, Self::Output>;

    fn into_future(self) -> Self::IntoFuture { Box::pin(self.run()) }
}

impl std::fmt::Debug for Scenario<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scenario")
            .field("harness", &self.harness)
            .field("steps", &self.steps)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
