//! Matching recorded outbound calls against expectations.
//!
//! Histories recorded by the stub channel are never mutated. The harness
//! keeps a [`Cursors`] value instead: every record before a cursor has been
//! matched, and a successful match advances the cursor by exactly one.

use std::fmt;

use assert_json_diff::{CompareMode, Config, assert_json_matches_no_panic};
use serde_json::Value;

use crate::error::CallKind;

/// Structural difference between an expected and a decoded payload.
///
/// Carries both values so test output can show expected against actual, plus
/// a rendered path-by-path diff.
#[derive(Clone, Debug, PartialEq)]
pub struct Mismatch {
    subject: String,
    expected: Value,
    actual: Value,
    diff: String,
}

impl Mismatch {
    /// What was being matched, e.g. `event "order.confirmed"` or `reply`.
    #[must_use]
    pub fn subject(&self) -> &str { &self.subject }

    /// Value the test expected.
    #[must_use]
    pub fn expected(&self) -> &Value { &self.expected }

    /// Value decoded from the recorded call.
    #[must_use]
    pub fn actual(&self) -> &Value { &self.actual }

    /// Rendered differences.
    #[must_use]
    pub fn diff(&self) -> &str { &self.diff }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "payload mismatch for {}", self.subject)?;
        writeln!(f, "  expected: {}", self.expected)?;
        writeln!(f, "    actual: {}", self.actual)?;
        write!(f, "{}", self.diff)
    }
}

impl std::error::Error for Mismatch {}

/// Compare `actual` with `expected` for strict structural equality.
///
/// # Errors
///
/// Returns a [`Mismatch`] describing every differing path.
pub fn compare(subject: impl Into<String>, expected: &Value, actual: &Value) -> Result<(), Mismatch> {
    assert_json_matches_no_panic(actual, expected, Config::new(CompareMode::Strict)).map_err(
        |diff| Mismatch {
            subject: subject.into(),
            expected: expected.clone(),
            actual: actual.clone(),
            diff,
        },
    )
}

/// Per-history match positions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cursors {
    publish: usize,
    reply: usize,
}

impl Cursors {
    /// Index of the oldest unmatched record in `kind`'s history.
    #[must_use]
    pub fn position(&self, kind: CallKind) -> usize {
        match kind {
            CallKind::Publish => self.publish,
            CallKind::Reply => self.reply,
        }
    }

    /// Mark the oldest unmatched record in `kind`'s history as matched.
    pub fn advance(&mut self, kind: CallKind) {
        match kind {
            CallKind::Publish => self.publish += 1,
            CallKind::Reply => self.reply += 1,
        }
    }

    /// Records in a history of `recorded` entries not yet matched.
    #[must_use]
    pub fn pending(&self, kind: CallKind, recorded: usize) -> usize {
        recorded.saturating_sub(self.position(kind))
    }
}
