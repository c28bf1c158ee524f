//! Append-only call histories.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Ordered record of every call made to one stub operation.
///
/// Entries are only ever appended. Readers take clones so no lock is held
/// while a test inspects the history.
#[derive(Debug)]
pub struct CallHistory<T>(Mutex<Vec<T>>);

impl<T> Default for CallHistory<T> {
    fn default() -> Self { Self(Mutex::new(Vec::new())) }
}

impl<T: Clone> CallHistory<T> {
    /// Append `call` to the history.
    pub fn record(&self, call: T) { self.lock().push(call); }

    /// Number of recorded calls.
    #[must_use]
    pub fn len(&self) -> usize { self.lock().len() }

    /// Whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.lock().is_empty() }

    /// Clone of the call at `index`, oldest first.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<T> { self.lock().get(index).cloned() }

    /// Clone of the whole history.
    #[must_use]
    pub fn snapshot(&self) -> Vec<T> { self.lock().clone() }

    fn lock(&self) -> MutexGuard<'_, Vec<T>> {
        // A panic while pushing cannot leave the vector half-written.
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
