//! One bounded response from the remote API.

use serde::{Deserialize, Serialize};

use crate::budget::BudgetObservation;

/// Records returned by one remote call, ascending by the cursor dimension.
///
/// An empty page ends a run. A short page is only a hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<R> {
    /// Records in ascending cursor order.
    pub records: Vec<R>,
}

impl<R> Page<R> {
    /// Wrap already-ordered records.
    #[must_use]
    pub const fn new(records: Vec<R>) -> Self {
        Self { records }
    }

    /// Page with no records.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// True for the terminal signal.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Trailing record, if any.
    #[must_use]
    pub fn last(&self) -> Option<&R> {
        self.records.last()
    }
}

impl<R> Default for Page<R> {
    fn default() -> Self {
        Self::empty()
    }
}

/// A decoded page together with the budget metadata of its response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fetched<R> {
    /// Decoded records.
    pub page: Page<R>,
    /// Budget state learned from the response headers.
    pub observed: BudgetObservation,
}
