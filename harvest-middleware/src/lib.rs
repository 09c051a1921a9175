//! harvest-middleware
//!
//! Wrappers placed between the ingestion engine and a remote page source:
//!
//! - [`BudgetGovernor`]: shared admission gate driven by server-reported weight.
//! - [`GovernedSource`]: admits each request, records the budget, trips on bans.
//! - [`retry_transient`]: bounded exponential backoff for transport failures.

mod governed;
mod governor;
mod retry;

pub use crate::governed::GovernedSource;
pub use crate::governor::{AdmissionPermit, BudgetGovernor, admission_wait, window_reset};
pub use crate::retry::{backoff_delay, jitter_wait, retry_transient};
