//! harvest-mock
//!
//! Deterministic collaborators for tests and examples:
//!
//! - [`ScriptedSource`]: answers each call with the next queued behavior.
//! - [`SimulatedExchange`]: pages through a fixed history against a settable clock.
//! - [`MemoryStore`]: atomic in-memory checkpoint store with failure injection.

mod exchange;
/// Deterministic record builders.
pub mod fixtures;
mod scripted;
mod store;

pub use exchange::{ExchangeController, SimulatedExchange};
pub use scripted::{MockBehavior, RequestLog, ScriptController, ScriptedSource, fetched};
pub use store::MemoryStore;
