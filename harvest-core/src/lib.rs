//! harvest-core
//!
//! Collaborator traits and the pure page logic of the harvest ingestion engine.
//!
//! - `source`: the `PageSource` trait implemented by remote API connectors.
//! - `store`: the `CheckpointStore` trait implemented by persistent stores.
//! - `boundary`: which trailing records of a page are final.
//! - `advance`: next cursor from the last finalized record.
//! - `validate`: ordering and contiguity checks before a batch is persisted.
//! - `record`: the `Record` trait tying the above together per dataset.
//!
//! Async runtime
//! -------------
//! The traits are `async_trait` based and runtime agnostic; the engine in the
//! `harvest` crate runs them on Tokio.
#![warn(missing_docs)]

/// Cursor advancement.
pub mod advance;
/// Boundary classification of pages.
pub mod boundary;
/// Per-dataset record behavior.
pub mod record;
/// Remote page source trait.
pub mod source;
/// Persistent store trait.
pub mod store;
/// Batch validation.
pub mod validate;

pub use advance::{advance, resume_cursor};
pub use boundary::{Classified, classify_candles, classify_trades};
pub use record::Record;
pub use source::PageSource;
pub use store::{CheckpointStore, WriteBatch};
pub use validate::{validate_candles, validate_trades};

pub use harvest_types::*;
