//! Harvest data model, error taxonomy, and configuration primitives.
#![warn(missing_docs)]

mod budget;
mod config;
mod cursor;
mod error;
mod market;
mod page;
mod reports;

pub use budget::{BudgetObservation, BudgetState};
pub use config::{GovernorConfig, HarvestConfig, RetryConfig};
pub use cursor::{Checkpoint, Cursor, floor_minute, floor_to};
pub use error::{ErrorKind, ErrorPolicy, HarvestError};
pub use market::{Candle, Dataset, Symbol, Trade};
pub use page::{Fetched, Page};
pub use reports::{DrainReason, HarvestReport, IngestReport, SymbolFailure};
