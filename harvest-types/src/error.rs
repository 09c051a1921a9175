use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for the harvest workspace.
///
/// Every failure an ingestion run can hit is one of these variants. Use
/// [`HarvestError::kind`] to classify a failure and [`HarvestError::policy`] to
/// decide what the engine does about it.
#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum HarvestError {
    /// Connection error, timeout, or an interrupted body read.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The remote API answered with a rate-limit or IP-ban status.
    #[error("rate limited: status={status} retry_after_ms={retry_after_ms:?}")]
    RateLimited {
        /// HTTP status that carried the signal (429 or 418).
        status: u16,
        /// Server-suggested wait before the next request, if provided.
        retry_after_ms: Option<u64>,
    },

    /// The shared budget governor is tripped after an earlier ban signal.
    #[error("budget governor tripped: reset_in_ms={reset_in_ms}")]
    Banned {
        /// Milliseconds until the trip clears.
        reset_in_ms: u64,
    },

    /// Any other non-success status.
    #[error("unexpected status {status}")]
    UnexpectedStatus {
        /// HTTP status code returned by the remote API.
        status: u16,
    },

    /// The response declared a content type other than JSON.
    #[error("unexpected content type: {content_type}")]
    UnexpectedContentType {
        /// Raw `Content-Type` header value (empty when absent).
        content_type: String,
    },

    /// The page body could not be decoded into records of the expected shape.
    #[error("malformed page: {0}")]
    MalformedPage(String),

    /// A budget header was absent or could not be parsed.
    #[error("missing or invalid budget header: {header}")]
    MissingBudgetHeader {
        /// Header name, e.g. `X-MBX-USED-WEIGHT-1M`.
        header: String,
    },

    /// Records were not strictly increasing past the previous checkpoint.
    #[error("out-of-order records: {0}")]
    OutOfOrder(String),

    /// Trade ids skipped one or more values.
    #[error("trade id gap: expected {expected}, found {found}")]
    Gap {
        /// Id that should have come next.
        expected: u64,
        /// Id that actually came next.
        found: u64,
    },

    /// The persistent store rejected a read or write.
    #[error("persistence failure: {0}")]
    Persistence(String),

    /// A commit would have moved the checkpoint backward or left it in place.
    #[error("checkpoint regression: stored={stored} attempted={attempted}")]
    CheckpointRegression {
        /// Checkpoint currently held by the store.
        stored: String,
        /// Checkpoint the batch tried to commit.
        attempted: String,
    },

    /// Invalid input argument.
    #[error("invalid argument: {0}")]
    InvalidArg(String),

    /// The collaborator does not implement the requested operation.
    #[error("unsupported capability: {capability}")]
    Unsupported {
        /// Operation label, e.g. "store/candles_since".
        capability: String,
    },

    /// A retryable failure persisted across every allowed attempt.
    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Number of attempts performed.
        attempts: u32,
        /// Error returned by the final attempt.
        last: Box<HarvestError>,
    },

    /// One or more symbols of a multi-symbol harvest failed.
    #[error("symbols failed: {0:?}")]
    SymbolsFailed(Vec<HarvestError>),
}

/// Coarse failure class of a [`HarvestError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Network-level failure that may succeed when repeated.
    Transient,
    /// The remote server signalled quota exhaustion or a ban.
    QuotaOrBan,
    /// The remote contract is broken; its data cannot be trusted.
    Protocol,
    /// The store failed; nothing past the last commit is durable.
    Persistence,
    /// The caller supplied something unusable.
    Invalid,
}

/// What the engine does when it meets an error of a given kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ErrorPolicy {
    /// Repeat the same request after a bounded backoff.
    Retry,
    /// Halt the run and leave the decision to re-invoke to the caller, after
    /// the ban window has passed.
    Stop,
    /// Halt the run; repeating it will not help until something external is fixed.
    Abort,
}

impl ErrorKind {
    /// Policy table mapping each kind to the engine's reaction.
    #[must_use]
    pub const fn policy(self) -> ErrorPolicy {
        match self {
            Self::Transient => ErrorPolicy::Retry,
            Self::QuotaOrBan => ErrorPolicy::Stop,
            Self::Protocol | Self::Persistence | Self::Invalid => ErrorPolicy::Abort,
        }
    }
}

impl HarvestError {
    /// Helper: build a `Transport` error from anything displayable.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Helper: build an `Unsupported` error for an operation label.
    #[must_use]
    pub fn unsupported(capability: impl Into<String>) -> Self {
        Self::Unsupported {
            capability: capability.into(),
        }
    }

    /// Helper: build a `Persistence` error.
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Helper: build a `MalformedPage` error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedPage(msg.into())
    }

    /// Helper: build a `MissingBudgetHeader` error for the named header.
    pub fn missing_header(header: impl Into<String>) -> Self {
        Self::MissingBudgetHeader {
            header: header.into(),
        }
    }

    /// Classify this error.
    ///
    /// `RetriesExhausted` reports the kind of its final attempt. An aggregate
    /// of symbol failures reports the most severe kind among its members.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) => ErrorKind::Transient,
            Self::RateLimited { .. } | Self::Banned { .. } => ErrorKind::QuotaOrBan,
            Self::UnexpectedStatus { .. }
            | Self::UnexpectedContentType { .. }
            | Self::MalformedPage(_)
            | Self::MissingBudgetHeader { .. }
            | Self::OutOfOrder(_)
            | Self::Gap { .. } => ErrorKind::Protocol,
            Self::Persistence(_) | Self::CheckpointRegression { .. } => ErrorKind::Persistence,
            Self::InvalidArg(_) | Self::Unsupported { .. } => ErrorKind::Invalid,
            Self::RetriesExhausted { last, .. } => last.kind(),
            Self::SymbolsFailed(inner) => inner
                .iter()
                .map(Self::kind)
                .max_by_key(|k| severity(*k))
                .unwrap_or(ErrorKind::Invalid),
        }
    }

    /// Engine reaction for this error.
    ///
    /// An exhausted retry is never retried again by the engine: it stops the run.
    #[must_use]
    pub fn policy(&self) -> ErrorPolicy {
        match self {
            Self::RetriesExhausted { .. } => ErrorPolicy::Stop,
            other => other.kind().policy(),
        }
    }

    /// True when the engine may repeat the failed request.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self.policy(), ErrorPolicy::Retry)
    }

    /// Flatten nested `SymbolsFailed` structures into a plain vector.
    #[must_use]
    pub fn flatten(self) -> Vec<Self> {
        match self {
            Self::SymbolsFailed(list) => list.into_iter().flat_map(Self::flatten).collect(),
            other => vec![other],
        }
    }
}

const fn severity(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::Transient => 0,
        ErrorKind::QuotaOrBan => 1,
        ErrorKind::Invalid => 2,
        ErrorKind::Protocol => 3,
        ErrorKind::Persistence => 4,
    }
}
