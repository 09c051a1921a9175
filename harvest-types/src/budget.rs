//! Server-reported request budget.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Budget metadata decoded from one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetObservation {
    /// Server clock at the time of the response (`Date` header).
    pub server_time: DateTime<Utc>,
    /// Weight consumed in the current window (`X-MBX-USED-WEIGHT-1M`).
    pub used_weight: u32,
}

/// Quota state the governor consults before every request.
///
/// Never persisted: the server is authoritative, so resetting to zero on
/// restart is safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetState {
    /// Last observed server clock.
    pub server_time: DateTime<Utc>,
    /// Weight consumed in the server's current window.
    pub used_weight: u32,
    /// Policy ceiling for `used_weight`.
    pub max_weight: u32,
}

impl BudgetState {
    /// Fresh state with nothing used, anchored at `now`.
    #[must_use]
    pub const fn new(max_weight: u32, now: DateTime<Utc>) -> Self {
        Self {
            server_time: now,
            used_weight: 0,
            max_weight,
        }
    }

    /// Overwrite both server-reported fields unconditionally.
    pub const fn observe(&mut self, obs: BudgetObservation) {
        self.server_time = obs.server_time;
        self.used_weight = obs.used_weight;
    }

    /// True once the window's weight has reached the ceiling.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.used_weight >= self.max_weight
    }

    /// True when nothing has been consumed in the current window.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        self.used_weight == 0
    }
}
