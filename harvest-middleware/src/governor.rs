//! Shared budget governor.
//!
//! The remote server reports how much of its per-window weight has been used;
//! the governor only ever echoes that back and never estimates endpoint costs
//! itself. All symbol tasks of a process share one governor and pass through
//! its admission gate one at a time.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use harvest_core::{BudgetObservation, BudgetState, GovernorConfig, HarvestError, floor_to};
use tokio::time::Instant;

/// Serialized admission gate over a server-reported request budget.
pub struct BudgetGovernor {
    config: GovernorConfig,
    runtime: Mutex<GovernorRuntime>,
    gate: tokio::sync::Mutex<()>,
}

struct GovernorRuntime {
    budget: BudgetState,
    // Local monotonic instant at which `budget.server_time` was observed.
    observed_at: Instant,
    tripped_until: Option<Instant>,
}

impl BudgetGovernor {
    /// Create a governor with nothing used, anchored at the local clock.
    ///
    /// The first response overwrites the anchor with the server's clock.
    #[must_use]
    pub fn new(config: GovernorConfig) -> Self {
        Self::with_state(config, BudgetState::new(config.max_weight, Utc::now()))
    }

    /// Create a governor from a known budget state, observed just now.
    #[must_use]
    pub fn with_state(config: GovernorConfig, budget: BudgetState) -> Self {
        Self {
            config,
            runtime: Mutex::new(GovernorRuntime {
                budget: BudgetState {
                    max_weight: config.max_weight,
                    ..budget
                },
                observed_at: Instant::now(),
                tripped_until: None,
            }),
            gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Configured limits.
    #[must_use]
    pub const fn config(&self) -> &GovernorConfig {
        &self.config
    }

    fn runtime(&self) -> std::sync::MutexGuard<'_, GovernorRuntime> {
        self.runtime.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current budget snapshot.
    #[must_use]
    pub fn snapshot(&self) -> BudgetState {
        self.runtime().budget
    }

    /// Overwrite the budget from response metadata.
    pub fn update(&self, observed: BudgetObservation) {
        let mut rt = self.runtime();
        rt.budget.observe(observed);
        rt.observed_at = Instant::now();
    }

    /// Server-clock instant at which the current window resets.
    #[must_use]
    pub fn window_reset(&self) -> DateTime<Utc> {
        window_reset(&self.runtime().budget, &self.config)
    }

    /// Wait the next request needs before it may be sent, without waiting.
    #[must_use]
    pub fn required_wait(&self) -> Duration {
        let rt = self.runtime();
        admission_wait(&rt.budget, rt.observed_at.elapsed(), &self.config)
    }

    /// Remaining trip time, if the governor is tripped.
    #[must_use]
    pub fn tripped_for(&self) -> Option<Duration> {
        let mut rt = self.runtime();
        let now = Instant::now();
        match rt.tripped_until {
            Some(until) if now < until => Some(until - now),
            Some(_) => {
                rt.tripped_until = None;
                None
            }
            None => None,
        }
    }

    /// Refuse admissions after a quota or ban signal.
    ///
    /// Holds for `retry_after` when the server supplied one, otherwise until
    /// the current window resets plus one more window. An existing longer
    /// trip is kept. Returns the hold applied by this call.
    pub fn trip(&self, retry_after: Option<Duration>) -> Duration {
        let mut rt = self.runtime();
        let now = Instant::now();
        let hold = retry_after.unwrap_or_else(|| {
            let server_now = shift(rt.budget.server_time, rt.observed_at.elapsed());
            let to_reset = (window_reset(&rt.budget, &self.config) - server_now)
                .to_std()
                .unwrap_or(Duration::ZERO);
            to_reset.saturating_add(self.config.window)
        });
        let until = now + hold;
        rt.tripped_until = Some(rt.tripped_until.map_or(until, |prev| prev.max(until)));
        drop(rt);
        #[cfg(feature = "tracing")]
        tracing::warn!(
            hold_ms = u64::try_from(hold.as_millis()).unwrap_or(u64::MAX),
            "budget governor tripped"
        );
        hold
    }

    /// Wait until the next request may be sent and hold the gate for it.
    ///
    /// The returned permit keeps every other caller out until it is dropped
    /// or consumed by [`AdmissionPermit::update`] / [`AdmissionPermit::trip`],
    /// so the next admission always sees the budget reported by the response
    /// to this request. Dropping the future abandons the wait without side
    /// effects.
    ///
    /// # Errors
    /// Returns `Banned` while the governor is tripped.
    pub async fn acquire(&self) -> Result<AdmissionPermit<'_>, HarvestError> {
        let gate = self.gate.lock().await;
        self.ensure_not_tripped()?;
        let wait = self.required_wait();
        if !wait.is_zero() {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                "waiting for request budget"
            );
            tokio::time::sleep(wait).await;
            self.ensure_not_tripped()?;
        }
        Ok(AdmissionPermit {
            governor: self,
            waited: wait,
            _gate: gate,
        })
    }

    /// Wait until the next request may be sent, releasing the gate at once.
    ///
    /// Returns the time waited.
    ///
    /// # Errors
    /// Returns `Banned` while the governor is tripped.
    pub async fn admit(&self) -> Result<Duration, HarvestError> {
        self.acquire().await.map(|permit| permit.waited())
    }

    fn ensure_not_tripped(&self) -> Result<(), HarvestError> {
        match self.tripped_for() {
            Some(left) => Err(HarvestError::Banned {
                reset_in_ms: u64::try_from(left.as_millis()).unwrap_or(u64::MAX),
            }),
            None => Ok(()),
        }
    }
}

/// Right to send one request through a [`BudgetGovernor`].
///
/// Held from admission until the response's budget has been recorded.
pub struct AdmissionPermit<'a> {
    governor: &'a BudgetGovernor,
    waited: Duration,
    _gate: tokio::sync::MutexGuard<'a, ()>,
}

impl AdmissionPermit<'_> {
    /// Time spent waiting for admission.
    #[must_use]
    pub const fn waited(&self) -> Duration {
        self.waited
    }

    /// Record the response's budget and release the gate.
    pub fn update(self, observed: BudgetObservation) {
        self.governor.update(observed);
    }

    /// Trip the governor on a quota or ban signal and release the gate.
    ///
    /// Returns the hold applied.
    pub fn trip(self, retry_after: Option<Duration>) -> Duration {
        self.governor.trip(retry_after)
    }
}

/// Server-clock instant at which the window containing `budget.server_time` ends.
#[must_use]
pub fn window_reset(budget: &BudgetState, config: &GovernorConfig) -> DateTime<Utc> {
    let window = TimeDelta::from_std(config.window).unwrap_or(TimeDelta::MAX);
    let start = floor_to(budget.server_time, window);
    start.checked_add_signed(window).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Wait required before the next request.
///
/// `elapsed` is the local monotonic time since `budget` was observed; it is
/// added to the server's clock so the result does not depend on the local
/// wall clock.
///
/// - exhausted: until the server's window resets
/// - partly used: the fixed pacing delay
/// - unused: no delay
#[must_use]
pub fn admission_wait(budget: &BudgetState, elapsed: Duration, config: &GovernorConfig) -> Duration {
    if budget.is_exhausted() {
        let server_now = shift(budget.server_time, elapsed);
        (window_reset(budget, config) - server_now)
            .to_std()
            .unwrap_or(Duration::ZERO)
    } else if budget.is_idle() {
        Duration::ZERO
    } else {
        config.pacing
    }
}

fn shift(ts: DateTime<Utc>, by: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(by)
        .ok()
        .and_then(|d| ts.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
