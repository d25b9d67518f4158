// ⏳ Readiness - when is the host page done rendering?
//
// The host page never says it has finished. Instead of sleeping a fixed time
// we watch the document's mutation counter and call it settled once it has
// been quiet long enough. A hard ceiling keeps a page that never stops
// changing from blocking the first reconciliation forever.

use crate::config::ReadinessConfig;
use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Pending,
    Settled,
    /// `max_wait` ran out while the page was still changing
    TimedOut,
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        !matches!(self, Readiness::Pending)
    }
}

#[derive(Debug, Clone)]
pub struct SettleDetector {
    quiet_period: Duration,
    max_wait: Duration,
    started_at: Option<DateTime<Utc>>,
    last_change_at: Option<DateTime<Utc>>,
    last_generation: Option<u64>,
    outcome: Option<Readiness>,
}

impl SettleDetector {
    pub fn new(quiet_period: Duration, max_wait: Duration) -> Self {
        SettleDetector {
            quiet_period,
            max_wait,
            started_at: None,
            last_change_at: None,
            last_generation: None,
            outcome: None,
        }
    }

    pub fn from_config(config: &ReadinessConfig) -> Self {
        Self::new(
            Duration::milliseconds(config.quiet_period_ms as i64),
            Duration::milliseconds(config.max_wait_ms as i64),
        )
    }

    /// Feed the current mutation counter. Once ready, stays ready.
    pub fn observe(&mut self, generation: u64, now: DateTime<Utc>) -> Readiness {
        if let Some(outcome) = self.outcome {
            return outcome;
        }

        let started_at = *self.started_at.get_or_insert(now);
        if self.last_generation != Some(generation) {
            self.last_generation = Some(generation);
            self.last_change_at = Some(now);
        }
        let last_change_at = self.last_change_at.unwrap_or(now);

        let state = if now - last_change_at >= self.quiet_period {
            Readiness::Settled
        } else if now - started_at >= self.max_wait {
            Readiness::TimedOut
        } else {
            Readiness::Pending
        };

        if state.is_ready() {
            self.outcome = Some(state);
        }
        state
    }

    pub fn outcome(&self) -> Option<Readiness> {
        self.outcome
    }
}
