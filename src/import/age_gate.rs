//! Retention-window cutoff.
//!
//! Items arrive newest first, so the first item older than the window means
//! every item still queued is older too. The gate only answers the question
//! for one item; stopping the run is the coordinator's job.

use chrono::{DateTime, TimeDelta, Utc};

/// Verdict for one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgeDecision {
    /// The item is inside the retention window (or the gate is disabled).
    Keep,
    /// The item was captured before `cutoff`.
    TooOld {
        /// The oldest capture time still accepted.
        cutoff: DateTime<Utc>,
    },
}

/// Compares capture times against `now - retention`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeGate {
    retention: Option<TimeDelta>,
}

impl AgeGate {
    /// Creates a gate keeping items from the last `retention_days` days.
    ///
    /// Zero or negative values disable the gate.
    #[must_use]
    pub fn new(retention_days: i64) -> Self {
        let retention = if retention_days > 0 {
            TimeDelta::try_days(retention_days)
        } else {
            None
        };
        Self { retention }
    }

    /// Returns true when every item passes.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.retention.is_none()
    }

    /// Returns the cutoff instant relative to `now`, if the gate is active.
    #[must_use]
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        now.checked_sub_signed(self.retention?)
    }

    /// Decides whether an item captured at `captured_at` is still wanted.
    #[must_use]
    pub fn check(&self, captured_at: DateTime<Utc>, now: DateTime<Utc>) -> AgeDecision {
        match self.cutoff(now) {
            Some(cutoff) if captured_at < cutoff => AgeDecision::TooOld { cutoff },
            _ => AgeDecision::Keep,
        }
    }
}
