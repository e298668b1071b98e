//! Run-wide cancellation and outcome bookkeeping.
//!
//! Every task of a run shares one [`RunCoordinator`]. It owns a child of the
//! process interrupt token, so cancelling the run never cancels the process,
//! while an interrupt reaches every task of the run.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{ImportError, RunOutcome};

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// Fetching and parsing the listing.
    Listing,
    /// Filtering items and feeding workers.
    Filtering,
    /// No more items will be admitted; workers finish what they hold.
    Draining,
    /// Every admitted item was handled.
    Completed,
    /// Stopped by a fatal error or an interrupt.
    CancelledError,
    /// Stopped because an item older than the retention window was seen.
    CancelledCutoff,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Listing => "listing",
            Self::Filtering => "filtering",
            Self::Draining => "draining",
            Self::Completed => "completed",
            Self::CancelledError => "cancelled-error",
            Self::CancelledCutoff => "cancelled-cutoff",
        };
        f.write_str(label)
    }
}

/// Shared state deciding how a run ends.
#[derive(Debug)]
pub struct RunCoordinator {
    interrupt: CancellationToken,
    cancel: CancellationToken,
    first_error: Mutex<Option<ImportError>>,
    cutoff_reached: AtomicBool,
    phase: Mutex<RunPhase>,
}

impl RunCoordinator {
    /// Creates a coordinator whose run token is a child of `interrupt`.
    #[must_use]
    pub fn new(interrupt: &CancellationToken) -> Self {
        Self {
            interrupt: interrupt.clone(),
            cancel: interrupt.child_token(),
            first_error: Mutex::new(None),
            cutoff_reached: AtomicBool::new(false),
            phase: Mutex::new(RunPhase::Listing),
        }
    }

    /// Token cancelled when the run must stop for any reason.
    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Returns true once the run has been told to stop.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Returns the current phase.
    #[must_use]
    pub fn phase(&self) -> RunPhase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves to `next` unless a terminal phase was already reached.
    pub fn enter(&self, next: RunPhase) {
        let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(
            *phase,
            RunPhase::Completed | RunPhase::CancelledError | RunPhase::CancelledCutoff
        ) {
            return;
        }
        if *phase != next {
            debug!(from = %*phase, to = %next, "run phase");
            *phase = next;
        }
    }

    /// Records a fatal error and cancels the run.
    ///
    /// Returns true if this was the first error; later ones are dropped.
    pub fn fail(&self, error: ImportError) -> bool {
        let first = {
            let mut slot = self
                .first_error
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if slot.is_some() {
                debug!(error = %error, "dropping error after first failure");
                false
            } else {
                *slot = Some(error);
                true
            }
        };
        if first {
            self.enter(RunPhase::CancelledError);
        }
        self.cancel.cancel();
        first
    }

    /// Stops the run because the retention cutoff was reached.
    pub fn soft_stop(&self) {
        if !self.cutoff_reached.swap(true, Ordering::SeqCst) {
            debug!("retention cutoff reached, stopping run");
        }
        self.enter(RunPhase::CancelledCutoff);
        self.cancel.cancel();
    }

    /// Returns true if [`soft_stop`](Self::soft_stop) was called.
    #[must_use]
    pub fn cutoff_reached(&self) -> bool {
        self.cutoff_reached.load(Ordering::SeqCst)
    }

    /// Resolves the run result once every task has stopped.
    ///
    /// A recorded error wins, then the cutoff, then an interrupt.
    ///
    /// # Errors
    ///
    /// Returns the first recorded error, or [`ImportError::Interrupted`] if
    /// the process token was cancelled.
    pub fn finish(&self) -> Result<RunOutcome, ImportError> {
        let error = self
            .first_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(error) = error {
            return Err(error);
        }
        if self.cutoff_reached() {
            return Ok(RunOutcome::CutoffReached);
        }
        if self.interrupt.is_cancelled() {
            self.enter(RunPhase::CancelledError);
            return Err(ImportError::Interrupted);
        }
        self.enter(RunPhase::Completed);
        Ok(RunOutcome::Completed)
    }
}
