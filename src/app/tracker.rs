//! Last-request-wins bookkeeping.
//!
//! Every settings change starts a new run with a fresh id. Only the run
//! holding the newest id may publish results; older runs notice at stage
//! boundaries and bail out with `RunError::Superseded`.

use std::sync::atomic::{AtomicU64, Ordering};

use super::pipeline::RunError;

#[derive(Debug, Default)]
pub struct RunTracker {
    latest: AtomicU64,
}

impl RunTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new run, superseding any run in flight.
    pub fn begin(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn latest(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, run_id: u64) -> bool {
        self.latest() == run_id
    }

    pub fn ticket(&self, run_id: u64) -> RunTicket<'_> {
        RunTicket { tracker: self, run_id }
    }
}

/// A run id bound to its tracker, checked by the pipeline between stages.
#[derive(Debug, Clone, Copy)]
pub struct RunTicket<'a> {
    tracker: &'a RunTracker,
    run_id: u64,
}

impl RunTicket<'_> {
    pub fn check(&self) -> Result<(), RunError> {
        if self.tracker.is_current(self.run_id) {
            Ok(())
        } else {
            tracing::debug!(run_id = self.run_id, latest = self.tracker.latest(), "dropping stale run");
            Err(RunError::Superseded)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_run_supersedes_older() {
        let tracker = RunTracker::new();
        let first = tracker.begin();
        assert!(tracker.ticket(first).check().is_ok());

        let second = tracker.begin();
        assert!(second > first);
        assert!(matches!(tracker.ticket(first).check(), Err(RunError::Superseded)));
        assert!(tracker.ticket(second).check().is_ok());
    }
}
