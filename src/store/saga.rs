//! # Write Saga
//!
//! Bookkeeping for a multi-region write.
//!
//! Every region that accepted the write is recorded as it succeeds, and so is
//! every region whose call ran out of time, since that write may still have
//! landed. The record is only consulted on the failure path, where each
//! recorded region receives
//! the compensating call (delete for Create, re-put of the previous value for
//! Update). Compensations are attempted once and never retried: a failed
//! compensation means automatic repair is no longer safe.

use crate::error::{BackendError, Operation};
use crate::observability::metrics;
use crate::provider::RegionalBackend;
use crate::store::fanout::{self, RegionOutcome};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// Call that undoes a completed regional write
#[derive(Clone)]
pub(crate) enum Compensation {
    /// Remove the name again (Create)
    Delete,
    /// Put the previous value back (Update)
    Restore(String),
}

impl std::fmt::Debug for Compensation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Compensation::Delete => f.write_str("Delete"),
            Compensation::Restore(_) => f.write_str("Restore(<redacted>)"),
        }
    }
}

/// Regional writes of one operation that may need undoing, and how to undo them
pub(crate) struct WriteSaga<'a, B> {
    operation: Operation,
    name: String,
    compensation: Compensation,
    /// Regions that accepted the write or timed out, in recording order
    written: Vec<&'a B>,
    /// Subset of `written` whose outcome is unknown
    uncertain: Vec<&'a B>,
}

impl<'a, B: RegionalBackend> WriteSaga<'a, B> {
    pub fn new(operation: Operation, name: impl Into<String>, compensation: Compensation) -> Self {
        Self {
            operation,
            name: name.into(),
            compensation,
            written: Vec::new(),
            uncertain: Vec::new(),
        }
    }

    /// Record successful and timed-out outcomes; return the failed ones in input order
    pub fn absorb<T>(
        &mut self,
        outcomes: Vec<RegionOutcome<'a, B, T>>,
    ) -> Vec<(&'a B, BackendError)> {
        let mut failed = Vec::new();
        for outcome in outcomes {
            match outcome.result {
                Ok(_) => self.record(outcome.backend),
                Err(e) => {
                    if matches!(e, BackendError::DeadlineExceeded(_)) {
                        self.record(outcome.backend);
                        if !self.is_uncertain(outcome.backend) {
                            self.uncertain.push(outcome.backend);
                        }
                    }
                    failed.push((outcome.backend, e));
                }
            }
        }
        failed
    }

    /// Whether an earlier call to `backend` timed out, so its write may have landed
    pub fn is_uncertain(&self, backend: &B) -> bool {
        self.uncertain.iter().any(|b| std::ptr::eq(*b, backend))
    }

    fn record(&mut self, backend: &'a B) {
        if !self.written.iter().any(|b| std::ptr::eq(*b, backend)) {
            self.written.push(backend);
        }
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn written_regions(&self) -> Vec<&str> {
        self.written.iter().map(|b| b.region()).collect()
    }

    /// Undo every recorded write, returning the regions where undoing failed
    ///
    /// Runs with a fresh `call_timeout` budget rather than the caller's
    /// deadline, which may already have expired.
    pub async fn compensate(self, call_timeout: Duration) -> Vec<(String, BackendError)> {
        if self.written.is_empty() {
            return Vec::new();
        }
        info!(
            operation = %self.operation,
            name = %self.name,
            regions = ?self.written_regions(),
            uncertain = self.uncertain.len(),
            compensation = ?self.compensation,
            "Rolling back regional writes"
        );

        let deadline = Instant::now() + call_timeout;
        let name = self.name.as_str();
        let outcomes = match &self.compensation {
            Compensation::Delete => {
                fanout::across("rollback_delete", &self.written, deadline, call_timeout, |b| {
                    b.delete(name)
                })
                .await
            }
            Compensation::Restore(previous) => {
                fanout::across("rollback_put", &self.written, deadline, call_timeout, |b| {
                    b.put(name, previous, true)
                })
                .await
                .into_iter()
                .map(|o| RegionOutcome {
                    backend: o.backend,
                    result: o.result.map(|_| ()),
                })
                .collect()
            }
        };

        let mut failures = Vec::new();
        for outcome in outcomes {
            match (&self.compensation, outcome.result) {
                // Already gone counts as rolled back
                (_, Ok(())) | (Compensation::Delete, Err(BackendError::NotFound { .. })) => {
                    metrics::record_rollback(self.operation.as_str(), true);
                }
                (_, Err(e)) => {
                    metrics::record_rollback(self.operation.as_str(), false);
                    warn!(
                        operation = %self.operation,
                        region = outcome.backend.region(),
                        error = %e,
                        "Rollback failed"
                    );
                    failures.push((outcome.backend.region().to_string(), e));
                }
            }
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::memory::InMemoryRegion;

    #[test]
    fn test_absorb_records_timeouts_for_compensation() {
        let west = InMemoryRegion::new("us-west-1");
        let east = InMemoryRegion::new("us-east-1");
        let south = InMemoryRegion::new("us-east-2");
        let mut saga: WriteSaga<'_, InMemoryRegion> =
            WriteSaga::new(Operation::Create, "/ci-test/svc/k", Compensation::Delete);

        let failed = saga.absorb(vec![
            RegionOutcome {
                backend: &west,
                result: Ok(1),
            },
            RegionOutcome {
                backend: &east,
                result: Err(BackendError::DeadlineExceeded(Duration::from_millis(50))),
            },
            RegionOutcome {
                backend: &south,
                result: Err(BackendError::Service("boom".to_string())),
            },
        ]);

        assert_eq!(failed.len(), 2);
        assert_eq!(saga.written_regions(), vec!["us-west-1", "us-east-1"]);
        assert!(saga.is_uncertain(&east));
        assert!(!saga.is_uncertain(&south));

        // A later success in the same region is not recorded twice
        saga.absorb(vec![RegionOutcome {
            backend: &east,
            result: Ok(2),
        }]);
        assert_eq!(saga.written_regions(), vec!["us-west-1", "us-east-1"]);
    }
}
