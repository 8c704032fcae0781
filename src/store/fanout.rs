//! Concurrent per-region calls bounded by a deadline.

use crate::error::BackendError;
use crate::observability::metrics;
use crate::provider::RegionalBackend;
use futures::future::join_all;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Result of one regional call
pub(crate) struct RegionOutcome<'a, B, T> {
    pub backend: &'a B,
    pub result: Result<T, BackendError>,
}

impl<B: RegionalBackend, T> RegionOutcome<'_, B, T> {
    pub fn region(&self) -> &str {
        self.backend.region()
    }
}

/// Issue `op` against every backend at once and wait for all of them
///
/// Each call is cut off at `min(deadline, start + call_timeout)`; a call that
/// runs out of time yields [`BackendError::DeadlineExceeded`]. Outcomes are
/// returned in the order of `backends`.
pub(crate) async fn across<'a, B, T, F, Fut>(
    call: &'static str,
    backends: &[&'a B],
    deadline: Instant,
    call_timeout: Duration,
    op: F,
) -> Vec<RegionOutcome<'a, B, T>>
where
    B: RegionalBackend,
    F: Fn(&'a B) -> Fut,
    Fut: Future<Output = Result<T, BackendError>>,
{
    join_all(backends.iter().map(|&backend| {
        let fut = op(backend);
        async move {
            let started = Instant::now();
            let limit = deadline.min(started + call_timeout);
            let result = match tokio::time::timeout_at(limit, fut).await {
                Ok(result) => result,
                Err(_) => Err(BackendError::DeadlineExceeded(
                    limit.saturating_duration_since(started),
                )),
            };
            let elapsed = started.elapsed();
            let outcome = match &result {
                Ok(_) => "success",
                Err(BackendError::NotFound { .. } | BackendError::VersionNotFound { .. }) => {
                    "not_found"
                }
                Err(BackendError::DeadlineExceeded(_)) => "timeout",
                Err(_) => "error",
            };
            metrics::record_region_call(backend.region(), call, outcome, elapsed.as_secs_f64());
            debug!(
                region = backend.region(),
                call,
                outcome,
                elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                "Regional call finished"
            );
            RegionOutcome { backend, result }
        }
    }))
    .await
}
