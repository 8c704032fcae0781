//! # Paged Listing
//!
//! Enumerates every name under a prefix in one region.
//!
//! List-by-prefix results are best-effort: a single enumeration can miss
//! entries while the backend shifts pages underneath it. The lister therefore
//! walks the full page chain several times, pacing itself between pages and
//! between attempts, and keeps the largest result set it saw. This is a
//! heuristic and not a completeness guarantee.

use crate::config::ListConfig;
use crate::error::BackendError;
use crate::provider::{ListPage, RegionalBackend};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};

/// Repeated, paced enumeration of one region's names
#[derive(Debug)]
pub struct PagedLister<'a, B> {
    backend: &'a B,
    config: &'a ListConfig,
    call_timeout: Option<Duration>,
}

impl<'a, B: RegionalBackend> PagedLister<'a, B> {
    #[must_use]
    pub fn new(backend: &'a B, config: &'a ListConfig) -> Self {
        Self {
            backend,
            config,
            call_timeout: None,
        }
    }

    /// Bound every page request by `timeout`
    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// All names under `prefix`, from the largest of `attempts` enumerations
    ///
    /// When two attempts return the same number of names the later one wins.
    ///
    /// # Errors
    ///
    /// The first page error of any attempt aborts the listing.
    pub async fn list_names(&self, prefix: &str) -> Result<Vec<String>, BackendError> {
        let attempts = self.config.attempts.max(1);
        let mut best: Vec<String> = Vec::new();
        for attempt in 1..=attempts {
            if attempt > 1 && !self.config.attempt_delay.is_zero() {
                tokio::time::sleep(self.config.attempt_delay).await;
            }
            let names = self.enumerate(prefix).await?;
            debug!(
                region = self.backend.region(),
                prefix,
                attempt,
                found = names.len(),
                "Enumeration finished"
            );
            if names.len() >= best.len() {
                best = names;
            }
        }
        Ok(best)
    }

    /// One pass over the page chain
    async fn enumerate(&self, prefix: &str) -> Result<Vec<String>, BackendError> {
        let mut names = Vec::new();
        let mut seen_tokens = HashSet::new();
        let mut token: Option<String> = None;
        loop {
            let page = self.page(prefix, token.as_deref()).await?;
            names.extend(page.names);
            if !self.config.page_delay.is_zero() {
                tokio::time::sleep(self.config.page_delay).await;
            }
            match page.next_token.filter(|t| !t.is_empty()) {
                Some(next) if !seen_tokens.insert(next.clone()) => {
                    warn!(
                        region = self.backend.region(),
                        prefix,
                        token = %next,
                        "Backend repeated a page token, ending enumeration"
                    );
                    break;
                }
                Some(next) => token = Some(next),
                None => break,
            }
        }
        Ok(names)
    }

    async fn page(&self, prefix: &str, token: Option<&str>) -> Result<ListPage, BackendError> {
        let request = self
            .backend
            .list_by_prefix(prefix, self.config.page_size, token);
        match self.call_timeout {
            Some(timeout) => tokio::time::timeout(timeout, request)
                .await
                .unwrap_or(Err(BackendError::DeadlineExceeded(timeout))),
            None => request.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::memory::{BackendOp, FaultPlan, InMemoryRegion};
    use crate::provider::{RegionalValue, VersionRecord};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Backend whose enumeration loses entries on the first pass
    struct ShiftingRegion {
        passes: AtomicU32,
    }

    #[async_trait]
    impl RegionalBackend for ShiftingRegion {
        fn region(&self) -> &str {
            "us-west-1"
        }

        async fn put(&self, name: &str, _value: &str, _overwrite: bool) -> Result<u64, BackendError> {
            Err(BackendError::InvalidRequest(name.to_string()))
        }

        async fn get(&self, name: &str, _version: Option<u64>) -> Result<RegionalValue, BackendError> {
            Err(BackendError::NotFound {
                name: name.to_string(),
            })
        }

        async fn delete(&self, name: &str) -> Result<(), BackendError> {
            Err(BackendError::NotFound {
                name: name.to_string(),
            })
        }

        async fn list_by_prefix(
            &self,
            prefix: &str,
            _page_size: u32,
            page_token: Option<&str>,
        ) -> Result<ListPage, BackendError> {
            match page_token {
                None => Ok(ListPage {
                    names: vec![format!("{prefix}a")],
                    next_token: Some("1".to_string()),
                }),
                Some(_) => {
                    let pass = self.passes.fetch_add(1, Ordering::SeqCst);
                    let names = if pass == 0 {
                        vec![]
                    } else {
                        vec![format!("{prefix}b"), format!("{prefix}c")]
                    };
                    Ok(ListPage {
                        names,
                        next_token: None,
                    })
                }
            }
        }

        async fn history(&self, name: &str) -> Result<Vec<VersionRecord>, BackendError> {
            Err(BackendError::NotFound {
                name: name.to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_follows_page_tokens() {
        let region = InMemoryRegion::new("us-west-1");
        for key in ["a", "b", "c", "d", "e"] {
            region
                .put(&format!("/ci-test/svc/{key}"), "v", false)
                .await
                .unwrap();
        }
        region.put("/production/svc/x", "v", false).await.unwrap();

        let config = ListConfig {
            page_size: 2,
            attempts: 1,
            ..ListConfig::default().unpaced()
        };
        let names = PagedLister::new(&region, &config)
            .list_names("/ci-test/")
            .await
            .unwrap();
        assert_eq!(names.len(), 5);
        assert_eq!(region.calls(BackendOp::List), 3);
    }

    #[tokio::test]
    async fn test_keeps_largest_enumeration() {
        let region = ShiftingRegion {
            passes: AtomicU32::new(0),
        };
        let config = ListConfig::default().unpaced();
        let names = PagedLister::new(&region, &config)
            .list_names("/ci-test/svc/")
            .await
            .unwrap();
        assert_eq!(
            names,
            vec!["/ci-test/svc/a", "/ci-test/svc/b", "/ci-test/svc/c"]
        );
    }

    #[tokio::test]
    async fn test_page_error_aborts_listing() {
        let region = InMemoryRegion::new("us-west-1");
        region.put("/ci-test/svc/a", "v", false).await.unwrap();
        region.inject_fault(BackendOp::List, FaultPlan::Times(1));

        let config = ListConfig::default().unpaced();
        let err = PagedLister::new(&region, &config)
            .list_names("/ci-test/")
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Service(_)));
    }

    #[tokio::test]
    async fn test_slow_page_times_out() {
        let region = InMemoryRegion::new("us-west-1");
        region.set_latency(Duration::from_millis(200));

        let config = ListConfig::default().unpaced();
        let err = PagedLister::new(&region, &config)
            .with_call_timeout(Duration::from_millis(20))
            .list_names("/ci-test/")
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::DeadlineExceeded(_)));
    }
}
