//! # In-Memory Region
//!
//! A regional backend kept entirely in process memory.
//!
//! Used as the test double for the multi-region store: clones of an
//! [`InMemoryRegion`] share state, so a test can hand one clone to the store
//! and keep another to inspect the region or inject faults.
//!
//! ```
//! use regional_secrets::provider::memory::{BackendOp, FaultPlan, InMemoryRegion};
//!
//! let region = InMemoryRegion::new("us-east-1");
//! let handle = region.clone();
//! handle.inject_fault(BackendOp::Put, FaultPlan::Times(2));
//! ```

use crate::error::BackendError;
use crate::provider::{ListPage, RegionalBackend, RegionalValue, VersionRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

/// Backend operation, used to target injected faults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendOp {
    Put,
    Get,
    Delete,
    List,
    History,
}

/// How long an injected fault stays active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPlan {
    /// Fail the next `n` calls, then recover
    Times(u32),
    /// Fail every call until [`InMemoryRegion::clear_faults`]
    Always,
    /// Let the next `n` calls through, then fail every call
    After(u32),
}

#[derive(Debug, Clone)]
struct StoredVersion {
    version: u64,
    value: String,
    created: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct RegionState {
    entries: BTreeMap<String, Vec<StoredVersion>>,
    faults: HashMap<BackendOp, FaultPlan>,
    calls: HashMap<BackendOp, u32>,
    latency: Duration,
    /// Remaining stalled put replies and how long each is held back
    put_reply_stall: (u32, Duration),
}

/// In-memory regional backend with fault injection
#[derive(Debug, Clone)]
pub struct InMemoryRegion {
    region: String,
    version_base: u64,
    state: Arc<Mutex<RegionState>>,
}

impl InMemoryRegion {
    /// Empty region with 1-indexed native versions
    #[must_use]
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            version_base: 1,
            state: Arc::new(Mutex::new(RegionState::default())),
        }
    }

    /// Use a different native index for the first version
    #[must_use]
    pub fn with_version_base(mut self, base: u64) -> Self {
        self.version_base = base;
        self
    }

    /// Fail calls of `op` according to `plan`
    pub fn inject_fault(&self, op: BackendOp, plan: FaultPlan) {
        self.lock().faults.insert(op, plan);
    }

    pub fn clear_faults(&self) {
        self.lock().faults.clear();
    }

    /// Delay every call by `latency` before it is served
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = latency;
    }

    /// Hold back the replies of the next `count` applied puts by `stall`
    ///
    /// The write lands before the stall, so a caller that gives up waiting
    /// leaves the value stored.
    pub fn stall_put_replies(&self, count: u32, stall: Duration) {
        self.lock().put_reply_stall = (count, stall);
    }

    /// Number of calls of `op` received so far, including failed ones
    #[must_use]
    pub fn calls(&self, op: BackendOp) -> u32 {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Latest value stored under `name`
    #[must_use]
    pub fn latest_value(&self, name: &str) -> Option<String> {
        self.lock()
            .entries
            .get(name)
            .and_then(|versions| versions.last())
            .map(|v| v.value.clone())
    }

    /// Number of versions stored under `name`
    #[must_use]
    pub fn version_count(&self, name: &str) -> usize {
        self.lock().entries.get(name).map_or(0, Vec::len)
    }

    /// Remove a single version, leaving a gap in the history
    ///
    /// Simulates backend-side corruption; returns whether the version existed.
    pub fn forget_version(&self, name: &str, version: u64) -> bool {
        let mut state = self.lock();
        let Some(versions) = state.entries.get_mut(name) else {
            return false;
        };
        let before = versions.len();
        versions.retain(|v| v.version != version);
        before != versions.len()
    }

    fn lock(&self) -> MutexGuard<'_, RegionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count the call, apply latency, and fail if a fault is armed for `op`
    async fn enter(&self, op: BackendOp) -> Result<(), BackendError> {
        let latency = {
            let mut state = self.lock();
            *state.calls.entry(op).or_insert(0) += 1;
            state.latency
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.lock();
        let fail = match state.faults.get_mut(&op) {
            Some(FaultPlan::Always) => true,
            Some(FaultPlan::Times(remaining)) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            Some(FaultPlan::After(remaining)) if *remaining > 0 => {
                *remaining -= 1;
                false
            }
            Some(FaultPlan::After(_)) => true,
            _ => false,
        };
        if fail {
            debug!(region = %self.region, ?op, "Injected fault");
            return Err(BackendError::Service(format!(
                "injected {op:?} fault in {}",
                self.region
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl RegionalBackend for InMemoryRegion {
    fn region(&self) -> &str {
        &self.region
    }

    fn version_base(&self) -> u64 {
        self.version_base
    }

    async fn put(&self, name: &str, value: &str, overwrite: bool) -> Result<u64, BackendError> {
        self.enter(BackendOp::Put).await?;
        let base = self.version_base;
        let (version, stall) = {
            let mut state = self.lock();
            let versions = state.entries.entry(name.to_string()).or_default();
            if !versions.is_empty() && !overwrite {
                return Err(BackendError::AlreadyExists {
                    name: name.to_string(),
                });
            }
            let version = versions.last().map_or(base, |v| v.version + 1);
            versions.push(StoredVersion {
                version,
                value: value.to_string(),
                created: Utc::now(),
            });
            let stall = match &mut state.put_reply_stall {
                (remaining, stall) if *remaining > 0 => {
                    *remaining -= 1;
                    Some(*stall)
                }
                _ => None,
            };
            (version, stall)
        };

        if let Some(stall) = stall {
            debug!(region = %self.region, ?stall, "Stalling put reply");
            tokio::time::sleep(stall).await;
        }
        Ok(version)
    }

    async fn get(&self, name: &str, version: Option<u64>) -> Result<RegionalValue, BackendError> {
        self.enter(BackendOp::Get).await?;
        let state = self.lock();
        let versions = state
            .entries
            .get(name)
            .filter(|versions| !versions.is_empty())
            .ok_or_else(|| BackendError::NotFound {
                name: name.to_string(),
            })?;
        let stored = match version {
            None => versions.last(),
            Some(wanted) => versions.iter().find(|v| v.version == wanted),
        }
        .ok_or_else(|| BackendError::VersionNotFound {
            name: name.to_string(),
            version: version.unwrap_or_default(),
        })?;
        Ok(RegionalValue {
            value: stored.value.clone(),
            version: stored.version,
            created: stored.created,
        })
    }

    async fn delete(&self, name: &str) -> Result<(), BackendError> {
        self.enter(BackendOp::Delete).await?;
        self.lock()
            .entries
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| BackendError::NotFound {
                name: name.to_string(),
            })
    }

    async fn list_by_prefix(
        &self,
        prefix: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<ListPage, BackendError> {
        self.enter(BackendOp::List).await?;
        let offset = match page_token {
            Some(token) => token.parse::<usize>().map_err(|e| {
                BackendError::InvalidRequest(format!("bad page token '{token}': {e}"))
            })?,
            None => 0,
        };
        let page_size = usize::try_from(page_size).unwrap_or(usize::MAX).max(1);

        let state = self.lock();
        let matching: Vec<&String> = state
            .entries
            .keys()
            .filter(|name| name.starts_with(prefix))
            .collect();
        let end = offset.saturating_add(page_size).min(matching.len());
        let names = matching
            .get(offset..end)
            .unwrap_or_default()
            .iter()
            .map(|name| (*name).clone())
            .collect();
        let next_token = (end < matching.len()).then(|| end.to_string());
        Ok(ListPage { names, next_token })
    }

    async fn history(&self, name: &str) -> Result<Vec<VersionRecord>, BackendError> {
        self.enter(BackendOp::History).await?;
        self.lock()
            .entries
            .get(name)
            .map(|versions| {
                versions
                    .iter()
                    .map(|v| VersionRecord {
                        version: v.version,
                        created: v.created,
                    })
                    .collect()
            })
            .ok_or_else(|| BackendError::NotFound {
                name: name.to_string(),
            })
    }
}
