//! # Multi-Region Secret Store
//!
//! Keeps one secret value consistent across several independent regional
//! backends without a coordinator.
//!
//! ## Write protocol
//!
//! Create and Update write to every region concurrently, retry the failed
//! subset once, and when regions still fail they undo the regions that
//! succeeded or timed out (see the `saga` module). Delete retries the failed subset once and reports
//! any region still holding data. A compensation that itself fails is surfaced
//! as [`StoreError::PartialFailure`] and needs manual repair.
//!
//! ## Reads
//!
//! Read and ReadVersion query every region and only return a value when all
//! regions agree on value and version. Disagreement is reported as
//! [`StoreError::RegionalInconsistency`]; reads never retry.
//!
//! ## Deadlines
//!
//! Each operation runs under a deadline, `now + operation_timeout` unless the
//! caller scopes one with [`MultiRegionStore::with_deadline`]. Every regional
//! call is additionally capped at `region_call_timeout`. A call that runs out
//! of time counts as a failed region.

mod fanout;
mod saga;

use crate::config::{ConfigError, StoreConfig};
use crate::constants::CURRENT_DEPLOY_SUFFIX;
use crate::error::{BackendError, Operation, StoreError};
use crate::listing::PagedLister;
use crate::model::{validate_segment, Environment, Secret, SecretIdentifier, SecretMeta};
use crate::observability::metrics;
use crate::provider::RegionalBackend;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fanout::RegionOutcome;
use saga::{Compensation, WriteSaga};
use std::fmt;
use tokio::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Versioned secret storage scoped by environment and service
///
/// Versions are zero-based: Create yields version 0 and every Update appends
/// the next one.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Store a new secret; fails if the identifier exists in any region
    async fn create(&self, id: &SecretIdentifier, value: &str) -> Result<(), StoreError>;

    /// Latest version of a secret
    async fn read(&self, id: &SecretIdentifier) -> Result<Secret, StoreError>;

    /// A specific version of a secret
    async fn read_version(&self, id: &SecretIdentifier, version: i64)
        -> Result<Secret, StoreError>;

    /// Append a new version to an existing secret and return it
    async fn update(&self, id: &SecretIdentifier, value: &str) -> Result<Secret, StoreError>;

    /// Identifiers of one service, sorted by canonical string
    async fn list(
        &self,
        environment: Environment,
        service: &str,
    ) -> Result<Vec<SecretIdentifier>, StoreError>;

    /// Identifiers of a whole environment, sorted by canonical string
    async fn list_all(&self, environment: Environment)
        -> Result<Vec<SecretIdentifier>, StoreError>;

    /// Metadata of every version, oldest first
    async fn history(&self, id: &SecretIdentifier) -> Result<Vec<SecretMeta>, StoreError>;

    /// Remove every version of a secret
    async fn delete(&self, id: &SecretIdentifier) -> Result<(), StoreError>;
}

/// Secret store replicated over an ordered, fixed set of regions
pub struct MultiRegionStore<B> {
    config: StoreConfig,
    /// One backend per configured region, in configured order
    backends: Vec<B>,
    primary: usize,
}

impl<B: RegionalBackend> fmt::Debug for MultiRegionStore<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiRegionStore")
            .field("regions", &self.regions())
            .field("primary", &self.primary_region())
            .finish_non_exhaustive()
    }
}

/// What one region reported for a read
enum Observation {
    Found {
        value: String,
        version: u64,
        created: DateTime<Utc>,
    },
    Absent,
    MissingVersion,
}

impl Observation {
    /// Same value and version; creation times differ between regions
    fn agrees_with(&self, other: &Observation) -> bool {
        match (self, other) {
            (
                Observation::Found { value, version, .. },
                Observation::Found {
                    value: other_value,
                    version: other_version,
                    ..
                },
            ) => value == other_value && version == other_version,
            (Observation::Absent, Observation::Absent)
            | (Observation::MissingVersion, Observation::MissingVersion) => true,
            _ => false,
        }
    }

    /// Description safe for logs and errors; never includes the value
    fn describe(&self) -> String {
        match self {
            Observation::Found { version, .. } => format!("version {version}"),
            Observation::Absent => "absent".to_string(),
            Observation::MissingVersion => "version missing".to_string(),
        }
    }
}

impl<B: RegionalBackend> MultiRegionStore<B> {
    /// Build a store from a validated config and one backend per configured region
    ///
    /// Backends may be passed in any order; they are arranged in configured order.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the config is invalid, a configured region
    /// has no backend, or a backend's region is unknown or supplied twice.
    pub fn new(config: StoreConfig, backends: Vec<B>) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut slots: Vec<Option<B>> = config.regions.iter().map(|_| None).collect();
        for backend in backends {
            let region = backend.region().to_string();
            let slot = config
                .regions
                .iter()
                .position(|r| *r == region)
                .and_then(|index| slots.get_mut(index))
                .ok_or_else(|| ConfigError::UnexpectedBackend(region.clone()))?;
            if slot.is_some() {
                return Err(ConfigError::DuplicateRegion(region));
            }
            *slot = Some(backend);
        }
        let backends = slots
            .into_iter()
            .zip(&config.regions)
            .map(|(slot, region)| slot.ok_or_else(|| ConfigError::MissingBackend(region.clone())))
            .collect::<Result<Vec<B>, ConfigError>>()?;
        let primary = config
            .regions
            .iter()
            .position(|r| *r == config.primary_region)
            .ok_or_else(|| ConfigError::PrimaryNotConfigured(config.primary_region.clone()))?;

        info!(
            regions = ?config.regions,
            primary = %config.primary_region,
            "Multi-region store ready"
        );
        Ok(Self {
            config,
            backends,
            primary,
        })
    }

    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Configured regions in write order
    #[must_use]
    pub fn regions(&self) -> Vec<&str> {
        self.backends.iter().map(RegionalBackend::region).collect()
    }

    #[must_use]
    pub fn primary_region(&self) -> &str {
        self.primary_backend().region()
    }

    /// Backend for `region`, if configured
    #[must_use]
    pub fn backend(&self, region: &str) -> Option<&B> {
        self.backends.iter().find(|b| b.region() == region)
    }

    /// View of this store whose operations all share `deadline`
    #[must_use]
    pub fn with_deadline(&self, deadline: Instant) -> DeadlineStore<'_, B> {
        DeadlineStore {
            store: self,
            deadline,
        }
    }

    fn primary_backend(&self) -> &B {
        &self.backends[self.primary]
    }

    fn all(&self) -> Vec<&B> {
        self.backends.iter().collect()
    }

    fn default_deadline(&self) -> Instant {
        Instant::now() + self.config.operation_timeout
    }

    fn backend_error(id: &SecretIdentifier, region: &str, source: BackendError) -> StoreError {
        match source {
            BackendError::MalformedVersion { detail, .. } => StoreError::MalformedVersion {
                identifier: id.clone(),
                region: region.to_string(),
                detail,
            },
            source => StoreError::Backend {
                region: region.to_string(),
                source,
            },
        }
    }

    async fn pause_before_retry(&self, operation: Operation, regions: &[&str]) {
        warn!(
            operation = %operation,
            regions = ?regions,
            "Retrying failed regions"
        );
        metrics::increment_retries(operation.as_str());
        if !self.config.retry_delay.is_zero() {
            tokio::time::sleep(self.config.retry_delay).await;
        }
    }

    async fn create_by(
        &self,
        id: &SecretIdentifier,
        value: &str,
        deadline: Instant,
    ) -> Result<(), StoreError> {
        let span = info_span!(
            "secret_store.create",
            secret.id = %id,
            operation = "create",
            operation.success = tracing::field::Empty
        );
        let span_clone = span.clone();

        async move {
            let name = id.path();
            let timeout = self.config.region_call_timeout;

            let checked = if self.config.strict_create_check {
                self.all()
            } else {
                vec![self.primary_backend()]
            };
            let outcomes =
                fanout::across("get", &checked, deadline, timeout, |b| b.get(&name, None)).await;
            let mut present = Vec::new();
            let mut first_error = None;
            for outcome in outcomes {
                match outcome.result {
                    Ok(_) => present.push(outcome.backend.region().to_string()),
                    Err(e) if e.is_not_found() => {}
                    Err(e) => {
                        first_error.get_or_insert((outcome.backend.region(), e));
                    }
                }
            }
            if !present.is_empty() {
                span_clone.record("operation.success", false);
                return Err(StoreError::IdentifierAlreadyExists {
                    identifier: id.clone(),
                    regions: present,
                });
            }
            if let Some((region, source)) = first_error {
                span_clone.record("operation.success", false);
                return Err(Self::backend_error(id, region, source));
            }

            let mut saga = WriteSaga::new(Operation::Create, name.clone(), Compensation::Delete);
            let written = self
                .replicate_write(&mut saga, Operation::Create, &name, value, false, deadline)
                .await;
            match written {
                Ok(_) => {
                    span_clone.record("operation.success", true);
                    info!("Created secret {} in {} regions", id, self.backends.len());
                    Ok(())
                }
                Err(first) => {
                    span_clone.record("operation.success", false);
                    Err(self.roll_back(saga, id, first).await)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn update_by(
        &self,
        id: &SecretIdentifier,
        value: &str,
        deadline: Instant,
    ) -> Result<Secret, StoreError> {
        let span = info_span!(
            "secret_store.update",
            secret.id = %id,
            operation = "update",
            operation.success = tracing::field::Empty
        );
        let span_clone = span.clone();

        async move {
            let previous = self.read_consistent(id, None, deadline).await?;
            let name = id.path();

            let mut saga = WriteSaga::new(
                Operation::Update,
                name.clone(),
                Compensation::Restore(previous.data),
            );
            let accepted = match self
                .replicate_write(&mut saga, Operation::Update, &name, value, true, deadline)
                .await
            {
                Ok(accepted) => accepted,
                Err(first) => {
                    span_clone.record("operation.success", false);
                    return Err(self.roll_back(saga, id, first).await);
                }
            };

            span_clone.record("operation.success", true);
            let updated = match self.read_consistent(id, None, deadline).await {
                Ok(updated) => updated,
                Err(e) => {
                    warn!(
                        error = %e,
                        "Update committed in every region but could not be read back"
                    );
                    let primary = self.primary_backend();
                    let version = accepted
                        .and_then(|native| native.checked_sub(primary.version_base()))
                        .ok_or(e)?;
                    Secret {
                        data: value.to_string(),
                        meta: SecretMeta {
                            created: Utc::now(),
                            version,
                        },
                    }
                }
            };
            info!(
                "Updated secret {} from version {} to {}",
                id, previous.meta.version, updated.meta.version
            );
            Ok(updated)
        }
        .instrument(span)
        .await
    }

    /// Put to every region, then once more to the regions that failed
    ///
    /// Once every region accepted the write, returns the native version the
    /// primary assigned. Otherwise returns the first region, in configured
    /// order, that failed both attempts.
    async fn replicate_write<'a>(
        &'a self,
        saga: &mut WriteSaga<'a, B>,
        operation: Operation,
        name: &str,
        value: &str,
        overwrite: bool,
        deadline: Instant,
    ) -> Result<Option<u64>, (&'a B, BackendError)> {
        let timeout = self.config.region_call_timeout;
        let primary = self.primary_backend();
        let outcomes = fanout::across("put", &self.all(), deadline, timeout, |b| {
            b.put(name, value, overwrite)
        })
        .await;
        let mut accepted = version_from(&outcomes, primary);
        let failed = saga.absorb(outcomes);
        if failed.is_empty() {
            return Ok(accepted);
        }

        for (backend, e) in &failed {
            warn!(region = backend.region(), error = %e, "Regional write failed");
        }
        let retry: Vec<&B> = failed.iter().map(|(b, _)| *b).collect();
        let regions: Vec<&str> = retry.iter().map(|b| b.region()).collect();
        self.pause_before_retry(operation, &regions).await;

        let outcomes = fanout::across("put", &retry, deadline, timeout, |b| {
            b.put(name, value, overwrite)
        })
        .await;
        accepted = accepted.or_else(|| version_from(&outcomes, primary));
        let first_failure = saga
            .absorb(outcomes)
            .into_iter()
            .next()
            .map(|(backend, e)| {
                let earlier_timeout = failed.iter().find(|(b, first)| {
                    std::ptr::eq(*b, backend) && matches!(first, BackendError::DeadlineExceeded(_))
                });
                match (e, earlier_timeout) {
                    // The timed-out first attempt most likely created the name
                    (BackendError::AlreadyExists { .. }, Some((_, first))) if !overwrite => {
                        (backend, first.clone())
                    }
                    (e, _) => (backend, e),
                }
            });
        match first_failure {
            None => Ok(accepted),
            Some(first) => Err(first),
        }
    }

    /// Compensate a failed write and classify the result
    async fn roll_back(
        &self,
        saga: WriteSaga<'_, B>,
        id: &SecretIdentifier,
        first_failure: (&B, BackendError),
    ) -> StoreError {
        let operation = saga.operation();
        let (failed_backend, source) = first_failure;
        warn!(
            operation = %operation,
            region = failed_backend.region(),
            error = %source,
            "Write did not converge, rolling back"
        );

        let rollback_failures = saga.compensate(self.config.region_call_timeout).await;
        if !rollback_failures.is_empty() {
            let regions: Vec<String> = rollback_failures.into_iter().map(|(r, _)| r).collect();
            metrics::increment_partial_failures(operation.as_str());
            error!(
                operation = %operation,
                secret.id = %id,
                regions = ?regions,
                "Rollback failed, regions left inconsistent"
            );
            return StoreError::PartialFailure {
                identifier: id.clone(),
                operation,
                regions,
            };
        }

        match source {
            BackendError::AlreadyExists { .. } if operation == Operation::Create => {
                StoreError::IdentifierAlreadyExists {
                    identifier: id.clone(),
                    regions: vec![failed_backend.region().to_string()],
                }
            }
            source => Self::backend_error(id, failed_backend.region(), source),
        }
    }

    async fn delete_by(&self, id: &SecretIdentifier, deadline: Instant) -> Result<(), StoreError> {
        let span = info_span!(
            "secret_store.delete",
            secret.id = %id,
            operation = "delete",
            operation.success = tracing::field::Empty
        );
        let span_clone = span.clone();

        async move {
            let name = id.path();
            let timeout = self.config.region_call_timeout;

            let outcomes =
                fanout::across("delete", &self.all(), deadline, timeout, |b| b.delete(&name))
                    .await;
            let mut deleted = Vec::new();
            let mut failed = classify_deletes(outcomes, &mut deleted);

            if !failed.is_empty() {
                let retry: Vec<&B> = failed.iter().map(|(b, _)| *b).collect();
                let regions: Vec<&str> = retry.iter().map(|b| b.region()).collect();
                self.pause_before_retry(Operation::Delete, &regions).await;
                let outcomes =
                    fanout::across("delete", &retry, deadline, timeout, |b| b.delete(&name))
                        .await;
                failed = classify_deletes(outcomes, &mut deleted);
            }

            let Some((first_backend, first_error)) = failed.first() else {
                if deleted.is_empty() {
                    span_clone.record("operation.success", false);
                    return Err(StoreError::IdentifierNotFound {
                        identifier: id.clone(),
                    });
                }
                span_clone.record("operation.success", true);
                info!("Deleted secret {} from {:?}", id, deleted);
                return Ok(());
            };

            span_clone.record("operation.success", false);
            if deleted.is_empty() {
                return Err(Self::backend_error(
                    id,
                    first_backend.region(),
                    first_error.clone(),
                ));
            }
            let regions: Vec<String> = failed
                .iter()
                .map(|(b, _)| b.region().to_string())
                .collect();
            metrics::increment_partial_failures(Operation::Delete.as_str());
            error!(
                secret.id = %id,
                deleted = ?deleted,
                regions = ?regions,
                "Delete left data in some regions"
            );
            Err(StoreError::PartialFailure {
                identifier: id.clone(),
                operation: Operation::Delete,
                regions,
            })
        }
        .instrument(span)
        .await
    }

    /// Read every region and return the primary's value if all of them agree
    ///
    /// `version` is a zero-based public version; `None` reads the latest.
    async fn read_consistent(
        &self,
        id: &SecretIdentifier,
        version: Option<u64>,
        deadline: Instant,
    ) -> Result<Secret, StoreError> {
        let name = id.path();
        let outcomes = fanout::across(
            "get",
            &self.all(),
            deadline,
            self.config.region_call_timeout,
            |b| b.get(&name, version.map(|v| v + b.version_base())),
        )
        .await;

        let mut observations = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            let region = outcome.backend.region();
            let observation = match outcome.result {
                Ok(found) => {
                    let public = found
                        .version
                        .checked_sub(outcome.backend.version_base())
                        .ok_or_else(|| StoreError::MalformedVersion {
                            identifier: id.clone(),
                            region: region.to_string(),
                            detail: format!(
                                "native version {} is below base {}",
                                found.version,
                                outcome.backend.version_base()
                            ),
                        })?;
                    Observation::Found {
                        value: found.value,
                        version: public,
                        created: found.created,
                    }
                }
                Err(BackendError::NotFound { .. }) => Observation::Absent,
                Err(BackendError::VersionNotFound { .. }) => Observation::MissingVersion,
                Err(e) => return Err(Self::backend_error(id, region, e)),
            };
            observations.push((region, observation));
        }

        let (primary_region, primary) = &observations[self.primary];
        let differing: Vec<(&str, &Observation)> = observations
            .iter()
            .filter(|(_, o)| !o.agrees_with(primary))
            .map(|(r, o)| (*r, o))
            .collect();

        if !differing.is_empty() {
            let detail = std::iter::once(format!(
                "{primary_region} (primary): {}",
                primary.describe()
            ))
            .chain(
                differing
                    .iter()
                    .map(|(r, o)| format!("{r}: {}", o.describe())),
            )
            .collect::<Vec<_>>()
            .join("; ");
            metrics::increment_inconsistencies();
            warn!(secret.id = %id, detail = %detail, "Regions disagree");
            return Err(StoreError::RegionalInconsistency {
                identifier: id.clone(),
                regions: differing.iter().map(|(r, _)| (*r).to_string()).collect(),
                detail,
            });
        }

        match observations.swap_remove(self.primary).1 {
            Observation::Found {
                value,
                version,
                created,
            } => Ok(Secret {
                data: value,
                meta: SecretMeta { created, version },
            }),
            Observation::Absent => Err(StoreError::IdentifierNotFound {
                identifier: id.clone(),
            }),
            Observation::MissingVersion => Err(StoreError::VersionNotFound {
                identifier: id.clone(),
                version: version
                    .and_then(|v| i64::try_from(v).ok())
                    .unwrap_or_default(),
            }),
        }
    }

    async fn read_by(&self, id: &SecretIdentifier, deadline: Instant) -> Result<Secret, StoreError> {
        let span = info_span!("secret_store.read", secret.id = %id, operation = "read");
        self.read_consistent(id, None, deadline)
            .instrument(span)
            .await
    }

    async fn read_version_by(
        &self,
        id: &SecretIdentifier,
        version: i64,
        deadline: Instant,
    ) -> Result<Secret, StoreError> {
        let span = info_span!(
            "secret_store.read_version",
            secret.id = %id,
            operation = "read_version",
            version
        );

        async move {
            let Ok(public) = u64::try_from(version) else {
                self.read_consistent(id, None, deadline).await?;
                return Err(StoreError::VersionNotFound {
                    identifier: id.clone(),
                    version,
                });
            };
            self.read_consistent(id, Some(public), deadline).await
        }
        .instrument(span)
        .await
    }

    async fn history_by(
        &self,
        id: &SecretIdentifier,
        deadline: Instant,
    ) -> Result<Vec<SecretMeta>, StoreError> {
        let span = info_span!("secret_store.history", secret.id = %id, operation = "history");

        async move {
            let name = id.path();
            let primary = self.primary_backend();
            let outcome = fanout::across(
                "history",
                &[primary],
                deadline,
                self.config.region_call_timeout,
                |b| b.history(&name),
            )
            .await
            .pop()
            .map_or_else(|| Ok(Vec::new()), |o| o.result);

            let mut records = match outcome {
                Ok(records) => records,
                Err(e) if e.is_not_found() => {
                    return Err(StoreError::IdentifierNotFound {
                        identifier: id.clone(),
                    })
                }
                Err(e) => return Err(Self::backend_error(id, primary.region(), e)),
            };
            if records.is_empty() {
                return Err(StoreError::IdentifierNotFound {
                    identifier: id.clone(),
                });
            }
            records.sort_by_key(|r| r.version);

            let base = primary.version_base();
            let mut history = Vec::with_capacity(records.len());
            for (expected, record) in (0u64..).zip(records) {
                if record.version.checked_sub(base) != Some(expected) {
                    return Err(StoreError::MalformedVersion {
                        identifier: id.clone(),
                        region: primary.region().to_string(),
                        detail: format!(
                            "expected version {expected}, found native version {}",
                            record.version
                        ),
                    });
                }
                history.push(SecretMeta {
                    created: record.created,
                    version: expected,
                });
            }
            debug!(versions = history.len(), "Loaded history");
            Ok(history)
        }
        .instrument(span)
        .await
    }

    /// Identifiers under `prefix` in the primary region
    ///
    /// Not bound by the operation deadline: every page is bounded by
    /// `region_call_timeout` instead.
    async fn list_namespace(
        &self,
        environment: Environment,
        service: Option<&str>,
    ) -> Result<Vec<SecretIdentifier>, StoreError> {
        let prefix = match service {
            Some(service) => environment.service_namespace(service),
            None => environment.namespace(),
        };
        let span = info_span!("secret_store.list", operation = "list", prefix = %prefix);

        async move {
            let primary = self.primary_backend();
            let names = match PagedLister::new(primary, &self.config.list)
                .with_call_timeout(self.config.region_call_timeout)
                .list_names(&prefix)
                .await
            {
                Ok(names) => names,
                Err(source) => {
                    return Err(StoreError::Backend {
                        region: primary.region().to_string(),
                        source,
                    })
                }
            };

            let mut ids: Vec<SecretIdentifier> = names
                .iter()
                .filter(|name| !name.ends_with(CURRENT_DEPLOY_SUFFIX))
                .filter_map(|name| match SecretIdentifier::from_path(name) {
                    Ok(id) => Some(id),
                    Err(e) => {
                        warn!(name = %name, error = %e, "Skipping unparseable backend name");
                        None
                    }
                })
                .filter(|id| {
                    id.environment() == environment && service.is_none_or(|s| id.service() == s)
                })
                .collect();
            ids.sort();
            ids.dedup();
            debug!(found = ids.len(), "Listed identifiers");
            Ok(ids)
        }
        .instrument(span)
        .await
    }
}

/// Native version `primary` assigned, if its put is among `outcomes` and succeeded
fn version_from<B>(outcomes: &[RegionOutcome<'_, B, u64>], primary: &B) -> Option<u64> {
    outcomes
        .iter()
        .find(|o| std::ptr::eq(o.backend, primary))
        .and_then(|o| o.result.as_ref().ok().copied())
}

/// Split delete outcomes: successes are appended to `deleted`, failures returned
///
/// A region that no longer has the name has converged and is neither.
fn classify_deletes<'a, B: RegionalBackend>(
    outcomes: Vec<RegionOutcome<'a, B, ()>>,
    deleted: &mut Vec<String>,
) -> Vec<(&'a B, BackendError)> {
    let mut failed = Vec::new();
    for outcome in outcomes {
        match outcome.result {
            Ok(()) => deleted.push(outcome.backend.region().to_string()),
            Err(e) if e.is_not_found() => {}
            Err(e) => failed.push((outcome.backend, e)),
        }
    }
    failed
}

#[async_trait]
impl<B: RegionalBackend> SecretStore for MultiRegionStore<B> {
    async fn create(&self, id: &SecretIdentifier, value: &str) -> Result<(), StoreError> {
        self.create_by(id, value, self.default_deadline()).await
    }

    async fn read(&self, id: &SecretIdentifier) -> Result<Secret, StoreError> {
        self.read_by(id, self.default_deadline()).await
    }

    async fn read_version(
        &self,
        id: &SecretIdentifier,
        version: i64,
    ) -> Result<Secret, StoreError> {
        self.read_version_by(id, version, self.default_deadline())
            .await
    }

    async fn update(&self, id: &SecretIdentifier, value: &str) -> Result<Secret, StoreError> {
        self.update_by(id, value, self.default_deadline()).await
    }

    async fn list(
        &self,
        environment: Environment,
        service: &str,
    ) -> Result<Vec<SecretIdentifier>, StoreError> {
        validate_segment("service", service)?;
        self.list_namespace(environment, Some(service)).await
    }

    async fn list_all(
        &self,
        environment: Environment,
    ) -> Result<Vec<SecretIdentifier>, StoreError> {
        self.list_namespace(environment, None).await
    }

    async fn history(&self, id: &SecretIdentifier) -> Result<Vec<SecretMeta>, StoreError> {
        self.history_by(id, self.default_deadline()).await
    }

    async fn delete(&self, id: &SecretIdentifier) -> Result<(), StoreError> {
        self.delete_by(id, self.default_deadline()).await
    }
}

/// [`MultiRegionStore`] view whose operations share one caller-chosen deadline
pub struct DeadlineStore<'a, B> {
    store: &'a MultiRegionStore<B>,
    deadline: Instant,
}

impl<B: RegionalBackend> fmt::Debug for DeadlineStore<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeadlineStore")
            .field("store", self.store)
            .field("deadline", &self.deadline)
            .finish()
    }
}

impl<B> DeadlineStore<'_, B> {
    #[must_use]
    pub fn deadline(&self) -> Instant {
        self.deadline
    }
}

#[async_trait]
impl<B: RegionalBackend> SecretStore for DeadlineStore<'_, B> {
    async fn create(&self, id: &SecretIdentifier, value: &str) -> Result<(), StoreError> {
        self.store.create_by(id, value, self.deadline).await
    }

    async fn read(&self, id: &SecretIdentifier) -> Result<Secret, StoreError> {
        self.store.read_by(id, self.deadline).await
    }

    async fn read_version(
        &self,
        id: &SecretIdentifier,
        version: i64,
    ) -> Result<Secret, StoreError> {
        self.store.read_version_by(id, version, self.deadline).await
    }

    async fn update(&self, id: &SecretIdentifier, value: &str) -> Result<Secret, StoreError> {
        self.store.update_by(id, value, self.deadline).await
    }

    async fn list(
        &self,
        environment: Environment,
        service: &str,
    ) -> Result<Vec<SecretIdentifier>, StoreError> {
        self.store.list(environment, service).await
    }

    async fn list_all(
        &self,
        environment: Environment,
    ) -> Result<Vec<SecretIdentifier>, StoreError> {
        self.store.list_all(environment).await
    }

    async fn history(&self, id: &SecretIdentifier) -> Result<Vec<SecretMeta>, StoreError> {
        self.store.history_by(id, self.deadline).await
    }

    async fn delete(&self, id: &SecretIdentifier) -> Result<(), StoreError> {
        self.store.delete_by(id, self.deadline).await
    }
}
