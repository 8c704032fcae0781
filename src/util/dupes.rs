use crate::error::StoreError;
use crate::model::{Environment, SecretIdentifier};
use crate::store::SecretStore;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Every identifier in `environments` whose latest value equals that of `id`
///
/// `id` itself is included when it lives in one of the scanned environments.
/// Results are sorted by canonical string.
///
/// # Errors
///
/// Fails on the first read or list error.
pub async fn find_dupes<S: SecretStore + ?Sized>(
    store: &S,
    id: &SecretIdentifier,
    environments: &[Environment],
    read_delay: Duration,
) -> Result<Vec<SecretIdentifier>, StoreError> {
    let wanted = store.read(id).await?;
    let mut dupes = Vec::new();
    for &environment in environments {
        for candidate in store.list_all(environment).await? {
            if !read_delay.is_zero() {
                tokio::time::sleep(read_delay).await;
            }
            if store.read(&candidate).await?.data == wanted.data {
                debug!(secret.id = %candidate, "Found duplicate value");
                dupes.push(candidate);
            }
        }
    }
    dupes.sort();
    dupes.dedup();
    Ok(dupes)
}

/// Outcome of rewriting a set of duplicates
#[derive(Debug, Default)]
pub struct ReplaceReport {
    /// Rewritten identifiers with the version the new value was stored as
    pub updated: Vec<(SecretIdentifier, u64)>,
    pub errors: Vec<(SecretIdentifier, StoreError)>,
}

/// Update every identifier in `dupes` to `value`
///
/// Keeps going past individual failures, pausing `write_delay` between updates.
pub async fn replace_dupes<S: SecretStore + ?Sized>(
    store: &S,
    dupes: &[SecretIdentifier],
    value: &str,
    write_delay: Duration,
) -> ReplaceReport {
    let mut report = ReplaceReport::default();
    for (index, id) in dupes.iter().enumerate() {
        if index > 0 && !write_delay.is_zero() {
            tokio::time::sleep(write_delay).await;
        }
        match store.update(id, value).await {
            Ok(secret) => {
                info!(secret.id = %id, version = secret.meta.version, "Replaced duplicate value");
                report.updated.push((id.clone(), secret.meta.version));
            }
            Err(e) => {
                warn!(secret.id = %id, error = %e, "Failed to replace duplicate value");
                report.errors.push((id.clone(), e));
            }
        }
    }
    report
}
