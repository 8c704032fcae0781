use crate::error::StoreError;
use crate::model::{Environment, SecretIdentifier};
use crate::store::SecretStore;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// Identifiers grouped by shared value, plus every error met on the way
///
/// A scan keeps going past individual failures so one unreadable secret does
/// not hide the rest of the report.
#[derive(Debug, Default)]
pub struct GroupReport {
    /// Groups sorted internally and by first member; values are never included
    pub groups: Vec<Vec<SecretIdentifier>>,
    pub errors: Vec<StoreError>,
}

/// Group the secrets of `environments` by value
///
/// Without `seeds` every distinct value forms a group. With `seeds` only the
/// values of the seed identifiers form groups, and a group lists the scanned
/// identifiers holding that value; seed values no scanned identifier holds
/// produce no group.
pub async fn find_groups<S: SecretStore + ?Sized>(
    store: &S,
    environments: &[Environment],
    seeds: Option<&[SecretIdentifier]>,
    read_delay: Duration,
) -> GroupReport {
    let mut report = GroupReport::default();
    let mut by_value: HashMap<String, Vec<SecretIdentifier>> = HashMap::new();

    if let Some(seeds) = seeds {
        for seed in seeds {
            pace(read_delay).await;
            match store.read(seed).await {
                Ok(secret) => {
                    by_value.entry(secret.data).or_default();
                }
                Err(e) => {
                    warn!(secret.id = %seed, error = %e, "Failed to read seed secret");
                    report.errors.push(e);
                }
            }
        }
    }

    for &environment in environments {
        let ids = match store.list_all(environment).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(%environment, error = %e, "Failed to list secrets");
                report.errors.push(e);
                continue;
            }
        };
        for id in ids {
            pace(read_delay).await;
            let secret = match store.read(&id).await {
                Ok(secret) => secret,
                Err(e) => {
                    warn!(secret.id = %id, error = %e, "Failed to read secret");
                    report.errors.push(e);
                    continue;
                }
            };
            match by_value.get_mut(&secret.data) {
                Some(group) => group.push(id),
                None if seeds.is_none() => {
                    by_value.insert(secret.data, vec![id]);
                }
                None => {}
            }
        }
    }

    report.groups = by_value
        .into_values()
        .filter(|group| !group.is_empty())
        .map(|mut group| {
            group.sort();
            group.dedup();
            group
        })
        .collect();
    report.groups.sort();
    report
}

/// Like [`find_groups`], seeded from a JSON array of canonical identifiers
///
/// Entries that do not parse are reported in [`GroupReport::errors`].
///
/// # Errors
///
/// Fails if the file cannot be read or is not a JSON array of strings.
pub async fn find_groups_from_file<S: SecretStore + ?Sized>(
    store: &S,
    environments: &[Environment],
    path: &Path,
    read_delay: Duration,
) -> Result<GroupReport> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read groups file {}", path.display()))?;
    let entries: Vec<String> = serde_json::from_str(&contents)
        .with_context(|| format!("Groups file {} is not a JSON array of strings", path.display()))?;

    let mut parse_errors = Vec::new();
    let seeds: Vec<SecretIdentifier> = entries
        .iter()
        .filter_map(|entry| match entry.parse() {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(entry = %entry, error = %e, "Skipping invalid identifier in groups file");
                parse_errors.push(e);
                None
            }
        })
        .collect();

    let mut report = find_groups(store, environments, Some(&seeds), read_delay).await;
    parse_errors.append(&mut report.errors);
    report.errors = parse_errors;
    Ok(report)
}

async fn pace(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
