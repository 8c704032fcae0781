//! # Utility Scan Tests
//!
//! Duplicate and group scans over a multi-region store of in-memory regions.

mod common;

use common::{ci_id, two_region_store};
use regional_secrets::error::StoreError;
use regional_secrets::model::{Environment, SecretIdentifier};
use regional_secrets::provider::memory::{BackendOp, FaultPlan};
use regional_secrets::store::SecretStore;
use regional_secrets::util::{find_dupes, find_groups, find_groups_from_file, replace_dupes};
use std::io::Write;
use std::time::Duration;

async fn seed(store: &impl SecretStore) {
    for (id, value) in [
        (ci_id("api", "token"), "shared"),
        (ci_id("web", "token"), "shared"),
        (ci_id("web", "salt"), "unique"),
        (
            SecretIdentifier::new(Environment::Production, "api", "token").unwrap(),
            "shared",
        ),
    ] {
        store.create(&id, value).await.unwrap();
    }
}

#[tokio::test]
async fn test_find_dupes_in_one_environment() {
    let (store, _regions) = two_region_store();
    seed(&store).await;

    let dupes = find_dupes(
        &store,
        &ci_id("api", "token"),
        &[Environment::CITest],
        Duration::ZERO,
    )
    .await
    .unwrap();
    assert_eq!(dupes, vec![ci_id("api", "token"), ci_id("web", "token")]);
}

#[tokio::test]
async fn test_find_dupes_across_environments() {
    let (store, _regions) = two_region_store();
    seed(&store).await;

    let dupes = find_dupes(
        &store,
        &ci_id("web", "token"),
        &Environment::ALL,
        Duration::ZERO,
    )
    .await
    .unwrap();
    let names: Vec<String> = dupes.iter().map(ToString::to_string).collect();
    assert_eq!(
        names,
        vec!["ci-test.api.token", "ci-test.web.token", "production.api.token"]
    );
}

#[tokio::test]
async fn test_find_dupes_of_missing_secret_fails() {
    let (store, _regions) = two_region_store();
    let err = find_dupes(
        &store,
        &ci_id("api", "missing"),
        &[Environment::CITest],
        Duration::ZERO,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, StoreError::IdentifierNotFound { .. }));
}

#[tokio::test]
async fn test_replace_dupes_updates_each_and_collects_errors() {
    let (store, regions) = two_region_store();
    seed(&store).await;
    let dupes = find_dupes(
        &store,
        &ci_id("api", "token"),
        &[Environment::CITest],
        Duration::ZERO,
    )
    .await
    .unwrap();
    let missing = ci_id("api", "gone");
    let mut targets = dupes.clone();
    targets.push(missing.clone());

    let report = replace_dupes(&store, &targets, "rotated", Duration::ZERO).await;

    assert_eq!(
        report.updated,
        vec![(ci_id("api", "token"), 1), (ci_id("web", "token"), 1)]
    );
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].0, missing);
    assert!(matches!(
        report.errors[0].1,
        StoreError::IdentifierNotFound { .. }
    ));
    for id in &dupes {
        assert_eq!(
            regions[1].latest_value(&id.path()).as_deref(),
            Some("rotated")
        );
    }
    assert_eq!(store.read(&ci_id("web", "salt")).await.unwrap().data, "unique");
}

#[tokio::test]
async fn test_find_groups_by_value() {
    let (store, _regions) = two_region_store();
    seed(&store).await;

    let report = find_groups(&store, &[Environment::CITest], None, Duration::ZERO).await;
    assert!(report.errors.is_empty());
    assert_eq!(
        report.groups,
        vec![
            vec![ci_id("api", "token"), ci_id("web", "token")],
            vec![ci_id("web", "salt")],
        ]
    );
}

#[tokio::test]
async fn test_find_groups_collects_read_errors() {
    let (store, regions) = two_region_store();
    seed(&store).await;
    regions[1].inject_fault(BackendOp::Get, FaultPlan::Times(1));

    let report = find_groups(&store, &[Environment::CITest], None, Duration::ZERO).await;
    assert_eq!(report.errors.len(), 1);
    let grouped: usize = report.groups.iter().map(Vec::len).sum();
    assert_eq!(grouped, 2);
}

#[tokio::test]
async fn test_find_groups_from_file_seeds_groups() {
    let (store, _regions) = two_region_store();
    seed(&store).await;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"["production.api.token", "not-an-identifier", "ci-test.api.missing"]"#
    )
    .unwrap();

    let report = find_groups_from_file(
        &store,
        &[Environment::CITest],
        file.path(),
        Duration::ZERO,
    )
    .await
    .unwrap();

    assert_eq!(
        report.groups,
        vec![vec![ci_id("api", "token"), ci_id("web", "token")]]
    );
    assert_eq!(report.errors.len(), 2);
    assert!(matches!(
        report.errors[0],
        StoreError::InvalidIdentifier { .. }
    ));
    assert!(matches!(
        report.errors[1],
        StoreError::IdentifierNotFound { .. }
    ));
}

#[tokio::test]
async fn test_find_groups_from_file_rejects_bad_json() {
    let (store, _regions) = two_region_store();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{{\"not\": \"an array\"}}").unwrap();

    let err = find_groups_from_file(&store, &Environment::ALL, file.path(), Duration::ZERO)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not a JSON array"));
}
