//! # Identifier & Secret Model
//!
//! Canonical key structure for secrets and the versioned value stored under it.
//!
//! A [`SecretIdentifier`] has two textual forms:
//!
//! - canonical: `production.oauth.client-secret` (display, sorting, CLI input)
//! - path: `/production/oauth/client-secret` (the name handed to regional backends)
//!
//! Both forms round-trip. Service and key segments are restricted to
//! `[A-Za-z0-9_-]` so neither delimiter can appear inside a segment.

use crate::error::StoreError;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Allowed characters for service and key segments
static SEGMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("segment regex is valid"));

/// Deployment environment a secret belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Environment {
    Production,
    Development,
    CITest,
}

impl Environment {
    /// All supported environments
    pub const ALL: [Environment; 3] = [
        Environment::Production,
        Environment::Development,
        Environment::CITest,
    ];

    /// Canonical name used in identifiers and backend paths
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Development => "development",
            Environment::CITest => "ci-test",
        }
    }

    /// Backend namespace holding every secret of this environment, e.g. `/production/`
    #[must_use]
    pub fn namespace(&self) -> String {
        format!("/{}/", self.as_str())
    }

    /// Backend namespace holding every secret of one service, e.g. `/production/oauth/`
    #[must_use]
    pub fn service_namespace(&self, service: &str) -> String {
        format!("/{}/{}/", self.as_str(), service)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Environment::ALL
            .into_iter()
            .find(|env| env.as_str() == s)
            .ok_or_else(|| StoreError::InvalidIdentifier {
                input: s.to_string(),
                reason: format!(
                    "unknown environment (expected one of: {})",
                    Environment::ALL.map(|e| e.as_str()).join(", ")
                ),
            })
    }
}

impl TryFrom<String> for Environment {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Environment> for String {
    fn from(env: Environment) -> Self {
        env.as_str().to_string()
    }
}

/// Lookup key for a secret: environment, service, and the key within that service
///
/// Construct with [`SecretIdentifier::new`] (validating) or parse the canonical
/// string form. Ordered by canonical string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SecretIdentifier {
    environment: Environment,
    service: String,
    key: String,
}

impl SecretIdentifier {
    /// Create a validated identifier
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidIdentifier`] if `service` or `key` is empty or
    /// contains characters outside `[A-Za-z0-9_-]`.
    pub fn new(
        environment: Environment,
        service: impl Into<String>,
        key: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let service = service.into();
        let key = key.into();
        validate_segment("service", &service)?;
        validate_segment("key", &key)?;
        Ok(Self {
            environment,
            service,
            key,
        })
    }

    #[must_use]
    pub fn environment(&self) -> Environment {
        self.environment
    }

    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Backend name for this identifier: `/<environment>/<service>/<key>`
    #[must_use]
    pub fn path(&self) -> String {
        format!("/{}/{}/{}", self.environment, self.service, self.key)
    }

    /// Parse a backend name produced by [`SecretIdentifier::path`]
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidIdentifier`] if the name does not have exactly
    /// three non-empty segments or any segment is invalid.
    pub fn from_path(path: &str) -> Result<Self, StoreError> {
        let invalid = |reason: &str| StoreError::InvalidIdentifier {
            input: path.to_string(),
            reason: reason.to_string(),
        };
        let rest = path
            .strip_prefix('/')
            .ok_or_else(|| invalid("backend name must start with '/'"))?;
        let parts: Vec<&str> = rest.split('/').collect();
        let [environment, service, key] = parts.as_slice() else {
            return Err(invalid("expected /<environment>/<service>/<key>"));
        };
        Self::new(environment.parse()?, *service, *key)
    }
}

pub(crate) fn validate_segment(segment: &str, value: &str) -> Result<(), StoreError> {
    if SEGMENT_RE.is_match(value) {
        return Ok(());
    }
    Err(StoreError::InvalidIdentifier {
        input: value.to_string(),
        reason: format!("{segment} must be non-empty and contain only [A-Za-z0-9_-]"),
    })
}

impl fmt::Display for SecretIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.environment, self.service, self.key)
    }
}

impl FromStr for SecretIdentifier {
    type Err = StoreError;

    /// Parse `<environment>.<service>.<key>`
    ///
    /// A key carrying an extra `.` fails segment validation instead of being
    /// silently truncated.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, '.');
        let (Some(environment), Some(service), Some(key)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(StoreError::InvalidIdentifier {
                input: s.to_string(),
                reason: "expected <environment>.<service>.<key>".to_string(),
            });
        };
        let environment = environment.parse().map_err(|_| StoreError::InvalidIdentifier {
            input: s.to_string(),
            reason: format!("invalid environment '{environment}'"),
        })?;
        Self::new(environment, service, key).map_err(|e| match e {
            StoreError::InvalidIdentifier { reason, .. } => StoreError::InvalidIdentifier {
                input: s.to_string(),
                reason,
            },
            other => other,
        })
    }
}

impl TryFrom<String> for SecretIdentifier {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SecretIdentifier> for String {
    fn from(id: SecretIdentifier) -> Self {
        id.to_string()
    }
}

impl Ord for SecretIdentifier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_string().cmp(&other.to_string())
    }
}

impl PartialOrd for SecretIdentifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Metadata for one version of a secret
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretMeta {
    pub created: DateTime<Utc>,
    /// Zero-based position in the identifier's history
    pub version: u64,
}

/// One immutable version of a secret
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret {
    pub data: String,
    pub meta: SecretMeta,
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret")
            .field("data", &"<redacted>")
            .field("meta", &self.meta)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(service: &str, key: &str) -> SecretIdentifier {
        SecretIdentifier::new(Environment::CITest, service, key).unwrap()
    }

    #[test]
    fn test_canonical_string_round_trip() {
        let id = SecretIdentifier::new(Environment::Production, "oauth", "client-secret").unwrap();
        assert_eq!(id.to_string(), "production.oauth.client-secret");
        assert_eq!("production.oauth.client-secret".parse::<SecretIdentifier>().unwrap(), id);
    }

    #[test]
    fn test_path_round_trip() {
        let id = id("svc", "foo_bar");
        assert_eq!(id.path(), "/ci-test/svc/foo_bar");
        assert_eq!(SecretIdentifier::from_path(&id.path()).unwrap(), id);
    }

    #[test]
    fn test_embedded_delimiter_in_key_is_rejected() {
        let err = "development.svc.foo.bar".parse::<SecretIdentifier>().unwrap_err();
        assert!(matches!(err, StoreError::InvalidIdentifier { .. }));
        assert!(SecretIdentifier::new(Environment::Development, "svc", "foo.bar").is_err());
        assert!(SecretIdentifier::new(Environment::Development, "svc", "foo/bar").is_err());
    }

    #[test]
    fn test_invalid_environment_is_rejected() {
        let err = "staging.svc.foo".parse::<SecretIdentifier>().unwrap_err();
        match err {
            StoreError::InvalidIdentifier { input, .. } => assert_eq!(input, "staging.svc.foo"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_segments_are_rejected() {
        assert!("production.svc".parse::<SecretIdentifier>().is_err());
        assert!("production..key".parse::<SecretIdentifier>().is_err());
        assert!(SecretIdentifier::from_path("/production/svc").is_err());
        assert!(SecretIdentifier::from_path("production/svc/key").is_err());
        assert!(SecretIdentifier::from_path("/production/svc/key/extra").is_err());
    }

    #[test]
    fn test_ordering_follows_canonical_string() {
        let mut ids = vec![
            SecretIdentifier::new(Environment::Production, "a", "k").unwrap(),
            id("b", "k"),
            id("a", "z"),
            SecretIdentifier::new(Environment::Development, "z", "k").unwrap(),
        ];
        ids.sort();
        let rendered: Vec<String> = ids.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec!["ci-test.a.z", "ci-test.b.k", "development.z.k", "production.a.k"]
        );
    }

    #[test]
    fn test_identifier_serializes_as_canonical_string() {
        let id = id("svc", "key");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"ci-test.svc.key\"");
        let back: SecretIdentifier = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<SecretIdentifier>("\"ci-test.svc.a.b\"").is_err());
    }

    #[test]
    fn test_secret_debug_redacts_data() {
        let secret = Secret {
            data: "hunter2".to_string(),
            meta: SecretMeta {
                created: Utc::now(),
                version: 0,
            },
        };
        assert!(!format!("{secret:?}").contains("hunter2"));
    }
}
