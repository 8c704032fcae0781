//! # AWS Parameter Store Region
//!
//! Regional backend backed by AWS Systems Manager Parameter Store.
//!
//! Secrets are written as `SecureString` parameters named by the identifier
//! path (`/production/oauth/client-secret`). Parameter Store numbers versions
//! from 1, which is what [`RegionalBackend::version_base`] reports.
//!
//! Authentication, encryption, and access control are left entirely to the
//! AWS SDK default credential chain and the account's KMS/IAM setup.

use crate::error::BackendError;
use crate::provider::{ListPage, RegionalBackend, RegionalValue, VersionRecord};
use async_trait::async_trait;
use aws_sdk_ssm::error::{DisplayErrorContext, SdkError};
use aws_sdk_ssm::primitives::DateTime as SsmDateTime;
use aws_sdk_ssm::types::{ParameterStringFilter, ParameterType};
use aws_sdk_ssm::Client as SsmClient;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

/// Parameter Store rejects `MaxResults` above this for history and describe calls
const MAX_PAGE_SIZE: u32 = 50;

/// Parameter Store adapter for one AWS region
#[derive(Clone)]
pub struct ParameterStoreRegion {
    client: SsmClient,
    region: String,
    kms_key_id: Option<String>,
}

impl std::fmt::Debug for ParameterStoreRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParameterStoreRegion")
            .field("region", &self.region)
            .field("kms_key_id", &self.kms_key_id)
            .finish_non_exhaustive()
    }
}

impl ParameterStoreRegion {
    /// Connect to Parameter Store in `region` using the default credential chain
    pub async fn connect(region: &str) -> Self {
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.to_string()))
            .load()
            .await;
        info!("Connected Parameter Store client for region {}", region);
        Self::from_client(SsmClient::new(&sdk_config), region)
    }

    /// Connect to every region, preserving order
    pub async fn connect_all(regions: &[String]) -> Vec<Self> {
        futures::future::join_all(regions.iter().map(|region| Self::connect(region))).await
    }

    /// Wrap an already configured client
    #[must_use]
    pub fn from_client(client: SsmClient, region: impl Into<String>) -> Self {
        Self {
            client,
            region: region.into(),
            kms_key_id: None,
        }
    }

    /// Encrypt new versions with a specific KMS key instead of the account default
    #[must_use]
    pub fn with_kms_key_id(mut self, key_id: impl Into<String>) -> Self {
        self.kms_key_id = Some(key_id.into());
        self
    }
}

/// Path filter value for a listing prefix: `/production/oauth/` -> `/production/oauth`
fn path_filter_value(prefix: &str) -> &str {
    let trimmed = prefix.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}

/// Parameter Store versions are positive; anything else is corrupt data
fn native_version(name: &str, version: i64) -> Result<u64, BackendError> {
    u64::try_from(version)
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| BackendError::MalformedVersion {
            name: name.to_string(),
            detail: format!("parameter store returned version {version}"),
        })
}

fn to_utc(timestamp: Option<&SsmDateTime>) -> DateTime<Utc> {
    timestamp
        .and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos()))
        .unwrap_or_default()
}

fn service_error<E, R>(err: &SdkError<E, R>) -> BackendError
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    BackendError::Service(DisplayErrorContext(err).to_string())
}

#[async_trait]
impl RegionalBackend for ParameterStoreRegion {
    fn region(&self) -> &str {
        &self.region
    }

    async fn put(&self, name: &str, value: &str, overwrite: bool) -> Result<u64, BackendError> {
        debug!(region = %self.region, name, overwrite, "PutParameter");
        match self
            .client
            .put_parameter()
            .name(name)
            .value(value)
            .r#type(ParameterType::SecureString)
            .set_key_id(self.kms_key_id.clone())
            .overwrite(overwrite)
            .send()
            .await
        {
            Ok(output) => native_version(name, output.version()),
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_parameter_already_exists()) =>
            {
                Err(BackendError::AlreadyExists {
                    name: name.to_string(),
                })
            }
            Err(e) => Err(service_error(&e)),
        }
    }

    async fn get(&self, name: &str, version: Option<u64>) -> Result<RegionalValue, BackendError> {
        // A specific version is selected with the `name:version` form
        let selector = match version {
            Some(v) => format!("{name}:{v}"),
            None => name.to_string(),
        };
        debug!(region = %self.region, selector, "GetParameter");
        let output = match self
            .client
            .get_parameter()
            .name(&selector)
            .with_decryption(true)
            .send()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                return Err(match e.as_service_error() {
                    Some(se) if se.is_parameter_not_found() => BackendError::NotFound {
                        name: name.to_string(),
                    },
                    Some(se) if se.is_parameter_version_not_found() => {
                        BackendError::VersionNotFound {
                            name: name.to_string(),
                            version: version.unwrap_or_default(),
                        }
                    }
                    _ => service_error(&e),
                });
            }
        };

        let parameter = output.parameter().ok_or_else(|| {
            BackendError::Service(format!("GetParameter returned no parameter for {name}"))
        })?;
        Ok(RegionalValue {
            value: parameter.value().unwrap_or_default().to_string(),
            version: native_version(name, parameter.version())?,
            created: to_utc(parameter.last_modified_date()),
        })
    }

    async fn delete(&self, name: &str) -> Result<(), BackendError> {
        debug!(region = %self.region, name, "DeleteParameter");
        match self.client.delete_parameter().name(name).send().await {
            Ok(_) => Ok(()),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_parameter_not_found()) => {
                Err(BackendError::NotFound {
                    name: name.to_string(),
                })
            }
            Err(e) => Err(service_error(&e)),
        }
    }

    async fn list_by_prefix(
        &self,
        prefix: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<ListPage, BackendError> {
        let filter = ParameterStringFilter::builder()
            .key("Path")
            .option("Recursive")
            .values(path_filter_value(prefix))
            .build()
            .map_err(|e| BackendError::InvalidRequest(e.to_string()))?;
        let max_results = i32::try_from(page_size.clamp(1, MAX_PAGE_SIZE)).unwrap_or(50);

        debug!(region = %self.region, prefix, page_size, "DescribeParameters");
        let output = self
            .client
            .describe_parameters()
            .parameter_filters(filter)
            .max_results(max_results)
            .set_next_token(page_token.map(ToString::to_string))
            .send()
            .await
            .map_err(|e| service_error(&e))?;

        let names = output
            .parameters()
            .iter()
            .filter_map(|p| p.name())
            .filter(|name| name.starts_with(prefix))
            .map(ToString::to_string)
            .collect();
        let next_token = output
            .next_token()
            .filter(|t| !t.is_empty())
            .map(ToString::to_string);
        Ok(ListPage { names, next_token })
    }

    async fn history(&self, name: &str) -> Result<Vec<VersionRecord>, BackendError> {
        let mut records = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            debug!(region = %self.region, name, "GetParameterHistory");
            let output = match self
                .client
                .get_parameter_history()
                .name(name)
                .with_decryption(false)
                .max_results(i32::try_from(MAX_PAGE_SIZE).unwrap_or(50))
                .set_next_token(next_token.take())
                .send()
                .await
            {
                Ok(output) => output,
                Err(e) if e.as_service_error().is_some_and(|se| se.is_parameter_not_found()) => {
                    return Err(BackendError::NotFound {
                        name: name.to_string(),
                    });
                }
                Err(e) => return Err(service_error(&e)),
            };

            for entry in output.parameters() {
                records.push(VersionRecord {
                    version: native_version(name, entry.version())?,
                    created: to_utc(entry.last_modified_date()),
                });
            }

            match output.next_token().filter(|t| !t.is_empty()) {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_filter_value_strips_trailing_delimiter() {
        assert_eq!(path_filter_value("/production/oauth/"), "/production/oauth");
        assert_eq!(path_filter_value("/production/"), "/production");
        assert_eq!(path_filter_value("/"), "/");
    }

    #[test]
    fn test_native_version_rejects_non_positive_values() {
        assert_eq!(native_version("/p/s/k", 3), Ok(3));
        assert!(matches!(
            native_version("/p/s/k", 0),
            Err(BackendError::MalformedVersion { .. })
        ));
        assert!(matches!(
            native_version("/p/s/k", -1),
            Err(BackendError::MalformedVersion { .. })
        ));
    }

    #[test]
    fn test_to_utc_converts_sdk_timestamps() {
        let ts = SsmDateTime::from_secs(1_700_000_000);
        assert_eq!(to_utc(Some(&ts)).timestamp(), 1_700_000_000);
        assert_eq!(to_utc(None).timestamp(), 0);
    }
}
