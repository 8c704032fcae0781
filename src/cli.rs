//! # REGCTL CLI
//!
//! Command-line interface for the multi-region secret store.
//!
//! ## Usage
//!
//! ```bash
//! # Create a secret in every configured region
//! regctl create production.billing.db-password --value hunter2
//!
//! # Read the latest version, or a specific one
//! regctl read production.billing.db-password
//! regctl read production.billing.db-password --version 0
//!
//! # List a service, or a whole environment
//! regctl list --environment production --service billing
//!
//! # Find every secret sharing a value, optionally rewriting them all
//! regctl dupes production.billing.db-password
//! regctl dupes production.billing.db-password --update-with n3w-value
//! ```
//!
//! Region layout and timings come from `SECRET_STORE_*` environment variables.

use crate::constants::DEFAULT_UTIL_READ_DELAY_MS;
use crate::model::{Environment, SecretIdentifier};
use crate::store::SecretStore;
use crate::util;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("BUILD_GIT_HASH"),
    ", built ",
    env!("BUILD_DATETIME"),
    ")"
);

/// Multi-region secret store CLI
#[derive(Debug, Parser)]
#[command(name = "regctl")]
#[command(
    about = "Manage secrets replicated across regions",
    long_about = None,
    version,
    long_version = LONG_VERSION,
    after_help = "\
Identifiers use the form <environment>.<service>.<key>, for example:
  regctl read production.billing.db-password
  regctl update ci-test.api.token --value-file token.txt
"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Print Prometheus metrics to stderr after the command
    #[arg(long, global = true)]
    pub metrics: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create a secret in every region
    Create {
        #[arg(value_name = "ID")]
        id: SecretIdentifier,

        #[command(flatten)]
        value: ValueSource,
    },
    /// Print a secret's value
    Read {
        #[arg(value_name = "ID")]
        id: SecretIdentifier,

        /// Zero-based version to read instead of the latest
        #[arg(long, allow_hyphen_values = true)]
        version: Option<i64>,
    },
    /// Append a new version to an existing secret
    Update {
        #[arg(value_name = "ID")]
        id: SecretIdentifier,

        #[command(flatten)]
        value: ValueSource,
    },
    /// Delete every version of a secret from every region
    Delete {
        #[arg(value_name = "ID")]
        id: SecretIdentifier,
    },
    /// List identifiers of an environment, optionally of one service
    List {
        #[arg(short, long, value_enum)]
        environment: EnvironmentArg,

        #[arg(short, long)]
        service: Option<String>,
    },
    /// Show the version history of a secret
    History {
        #[arg(value_name = "ID")]
        id: SecretIdentifier,
    },
    /// List every secret holding the same value as ID
    Dupes {
        #[arg(value_name = "ID")]
        id: SecretIdentifier,

        /// Environments to scan (repeatable); defaults to all
        #[arg(short, long = "environment", value_enum)]
        environments: Vec<EnvironmentArg>,

        /// Update every duplicate found, ID included, to this value
        #[arg(long, value_name = "VALUE")]
        update_with: Option<String>,
    },
    /// Group secrets by shared value
    Groups {
        /// Environments to scan (repeatable); defaults to all
        #[arg(short, long = "environment", value_enum)]
        environments: Vec<EnvironmentArg>,

        /// JSON array of identifiers whose values seed the groups
        #[arg(long, value_name = "PATH")]
        groups_file: Option<PathBuf>,
    },
}

/// Environments accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EnvironmentArg {
    #[value(name = "production", alias = "prod")]
    Production,
    #[value(name = "development", alias = "dev")]
    Development,
    #[value(name = "ci-test", alias = "ci")]
    CITest,
}

impl From<EnvironmentArg> for Environment {
    fn from(arg: EnvironmentArg) -> Self {
        match arg {
            EnvironmentArg::Production => Environment::Production,
            EnvironmentArg::Development => Environment::Development,
            EnvironmentArg::CITest => Environment::CITest,
        }
    }
}

/// Secret value given inline or read from a file
#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct ValueSource {
    /// Secret value
    #[arg(long)]
    value: Option<String>,

    /// File whose exact contents are the secret value
    #[arg(long, value_name = "PATH")]
    value_file: Option<PathBuf>,
}

impl ValueSource {
    async fn resolve(self) -> Result<String> {
        match (self.value, self.value_file) {
            (Some(value), _) => Ok(value),
            (None, Some(path)) => tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read value file {}", path.display())),
            (None, None) => anyhow::bail!("either --value or --value-file is required"),
        }
    }
}

fn environments(args: &[EnvironmentArg]) -> Vec<Environment> {
    if args.is_empty() {
        return Environment::ALL.to_vec();
    }
    let mut environments: Vec<Environment> = Vec::with_capacity(args.len());
    for environment in args.iter().copied().map(Environment::from) {
        if !environments.contains(&environment) {
            environments.push(environment);
        }
    }
    environments
}

/// Run one command against `store`, writing results to `out`
///
/// # Errors
///
/// Returns the store error with context, or an I/O error writing `out`.
pub async fn execute<S, W>(store: &S, command: Commands, out: &mut W) -> Result<()>
where
    S: SecretStore + ?Sized,
    W: Write,
{
    let read_delay = Duration::from_millis(DEFAULT_UTIL_READ_DELAY_MS);
    match command {
        Commands::Create { id, value } => {
            let value = value.resolve().await?;
            store
                .create(&id, &value)
                .await
                .with_context(|| format!("Failed to create {id}"))?;
            writeln!(out, "created {id}")?;
        }
        Commands::Read { id, version } => {
            let secret = match version {
                Some(version) => store.read_version(&id, version).await,
                None => store.read(&id).await,
            }
            .with_context(|| format!("Failed to read {id}"))?;
            writeln!(out, "{}", secret.data)?;
        }
        Commands::Update { id, value } => {
            let value = value.resolve().await?;
            let secret = store
                .update(&id, &value)
                .await
                .with_context(|| format!("Failed to update {id}"))?;
            writeln!(out, "updated {id} to version {}", secret.meta.version)?;
        }
        Commands::Delete { id } => {
            store
                .delete(&id)
                .await
                .with_context(|| format!("Failed to delete {id}"))?;
            writeln!(out, "deleted {id}")?;
        }
        Commands::List {
            environment,
            service,
        } => {
            let environment = Environment::from(environment);
            let ids = match service.as_deref() {
                Some(service) => store.list(environment, service).await,
                None => store.list_all(environment).await,
            }
            .with_context(|| format!("Failed to list {environment}"))?;
            for id in ids {
                writeln!(out, "{id}")?;
            }
        }
        Commands::History { id } => {
            let history = store
                .history(&id)
                .await
                .with_context(|| format!("Failed to load history of {id}"))?;
            for meta in history {
                writeln!(out, "{}\t{}", meta.version, meta.created.to_rfc3339())?;
            }
        }
        Commands::Dupes {
            id,
            environments: args,
            update_with,
        } => {
            let dupes = util::find_dupes(store, &id, &environments(&args), read_delay)
                .await
                .with_context(|| format!("Failed to find duplicates of {id}"))?;
            let Some(value) = update_with else {
                for dupe in dupes {
                    writeln!(out, "{dupe}")?;
                }
                return Ok(());
            };

            let report = util::replace_dupes(store, &dupes, &value, read_delay).await;
            for (dupe, version) in &report.updated {
                writeln!(out, "updated {dupe} to version {version}")?;
            }
            for (dupe, error) in &report.errors {
                writeln!(out, "error: {dupe}: {error}")?;
            }
            if !report.errors.is_empty() {
                anyhow::bail!(
                    "failed to update {} of {} duplicates",
                    report.errors.len(),
                    dupes.len()
                );
            }
        }
        Commands::Groups {
            environments: args,
            groups_file,
        } => {
            let environments = environments(&args);
            let report = match groups_file {
                Some(path) => {
                    util::find_groups_from_file(store, &environments, &path, read_delay).await?
                }
                None => util::find_groups(store, &environments, None, read_delay).await,
            };
            for group in &report.groups {
                let members: Vec<String> = group.iter().map(ToString::to_string).collect();
                writeln!(out, "{}", members.join(" "))?;
            }
            for error in &report.errors {
                writeln!(out, "error: {error}")?;
            }
        }
    }
    Ok(())
}
