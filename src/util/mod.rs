//! # Secret Utilities
//!
//! Store-wide scans that find secrets sharing a value. They only use the
//! public [`SecretStore`](crate::store::SecretStore) contract, so they work
//! against any store implementation.
//!
//! Both scans read every listed secret one by one and pause between reads to
//! stay under backend rate limits.
//!
//! [`replace_dupes`] rewrites the duplicates a scan found with a new value.

mod dupes;
mod groups;

pub use dupes::{find_dupes, replace_dupes, ReplaceReport};
pub use groups::{find_groups, find_groups_from_file, GroupReport};
