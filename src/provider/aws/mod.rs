//! # AWS Providers
//!
//! Regional backends for AWS services.

pub mod parameter_store;

pub use parameter_store::ParameterStoreRegion;
