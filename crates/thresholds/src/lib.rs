//! Alert threshold configuration management.
//!
//! This crate provides:
//! - Update validation with per-field errors
//! - The [`ThresholdStore`] repository trait with in-memory, YAML-file, and
//!   PostgreSQL implementations
//! - [`ThresholdService`]: get/list with default fallback, partial upsert,
//!   batch update, and reset-to-default

pub mod error;
pub mod service;
pub mod store;
pub mod validation;

pub use error::{FieldError, ThresholdError};
pub use service::{BatchFailure, BatchOutcome, ThresholdService};
pub use store::{InMemoryThresholdStore, PgThresholdStore, ThresholdStore, YamlThresholdStore};
