//! Error types for request validation and catalog loading.

use thiserror::Error;

/// Validation failures reported before any estimator runs.
///
/// None of these are transient: the caller has to fix the request and
/// resubmit it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EstimateError {
    /// Parameter count is missing, non-finite, zero or negative.
    #[error("invalid parameter count: {0} (must be a finite number greater than 0)")]
    InvalidParameterCount(f64),

    /// No slot references a GPU.
    #[error("no GPU selected: at least one slot must reference a GPU model")]
    NoGpuSelected,

    /// A populated slot has a non-positive GPU count.
    #[error("invalid GPU count {count} for slot {slot} ({gpu_key})")]
    InvalidGpuCount {
        /// Zero-based slot index.
        slot: usize,
        /// Catalog key of the slot.
        gpu_key: String,
        /// Offending count.
        count: i64,
    },

    /// A slot references a key that the catalog does not define.
    #[error("unknown GPU model '{0}'")]
    UnknownGpuKey(String),
}

/// Errors raised while building or loading a GPU catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Catalog file could not be read.
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    /// JSON catalog did not parse.
    #[error("invalid JSON catalog: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML catalog did not parse.
    #[error("invalid YAML catalog: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// An entry carries a non-positive or non-finite figure.
    #[error("invalid spec for '{key}': {reason}")]
    InvalidSpec {
        /// Catalog key of the entry.
        key: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Catalog has no entries.
    #[error("catalog is empty")]
    Empty,
}

/// Result alias for estimation calls.
pub type Result<T> = std::result::Result<T, EstimateError>;
