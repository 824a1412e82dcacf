//! Error types for fixture loading.

use thiserror::Error;

/// Errors loading store fixtures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Fixture file could not be read
    #[error("fixture I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Fixture JSON did not parse
    #[error("fixture parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Fixture contents failed validation
    #[error("fixture validation error: {0}")]
    Invalid(#[from] epimap_core::GeoError),
}
