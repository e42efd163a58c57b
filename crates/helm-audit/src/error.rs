// error.rs — Error types for the audit subsystem.

use thiserror::Error;

use helm_store::StoreError;

/// Errors that can occur during audit operations.
///
/// A failed append is always surfaced — an operation whose event cannot be
/// recorded must fail rather than proceed unaudited.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The durability layer failed.
    #[error("audit storage error: {0}")]
    Storage(#[from] StoreError),

    /// An event record failed to serialize or deserialize.
    #[error("audit serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
