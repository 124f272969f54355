//! Error types for Groupsmith.

use thiserror::Error;

/// Main error type for Groupsmith operations.
///
/// Infeasibility is deliberately *not* an error: an infeasible model surfaces
/// as a solve status plus a diagnosis report. Likewise an unsatisfiable
/// request (target outside the requester's partition) is recorded as a
/// warning on the request, never raised.
#[derive(Debug, Error)]
pub enum GroupsmithError {
    /// Malformed or out-of-range configuration. Fails fast, before model
    /// assembly.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Malformed constraint construction. A programmer error: fatal,
    /// surfaced immediately, never retried.
    #[error("Invalid model: {0}")]
    ModelInvalid(String),

    /// The external engine failed outright (not infeasibility).
    #[error("Engine error: {0}")]
    Engine(String),
}

/// Result type alias for Groupsmith operations.
pub type Result<T> = std::result::Result<T, GroupsmithError>;
