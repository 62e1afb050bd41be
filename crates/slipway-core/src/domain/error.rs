//! Domain-level error taxonomy for slipway.

/// Slipway domain errors.
///
/// `Fetch` is deliberately distinct from an empty changed-file list: an empty
/// list means "no changes found", `Fetch` means "could not determine changes".
#[derive(Debug, thiserror::Error)]
pub enum SlipwayError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid comparison spec: {0}")]
    InvalidSpec(String),

    #[error("failed to determine changed files: {0}")]
    Fetch(String),

    #[error("command '{program}' failed to execute: {message}")]
    Exec { program: String, message: String },

    #[error("deploy failed for service '{service}': {message}")]
    Deploy { service: String, message: String },

    #[error("git error: {0}")]
    Git(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for slipway domain operations.
pub type Result<T> = std::result::Result<T, SlipwayError>;
