use thiserror::Error;

/// Error taxonomy for the grounding core.
///
/// Everything here is fatal to the operation that produced it; no retries
/// happen anywhere in this crate. Non-strict validation violations are not
/// errors at all, they come back as a [`crate::validator::ValidationReport`].
#[derive(Debug, Error)]
pub enum Error {
    /// The similarity/embedding capability is misconfigured, e.g. the
    /// embedding dimensionality disagrees with the index.
    #[error("similarity backend misconfigured: {0}")]
    Configuration(String),

    /// Caller bug, e.g. mismatched chunk/embedding batch lengths.
    #[error("invalid input: {0}")]
    Input(String),

    /// A store directory is missing or incomplete.
    #[error("not found: {0}")]
    NotFound(String),

    /// Strict-mode citation validation failed; carries every aggregated
    /// violation message.
    #[error("citation validation failed: {}", messages.join("; "))]
    Validation { messages: Vec<String> },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
