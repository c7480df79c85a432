//! Error taxonomy for the generation pipeline.
//!
//! Every failure is returned as a [`GenerationError`] value; nothing in the
//! pipeline panics or throws for control flow. The only local recovery is the
//! engine's single repair attempt, which is driven by
//! [`TransportError::is_repairable`].

use thiserror::Error;

/// Result alias used by the engine and resolver.
pub type Result<T> = std::result::Result<T, GenerationError>;

/// Errors surfaced to callers of the three public operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    /// Caller supplied a blank query or input.
    #[error("input is empty")]
    Empty,

    /// Deadline exceeded before the request completed.
    #[error("deadline exceeded")]
    Timeout,

    /// Caller cancelled the request.
    #[error("request cancelled")]
    Cancelled,

    /// Network, HTTP, or unparseable-response failure after the repair attempt.
    #[error("transport failure: {0}")]
    Transport(String),

    /// Provider refused the request on content-policy grounds.
    #[error("provider refused the request: {0}")]
    PolicyRefusal(String),

    /// The response parsed but did not conform to the schema.
    #[error("schema violation at {path}: expected {expected}")]
    SchemaInvalid { path: String, expected: String },

    /// A bug in the engine, never a user-facing condition.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GenerationError {
    /// Short machine-readable tag, handy for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::Empty => "empty",
            GenerationError::Timeout => "timeout",
            GenerationError::Cancelled => "cancelled",
            GenerationError::Transport(_) => "transport",
            GenerationError::PolicyRefusal(_) => "policy_refusal",
            GenerationError::SchemaInvalid { .. } => "schema_invalid",
            GenerationError::Internal(_) => "internal",
        }
    }
}

/// Errors a transport reports for a single provider call.
///
/// The variants are kept distinct so the engine can decide which ones earn a
/// repair attempt.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("content policy refusal: {0}")]
    PolicyRefusal(String),

    /// Provider-side strict mode rejected its own output.
    #[error("provider reported schema violation: {0}")]
    SchemaViolation(String),

    /// Body was not JSON, or not a JSON object.
    #[error("malformed response body: {0}")]
    Malformed(String),

    #[error("deadline exceeded")]
    Timeout,

    #[error("cancelled")]
    Cancelled,
}

impl TransportError {
    /// Whether the engine may spend its single repair attempt on this failure.
    pub fn is_repairable(&self) -> bool {
        matches!(
            self,
            TransportError::Network(_)
                | TransportError::Http { .. }
                | TransportError::SchemaViolation(_)
                | TransportError::Malformed(_)
        )
    }
}

impl From<TransportError> for GenerationError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout => GenerationError::Timeout,
            TransportError::Cancelled => GenerationError::Cancelled,
            TransportError::PolicyRefusal(reason) => GenerationError::PolicyRefusal(reason),
            TransportError::SchemaViolation(reason) => GenerationError::SchemaInvalid {
                path: "$".to_string(),
                expected: reason,
            },
            other => GenerationError::Transport(other.to_string()),
        }
    }
}
