//! Generator trait for producing text completions from a prompt.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Category of a generation failure, set by the client adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationErrorKind {
    /// Rate limit or quota exhausted (HTTP 429).
    RateLimited,
    /// Bad request or the model is unavailable (HTTP 400/404).
    InvalidRequest,
    /// Anything the adapter could not classify, including client timeouts.
    Other,
}

impl GenerationErrorKind {
    /// Classify an HTTP status code returned by a generation endpoint.
    pub fn from_status(status: u16) -> Self {
        match status {
            429 => Self::RateLimited,
            400 | 404 => Self::InvalidRequest,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for GenerationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::RateLimited => "rate limited",
            Self::InvalidRequest => "invalid request",
            Self::Other => "other",
        };
        f.write_str(label)
    }
}

/// A structured generation failure.
#[derive(Debug, Clone, Error)]
#[error("Generation failed ({kind}): {message}")]
pub struct GenerationError {
    /// Failure category used by the resilience layer.
    pub kind: GenerationErrorKind,
    /// Provider-supplied detail, kept for logs only.
    pub message: String,
}

impl GenerationError {
    /// Create a new error of the given kind.
    pub fn new(kind: GenerationErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }
}

/// A text generation backend.
///
/// Implementations perform a single blocking request per call; they must not
/// retry internally beyond what their HTTP client does and must map failures
/// onto a [`GenerationErrorKind`].
///
/// # Example
///
/// ```rust,ignore
/// use webqa_rag::Generator;
///
/// let text = generator.generate("Summarise: ...").await?;
/// ```
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a completion for the given prompt.
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;

    /// Model identifier, for logging.
    fn model(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_http_statuses() {
        assert_eq!(GenerationErrorKind::from_status(429), GenerationErrorKind::RateLimited);
        assert_eq!(GenerationErrorKind::from_status(400), GenerationErrorKind::InvalidRequest);
        assert_eq!(GenerationErrorKind::from_status(404), GenerationErrorKind::InvalidRequest);
        assert_eq!(GenerationErrorKind::from_status(504), GenerationErrorKind::Other);
        assert_eq!(GenerationErrorKind::from_status(500), GenerationErrorKind::Other);
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&GenerationErrorKind::RateLimited).unwrap();
        assert_eq!(json, "\"rate_limited\"");
    }
}
