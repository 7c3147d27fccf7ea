//! Typed failures of the verification pipeline.

use thiserror::Error;

use crate::kernel::ServiceFailure;

/// Why a verification did not produce a result.
///
/// `SynthesisFailed` is absorbed by the orchestrator and only escapes from
/// direct calls to [`super::synthesize`].
#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("embedding failed for text {index}: {cause}")]
    EmbeddingFailed { index: usize, cause: ServiceFailure },

    #[error("evidence retrieval unavailable: {0}")]
    RetrievalUnavailable(ServiceFailure),

    #[error("verdict synthesis failed: {0}")]
    SynthesisFailed(ServiceFailure),
}

impl VerificationError {
    pub fn claim_required() -> Self {
        VerificationError::InvalidInput("claim is required".to_string())
    }

    /// Stable name used in logs and the `Failed(kind)` stage.
    pub fn kind(&self) -> ErrorKind {
        match self {
            VerificationError::InvalidInput(_) => ErrorKind::InvalidInput,
            VerificationError::EmbeddingFailed { .. } => ErrorKind::EmbeddingFailed,
            VerificationError::RetrievalUnavailable(_) => ErrorKind::RetrievalUnavailable,
            VerificationError::SynthesisFailed(_) => ErrorKind::SynthesisFailed,
        }
    }

    /// True when the underlying remote call ran out of time.
    pub fn is_timeout(&self) -> bool {
        match self {
            VerificationError::InvalidInput(_) => false,
            VerificationError::EmbeddingFailed { cause, .. }
            | VerificationError::RetrievalUnavailable(cause)
            | VerificationError::SynthesisFailed(cause) => cause.is_timeout(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    EmbeddingFailed,
    RetrievalUnavailable,
    SynthesisFailed,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::InvalidInput => write!(f, "invalid_input"),
            ErrorKind::EmbeddingFailed => write!(f, "embedding_failed"),
            ErrorKind::RetrievalUnavailable => write!(f, "retrieval_unavailable"),
            ErrorKind::SynthesisFailed => write!(f, "synthesis_failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn timeout_is_visible_through_stage_error() {
        let err = VerificationError::EmbeddingFailed {
            index: 2,
            cause: ServiceFailure::Timeout(Duration::from_secs(30)),
        };
        assert!(err.is_timeout());
        assert_eq!(err.kind(), ErrorKind::EmbeddingFailed);
        assert!(err.to_string().contains("text 2"));

        let err = VerificationError::RetrievalUnavailable(ServiceFailure::Remote("503".into()));
        assert!(!err.is_timeout());
        assert_eq!(err.kind().to_string(), "retrieval_unavailable");
    }

    #[test]
    fn claim_required_message() {
        assert_eq!(VerificationError::claim_required().to_string(), "claim is required");
    }
}
