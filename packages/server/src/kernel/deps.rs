//! Server dependencies for the verification pipeline (using traits for testability)
//!
//! Every external service sits behind a trait so tests can swap in the
//! mocks from `test_dependencies`.

use std::sync::Arc;

use crate::kernel::{BaseAI, BaseEmbeddingService, BaseEvidenceIndex, BaseEvidenceStore};

// =============================================================================
// ServerDeps
// =============================================================================

/// Server dependencies accessible to the verifier
#[derive(Clone)]
pub struct ServerDeps {
    /// LLM used by the verdict synthesizer
    pub ai: Arc<dyn BaseAI>,
    pub embedding_service: Arc<dyn BaseEmbeddingService>,
    pub evidence_index: Arc<dyn BaseEvidenceIndex>,
    /// Structured evidence rows; a no-op store when no database is configured
    pub evidence_store: Arc<dyn BaseEvidenceStore>,
}

impl ServerDeps {
    /// Create new ServerDeps with the given dependencies
    pub fn new(
        ai: Arc<dyn BaseAI>,
        embedding_service: Arc<dyn BaseEmbeddingService>,
        evidence_index: Arc<dyn BaseEvidenceIndex>,
        evidence_store: Arc<dyn BaseEvidenceStore>,
    ) -> Self {
        Self {
            ai,
            embedding_service,
            evidence_index,
            evidence_store,
        }
    }
}
