//! Claim verification: embed the claim, retrieve evidence, score it and
//! synthesize a verdict grounded in that evidence.

pub mod aggregate;
pub mod embedding;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod retrieval;
pub mod scoring;
pub mod synthesis;

use std::time::Duration;

pub use aggregate::aggregate;
pub use embedding::embed;
pub use error::{ErrorKind, VerificationError};
pub use models::{
    Claim, EmbeddingTask, EmbeddingVector, EvidenceItem, EvidenceSet, ScoreSignal, Verdict,
    VerdictCategory, VerificationResult,
};
pub use orchestrator::{ClaimVerifier, Stage};
pub use retrieval::{query_index, search_by_keyword};
pub use scoring::score;
pub use synthesis::synthesize;

/// Immutable pipeline settings, built once from `Config` at startup.
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// Expected length of every embedding vector
    pub embedding_dimensionality: usize,
    /// Embedding calls in flight per request (1 = sequential)
    pub embedding_concurrency: usize,
    pub neighbor_count: usize,
    pub fallback_limit: usize,
    pub max_evidence: usize,
    pub snippet_chars: usize,
    /// Budget for every outbound call
    pub stage_timeout: Duration,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            embedding_dimensionality: 3072,
            embedding_concurrency: 1,
            neighbor_count: 10,
            fallback_limit: 5,
            max_evidence: 10,
            snippet_chars: 300,
            stage_timeout: Duration::from_secs(30),
        }
    }
}
