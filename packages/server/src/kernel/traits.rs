// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Business logic (what to embed, how to rank, what to prompt for) lives in
// domains/verification and uses these traits.
//
// Naming convention: Base* for trait names (e.g., BaseAI, BaseEmbeddingService)

use anyhow::Result;
use async_trait::async_trait;

use super::ServiceResult;
use crate::domains::verification::models::{EmbeddingTask, EvidenceItem};

// =============================================================================
// AI Trait (Infrastructure - Generic LLM capabilities)
// =============================================================================

#[async_trait]
pub trait BaseAI: Send + Sync {
    /// Complete a prompt with an LLM (returns raw text response)
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> ServiceResult<String>;

    /// Complete a prompt expecting a JSON response (returns raw JSON string)
    /// Parse with serde_json::from_str in calling code
    async fn complete_json(&self, system_prompt: &str, user_prompt: &str) -> ServiceResult<String> {
        // Default implementation calls complete
        self.complete(system_prompt, user_prompt).await
    }
}

// =============================================================================
// Embedding Service Trait (Infrastructure)
// =============================================================================

#[async_trait]
pub trait BaseEmbeddingService: Send + Sync {
    /// Generate the embedding for one text
    async fn generate(&self, text: &str, task: EmbeddingTask) -> ServiceResult<Vec<f32>>;
}

// =============================================================================
// Evidence Index Trait (Infrastructure - approximate nearest neighbors)
// =============================================================================

#[async_trait]
pub trait BaseEvidenceIndex: Send + Sync {
    /// Up to `k` neighbors of `vector`, most similar first.
    ///
    /// An index with no neighbors returns an empty vector, not an error.
    async fn find_neighbors(&self, vector: &[f32], k: usize) -> ServiceResult<Vec<EvidenceItem>>;
}

// =============================================================================
// Evidence Store Trait (Infrastructure - structured evidence rows)
// =============================================================================

#[async_trait]
pub trait BaseEvidenceStore: Send + Sync {
    /// Case-insensitive substring match on the evidence text, newest first.
    ///
    /// `needle` is matched literally; implementations escape any wildcard
    /// syntax of their query language.
    async fn search_text(
        &self,
        needle: &str,
        limit: usize,
        snippet_chars: usize,
    ) -> Result<Vec<EvidenceItem>>;

    /// Evidence rows for the given ids, in no particular order.
    async fn fetch_by_ids(&self, ids: &[String], snippet_chars: usize) -> Result<Vec<EvidenceItem>>;
}
