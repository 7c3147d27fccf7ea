// TestDependencies - mock implementations for testing
//
// Provides mock services that can be injected into ServerDeps for tests.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::credentials::{AccessToken, CredentialError, CredentialProvider};
use super::{
    BaseAI, BaseEmbeddingService, BaseEvidenceIndex, BaseEvidenceStore, ServerDeps, ServiceFailure,
    ServiceResult,
};
use crate::domains::verification::models::{EmbeddingTask, EvidenceItem};

// =============================================================================
// Mock AI (Generic LLM capabilities)
// =============================================================================

pub struct MockAI {
    responses: Arc<Mutex<Vec<ServiceResult<String>>>>,
    calls: Arc<Mutex<Vec<String>>>,
    delay: Option<Duration>,
}

impl MockAI {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            delay: None,
        }
    }

    /// Add a text response to the queue
    pub fn with_response(self, response: impl Into<String>) -> Self {
        self.responses.lock().unwrap().push(Ok(response.into()));
        self
    }

    /// Add a verdict reply in the JSON shape the synthesizer asks for
    pub fn with_verdict(self, verdict: &str, explanation: &str) -> Self {
        let json = serde_json::json!({ "verdict": verdict, "explanation": explanation });
        self.with_response(json.to_string())
    }

    /// Queue a failure
    pub fn with_failure(self, failure: ServiceFailure) -> Self {
        self.responses.lock().unwrap().push(Err(failure));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Get all user prompts that were sent to the AI
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Get the last prompt sent to the AI
    pub fn last_prompt(&self) -> Option<String> {
        self.calls.lock().unwrap().last().cloned()
    }

    /// Check if a prompt containing the given text was sent
    pub fn was_called_with(&self, text: &str) -> bool {
        self.calls.lock().unwrap().iter().any(|p| p.contains(text))
    }

    /// Get the number of times the AI was called
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Default for MockAI {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseAI for MockAI {
    async fn complete(&self, _system_prompt: &str, user_prompt: &str) -> ServiceResult<String> {
        // Record the call
        self.calls.lock().unwrap().push(user_prompt.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let mut responses = self.responses.lock().unwrap();
        if !responses.is_empty() {
            responses.remove(0)
        } else {
            // Return default mock response
            Ok(r#"{"verdict":"unverifiable","explanation":"Mock AI response"}"#.to_string())
        }
    }
}

// =============================================================================
// Mock Embedding Service
// =============================================================================

pub struct MockEmbeddingService {
    // Returns a fixed embedding vector for all inputs by default
    fixed_embedding: Vec<f32>,
    // Texts containing a pattern fail with the paired failure
    failures: Arc<Mutex<Vec<(String, ServiceFailure)>>>,
    // Track all texts that embeddings were generated for
    calls: Arc<Mutex<Vec<(String, EmbeddingTask)>>>,
    delay: Option<Duration>,
}

impl MockEmbeddingService {
    pub fn new() -> Self {
        Self {
            // gemini-embedding-001 default dimensionality
            fixed_embedding: vec![0.1; 3072],
            failures: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            delay: None,
        }
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.fixed_embedding = embedding;
        self
    }

    pub fn with_dimension(self, dimension: usize) -> Self {
        self.with_embedding(vec![0.1; dimension])
    }

    /// Fail any text containing `pattern`
    pub fn with_failure_on(self, pattern: &str, failure: ServiceFailure) -> Self {
        self.failures
            .lock()
            .unwrap()
            .push((pattern.to_string(), failure));
        self
    }

    /// Fail every call
    pub fn failing(self, failure: ServiceFailure) -> Self {
        self.with_failure_on("", failure)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Get all texts that embeddings were generated for
    pub fn calls(&self) -> Vec<(String, EmbeddingTask)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Default for MockEmbeddingService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseEmbeddingService for MockEmbeddingService {
    async fn generate(&self, text: &str, task: EmbeddingTask) -> ServiceResult<Vec<f32>> {
        // Record the call
        self.calls.lock().unwrap().push((text.to_string(), task));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let failure = self
            .failures
            .lock()
            .unwrap()
            .iter()
            .find(|(pattern, _)| text.contains(pattern.as_str()))
            .map(|(_, failure)| failure.clone());
        if let Some(failure) = failure {
            return Err(failure);
        }

        // Distinct per text so order mix-ups show up in assertions
        let mut embedding = self.fixed_embedding.clone();
        if let Some(first) = embedding.first_mut() {
            *first = text.len() as f32;
        }
        Ok(embedding)
    }
}

// =============================================================================
// Mock Evidence Index
// =============================================================================

pub struct MockEvidenceIndex {
    neighbors: Arc<Mutex<Vec<EvidenceItem>>>,
    failure: Option<ServiceFailure>,
    calls: Arc<Mutex<Vec<usize>>>,
    delay: Option<Duration>,
}

impl MockEvidenceIndex {
    /// Index with no neighbors
    pub fn new() -> Self {
        Self {
            neighbors: Arc::new(Mutex::new(Vec::new())),
            failure: None,
            calls: Arc::new(Mutex::new(Vec::new())),
            delay: None,
        }
    }

    pub fn with_neighbors(self, neighbors: Vec<EvidenceItem>) -> Self {
        self.neighbors.lock().unwrap().extend(neighbors);
        self
    }

    pub fn with_failure(mut self, failure: ServiceFailure) -> Self {
        self.failure = Some(failure);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// `k` of every query
    pub fn calls(&self) -> Vec<usize> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Default for MockEvidenceIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseEvidenceIndex for MockEvidenceIndex {
    async fn find_neighbors(&self, _vector: &[f32], k: usize) -> ServiceResult<Vec<EvidenceItem>> {
        self.calls.lock().unwrap().push(k);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }

        Ok(self.neighbors.lock().unwrap().iter().take(k).cloned().collect())
    }
}

// =============================================================================
// Mock Evidence Store
// =============================================================================

pub struct MockEvidenceStore {
    search_rows: Arc<Mutex<Vec<EvidenceItem>>>,
    stored: Arc<Mutex<Vec<EvidenceItem>>>,
    failure: Option<String>,
    search_calls: Arc<Mutex<Vec<(String, usize)>>>,
    fetch_calls: Arc<Mutex<Vec<Vec<String>>>>,
}

impl MockEvidenceStore {
    pub fn new() -> Self {
        Self {
            search_rows: Arc::new(Mutex::new(Vec::new())),
            stored: Arc::new(Mutex::new(Vec::new())),
            failure: None,
            search_calls: Arc::new(Mutex::new(Vec::new())),
            fetch_calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Rows returned by every text search
    pub fn with_search_rows(self, rows: Vec<EvidenceItem>) -> Self {
        self.search_rows.lock().unwrap().extend(rows);
        self
    }

    /// Rows available for lookup by id
    pub fn with_stored(self, rows: Vec<EvidenceItem>) -> Self {
        self.stored.lock().unwrap().extend(rows);
        self
    }

    /// Make every query fail
    pub fn with_failure(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    /// (needle, limit) of every text search
    pub fn search_calls(&self) -> Vec<(String, usize)> {
        self.search_calls.lock().unwrap().clone()
    }

    pub fn fetch_calls(&self) -> Vec<Vec<String>> {
        self.fetch_calls.lock().unwrap().clone()
    }
}

impl Default for MockEvidenceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseEvidenceStore for MockEvidenceStore {
    async fn search_text(
        &self,
        needle: &str,
        limit: usize,
        _snippet_chars: usize,
    ) -> Result<Vec<EvidenceItem>> {
        self.search_calls
            .lock()
            .unwrap()
            .push((needle.to_string(), limit));

        if let Some(message) = &self.failure {
            anyhow::bail!("{}", message);
        }
        Ok(self.search_rows.lock().unwrap().iter().take(limit).cloned().collect())
    }

    async fn fetch_by_ids(&self, ids: &[String], _snippet_chars: usize) -> Result<Vec<EvidenceItem>> {
        self.fetch_calls.lock().unwrap().push(ids.to_vec());

        if let Some(message) = &self.failure {
            anyhow::bail!("{}", message);
        }
        Ok(self
            .stored
            .lock()
            .unwrap()
            .iter()
            .filter(|row| ids.contains(&row.id))
            .cloned()
            .collect())
    }
}

// =============================================================================
// Mock Credential Provider
// =============================================================================

pub struct MockCredentialProvider {
    results: Arc<Mutex<Vec<Result<AccessToken, CredentialError>>>>,
    calls: Arc<Mutex<usize>>,
    delay: Option<Duration>,
}

impl MockCredentialProvider {
    pub fn new() -> Self {
        Self {
            results: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(0)),
            delay: None,
        }
    }

    /// Queue a token; the last queued result repeats once the queue drains
    pub fn with_token(self, token: &str, expires_at: DateTime<Utc>) -> Self {
        self.results
            .lock()
            .unwrap()
            .push(Ok(AccessToken::new(token, expires_at)));
        self
    }

    pub fn with_failure(self, message: &str) -> Self {
        self.results
            .lock()
            .unwrap()
            .push(Err(CredentialError::Command(message.to_string())));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl Default for MockCredentialProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialProvider for MockCredentialProvider {
    async fn acquire(&self) -> Result<AccessToken, CredentialError> {
        *self.calls.lock().unwrap() += 1;

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let mut results = self.results.lock().unwrap();
        match results.len() {
            0 => Ok(AccessToken::new("mock-token", Utc::now() + chrono::Duration::hours(1))),
            1 => results[0].clone(),
            _ => results.remove(0),
        }
    }
}

// =============================================================================
// TestDependencies
// =============================================================================

/// Mocks wired into a `ServerDeps`, with handles kept for assertions
pub struct TestDependencies {
    pub ai: Arc<MockAI>,
    pub embedding_service: Arc<MockEmbeddingService>,
    pub evidence_index: Arc<MockEvidenceIndex>,
    pub evidence_store: Arc<MockEvidenceStore>,
}

impl TestDependencies {
    pub fn new() -> Self {
        Self {
            ai: Arc::new(MockAI::new()),
            embedding_service: Arc::new(MockEmbeddingService::new()),
            evidence_index: Arc::new(MockEvidenceIndex::new()),
            evidence_store: Arc::new(MockEvidenceStore::new()),
        }
    }

    pub fn mock_ai(mut self, ai: MockAI) -> Self {
        self.ai = Arc::new(ai);
        self
    }

    pub fn mock_embeddings(mut self, embeddings: MockEmbeddingService) -> Self {
        self.embedding_service = Arc::new(embeddings);
        self
    }

    pub fn mock_index(mut self, index: MockEvidenceIndex) -> Self {
        self.evidence_index = Arc::new(index);
        self
    }

    pub fn mock_store(mut self, store: MockEvidenceStore) -> Self {
        self.evidence_store = Arc::new(store);
        self
    }

    pub fn into_server_deps(&self) -> ServerDeps {
        ServerDeps::new(
            self.ai.clone(),
            self.embedding_service.clone(),
            self.evidence_index.clone(),
            self.evidence_store.clone(),
        )
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}
