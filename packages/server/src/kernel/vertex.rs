// Vertex AI implementations of the kernel traits
//
// This is the infrastructure side only: request shaping, auth, and mapping
// wire types into domain types. What to embed, rank or prompt for lives in
// domains/verification.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use vertex_client::{
    EmbeddingRequest, FindNeighborsRequest, GenerateContentRequest, GenerationConfig, Neighbor,
    TaskType, VertexClient,
};

use super::credentials::CredentialProvider;
use super::{BaseAI, BaseEmbeddingService, BaseEvidenceIndex, ServiceResult};
use crate::domains::verification::models::{EmbeddingTask, EvidenceItem};

impl From<EmbeddingTask> for TaskType {
    fn from(task: EmbeddingTask) -> Self {
        match task {
            EmbeddingTask::Query => TaskType::RetrievalQuery,
            EmbeddingTask::Document => TaskType::RetrievalDocument,
        }
    }
}

// =============================================================================
// Embeddings
// =============================================================================

/// Gemini embedding model behind `:predict`
pub struct VertexEmbeddingService {
    client: VertexClient,
    credentials: Arc<dyn CredentialProvider>,
    model: String,
    dimensionality: u32,
}

impl VertexEmbeddingService {
    pub fn new(
        client: VertexClient,
        credentials: Arc<dyn CredentialProvider>,
        model: impl Into<String>,
        dimensionality: u32,
    ) -> Self {
        Self {
            client,
            credentials,
            model: model.into(),
            dimensionality,
        }
    }
}

#[async_trait]
impl BaseEmbeddingService for VertexEmbeddingService {
    async fn generate(&self, text: &str, task: EmbeddingTask) -> ServiceResult<Vec<f32>> {
        let token = self.credentials.acquire().await?;
        let request = EmbeddingRequest::new(&self.model, text, task.into())
            .output_dimensionality(self.dimensionality);

        Ok(self.client.embed(&token.token, request).await?)
    }
}

// =============================================================================
// Vector Search
// =============================================================================

/// Distance measure the index was built with.
///
/// Dot product and cosine report larger values for closer vectors; squared
/// L2 reports smaller ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DistanceMeasure {
    #[default]
    DotProduct,
    Cosine,
    SquaredL2,
}

impl DistanceMeasure {
    /// Similarity where higher always means closer
    pub fn similarity(self, distance: f64) -> f64 {
        match self {
            DistanceMeasure::DotProduct | DistanceMeasure::Cosine => distance,
            DistanceMeasure::SquaredL2 => 1.0 / (1.0 + distance.max(0.0)),
        }
    }
}

impl FromStr for DistanceMeasure {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DOT_PRODUCT_DISTANCE" | "DOT_PRODUCT" => Ok(DistanceMeasure::DotProduct),
            "COSINE_DISTANCE" | "COSINE" => Ok(DistanceMeasure::Cosine),
            "SQUARED_L2_DISTANCE" | "SQUARED_L2" => Ok(DistanceMeasure::SquaredL2),
            other => Err(format!("unknown distance measure: {}", other)),
        }
    }
}

/// Deployed Vector Search index queried through its public endpoint
pub struct VertexEvidenceIndex {
    client: VertexClient,
    credentials: Arc<dyn CredentialProvider>,
    query_url: String,
    deployed_index_id: String,
    distance_measure: DistanceMeasure,
}

impl VertexEvidenceIndex {
    pub fn new(
        client: VertexClient,
        credentials: Arc<dyn CredentialProvider>,
        query_url: impl Into<String>,
        deployed_index_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            credentials,
            query_url: query_url.into(),
            deployed_index_id: deployed_index_id.into(),
            distance_measure: DistanceMeasure::default(),
        }
    }

    pub fn with_distance_measure(mut self, measure: DistanceMeasure) -> Self {
        self.distance_measure = measure;
        self
    }
}

#[async_trait]
impl BaseEvidenceIndex for VertexEvidenceIndex {
    async fn find_neighbors(&self, vector: &[f32], k: usize) -> ServiceResult<Vec<EvidenceItem>> {
        let token = self.credentials.acquire().await?;
        let neighbor_count = u32::try_from(k).unwrap_or(u32::MAX);
        let request =
            FindNeighborsRequest::single(&self.deployed_index_id, vector.to_vec(), neighbor_count);

        let response = self
            .client
            .find_neighbors(&token.token, &self.query_url, &request)
            .await?;

        let items: Vec<EvidenceItem> = response
            .into_first_neighbors()
            .into_iter()
            .map(|n| neighbor_to_evidence(n, self.distance_measure))
            .collect();

        tracing::debug!(neighbors = items.len(), k, "Vector search complete");
        Ok(items)
    }
}

/// Map a neighbor to evidence using the metadata stored with the vector.
///
/// Keys follow the evidence export format (`text`, `description`, `source`,
/// `guid`, `publishedDate`) with a few common aliases. Neighbors without
/// metadata come back bare and are hydrated from the evidence store later.
/// The raw distance becomes a similarity score under `measure`.
pub fn neighbor_to_evidence(neighbor: Neighbor, measure: DistanceMeasure) -> EvidenceItem {
    let score = neighbor.distance.map(|d| measure.similarity(d));
    let mut item = EvidenceItem::bare(neighbor.datapoint.datapoint_id, score);

    let Some(meta) = neighbor.datapoint.embedding_metadata.as_ref() else {
        return item;
    };
    let field = |keys: &[&str]| -> Option<String> {
        keys.iter()
            .filter_map(|k| meta.get(*k).and_then(|v| v.as_str()))
            .map(str::trim)
            .find(|s| !s.is_empty())
            .map(str::to_string)
    };

    item.title = field(&["title", "text"]).unwrap_or_default();
    item.snippet = field(&["snippet", "description", "text"]).unwrap_or_default();
    item.url = field(&["url", "link", "source", "guid"])
        .filter(|u| u.starts_with("http://") || u.starts_with("https://"))
        .unwrap_or_default();
    item.source = field(&["publisher", "sourceName", "source_name"])
        .or_else(|| host_of(&item.url))
        .unwrap_or_default();
    item.published_at = field(&["publishedDate", "published_at", "publishedAt"])
        .as_deref()
        .and_then(parse_published);

    item
}

fn host_of(url: &str) -> Option<String> {
    let rest = url.split_once("://")?.1;
    let host = rest.split(['/', '?', '#']).next()?;
    let host = host.strip_prefix("www.").unwrap_or(host);
    (!host.is_empty()).then(|| host.to_string())
}

/// RFC 3339 or RFC 2822 (RSS `pubDate`) timestamps.
fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_rfc2822(raw))
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

// =============================================================================
// Gemini text generation
// =============================================================================

pub struct GeminiAI {
    client: VertexClient,
    credentials: Arc<dyn CredentialProvider>,
    model: String,
}

impl GeminiAI {
    pub fn new(
        client: VertexClient,
        credentials: Arc<dyn CredentialProvider>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            credentials,
            model: model.into(),
        }
    }

    async fn generate(&self, request: GenerateContentRequest) -> ServiceResult<String> {
        let token = self.credentials.acquire().await?;

        tracing::info!(model = %self.model, "Calling Gemini");
        let response = self
            .client
            .generate_content(&token.token, &self.model, &request)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, model = %self.model, "Gemini call failed");
                e
            })?;

        Ok(response)
    }
}

#[async_trait]
impl BaseAI for GeminiAI {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> ServiceResult<String> {
        let request = GenerateContentRequest::user(user_prompt)
            .system(system_prompt)
            .config(GenerationConfig {
                temperature: Some(0.0),
                ..Default::default()
            });
        self.generate(request).await
    }

    async fn complete_json(&self, system_prompt: &str, user_prompt: &str) -> ServiceResult<String> {
        let request = GenerateContentRequest::user(user_prompt)
            .system(system_prompt)
            .config(GenerationConfig {
                temperature: Some(0.0),
                response_mime_type: Some("application/json".to_string()),
                ..Default::default()
            });
        self.generate(request).await
    }
}
