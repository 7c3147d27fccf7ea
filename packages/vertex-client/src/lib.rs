//! Pure Vertex AI REST API client
//!
//! A minimal client for the three Vertex AI calls the claim verifier needs,
//! with no domain-specific logic:
//!
//! - text embeddings (`:predict` on a Gemini embedding model)
//! - nearest neighbor queries against a deployed Vector Search index
//! - text generation (`:generateContent` on a Gemini model)
//!
//! Authentication is a bearer token supplied per call; acquiring and caching
//! tokens is the caller's concern.
//!
//! # Example
//!
//! ```rust,ignore
//! use vertex_client::{EmbeddingRequest, SecretString, TaskType, VertexClient};
//!
//! let client = VertexClient::new("us-central1-aiplatform.googleapis.com", "my-project", "us-central1")
//!     .with_timeout(std::time::Duration::from_secs(30))?;
//! let token = SecretString::new(access_token);
//!
//! let vector = client
//!     .embed(&token, EmbeddingRequest::new("gemini-embedding-001", "claim text", TaskType::RetrievalQuery))
//!     .await?;
//! ```

pub mod error;
pub mod secret;
pub mod types;

pub use error::{Result, VertexError};
pub use secret::SecretString;
pub use types::*;

use std::time::{Duration, Instant};

use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

/// Pure Vertex AI API client.
#[derive(Clone)]
pub struct VertexClient {
    http_client: Client,
    base_url: String,
    project_id: String,
    location: String,
    timeout: Option<Duration>,
}

impl VertexClient {
    /// Create a client for a regional API endpoint
    /// (e.g. "us-central1-aiplatform.googleapis.com").
    pub fn new(
        api_endpoint: impl AsRef<str>,
        project_id: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            http_client: Client::new(),
            base_url: format!("https://{}/v1", api_endpoint.as_ref()),
            project_id: project_id.into(),
            location: location.into(),
            timeout: None,
        }
    }

    /// Apply a per-request timeout to every call.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VertexError::Config(format!("Failed to build HTTP client: {}", e)))?;
        self.timeout = Some(timeout);
        Ok(self)
    }

    /// Set a custom base URL (for proxies and local emulators).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full resource name of a Google publisher model in this project/location.
    pub fn publisher_model(&self, model: &str) -> String {
        format!(
            "projects/{}/locations/{}/publishers/google/models/{}",
            self.project_id, self.location, model
        )
    }

    /// Embed a single text.
    pub async fn embed(&self, token: &SecretString, request: EmbeddingRequest) -> Result<Vec<f32>> {
        let start = Instant::now();
        let url = format!("{}/{}:predict", self.base_url, self.publisher_model(&request.model));

        let response = self.post_json(&url, token, &request.body()).await?;
        let values = decode_embedding(&response)?;

        debug!(
            model = %request.model,
            dimensions = values.len(),
            duration_ms = start.elapsed().as_millis(),
            "Vertex embedding"
        );

        Ok(values)
    }

    /// Query a deployed Vector Search index.
    ///
    /// `query_url` is the public endpoint's `...:findNeighbors` URL, which
    /// lives on its own domain rather than the regional API endpoint.
    pub async fn find_neighbors(
        &self,
        token: &SecretString,
        query_url: &str,
        request: &FindNeighborsRequest,
    ) -> Result<FindNeighborsResponse> {
        let start = Instant::now();
        let response = self.post_json(query_url, token, request).await?;

        let parsed: FindNeighborsResponse =
            serde_json::from_value(response).map_err(|e| VertexError::Parse(e.to_string()))?;

        debug!(
            deployed_index_id = %request.deployed_index_id,
            duration_ms = start.elapsed().as_millis(),
            "Vertex findNeighbors"
        );

        Ok(parsed)
    }

    /// Generate text and return the first candidate's first text part.
    pub async fn generate_content(
        &self,
        token: &SecretString,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<String> {
        let start = Instant::now();
        let url = format!("{}/{}:generateContent", self.base_url, self.publisher_model(model));

        let response = self.post_json(&url, token, request).await?;
        let text = decode_candidate_text(&response)?;

        debug!(
            model = model,
            response_length = text.len(),
            duration_ms = start.elapsed().as_millis(),
            "Vertex generateContent"
        );

        Ok(text)
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        url: &str,
        token: &SecretString,
        body: &B,
    ) -> Result<serde_json::Value> {
        let response = self
            .http_client
            .post(url)
            .bearer_auth(token.expose())
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "Vertex API error");
            return Err(VertexError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        response.json().await.map_err(|e| {
            if e.is_timeout() {
                self.map_send_error(e)
            } else {
                VertexError::Parse(e.to_string())
            }
        })
    }

    fn map_send_error(&self, e: reqwest::Error) -> VertexError {
        if e.is_timeout() {
            warn!(error = %e, "Vertex request timed out");
            VertexError::Timeout(self.timeout.unwrap_or_default())
        } else {
            warn!(error = %e, "Vertex request failed");
            VertexError::Network(e.to_string())
        }
    }
}
