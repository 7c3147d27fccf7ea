//! Vertex AI request and response types.

use serde::{Deserialize, Serialize};

use crate::error::{Result, VertexError};

// =============================================================================
// Embeddings (publishers/google/models/{model}:predict)
// =============================================================================

/// Embedding task type understood by the Gemini embedding models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    RetrievalQuery,
    RetrievalDocument,
    SemanticSimilarity,
}

/// Embedding request for a single text.
///
/// Gemini embedding models accept one instance per call.
#[derive(Debug, Clone)]
pub struct EmbeddingRequest {
    /// Publisher model id (e.g. "gemini-embedding-001")
    pub model: String,

    /// Text to embed
    pub content: String,

    pub task_type: TaskType,

    /// Requested vector length; `None` keeps the model default
    pub output_dimensionality: Option<u32>,
}

impl EmbeddingRequest {
    pub fn new(model: impl Into<String>, content: impl Into<String>, task_type: TaskType) -> Self {
        Self {
            model: model.into(),
            content: content.into(),
            task_type,
            output_dimensionality: None,
        }
    }

    pub fn output_dimensionality(mut self, dimensionality: u32) -> Self {
        self.output_dimensionality = Some(dimensionality).filter(|d| *d > 0);
        self
    }

    pub(crate) fn body(&self) -> PredictBody<'_> {
        PredictBody {
            instances: [EmbeddingInstance {
                content: &self.content,
                task_type: self.task_type,
            }],
            parameters: EmbeddingParameters {
                output_dimensionality: self.output_dimensionality,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct PredictBody<'a> {
    instances: [EmbeddingInstance<'a>; 1],
    parameters: EmbeddingParameters,
}

#[derive(Debug, Serialize)]
struct EmbeddingInstance<'a> {
    content: &'a str,
    task_type: TaskType,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbeddingParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    output_dimensionality: Option<u32>,
}

/// Decode the vector out of a `:predict` response.
///
/// Only `predictions[0].embeddings.values` is read; the rest of the
/// payload (statistics, truncation flags) is ignored.
pub fn decode_embedding(response: &serde_json::Value) -> Result<Vec<f32>> {
    let values = response
        .pointer("/predictions/0/embeddings/values")
        .and_then(|v| v.as_array())
        .ok_or_else(|| VertexError::Parse("missing predictions[0].embeddings.values".into()))?;

    values
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|n| n as f32)
                .ok_or_else(|| VertexError::Parse(format!("non-numeric embedding value: {}", v)))
        })
        .collect()
}

// =============================================================================
// Vector Search (indexEndpoints/{id}:findNeighbors)
// =============================================================================

/// Nearest neighbor query against a deployed index.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FindNeighborsRequest {
    pub deployed_index_id: String,
    pub queries: Vec<NeighborQuery>,
    pub return_full_datapoint: bool,
}

impl FindNeighborsRequest {
    /// Single-query request, the only shape this client issues.
    pub fn single(
        deployed_index_id: impl Into<String>,
        feature_vector: Vec<f32>,
        neighbor_count: u32,
    ) -> Self {
        Self {
            deployed_index_id: deployed_index_id.into(),
            queries: vec![NeighborQuery {
                datapoint: QueryDatapoint { feature_vector },
                neighbor_count,
            }],
            return_full_datapoint: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NeighborQuery {
    pub datapoint: QueryDatapoint,
    pub neighbor_count: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryDatapoint {
    pub feature_vector: Vec<f32>,
}

/// `findNeighbors` response. Vertex omits empty arrays, so every list
/// defaults to empty.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindNeighborsResponse {
    #[serde(default)]
    pub nearest_neighbors: Vec<NearestNeighbors>,
}

impl FindNeighborsResponse {
    /// Neighbors of the first (only) query, in the order the index returned them.
    pub fn into_first_neighbors(self) -> Vec<Neighbor> {
        self.nearest_neighbors
            .into_iter()
            .next()
            .map(|n| n.neighbors)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearestNeighbors {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub neighbors: Vec<Neighbor>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Neighbor {
    pub datapoint: IndexDatapoint,
    #[serde(default)]
    pub distance: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDatapoint {
    pub datapoint_id: String,

    /// Free-form metadata stored alongside the vector at upsert time
    #[serde(default)]
    pub embedding_metadata: Option<serde_json::Value>,

    #[serde(default)]
    pub crowding_tag: Option<CrowdingTag>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrowdingTag {
    #[serde(default)]
    pub crowding_attribute: Option<String>,
}

// =============================================================================
// Content generation (publishers/google/models/{model}:generateContent)
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

impl GenerateContentRequest {
    /// Single user turn.
    pub fn user(prompt: impl Into<String>) -> Self {
        Self {
            contents: vec![Content::user(prompt)],
            system_instruction: None,
            generation_config: None,
        }
    }

    pub fn system(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(Content {
            role: None,
            parts: vec![Part::text(instruction)],
        });
        self
    }

    pub fn config(mut self, config: GenerationConfig) -> Self {
        self.generation_config = Some(config);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Some("user".to_string()),
            parts: vec![Part::text(text)],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,

    /// "application/json" asks the model for a bare JSON reply
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
}

/// Decode the first text part of the first candidate.
pub fn decode_candidate_text(response: &serde_json::Value) -> Result<String> {
    response
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| VertexError::Parse("missing candidates[0].content.parts[0].text".into()))
}

// =============================================================================
// Utilities
// =============================================================================

/// Strip markdown code fences from a model reply.
pub fn strip_code_blocks(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_embedding_request_body_shape() {
        let req = EmbeddingRequest::new("gemini-embedding-001", "hello", TaskType::RetrievalQuery)
            .output_dimensionality(3072);
        let body = serde_json::to_value(req.body()).unwrap();

        assert_eq!(
            body,
            json!({
                "instances": [{"content": "hello", "task_type": "RETRIEVAL_QUERY"}],
                "parameters": {"outputDimensionality": 3072}
            })
        );
    }

    #[test]
    fn test_zero_dimensionality_is_omitted() {
        let req = EmbeddingRequest::new("m", "x", TaskType::RetrievalDocument).output_dimensionality(0);
        let body = serde_json::to_value(req.body()).unwrap();
        assert_eq!(body["parameters"], json!({}));
        assert_eq!(body["instances"][0]["task_type"], "RETRIEVAL_DOCUMENT");
    }

    #[test]
    fn test_decode_embedding() {
        let response = json!({
            "predictions": [{
                "embeddings": {
                    "statistics": {"truncated": false, "token_count": 3},
                    "values": [0.25, -0.5, 1.0]
                }
            }]
        });
        assert_eq!(decode_embedding(&response).unwrap(), vec![0.25, -0.5, 1.0]);
    }

    #[test]
    fn test_decode_embedding_rejects_unexpected_shape() {
        assert!(matches!(
            decode_embedding(&json!({"predictions": []})),
            Err(VertexError::Parse(_))
        ));
        assert!(matches!(
            decode_embedding(&json!({"predictions": [{"embeddings": {"values": ["a"]}}]})),
            Err(VertexError::Parse(_))
        ));
    }

    #[test]
    fn test_find_neighbors_request_shape() {
        let req = FindNeighborsRequest::single("deployed_1", vec![0.1, 0.2], 10);
        let body = serde_json::to_value(&req).unwrap();
        assert_eq!(body["deployedIndexId"], "deployed_1");
        assert_eq!(body["returnFullDatapoint"], true);
        assert_eq!(body["queries"][0]["neighborCount"], 10);
        assert_eq!(body["queries"][0]["datapoint"]["featureVector"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_find_neighbors_response_parsing() {
        let raw = json!({
            "nearestNeighbors": [{
                "id": "0",
                "neighbors": [
                    {
                        "datapoint": {
                            "datapointId": "doc_7",
                            "embeddingMetadata": {"text": "Moon landing", "source": "https://bbc.co.uk/x"}
                        },
                        "distance": 0.82
                    },
                    {"datapoint": {"datapointId": "doc_3"}, "distance": 0.4}
                ]
            }]
        });
        let response: FindNeighborsResponse = serde_json::from_value(raw).unwrap();
        let neighbors = response.into_first_neighbors();

        assert_eq!(neighbors.len(), 2);
        assert_eq!(neighbors[0].datapoint.datapoint_id, "doc_7");
        assert_eq!(neighbors[0].distance, Some(0.82));
        assert!(neighbors[1].datapoint.embedding_metadata.is_none());
    }

    #[test]
    fn test_find_neighbors_response_without_neighbors() {
        let response: FindNeighborsResponse =
            serde_json::from_value(json!({"nearestNeighbors": [{"id": "0"}]})).unwrap();
        assert!(response.into_first_neighbors().is_empty());

        let response: FindNeighborsResponse = serde_json::from_value(json!({})).unwrap();
        assert!(response.into_first_neighbors().is_empty());
    }

    #[test]
    fn test_generate_content_request_shape() {
        let req = GenerateContentRequest::user("Claim: x")
            .system("Answer from evidence only")
            .config(GenerationConfig {
                temperature: Some(0.0),
                response_mime_type: Some("application/json".into()),
                ..Default::default()
            });
        let body = serde_json::to_value(&req).unwrap();

        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Claim: x");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Answer from evidence only");
        assert!(body["systemInstruction"].get("role").is_none());
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert!(body["generationConfig"].get("maxOutputTokens").is_none());
    }

    #[test]
    fn test_decode_candidate_text() {
        let response = json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": "{\"verdict\":\"supported\"}"}]}}]
        });
        assert_eq!(decode_candidate_text(&response).unwrap(), "{\"verdict\":\"supported\"}");
        assert!(decode_candidate_text(&json!({"candidates": []})).is_err());
        assert!(decode_candidate_text(&json!({"promptFeedback": {"blockReason": "SAFETY"}})).is_err());
    }

    #[test]
    fn test_strip_code_blocks() {
        assert_eq!(strip_code_blocks("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_blocks("```\n{}\n```"), "{}");
        assert_eq!(strip_code_blocks("{}"), "{}");
    }
}
