//! Claim verification endpoint.
//!
//! POST /api/claims/verify with `{ "claim": "..." }`
//!
//! An absent or blank body counts as a missing claim.

use axum::{
    body::Bytes,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::domains::verification::{VerificationError, VerificationResult};
use crate::server::app::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub claim: Option<String>,
}

/// Error body returned to callers. Internal causes are logged, never sent.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error".to_string()),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<VerificationError> for ApiError {
    fn from(err: VerificationError) -> Self {
        match err {
            VerificationError::InvalidInput(message) => ApiError::BadRequest(message),
            other => {
                tracing::error!(kind = %other.kind(), error = %other, "Verification request failed");
                ApiError::Internal
            }
        }
    }
}

pub async fn verify_claim_handler(
    Extension(state): Extension<AppState>,
    body: Bytes,
) -> Result<Json<VerificationResult>, ApiError> {
    let request = parse_body(&body)?;

    let claim = request.claim.unwrap_or_default();
    let result = state.verifier.verify(&claim).await?;

    Ok(Json(result))
}

fn parse_body(body: &[u8]) -> Result<VerifyRequest, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(VerifyRequest::default());
    }
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(error = %e, "Rejected verify request body");
        ApiError::BadRequest("invalid request body".to_string())
    })
}
