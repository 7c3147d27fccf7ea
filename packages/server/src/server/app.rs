//! Application setup and server configuration.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::domains::verification::ClaimVerifier;
use crate::server::routes::{health_handler, verify_claim_handler};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<ClaimVerifier>,
    /// `None` when no DATABASE_URL is configured
    pub db_pool: Option<PgPool>,
}

impl AppState {
    pub fn new(verifier: ClaimVerifier, db_pool: Option<PgPool>) -> Self {
        Self {
            verifier: Arc::new(verifier),
            db_pool,
        }
    }
}

/// Build the Axum application router
///
/// An empty `allowed_origins` list allows any origin, which the browser
/// extension needs since its origin is not known up front.
pub fn build_app(state: AppState, allowed_origins: &[String]) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(allow_origin(allowed_origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/api/claims/verify", post(verify_claim_handler))
        .route("/health", get(health_handler))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(Extension(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn allow_origin(allowed_origins: &[String]) -> AllowOrigin {
    if allowed_origins.is_empty() {
        return AllowOrigin::from(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    AllowOrigin::list(origins)
}
