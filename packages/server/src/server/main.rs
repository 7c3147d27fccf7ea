// Main entry point for the claim verification API server

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vertex_client::VertexClient;
use verifier_core::domains::verification::ClaimVerifier;
use verifier_core::kernel::{
    BaseEvidenceStore, CachedCredentialProvider, CredentialProvider, GcloudCredentialProvider,
    GeminiAI, NoopEvidenceStore, PostgresEvidenceStore, ServerDeps, StaticCredentialProvider,
    VertexEmbeddingService, VertexEvidenceIndex,
};
use verifier_core::server::{build_app, AppState};
use verifier_core::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,verifier_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting claim verification API");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(
        project = %config.project_id,
        location = %config.location,
        embedding_model = %config.embedding_model,
        generative_model = %config.generative_model,
        "Configuration loaded"
    );

    // Connect to database (optional, backs the lexical fallback)
    let pool = match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to database...");
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .context("Failed to connect to database")?;
            tracing::info!("Database connected");

            tracing::info!("Running database migrations...");
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to run migrations")?;
            tracing::info!("Migrations complete");
            Some(pool)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, lexical fallback disabled");
            None
        }
    };

    // Credentials: static token if given, otherwise the gcloud CLI
    let source: Arc<dyn CredentialProvider> = match &config.vertex_access_token {
        Some(token) => Arc::new(StaticCredentialProvider::new(token.expose())),
        None => Arc::new(GcloudCredentialProvider::new()),
    };
    let credentials: Arc<dyn CredentialProvider> =
        Arc::new(CachedCredentialProvider::new(source, config.stage_timeout));

    let client = VertexClient::new(
        &config.vertex_api_endpoint,
        &config.project_id,
        &config.location,
    )
    .with_timeout(config.stage_timeout)
    .context("Failed to build Vertex AI client")?;

    let evidence_store: Arc<dyn BaseEvidenceStore> = match &pool {
        Some(pool) => Arc::new(PostgresEvidenceStore::new(pool.clone())),
        None => Arc::new(NoopEvidenceStore),
    };

    let deps = ServerDeps::new(
        Arc::new(GeminiAI::new(
            client.clone(),
            credentials.clone(),
            &config.generative_model,
        )),
        Arc::new(VertexEmbeddingService::new(
            client.clone(),
            credentials.clone(),
            &config.embedding_model,
            config.embedding_dimensionality,
        )),
        Arc::new(VertexEvidenceIndex::new(
            client,
            credentials,
            &config.index_query_url,
            &config.deployed_index_id,
        )
        .with_distance_measure(config.distance_measure)),
        evidence_store,
    );

    // Build application
    let verifier = ClaimVerifier::new(deps, config.verifier_config());
    let app = build_app(AppState::new(verifier, pool), &config.allowed_origins);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Verify endpoint: http://localhost:{}/api/claims/verify", config.port);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
