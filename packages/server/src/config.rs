use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use vertex_client::SecretString;

use crate::domains::verification::VerifierConfig;
use crate::kernel::DistanceMeasure;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub project_id: String,
    pub location: String,
    pub vertex_api_endpoint: String,
    pub embedding_model: String,
    pub embedding_dimensionality: u32,
    pub embedding_concurrency: usize,
    pub index_query_url: String,
    pub deployed_index_id: String,
    pub distance_measure: DistanceMeasure,
    pub generative_model: String,
    pub database_url: Option<String>,
    pub vertex_access_token: Option<SecretString>,
    pub stage_timeout: Duration,
    pub neighbor_count: usize,
    pub fallback_limit: usize,
    pub max_evidence: usize,
    pub snippet_chars: usize,
    pub allowed_origins: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let location = env::var("LOCATION").unwrap_or_else(|_| "us-central1".to_string());

        Ok(Self {
            port: parse_or("PORT", 8080)?,
            project_id: env::var("PROJECT_ID")
                .or_else(|_| env::var("GOOGLE_CLOUD_PROJECT"))
                .context("PROJECT_ID must be set")?,
            vertex_api_endpoint: env::var("VERTEX_API_ENDPOINT")
                .unwrap_or_else(|_| format!("{}-aiplatform.googleapis.com", location)),
            location,
            embedding_model: env::var("EMBEDDING_MODEL")
                .unwrap_or_else(|_| "gemini-embedding-001".to_string()),
            embedding_dimensionality: parse_or("EMBEDDING_DIMENSIONALITY", 3072)?,
            embedding_concurrency: parse_or("EMBEDDING_CONCURRENCY", 1)?,
            index_query_url: env::var("INDEX_QUERY_URL").context("INDEX_QUERY_URL must be set")?,
            deployed_index_id: env::var("DEPLOYED_INDEX_ID")
                .context("DEPLOYED_INDEX_ID must be set")?,
            distance_measure: match env::var("DISTANCE_MEASURE") {
                Ok(raw) if !raw.trim().is_empty() => {
                    raw.parse().map_err(anyhow::Error::msg)?
                }
                _ => DistanceMeasure::default(),
            },
            generative_model: env::var("GENERATIVE_MODEL")
                .unwrap_or_else(|_| "gemini-2.0-flash".to_string()),
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            vertex_access_token: env::var("VERTEX_ACCESS_TOKEN")
                .ok()
                .filter(|s| !s.is_empty())
                .map(SecretString::new),
            stage_timeout: Duration::from_secs(parse_or("STAGE_TIMEOUT_SECS", 30)?),
            neighbor_count: parse_or("NEIGHBOR_COUNT", 10)?,
            fallback_limit: parse_or("FALLBACK_LIMIT", 5)?,
            max_evidence: parse_or("MAX_EVIDENCE", 10)?,
            snippet_chars: parse_or("SNIPPET_CHARS", 300)?,
            allowed_origins: parse_origins(&env::var("ALLOWED_ORIGINS").unwrap_or_default()),
        })
    }

    /// Pipeline settings handed to the verifier at construction
    pub fn verifier_config(&self) -> VerifierConfig {
        VerifierConfig {
            embedding_dimensionality: self.embedding_dimensionality as usize,
            embedding_concurrency: self.embedding_concurrency.max(1),
            neighbor_count: self.neighbor_count,
            fallback_limit: self.fallback_limit,
            max_evidence: self.max_evidence,
            snippet_chars: self.snippet_chars,
            stage_timeout: self.stage_timeout,
        }
    }
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid number", key)),
        _ => Ok(default),
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_are_split_and_trimmed() {
        assert_eq!(
            parse_origins(" chrome-extension://abc , https://app.example.org,,"),
            vec!["chrome-extension://abc", "https://app.example.org"]
        );
        assert!(parse_origins("").is_empty());
    }

    #[test]
    fn missing_number_uses_default() {
        let value: u16 = parse_or("CLAIM_VERIFIER_TEST_UNSET_PORT", 8080).unwrap();
        assert_eq!(value, 8080);
    }
}
