//! Bearer token acquisition for Vertex AI.
//!
//! `CredentialProvider` is the capability; the gcloud CLI and a static
//! token are the two sources, and `CachedCredentialProvider` puts a
//! process-wide cache with exclusive refresh in front of either.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::{Mutex, RwLock};
use vertex_client::SecretString;

use super::ServiceFailure;

/// gcloud access tokens live for one hour.
const GCLOUD_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Tokens this close to expiry are treated as expired.
const DEFAULT_EXPIRY_SKEW_SECS: i64 = 60;

#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: SecretString,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: SecretString::new(token),
            expires_at,
        }
    }

    pub fn is_fresh_at(&self, now: DateTime<Utc>, skew: chrono::Duration) -> bool {
        self.expires_at - skew > now
    }
}

#[derive(Debug, Clone, Error)]
pub enum CredentialError {
    #[error("credential command failed: {0}")]
    Command(String),

    #[error("credential provider returned an empty token")]
    Empty,

    #[error("credential refresh timed out after {0:?}")]
    Timeout(Duration),
}

impl From<CredentialError> for ServiceFailure {
    fn from(e: CredentialError) -> Self {
        match e {
            CredentialError::Timeout(d) => ServiceFailure::Timeout(d),
            other => ServiceFailure::Unauthorized(other.to_string()),
        }
    }
}

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn acquire(&self) -> Result<AccessToken, CredentialError>;
}

// =============================================================================
// Static token (VERTEX_ACCESS_TOKEN)
// =============================================================================

pub struct StaticCredentialProvider {
    token: SecretString,
}

impl StaticCredentialProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::new(token),
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    async fn acquire(&self) -> Result<AccessToken, CredentialError> {
        if self.token.is_empty() {
            return Err(CredentialError::Empty);
        }
        Ok(AccessToken {
            token: self.token.clone(),
            expires_at: Utc::now() + chrono::Duration::days(365),
        })
    }
}

// =============================================================================
// gcloud CLI (`gcloud auth print-access-token`)
// =============================================================================

pub struct GcloudCredentialProvider {
    program: String,
}

impl GcloudCredentialProvider {
    pub fn new() -> Self {
        Self {
            program: "gcloud".to_string(),
        }
    }

    /// Use a different executable (e.g. an absolute path to gcloud).
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }
}

impl Default for GcloudCredentialProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialProvider for GcloudCredentialProvider {
    async fn acquire(&self) -> Result<AccessToken, CredentialError> {
        tracing::debug!(program = %self.program, "Requesting access token from gcloud");

        let output = Command::new(&self.program)
            .args(["auth", "print-access-token"])
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| CredentialError::Command(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CredentialError::Command(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if token.is_empty() {
            return Err(CredentialError::Empty);
        }

        Ok(AccessToken::new(
            token,
            Utc::now() + chrono::Duration::seconds(GCLOUD_TOKEN_LIFETIME_SECS),
        ))
    }
}

// =============================================================================
// Process-wide cache
// =============================================================================

/// Caches a token until shortly before it expires.
///
/// Readers share the `RwLock`; a refresh holds `refresh_lock` so only one
/// caller talks to the inner provider at a time, and callers that queued
/// behind it re-check the cache before refreshing again. A failed refresh
/// leaves the cache untouched and fails only the callers that needed it.
pub struct CachedCredentialProvider {
    inner: Arc<dyn CredentialProvider>,
    cached: RwLock<Option<AccessToken>>,
    refresh_lock: Mutex<()>,
    skew: chrono::Duration,
    refresh_timeout: Duration,
}

impl CachedCredentialProvider {
    pub fn new(inner: Arc<dyn CredentialProvider>, refresh_timeout: Duration) -> Self {
        Self {
            inner,
            cached: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            skew: chrono::Duration::seconds(DEFAULT_EXPIRY_SKEW_SECS),
            refresh_timeout,
        }
    }

    pub fn with_skew(mut self, skew: chrono::Duration) -> Self {
        self.skew = skew;
        self
    }

    async fn fresh(&self) -> Option<AccessToken> {
        let cached = self.cached.read().await;
        cached
            .as_ref()
            .filter(|t| t.is_fresh_at(Utc::now(), self.skew))
            .cloned()
    }
}

#[async_trait]
impl CredentialProvider for CachedCredentialProvider {
    async fn acquire(&self) -> Result<AccessToken, CredentialError> {
        if let Some(token) = self.fresh().await {
            return Ok(token);
        }

        let _guard = self.refresh_lock.lock().await;

        // Another caller may have refreshed while we waited
        if let Some(token) = self.fresh().await {
            return Ok(token);
        }

        let token = tokio::time::timeout(self.refresh_timeout, self.inner.acquire())
            .await
            .map_err(|_| CredentialError::Timeout(self.refresh_timeout))??;

        if token.token.is_empty() {
            return Err(CredentialError::Empty);
        }

        tracing::info!(expires_at = %token.expires_at, "Access token refreshed");
        *self.cached.write().await = Some(token.clone());

        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::test_dependencies::MockCredentialProvider;

    fn in_minutes(minutes: i64) -> DateTime<Utc> {
        Utc::now() + chrono::Duration::minutes(minutes)
    }

    #[tokio::test]
    async fn cache_serves_fresh_token_without_refreshing() {
        let inner = Arc::new(MockCredentialProvider::new().with_token("tok-1", in_minutes(30)));
        let cache = CachedCredentialProvider::new(inner.clone(), Duration::from_secs(5));

        assert_eq!(cache.acquire().await.unwrap().token.expose(), "tok-1");
        assert_eq!(cache.acquire().await.unwrap().token.expose(), "tok-1");
        assert_eq!(inner.call_count(), 1);
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_refresh() {
        let inner = Arc::new(
            MockCredentialProvider::new()
                .with_token("tok-1", in_minutes(30))
                .with_delay(Duration::from_millis(50)),
        );
        let cache = Arc::new(CachedCredentialProvider::new(inner.clone(), Duration::from_secs(5)));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.acquire().await })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap().token.expose(), "tok-1");
        }

        assert_eq!(inner.call_count(), 1);
    }

    #[tokio::test]
    async fn expired_token_is_refreshed() {
        let inner = Arc::new(
            MockCredentialProvider::new()
                .with_token("old", in_minutes(-1))
                .with_token("new", in_minutes(30)),
        );
        let cache = CachedCredentialProvider::new(inner.clone(), Duration::from_secs(5));

        assert_eq!(cache.acquire().await.unwrap().token.expose(), "old");
        assert_eq!(cache.acquire().await.unwrap().token.expose(), "new");
        assert_eq!(inner.call_count(), 2);
    }

    #[tokio::test]
    async fn token_inside_skew_window_counts_as_expired() {
        let inner = Arc::new(
            MockCredentialProvider::new()
                .with_token("almost", Utc::now() + chrono::Duration::seconds(30))
                .with_token("later", in_minutes(30)),
        );
        let cache = CachedCredentialProvider::new(inner.clone(), Duration::from_secs(5));

        cache.acquire().await.unwrap();
        assert_eq!(cache.acquire().await.unwrap().token.expose(), "later");
    }

    #[tokio::test]
    async fn failed_refresh_does_not_poison_cache() {
        let inner = Arc::new(
            MockCredentialProvider::new()
                .with_failure("gcloud not logged in")
                .with_token("tok", in_minutes(30)),
        );
        let cache = CachedCredentialProvider::new(inner.clone(), Duration::from_secs(5));

        assert!(matches!(cache.acquire().await, Err(CredentialError::Command(_))));
        assert_eq!(cache.acquire().await.unwrap().token.expose(), "tok");
    }

    #[tokio::test]
    async fn slow_refresh_times_out() {
        let inner = Arc::new(
            MockCredentialProvider::new()
                .with_token("tok", in_minutes(30))
                .with_delay(Duration::from_secs(5)),
        );
        let cache = CachedCredentialProvider::new(inner, Duration::from_millis(20));

        let err = cache.acquire().await.unwrap_err();
        assert!(matches!(err, CredentialError::Timeout(_)));
        assert!(ServiceFailure::from(err).is_timeout());
    }

    #[tokio::test]
    async fn static_provider_rejects_empty_token() {
        assert!(matches!(
            StaticCredentialProvider::new("").acquire().await,
            Err(CredentialError::Empty)
        ));
        let token = StaticCredentialProvider::new("abc").acquire().await.unwrap();
        assert!(token.is_fresh_at(Utc::now(), chrono::Duration::seconds(60)));
    }

    #[tokio::test]
    async fn gcloud_provider_reports_missing_binary() {
        let provider = GcloudCredentialProvider::new().with_program("definitely-not-gcloud-xyz");
        assert!(matches!(provider.acquire().await, Err(CredentialError::Command(_))));
    }
}
