//! Failure type shared by every outbound service call.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use vertex_client::VertexError;

pub type ServiceResult<T> = std::result::Result<T, ServiceFailure>;

/// Why a remote call failed. Timeouts stay distinguishable from every
/// other remote error so callers can report them separately.
#[derive(Debug, Clone, Error)]
pub enum ServiceFailure {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("remote error: {0}")]
    Remote(String),

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ServiceFailure {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ServiceFailure::Timeout(_))
    }
}

impl From<VertexError> for ServiceFailure {
    fn from(e: VertexError) -> Self {
        match e {
            VertexError::Timeout(d) => ServiceFailure::Timeout(d),
            VertexError::Api { status: 401 | 403, message } => ServiceFailure::Unauthorized(message),
            VertexError::Parse(msg) => ServiceFailure::Malformed(msg),
            other => ServiceFailure::Remote(other.to_string()),
        }
    }
}

/// Run one outbound call under the per-stage time budget.
pub async fn bounded<T, F>(budget: Duration, call: F) -> ServiceResult<T>
where
    F: Future<Output = ServiceResult<T>>,
{
    match tokio::time::timeout(budget, call).await {
        Ok(result) => result,
        Err(_) => Err(ServiceFailure::Timeout(budget)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bounded_passes_through_fast_calls() {
        let result = bounded(Duration::from_secs(1), async { Ok::<_, ServiceFailure>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn bounded_turns_slow_calls_into_timeouts() {
        let result: ServiceResult<()> = bounded(Duration::from_millis(20), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(ServiceFailure::Timeout(d)) if d == Duration::from_millis(20)));
    }

    #[test]
    fn vertex_errors_map_to_service_failures() {
        let auth: ServiceFailure = VertexError::Api { status: 403, message: "denied".into() }.into();
        assert!(matches!(auth, ServiceFailure::Unauthorized(_)));

        let timeout: ServiceFailure = VertexError::Timeout(Duration::from_secs(30)).into();
        assert!(timeout.is_timeout());

        let server: ServiceFailure = VertexError::Api { status: 503, message: "busy".into() }.into();
        assert!(matches!(server, ServiceFailure::Remote(_)));

        let parse: ServiceFailure = VertexError::Parse("bad".into()).into();
        assert!(matches!(parse, ServiceFailure::Malformed(_)));
    }
}
