//! Embedding client: one remote call per text, results in input order.

use futures::stream::{self, StreamExt, TryStreamExt};

use super::models::{EmbeddingTask, EmbeddingVector};
use super::{VerificationError, VerifierConfig};
use crate::kernel::{bounded, BaseEmbeddingService, ServiceFailure};

/// Embed every text, returning one vector per text in the same order.
///
/// All texts are validated before any call is made. The first failing
/// text (by index) fails the whole batch; partial results are dropped.
pub async fn embed<S: AsRef<str>>(
    service: &dyn BaseEmbeddingService,
    texts: &[S],
    task: EmbeddingTask,
    config: &VerifierConfig,
) -> Result<Vec<EmbeddingVector>, VerificationError> {
    if let Some(index) = texts.iter().position(|t| t.as_ref().trim().is_empty()) {
        return Err(VerificationError::InvalidInput(format!(
            "text {} is empty",
            index
        )));
    }

    let calls: Vec<_> = texts
        .iter()
        .enumerate()
        .map(|(index, text)| embed_one(service, index, text.as_ref(), task, config))
        .collect();

    stream::iter(calls)
        .buffered(config.embedding_concurrency.max(1))
        .try_collect()
        .await
}

async fn embed_one(
    service: &dyn BaseEmbeddingService,
    index: usize,
    text: &str,
    task: EmbeddingTask,
    config: &VerifierConfig,
) -> Result<EmbeddingVector, VerificationError> {
    let vector = bounded(config.stage_timeout, service.generate(text, task))
        .await
        .map_err(|cause| {
            tracing::warn!(index, error = %cause, "Embedding call failed");
            VerificationError::EmbeddingFailed { index, cause }
        })?;

    if vector.len() != config.embedding_dimensionality {
        return Err(VerificationError::EmbeddingFailed {
            index,
            cause: ServiceFailure::Malformed(format!(
                "expected {} values, got {}",
                config.embedding_dimensionality,
                vector.len()
            )),
        });
    }

    Ok(vector)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::test_dependencies::MockEmbeddingService;
    use std::time::Duration;

    fn config() -> VerifierConfig {
        VerifierConfig {
            embedding_dimensionality: 4,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn one_vector_per_text_in_order() {
        let service = MockEmbeddingService::new().with_dimension(4);
        let texts = ["a", "three", "ab"];

        let vectors = embed(&service, &texts, EmbeddingTask::Document, &config())
            .await
            .unwrap();

        // The mock writes the text length into the first component
        let firsts: Vec<f32> = vectors.iter().map(|v| v[0]).collect();
        assert_eq!(firsts, vec![1.0, 5.0, 2.0]);
        assert!(vectors.iter().all(|v| v.len() == 4));

        let calls = service.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[1], ("three".to_string(), EmbeddingTask::Document));
    }

    #[tokio::test]
    async fn bounded_parallelism_keeps_input_order() {
        let service = MockEmbeddingService::new()
            .with_dimension(4)
            .with_delay(Duration::from_millis(10));
        let config = VerifierConfig {
            embedding_concurrency: 3,
            ..config()
        };
        let texts: Vec<String> = (1..=6).map(|n| "x".repeat(n)).collect();

        let vectors = embed(&service, &texts, EmbeddingTask::Query, &config)
            .await
            .unwrap();

        let firsts: Vec<f32> = vectors.iter().map(|v| v[0]).collect();
        assert_eq!(firsts, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn borrowed_text_batches_give_send_futures() {
        fn assert_send<T: Send>(_: T) {}

        let service = MockEmbeddingService::new().with_dimension(4);
        let config = config();
        let claim = String::from("claim");
        let texts = [claim.as_str()];
        assert_send(embed(&service, &texts, EmbeddingTask::Query, &config));
    }

    #[tokio::test]
    async fn blank_text_is_rejected_before_any_call() {
        let service = MockEmbeddingService::new().with_dimension(4);

        let err = embed(&service, &["ok", "  "], EmbeddingTask::Query, &config())
            .await
            .unwrap_err();

        assert!(matches!(err, VerificationError::InvalidInput(ref m) if m == "text 1 is empty"));
        assert_eq!(service.call_count(), 0);
    }

    #[tokio::test]
    async fn failure_reports_the_failing_index() {
        let service = MockEmbeddingService::new()
            .with_dimension(4)
            .with_failure_on("broken", ServiceFailure::Remote("connection reset".into()));

        let err = embed(&service, &["fine", "broken text", "also fine"], EmbeddingTask::Query, &config())
            .await
            .unwrap_err();

        match err {
            VerificationError::EmbeddingFailed { index, cause } => {
                assert_eq!(index, 1);
                assert!(matches!(cause, ServiceFailure::Remote(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn wrong_dimensionality_is_malformed() {
        let service = MockEmbeddingService::new().with_dimension(3);

        let err = embed(&service, &["claim"], EmbeddingTask::Query, &config())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            VerificationError::EmbeddingFailed { index: 0, cause: ServiceFailure::Malformed(_) }
        ));
    }

    #[tokio::test]
    async fn slow_call_surfaces_as_timeout() {
        let service = MockEmbeddingService::new()
            .with_dimension(4)
            .with_delay(Duration::from_secs(5));
        let config = VerifierConfig {
            stage_timeout: Duration::from_millis(20),
            ..config()
        };

        let err = embed(&service, &["claim"], EmbeddingTask::Query, &config)
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(err.kind(), crate::domains::verification::ErrorKind::EmbeddingFailed);
    }
}
