//! Verification orchestrator: runs the stages of one request in order and
//! applies the failure policy.

use std::fmt;

use tracing::Instrument;
use uuid::Uuid;

use super::models::{Claim, EmbeddingTask, EvidenceItem, VerificationResult};
use super::synthesis;
use super::{
    aggregate, embed, query_index, score, search_by_keyword, synthesize, ErrorKind,
    VerificationError, VerifierConfig,
};
use crate::kernel::{ServerDeps, ServiceFailure};

/// Where a request is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Embedding,
    Retrieving,
    FallbackRetrieving,
    Scoring,
    Synthesizing,
    Done,
    Failed(ErrorKind),
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Idle => write!(f, "idle"),
            Stage::Embedding => write!(f, "embedding"),
            Stage::Retrieving => write!(f, "retrieving"),
            Stage::FallbackRetrieving => write!(f, "fallback_retrieving"),
            Stage::Scoring => write!(f, "scoring"),
            Stage::Synthesizing => write!(f, "synthesizing"),
            Stage::Done => write!(f, "done"),
            Stage::Failed(kind) => write!(f, "failed({})", kind),
        }
    }
}

/// Stage tracker for one request.
struct Progress {
    stage: Stage,
}

impl Progress {
    fn new() -> Self {
        Self { stage: Stage::Idle }
    }

    fn enter(&mut self, next: Stage) {
        tracing::debug!(from = %self.stage, to = %next, "Stage transition");
        self.stage = next;
    }

    fn fail(&mut self, err: VerificationError) -> VerificationError {
        let failed_in = self.stage;
        self.enter(Stage::Failed(err.kind()));
        tracing::error!(
            stage = %failed_in,
            kind = %err.kind(),
            timeout = err.is_timeout(),
            error = %err,
            "Claim verification failed"
        );
        err
    }
}

/// Owns the single `verify` operation.
///
/// Holds only `Arc`'d clients and immutable settings, so one instance is
/// shared by every request.
#[derive(Clone)]
pub struct ClaimVerifier {
    deps: ServerDeps,
    config: VerifierConfig,
}

impl ClaimVerifier {
    pub fn new(deps: ServerDeps, config: VerifierConfig) -> Self {
        Self { deps, config }
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Verify one claim.
    ///
    /// Embedding and retrieval failures end the request. An empty index
    /// result triggers the lexical fallback exactly once; a retrieval error
    /// never does. A synthesis failure degrades to `insufficient-evidence`.
    pub async fn verify(&self, raw_claim: &str) -> Result<VerificationResult, VerificationError> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("verify_claim", %request_id);
        self.run(raw_claim).instrument(span).await
    }

    async fn run(&self, raw_claim: &str) -> Result<VerificationResult, VerificationError> {
        let mut progress = Progress::new();

        let Some(claim) = Claim::parse(raw_claim) else {
            return Err(progress.fail(VerificationError::claim_required()));
        };
        tracing::info!(claim_chars = claim.as_str().chars().count(), "Verifying claim");

        progress.enter(Stage::Embedding);
        let vector = match embed(
            self.deps.embedding_service.as_ref(),
            &[claim.as_str()],
            EmbeddingTask::Query,
            &self.config,
        )
        .await
        {
            Ok(vectors) => vectors.into_iter().next().ok_or_else(|| {
                VerificationError::EmbeddingFailed {
                    index: 0,
                    cause: ServiceFailure::Malformed("no vector returned".into()),
                }
            }),
            Err(e) => Err(e),
        }
        .map_err(|e| progress.fail(e))?;

        progress.enter(Stage::Retrieving);
        let primary = query_index(
            self.deps.evidence_index.as_ref(),
            self.deps.evidence_store.as_ref(),
            &vector,
            self.config.neighbor_count,
            &self.config,
        )
        .await
        .map_err(|e| progress.fail(e))?;

        let fallback: Vec<EvidenceItem> = if primary.is_empty() {
            progress.enter(Stage::FallbackRetrieving);
            search_by_keyword(
                self.deps.evidence_store.as_ref(),
                claim.as_str(),
                self.config.fallback_limit,
                &self.config,
            )
            .await
        } else {
            Vec::new()
        };

        let evidence = aggregate(&primary, &fallback, &self.config);

        progress.enter(Stage::Scoring);
        let signal = score(claim.as_str(), &evidence);
        tracing::debug!(
            evidence = evidence.len(),
            support = signal.support,
            oppose = signal.oppose,
            "Evidence scored"
        );

        progress.enter(Stage::Synthesizing);
        let verdict = match synthesize(
            self.deps.ai.as_ref(),
            claim.as_str(),
            &evidence,
            signal,
            &self.config,
        )
        .await
        {
            Ok(verdict) => verdict,
            Err(e @ VerificationError::SynthesisFailed(_)) => {
                tracing::warn!(
                    error = %e,
                    timeout = e.is_timeout(),
                    "Verdict synthesis failed, degrading to insufficient evidence"
                );
                synthesis::degraded()
            }
            Err(e) => return Err(progress.fail(e)),
        };

        progress.enter(Stage::Done);
        tracing::info!(
            verdict = %verdict.category,
            confidence = verdict.confidence,
            evidence = evidence.len(),
            "Claim verified"
        );

        Ok(VerificationResult {
            claim: claim.to_string(),
            verdict: verdict.category,
            explanation: verdict.explanation,
            confidence: verdict.confidence,
            evidence,
        })
    }
}
