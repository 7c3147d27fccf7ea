//! Evidence retrieval: nearest neighbors from the vector index, and the
//! lexical fallback over the structured store.

use std::collections::HashMap;

use super::models::EvidenceItem;
use super::{VerificationError, VerifierConfig};
use crate::kernel::{bounded, BaseEvidenceIndex, BaseEvidenceStore};

/// Longest claim prefix used as a substring needle.
pub const FALLBACK_PREFIX_CHARS: usize = 200;

/// Query the vector index for the `k` nearest neighbors of `vector`.
///
/// Neighbors that came back without metadata are filled in from the
/// evidence store. Hydration is best effort: if the store fails the bare
/// neighbors are kept.
pub async fn query_index(
    index: &dyn BaseEvidenceIndex,
    store: &dyn BaseEvidenceStore,
    vector: &[f32],
    k: usize,
    config: &VerifierConfig,
) -> Result<Vec<EvidenceItem>, VerificationError> {
    let neighbors = bounded(config.stage_timeout, index.find_neighbors(vector, k))
        .await
        .map_err(|cause| {
            tracing::error!(error = %cause, "Vector index query failed");
            VerificationError::RetrievalUnavailable(cause)
        })?;

    Ok(hydrate(store, neighbors, config).await)
}

async fn hydrate(
    store: &dyn BaseEvidenceStore,
    mut neighbors: Vec<EvidenceItem>,
    config: &VerifierConfig,
) -> Vec<EvidenceItem> {
    let bare_ids: Vec<String> = neighbors
        .iter()
        .filter(|n| n.needs_hydration())
        .map(|n| n.id.clone())
        .collect();
    if bare_ids.is_empty() {
        return neighbors;
    }

    let fetched = tokio::time::timeout(
        config.stage_timeout,
        store.fetch_by_ids(&bare_ids, config.snippet_chars),
    )
    .await;

    let rows = match fetched {
        Ok(Ok(rows)) => rows,
        Ok(Err(e)) => {
            tracing::warn!(error = %e, missing = bare_ids.len(), "Evidence hydration failed");
            return neighbors;
        }
        Err(_) => {
            tracing::warn!(missing = bare_ids.len(), "Evidence hydration timed out");
            return neighbors;
        }
    };

    let mut by_id: HashMap<String, EvidenceItem> =
        rows.into_iter().map(|row| (row.id.clone(), row)).collect();
    for neighbor in neighbors.iter_mut().filter(|n| n.needs_hydration()) {
        if let Some(row) = by_id.remove(&neighbor.id) {
            let similarity_score = neighbor.similarity_score;
            *neighbor = EvidenceItem {
                similarity_score,
                ..row
            };
        }
    }

    tracing::debug!(requested = bare_ids.len(), "Hydrated bare neighbors");
    neighbors
}

/// Substring search over the structured store, newest first.
///
/// Only the first [`FALLBACK_PREFIX_CHARS`] characters of the claim are
/// matched. Never fails: store errors and timeouts are logged and yield an
/// empty result.
pub async fn search_by_keyword(
    store: &dyn BaseEvidenceStore,
    claim: &str,
    limit: usize,
    config: &VerifierConfig,
) -> Vec<EvidenceItem> {
    let needle = claim_prefix(claim);

    let result = tokio::time::timeout(
        config.stage_timeout,
        store.search_text(needle, limit, config.snippet_chars),
    )
    .await;

    match result {
        Ok(Ok(rows)) => {
            tracing::debug!(rows = rows.len(), limit, "Lexical fallback complete");
            rows
        }
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Lexical fallback failed, continuing without evidence");
            Vec::new()
        }
        Err(_) => {
            tracing::warn!(timeout = ?config.stage_timeout, "Lexical fallback timed out, continuing without evidence");
            Vec::new()
        }
    }
}

fn claim_prefix(claim: &str) -> &str {
    match claim.char_indices().nth(FALLBACK_PREFIX_CHARS) {
        Some((end, _)) => &claim[..end],
        None => claim,
    }
}
