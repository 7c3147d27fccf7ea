//! Heuristic support/oppose scoring.
//!
//! This is a coarse lexical pre-filter. It only looks for negation words in
//! the snippets and knows nothing about what the snippets actually assert,
//! so it must never be the sole basis of a published verdict. Its one job
//! downstream is to drive the confidence number.

use super::models::{EvidenceSet, ScoreSignal};

/// Phrases that mark a snippet as opposing the claim.
pub const NEGATION_LEXICON: &[&str] = &[
    "false",
    "fake",
    "not true",
    "hoax",
    "misleading",
    "no evidence",
    "debunk",
];

const OPPOSE_WEIGHT: f64 = 1.0;
const SUPPORT_WEIGHT: f64 = 0.5;

/// Score the evidence against the negation lexicon.
///
/// Each non-empty snippet adds `1.0` to `oppose` when it contains a lexicon
/// phrase and `0.5` to `support` otherwise. Both sums are divided by
/// `max(1, |evidence|)`, so each component stays in [0, 1]. The claim is
/// not consulted: a snippet that merely quotes a claim containing "hoax"
/// still opposes it.
pub fn score(_claim: &str, evidence: &EvidenceSet) -> ScoreSignal {
    let mut signal = ScoreSignal::default();

    for item in evidence.iter() {
        if item.snippet.trim().is_empty() {
            continue;
        }
        let text = item.snippet.to_lowercase();

        if NEGATION_LEXICON.iter().any(|phrase| text.contains(phrase)) {
            signal.oppose += OPPOSE_WEIGHT;
        } else {
            signal.support += SUPPORT_WEIGHT;
        }
    }

    let n = evidence.len().max(1) as f64;
    signal.support /= n;
    signal.oppose /= n;
    signal
}
