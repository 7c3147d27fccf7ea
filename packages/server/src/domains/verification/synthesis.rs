//! Verdict synthesis constrained to the aggregated evidence.

use std::cmp::Reverse;
use std::fmt::Write;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use vertex_client::strip_code_blocks;

use super::models::{EvidenceSet, ScoreSignal, Verdict, VerdictCategory};
use super::{VerificationError, VerifierConfig};
use crate::kernel::{bounded, BaseAI, ServiceFailure, ServiceResult};

/// Confidence reported when no evidence was found at all.
pub const EMPTY_EVIDENCE_CONFIDENCE: f64 = 0.1;

/// Confidence reported when evidence exists but synthesis failed.
pub const DEGRADED_CONFIDENCE: f64 = 0.5;

const MIN_CONFIDENCE: f64 = 0.5;
const MAX_CONFIDENCE: f64 = 0.99;

const SYSTEM_PROMPT: &str = "You are a careful fact-checking assistant. \
Judge the claim ONLY using the numbered evidence you are given. \
Do not use outside knowledge and never mention a source, link or fact that is not in the evidence.";

static CITATION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[(\d+)\]").unwrap());
static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s\)\]"'<>]+"#).unwrap());

#[derive(Debug, Deserialize)]
struct VerdictReply {
    verdict: String,
    explanation: String,
}

/// Ask the model for a verdict on `claim` using only `evidence`.
///
/// An empty evidence set never reaches the model. Confidence comes from
/// `signal`, not from the model.
pub async fn synthesize(
    ai: &dyn BaseAI,
    claim: &str,
    evidence: &EvidenceSet,
    signal: ScoreSignal,
    config: &VerifierConfig,
) -> Result<Verdict, VerificationError> {
    if evidence.is_empty() {
        return Ok(insufficient_evidence());
    }

    let prompt = build_prompt(claim, evidence);
    let raw = bounded(config.stage_timeout, ai.complete_json(SYSTEM_PROMPT, &prompt))
        .await
        .map_err(VerificationError::SynthesisFailed)?;

    let (category, explanation) = parse_reply(&raw).map_err(VerificationError::SynthesisFailed)?;
    check_grounding(&explanation, evidence).map_err(VerificationError::SynthesisFailed)?;

    Ok(Verdict {
        category,
        explanation,
        confidence: confidence(signal),
    })
}

/// `max(support, oppose)` clamped to [0.5, 0.99].
pub fn confidence(signal: ScoreSignal) -> f64 {
    signal.support.max(signal.oppose).clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
}

pub fn insufficient_evidence() -> Verdict {
    Verdict {
        category: VerdictCategory::InsufficientEvidence,
        explanation: "No evidence related to this claim was found.".to_string(),
        confidence: EMPTY_EVIDENCE_CONFIDENCE,
    }
}

/// Verdict used when evidence was retrieved but synthesis failed.
pub fn degraded() -> Verdict {
    Verdict {
        category: VerdictCategory::InsufficientEvidence,
        explanation: "Related evidence was found, but a verdict could not be produced from it."
            .to_string(),
        confidence: DEGRADED_CONFIDENCE,
    }
}

pub fn build_prompt(claim: &str, evidence: &EvidenceSet) -> String {
    let mut prompt = format!("Claim: \"{}\"\n\nEvidence:\n", claim);

    for (n, item) in evidence.iter().enumerate() {
        let _ = write!(prompt, "[{}] {}", n + 1, item.title);
        if !item.source.is_empty() {
            let _ = write!(prompt, " ({})", item.source);
        }
        if let Some(published) = item.published_at {
            let _ = write!(prompt, " {}", published.format("%Y-%m-%d"));
        }
        if !item.url.is_empty() {
            let _ = write!(prompt, " {}", item.url);
        }
        let _ = writeln!(prompt, "\n{}\n", item.snippet);
    }

    prompt.push_str(
        "Decide whether the evidence above supports or disputes the claim. \
Answer strictly from that evidence and cite it by number, e.g. [1]. \
If the evidence does not address the claim, the verdict is \"insufficient-evidence\"; \
if it addresses the claim but cannot settle it, the verdict is \"unverifiable\".\n\
Respond with JSON only: \
{\"verdict\": \"supported\" | \"disputed\" | \"unverifiable\" | \"insufficient-evidence\", \
\"explanation\": \"one or two sentences\"}",
    );

    prompt
}

fn parse_reply(raw: &str) -> ServiceResult<(VerdictCategory, String)> {
    let reply: VerdictReply = serde_json::from_str(strip_code_blocks(raw))
        .map_err(|e| ServiceFailure::Malformed(format!("verdict reply is not the expected JSON: {}", e)))?;

    let category = reply.verdict.parse().map_err(ServiceFailure::Malformed)?;
    let explanation = reply.explanation.trim();
    if explanation.is_empty() {
        return Err(ServiceFailure::Malformed("verdict reply has an empty explanation".into()));
    }

    Ok((category, explanation.to_string()))
}

/// Reject explanations that cite evidence outside the set.
fn check_grounding(explanation: &str, evidence: &EvidenceSet) -> ServiceResult<()> {
    for cap in CITATION.captures_iter(explanation) {
        let n: usize = cap[1].parse().unwrap_or(0);
        if n == 0 || n > evidence.len() {
            return Err(ServiceFailure::Malformed(format!(
                "explanation cites [{}] but only {} evidence items were supplied",
                &cap[1],
                evidence.len()
            )));
        }
    }

    let remaining = strip_evidence_urls(explanation, evidence);
    for found in URL.find_iter(&remaining) {
        let url = found.as_str().trim_end_matches(['.', ',', ';', ':', '/']);
        let known = evidence
            .iter()
            .any(|item| !item.url.is_empty() && item.url.trim_end_matches('/') == url);
        if !known {
            return Err(ServiceFailure::Malformed(format!(
                "explanation cites {} which is not in the evidence",
                url
            )));
        }
    }

    Ok(())
}

/// Blank out evidence URLs quoted verbatim, so URLs with characters the
/// scanner stops at, like `(`, still count as cited evidence.
fn strip_evidence_urls(explanation: &str, evidence: &EvidenceSet) -> String {
    let mut urls: Vec<&str> = evidence
        .iter()
        .map(|item| item.url.as_str())
        .filter(|url| !url.is_empty())
        .collect();
    urls.sort_by_key(|url| Reverse(url.len()));

    let mut text = explanation.to_string();
    for url in urls {
        let mut from = 0;
        while let Some(pos) = text[from..].find(url) {
            let start = from + pos;
            let end = start + url.len();
            // Only whole URLs; a longer URL sharing this prefix stays visible
            let whole = text[end..]
                .chars()
                .next()
                .map_or(true, |c| c.is_whitespace() || ".,;:)]\"'>".contains(c));
            if whole {
                text.replace_range(start..end, " ");
                from = start + 1;
            } else {
                from = end;
            }
        }
    }
    text
}
