use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A claim that has passed input validation (non-empty after trimming).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim(String);

impl Claim {
    /// Returns `None` when the text is empty after trimming.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Claim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Embedding of one text, of the configured dimensionality.
pub type EmbeddingVector = Vec<f32>;

/// Which side of a retrieval the text is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingTask {
    Query,
    Document,
}

/// One retrieved piece of evidence, from the vector index or the lexical store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceItem {
    pub id: String,
    pub title: String,
    pub url: String,
    pub source: String,
    pub snippet: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[sqlx(default)]
    pub similarity_score: Option<f64>,
}

impl EvidenceItem {
    /// Bare item for an index neighbor whose metadata has not been resolved yet.
    pub fn bare(id: impl Into<String>, similarity_score: Option<f64>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            url: String::new(),
            source: String::new(),
            snippet: String::new(),
            published_at: None,
            similarity_score,
        }
    }

    /// True when nothing but the id is known.
    pub fn needs_hydration(&self) -> bool {
        self.snippet.is_empty() && self.title.is_empty() && self.url.is_empty()
    }
}

/// Deduplicated, ordered and bounded evidence for one verification.
///
/// Only [`super::aggregate`] builds one, so the invariants hold for every
/// instance: unique ids, at most `max_evidence` items, bounded snippets.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EvidenceSet {
    items: Vec<EvidenceItem>,
}

impl EvidenceSet {
    pub(crate) fn from_aggregated(items: Vec<EvidenceItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[EvidenceItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EvidenceItem> {
        self.items.iter()
    }

    pub fn into_items(self) -> Vec<EvidenceItem> {
        self.items
    }
}

/// Heuristic support/oppose signal, each component in [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScoreSignal {
    pub support: f64,
    pub oppose: f64,
}

/// Final verdict category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerdictCategory {
    Supported,
    Disputed,
    Unverifiable,
    InsufficientEvidence,
}

impl std::fmt::Display for VerdictCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerdictCategory::Supported => write!(f, "supported"),
            VerdictCategory::Disputed => write!(f, "disputed"),
            VerdictCategory::Unverifiable => write!(f, "unverifiable"),
            VerdictCategory::InsufficientEvidence => write!(f, "insufficient-evidence"),
        }
    }
}

impl std::str::FromStr for VerdictCategory {
    type Err = String;

    /// Lenient about case and separators since the value comes from a model.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['_', ' '], "-");
        match normalized.as_str() {
            "supported" | "true" => Ok(VerdictCategory::Supported),
            "disputed" | "refuted" | "false" | "contradicted" => Ok(VerdictCategory::Disputed),
            "unverifiable" => Ok(VerdictCategory::Unverifiable),
            "insufficient-evidence" | "insufficient" => Ok(VerdictCategory::InsufficientEvidence),
            _ => Err(format!("unknown verdict category: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub category: VerdictCategory,
    pub explanation: String,
    pub confidence: f64,
}

/// Terminal output of one verification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationResult {
    pub claim: String,
    pub verdict: VerdictCategory,
    pub explanation: String,
    pub confidence: f64,
    pub evidence: EvidenceSet,
}
