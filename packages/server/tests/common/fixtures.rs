//! Test fixtures for evidence data.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use verifier_core::domains::verification::EvidenceItem;

/// Index neighbor with full metadata
pub fn neighbor(id: &str, snippet: &str, similarity: f64) -> EvidenceItem {
    EvidenceItem {
        title: format!("Report {}", id),
        url: format!("https://news.example/{}", id),
        source: "news.example".to_string(),
        snippet: snippet.to_string(),
        ..EvidenceItem::bare(id, Some(similarity))
    }
}

/// Insert one evidence row
pub async fn insert_evidence(
    pool: &PgPool,
    id: &str,
    title: &str,
    text: &str,
    published_at: Option<DateTime<Utc>>,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO evidence (id, title, url, source, text, published_at) VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(id)
    .bind(title)
    .bind(format!("https://archive.example/{}", id))
    .bind("archive.example")
    .bind(text)
    .bind(published_at)
    .execute(pool)
    .await?;

    Ok(())
}
