use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;

use super::BaseEvidenceStore;
use crate::domains::verification::models::EvidenceItem;

/// Evidence rows in Postgres (`evidence` table, see migrations/)
pub struct PostgresEvidenceStore {
    pool: PgPool,
}

impl PostgresEvidenceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BaseEvidenceStore for PostgresEvidenceStore {
    async fn search_text(
        &self,
        needle: &str,
        limit: usize,
        snippet_chars: usize,
    ) -> Result<Vec<EvidenceItem>> {
        let rows = sqlx::query_as::<_, EvidenceItem>(
            r#"
            SELECT id, title, url, source, LEFT(text, $3) AS snippet, published_at
            FROM evidence
            WHERE text ILIKE '%' || $1 || '%' ESCAPE '\'
            ORDER BY published_at DESC NULLS LAST
            LIMIT $2
            "#,
        )
        .bind(escape_like(needle))
        .bind(limit as i64)
        .bind(snippet_chars as i32)
        .fetch_all(&self.pool)
        .await
        .context("Failed to search evidence text")?;

        Ok(rows)
    }

    async fn fetch_by_ids(&self, ids: &[String], snippet_chars: usize) -> Result<Vec<EvidenceItem>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, EvidenceItem>(
            r#"
            SELECT id, title, url, source, LEFT(text, $2) AS snippet, published_at
            FROM evidence
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .bind(snippet_chars as i32)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch evidence by id")?;

        Ok(rows)
    }
}

/// No-op store for deployments without DATABASE_URL
pub struct NoopEvidenceStore;

#[async_trait]
impl BaseEvidenceStore for NoopEvidenceStore {
    async fn search_text(&self, _needle: &str, _limit: usize, _snippet_chars: usize) -> Result<Vec<EvidenceItem>> {
        tracing::warn!("NoopEvidenceStore: lexical fallback called but no database configured");
        Ok(vec![])
    }

    async fn fetch_by_ids(&self, _ids: &[String], _snippet_chars: usize) -> Result<Vec<EvidenceItem>> {
        Ok(vec![])
    }
}

/// Escape LIKE wildcards so the needle is matched literally.
pub fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
