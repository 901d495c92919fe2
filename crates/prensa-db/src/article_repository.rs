use sqlx::{PgPool, Pool, Postgres};
use uuid::Uuid;

use prensa_core::error::AppError;
use prensa_core::models::ArticleRecord;
use prensa_core::traits::ArticleStore;

/// Document store for enriched articles, one JSONB document per row,
/// keyed by `(site, canonical_url)` so redeliveries converge on the
/// same document instead of duplicating it.
#[derive(Clone)]
pub struct ArticleRepository {
    pool: Pool<Postgres>,
}

impl ArticleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetch a stored document by site and canonical URL.
    pub async fn get(
        &self,
        site: &str,
        canonical_url: &str,
    ) -> Result<Option<ArticleRecord>, AppError> {
        let row: Option<(serde_json::Value,)> = sqlx::query_as(
            "SELECT document FROM articles WHERE site = $1 AND canonical_url = $2",
        )
        .bind(site)
        .bind(canonical_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            None => Ok(None),
            Some((document,)) => Ok(Some(serde_json::from_value(document)?)),
        }
    }

    /// Number of documents stored for a site.
    pub async fn count_for_site(&self, site: &str) -> Result<i64, AppError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM articles WHERE site = $1")
            .bind(site)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(count)
    }
}

impl ArticleStore for ArticleRepository {
    async fn upsert(&self, site: &str, record: &ArticleRecord) -> Result<Uuid, AppError> {
        let document = serde_json::to_value(record)?;

        let (id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO articles (site, canonical_url, document)
            VALUES ($1, $2, $3)
            ON CONFLICT (site, canonical_url)
            DO UPDATE SET document = EXCLUDED.document, updated_at = NOW()
            RETURNING id
            "#,
        )
        .bind(site)
        .bind(&record.canonical_url)
        .bind(&document)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(id)
    }
}
