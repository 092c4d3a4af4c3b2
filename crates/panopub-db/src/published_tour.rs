use chrono::{DateTime, Utc};
use panopub_core::models::TourStatus;
use panopub_core::AppError;
use sqlx::{PgPool, Row};

/// Repository for published tours and the slug redirect mapping.
#[derive(Clone)]
pub struct PublishedTourRepository {
    pool: PgPool,
}

impl PublishedTourRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Upsert a tour on successful publish. A first publish creates the row;
    /// an update-in-place refreshes the prefix and clears any archive state.
    /// `content_id` never changes here; it is the conflict key.
    pub async fn upsert_published(
        &self,
        content_id: &str,
        slug: &str,
        storage_prefix: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO published_tours (content_id, slug, storage_prefix, status)
            VALUES ($1, $2, $3, 'completed')
            ON CONFLICT (content_id) DO UPDATE
            SET storage_prefix = EXCLUDED.storage_prefix,
                status = 'completed',
                archived_at = NULL,
                archive_prefix = NULL,
                retention_expires_at = NULL,
                updated_at = NOW()
            "#,
        )
        .bind(content_id)
        .bind(slug)
        .bind(storage_prefix)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get a tour by its durable content id.
    pub async fn get(&self, content_id: &str) -> Result<Option<PublishedTourRow>, AppError> {
        let row = sqlx::query_as::<_, PublishedTourRow>(
            r#"
            SELECT content_id, slug, storage_prefix, status, created_at,
                   updated_at, archived_at, archive_prefix, retention_expires_at
            FROM published_tours
            WHERE content_id = $1
            "#,
        )
        .bind(content_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Resolve a slug to a tour, following at most one redirect mapping.
    /// Returns the tour and whether the slug was a redirect.
    pub async fn resolve_slug(
        &self,
        slug: &str,
    ) -> Result<Option<(PublishedTourRow, bool)>, AppError> {
        let direct = sqlx::query_as::<_, PublishedTourRow>(
            r#"
            SELECT content_id, slug, storage_prefix, status, created_at,
                   updated_at, archived_at, archive_prefix, retention_expires_at
            FROM published_tours
            WHERE slug = $1
            "#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(tour) = direct {
            return Ok(Some((tour, false)));
        }

        let redirected = sqlx::query_as::<_, PublishedTourRow>(
            r#"
            SELECT t.content_id, t.slug, t.storage_prefix, t.status, t.created_at,
                   t.updated_at, t.archived_at, t.archive_prefix, t.retention_expires_at
            FROM slug_redirects r
            JOIN published_tours t ON t.content_id = r.content_id
            WHERE r.old_slug = $1
            "#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(redirected.map(|tour| (tour, true)))
    }

    /// List all tours, newest first.
    pub async fn list(&self) -> Result<Vec<PublishedTourRow>, AppError> {
        let rows = sqlx::query_as::<_, PublishedTourRow>(
            r#"
            SELECT content_id, slug, storage_prefix, status, created_at,
                   updated_at, archived_at, archive_prefix, retention_expires_at
            FROM published_tours
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Change a tour's slug, registering the old slug as a redirect so
    /// previously shared links stay valid. Touches neither `content_id` nor
    /// `storage_prefix`.
    pub async fn change_slug(&self, content_id: &str, new_slug: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let old_slug: Option<String> =
            sqlx::query("SELECT slug FROM published_tours WHERE content_id = $1")
                .bind(content_id)
                .fetch_optional(&mut *tx)
                .await?
                .map(|row| row.get("slug"));

        let Some(old_slug) = old_slug else {
            return Err(AppError::NotFound(format!("Tour not found: {}", content_id)));
        };

        if old_slug == new_slug {
            return Ok(());
        }

        // The new slug may have been a redirect target before; it stops
        // redirecting once it names a tour directly.
        sqlx::query("DELETE FROM slug_redirects WHERE old_slug = $1")
            .bind(new_slug)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            UPDATE published_tours
            SET slug = $2, updated_at = NOW()
            WHERE content_id = $1
            "#,
        )
        .bind(content_id)
        .bind(new_slug)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO slug_redirects (old_slug, content_id)
            VALUES ($1, $2)
            ON CONFLICT (old_slug) DO UPDATE SET content_id = EXCLUDED.content_id
            "#,
        )
        .bind(&old_slug)
        .bind(content_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    /// Mark a tour archived (soft-deleted). CAS on not-already-archived.
    pub async fn mark_archived(
        &self,
        content_id: &str,
        archive_prefix: &str,
        retention_expires_at: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE published_tours
            SET archived_at = NOW(), archive_prefix = $2,
                retention_expires_at = $3, updated_at = NOW()
            WHERE content_id = $1 AND archived_at IS NULL
            "#,
        )
        .bind(content_id)
        .bind(archive_prefix)
        .bind(retention_expires_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Archived tours whose retention window has lapsed; the sweep
    /// hard-deletes their archived objects and then the rows.
    pub async fn find_retention_expired(&self) -> Result<Vec<PublishedTourRow>, AppError> {
        let rows = sqlx::query_as::<_, PublishedTourRow>(
            r#"
            SELECT content_id, slug, storage_prefix, status, created_at,
                   updated_at, archived_at, archive_prefix, retention_expires_at
            FROM published_tours
            WHERE archived_at IS NOT NULL AND retention_expires_at < NOW()
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Hard-delete a tour row (cascades to its slug redirects).
    pub async fn delete(&self, content_id: &str) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM published_tours WHERE content_id = $1")
            .bind(content_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

/// Published tour record
#[derive(Debug, Clone)]
pub struct PublishedTourRow {
    pub content_id: String,
    pub slug: String,
    pub storage_prefix: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub archived_at: Option<DateTime<Utc>>,
    pub archive_prefix: Option<String>,
    pub retention_expires_at: Option<DateTime<Utc>>,
}

impl PublishedTourRow {
    pub fn status(&self) -> Result<TourStatus, AppError> {
        self.status.parse().map_err(|e: String| AppError::Internal(e))
    }

    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for PublishedTourRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(PublishedTourRow {
            content_id: row.get("content_id"),
            slug: row.get("slug"),
            storage_prefix: row.get("storage_prefix"),
            status: row.get("status"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
            archived_at: row.get("archived_at"),
            archive_prefix: row.get("archive_prefix"),
            retention_expires_at: row.get("retention_expires_at"),
        })
    }
}
