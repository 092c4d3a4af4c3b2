use chrono::{DateTime, Utc};
use panopub_core::models::UploadSessionStatus;
use panopub_core::AppError;
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// Repository for upload sessions.
#[derive(Clone)]
pub struct UploadSessionRepository {
    pool: PgPool,
}

impl UploadSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new upload session in `created` state.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_session(
        &self,
        session_id: Uuid,
        target_name: &str,
        object_key: &str,
        is_update: bool,
        content_id: Option<&str>,
        file_name: &str,
        file_size: i64,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO upload_sessions (
                id, target_name, object_key, is_update, content_id,
                file_name, file_size, status, expires_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'created', $8)
            "#,
        )
        .bind(session_id)
        .bind(target_name)
        .bind(object_key)
        .bind(is_update)
        .bind(content_id)
        .bind(file_name)
        .bind(file_size)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get a session by ID.
    pub async fn get_session(&self, session_id: Uuid) -> Result<Option<UploadSessionRow>, AppError> {
        let row = sqlx::query_as::<_, UploadSessionRow>(
            r#"
            SELECT id, target_name, object_key, is_update, content_id,
                   file_name, file_size, status, error_message,
                   created_at, expires_at, completed_at, updated_at
            FROM upload_sessions
            WHERE id = $1
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Most recent session for a target name. The processor reports reference
    /// sessions by tour name, not id.
    pub async fn find_latest_by_target_name(
        &self,
        target_name: &str,
    ) -> Result<Option<UploadSessionRow>, AppError> {
        let row = sqlx::query_as::<_, UploadSessionRow>(
            r#"
            SELECT id, target_name, object_key, is_update, content_id,
                   file_name, file_size, status, error_message,
                   created_at, expires_at, completed_at, updated_at
            FROM upload_sessions
            WHERE target_name = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(target_name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Transition `created`/`uploading` → `uploaded`. Returns the number of
    /// rows that transitioned (0 means the session was already past
    /// `uploaded` or in a terminal state).
    pub async fn mark_uploaded(&self, session_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE upload_sessions
            SET status = 'uploaded', updated_at = NOW()
            WHERE id = $1 AND status IN ('created', 'uploading')
            "#,
        )
        .bind(session_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Transition a not-yet-uploaded session to `expired`.
    pub async fn mark_expired(&self, session_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE upload_sessions
            SET status = 'expired', updated_at = NOW()
            WHERE id = $1 AND status IN ('created', 'uploading')
            "#,
        )
        .bind(session_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Transition `processing` → `completed`.
    pub async fn mark_completed(&self, session_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE upload_sessions
            SET status = 'completed', completed_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND status = 'processing'
            "#,
        )
        .bind(session_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Transition a non-terminal session to `failed`.
    pub async fn mark_failed(
        &self,
        session_id: Uuid,
        error_message: Option<&str>,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE upload_sessions
            SET status = 'failed', error_message = $2, updated_at = NOW()
            WHERE id = $1 AND status NOT IN ('completed', 'failed', 'expired')
            "#,
        )
        .bind(session_id)
        .bind(error_message)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Remove terminal sessions older than the retention window. Jobs are
    /// removed first to satisfy the foreign key.
    pub async fn delete_terminal_older_than_days(&self, days: i32) -> Result<u64, AppError> {
        sqlx::query(
            r#"
            DELETE FROM processing_jobs
            WHERE session_id IN (
                SELECT id FROM upload_sessions
                WHERE status IN ('completed', 'failed', 'expired')
                  AND updated_at < NOW() - make_interval(days => $1)
            )
            "#,
        )
        .bind(days)
        .execute(&self.pool)
        .await?;

        let result = sqlx::query(
            r#"
            DELETE FROM upload_sessions
            WHERE status IN ('completed', 'failed', 'expired')
              AND updated_at < NOW() - make_interval(days => $1)
            "#,
        )
        .bind(days)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

/// Upload session record
#[derive(Debug, Clone)]
pub struct UploadSessionRow {
    pub id: Uuid,
    pub target_name: String,
    pub object_key: String,
    pub is_update: bool,
    pub content_id: Option<String>,
    pub file_name: String,
    pub file_size: i64,
    pub status: String,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl UploadSessionRow {
    /// Typed status; rows only ever hold the canonical status strings.
    pub fn status(&self) -> Result<UploadSessionStatus, AppError> {
        self.status
            .parse()
            .map_err(|e: String| AppError::Internal(e))
    }
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for UploadSessionRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(UploadSessionRow {
            id: row.get("id"),
            target_name: row.get("target_name"),
            object_key: row.get("object_key"),
            is_update: row.get("is_update"),
            content_id: row.get("content_id"),
            file_name: row.get("file_name"),
            file_size: row.get("file_size"),
            status: row.get("status"),
            error_message: row.get("error_message"),
            created_at: row.get("created_at"),
            expires_at: row.get("expires_at"),
            completed_at: row.get("completed_at"),
            updated_at: row.get("updated_at"),
        })
    }
}
