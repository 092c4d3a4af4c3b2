use chrono::{DateTime, Utc};
use panopub_core::models::{ProcessingStage, TerminalStatus};
use panopub_core::AppError;
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// Repository for processing jobs.
#[derive(Clone)]
pub struct ProcessingJobRepository {
    pool: PgPool,
}

impl ProcessingJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Trigger processing for an uploaded session.
    ///
    /// Runs in one transaction: CAS the session `uploaded` → `processing`,
    /// then insert the job with `ON CONFLICT (session_id) DO NOTHING`. Two
    /// racing calls both come back with the same job id; exactly one row is
    /// ever created.
    pub async fn start_for_session(&self, session_id: Uuid) -> Result<ProcessingJobRow, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE upload_sessions
            SET status = 'processing', updated_at = NOW()
            WHERE id = $1 AND status = 'uploaded'
            "#,
        )
        .bind(session_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO processing_jobs (id, session_id, stage, percent, message)
            VALUES ($1, $2, 'downloading', 0, 'Waiting for processor')
            ON CONFLICT (session_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(session_id)
        .execute(&mut *tx)
        .await?;

        let job = sqlx::query_as::<_, ProcessingJobRow>(
            r#"
            SELECT id, session_id, stage, percent, message, terminal_status,
                   error_detail, created_at, updated_at
            FROM processing_jobs
            WHERE session_id = $1
            "#,
        )
        .bind(session_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(job)
    }

    /// Get a job by ID.
    pub async fn get(&self, job_id: Uuid) -> Result<Option<ProcessingJobRow>, AppError> {
        let row = sqlx::query_as::<_, ProcessingJobRow>(
            r#"
            SELECT id, session_id, stage, percent, message, terminal_status,
                   error_detail, created_at, updated_at
            FROM processing_jobs
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Get the job owned by a session, if processing was triggered.
    pub async fn get_by_session(&self, session_id: Uuid) -> Result<Option<ProcessingJobRow>, AppError> {
        let row = sqlx::query_as::<_, ProcessingJobRow>(
            r#"
            SELECT id, session_id, stage, percent, message, terminal_status,
                   error_detail, created_at, updated_at
            FROM processing_jobs
            WHERE session_id = $1
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Record a progress callback. Percent is clamped monotonic with
    /// GREATEST so out-of-order delivery can never move the bar backwards.
    /// No-op once the job is terminal.
    pub async fn record_progress(
        &self,
        job_id: Uuid,
        stage: ProcessingStage,
        percent: i16,
        message: &str,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE processing_jobs
            SET stage = $2, percent = GREATEST(percent, $3), message = $4, updated_at = NOW()
            WHERE id = $1 AND terminal_status IS NULL
            "#,
        )
        .bind(job_id)
        .bind(stage.as_str())
        .bind(percent.clamp(0, 99))
        .bind(message)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Mark the job completed at 100%. Returns the number of rows that
    /// transitioned; 0 means the job was already terminal and the caller is
    /// looking at a replay (first terminal report wins).
    pub async fn complete(&self, job_id: Uuid, message: &str) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE processing_jobs
            SET terminal_status = 'completed', stage = 'cleanup', percent = 100,
                message = $2, updated_at = NOW()
            WHERE id = $1 AND terminal_status IS NULL
            "#,
        )
        .bind(job_id)
        .bind(message)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Mark the job failed. Percent stays wherever it was. Returns 0 when the
    /// job was already terminal.
    pub async fn fail(&self, job_id: Uuid, error_detail: &str) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE processing_jobs
            SET terminal_status = 'failed', error_detail = $2, updated_at = NOW()
            WHERE id = $1 AND terminal_status IS NULL
            "#,
        )
        .bind(job_id)
        .bind(error_detail)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Jobs that have not reached a terminal state within the ceiling.
    /// The timeout sweep marks these failed.
    pub async fn find_stuck(&self, ceiling_seconds: i64) -> Result<Vec<ProcessingJobRow>, AppError> {
        let rows = sqlx::query_as::<_, ProcessingJobRow>(
            r#"
            SELECT id, session_id, stage, percent, message, terminal_status,
                   error_detail, created_at, updated_at
            FROM processing_jobs
            WHERE terminal_status IS NULL
              AND created_at < NOW() - make_interval(secs => $1::double precision)
            "#,
        )
        .bind(ceiling_seconds as f64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

/// Processing job record
#[derive(Debug, Clone)]
pub struct ProcessingJobRow {
    pub id: Uuid,
    pub session_id: Uuid,
    pub stage: String,
    pub percent: i16,
    pub message: String,
    pub terminal_status: Option<String>,
    pub error_detail: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProcessingJobRow {
    pub fn stage(&self) -> Result<ProcessingStage, AppError> {
        self.stage.parse().map_err(|e: String| AppError::Internal(e))
    }

    pub fn terminal_status(&self) -> Result<Option<TerminalStatus>, AppError> {
        self.terminal_status
            .as_deref()
            .map(|s| s.parse().map_err(|e: String| AppError::Internal(e)))
            .transpose()
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal_status.is_some()
    }
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for ProcessingJobRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProcessingJobRow {
            id: row.get("id"),
            session_id: row.get("session_id"),
            stage: row.get("stage"),
            percent: row.get("percent"),
            message: row.get("message"),
            terminal_status: row.get("terminal_status"),
            error_detail: row.get("error_detail"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }
}
