//! PostgreSQL implementation of RecordingRepository.
//!
//! `(session_id, recording_sid)` is unique, so a racing duplicate insert
//! surfaces as `DuplicateRecord`.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::PgPool;

use super::rows::{get, insert_error, seconds_column};
use crate::domain::call::Recording;
use crate::domain::foundation::{CallSessionId, DomainError, ErrorCode, RecordingId, Timestamp};
use crate::ports::RecordingRepository;

#[derive(Clone)]
pub struct PostgresRecordingRepository {
    pool: PgPool,
}

impl PostgresRecordingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordingRepository for PostgresRecordingRepository {
    async fn exists_for_session(
        &self,
        session_id: &CallSessionId,
        recording_sid: &str,
    ) -> Result<bool, DomainError> {
        let result: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM recordings WHERE session_id = $1 AND recording_sid = $2",
        )
        .bind(session_id.as_uuid())
        .bind(recording_sid)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to check recording existence", e))?;

        Ok(result.0 > 0)
    }

    async fn save(&self, recording: &Recording) -> Result<(), DomainError> {
        let duration = seconds_column(recording.duration_seconds())?;
        sqlx::query(
            r#"
            INSERT INTO recordings (
                id, session_id, recording_sid, url, duration_seconds, audio_attached, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(recording.id().as_uuid())
        .bind(recording.session_id().as_uuid())
        .bind(recording.recording_sid())
        .bind(recording.url())
        .bind(duration)
        .bind(recording.is_audio_attached())
        .bind(recording.created_at().as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| insert_error("Failed to insert recording", e))?;

        Ok(())
    }

    async fn update(&self, recording: &Recording) -> Result<(), DomainError> {
        let duration = seconds_column(recording.duration_seconds())?;
        let result = sqlx::query(
            "UPDATE recordings SET url = $2, duration_seconds = $3, audio_attached = $4 WHERE id = $1",
        )
        .bind(recording.id().as_uuid())
        .bind(recording.url())
        .bind(duration)
        .bind(recording.is_audio_attached())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to update recording", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::RecordingNotFound,
                format!("Recording not found: {}", recording.id()),
            ));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &RecordingId) -> Result<Option<Recording>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT id, session_id, recording_sid, url, duration_seconds, audio_attached, created_at
            FROM recordings WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch recording", e))?;

        row.as_ref().map(row_to_recording).transpose()
    }
}

fn row_to_recording(row: &PgRow) -> Result<Recording, DomainError> {
    let duration: Option<i32> = get(row, "duration_seconds")?;
    let created_at: chrono::DateTime<chrono::Utc> = get(row, "created_at")?;

    Ok(Recording::reconstitute(
        RecordingId::from_uuid(get(row, "id")?),
        CallSessionId::from_uuid(get(row, "session_id")?),
        get(row, "recording_sid")?,
        get(row, "url")?,
        duration.and_then(|d| u32::try_from(d).ok()),
        get(row, "audio_attached")?,
        Timestamp::from_datetime(created_at),
    ))
}
