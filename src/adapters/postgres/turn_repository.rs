//! PostgreSQL implementation of TurnRepository.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::PgPool;

use super::rows::{get, insert_error};
use crate::domain::call::{ResponseTurn, TurnInput};
use crate::domain::foundation::{
    CallSessionId, CallerId, DomainError, ErrorCode, RecordingId, Timestamp, TurnId,
};
use crate::domain::tree::PromptHandle;
use crate::ports::TurnRepository;

pub(super) const TURN_COLUMNS: &str =
    "id, session_id, prompt_handle, digits, transcription, transcribed, timeout, recording_id, created_at";

#[derive(Clone)]
pub struct PostgresTurnRepository {
    pool: PgPool,
}

impl PostgresTurnRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TurnRepository for PostgresTurnRepository {
    async fn save(&self, turn: &ResponseTurn) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO response_turns (
                id, session_id, prompt_handle, digits, transcription, transcribed,
                timeout, recording_id, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(turn.id().as_uuid())
        .bind(turn.session_id().as_uuid())
        .bind(turn.prompt_handle().as_str())
        .bind(turn.digits())
        .bind(turn.transcription())
        .bind(turn.is_transcribed())
        .bind(turn.is_timeout())
        .bind(turn.recording_id().map(|r| *r.as_uuid()))
        .bind(turn.created_at().as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| insert_error("Failed to insert turn", e))?;

        Ok(())
    }

    async fn record_input(&self, id: &TurnId, input: &TurnInput) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE response_turns SET
                digits = COALESCE(digits, $2),
                transcribed = transcribed OR (transcription IS NULL AND $3::text IS NOT NULL),
                transcription = COALESCE(transcription, $3)
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(input.digits.as_deref())
        .bind(input.transcription.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to record turn input", e))?;

        ensure_found(result.rows_affected(), id)
    }

    async fn mark_timed_out(&self, id: &TurnId) -> Result<(), DomainError> {
        let result = sqlx::query("UPDATE response_turns SET timeout = TRUE WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to mark turn timed out", e))?;

        ensure_found(result.rows_affected(), id)
    }

    async fn attach_recording(
        &self,
        id: &TurnId,
        recording_id: &RecordingId,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE response_turns SET recording_id = COALESCE(recording_id, $2) WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(recording_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to attach recording to turn", e))?;

        ensure_found(result.rows_affected(), id)
    }

    async fn find_by_id(&self, id: &TurnId) -> Result<Option<ResponseTurn>, DomainError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM response_turns WHERE id = $1",
            TURN_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch turn", e))?;

        row.as_ref().map(row_to_turn).transpose()
    }

    async fn latest_for_handle(
        &self,
        session_id: &CallSessionId,
        handle: &PromptHandle,
        limit: usize,
    ) -> Result<Vec<ResponseTurn>, DomainError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM response_turns \
             WHERE session_id = $1 AND prompt_handle = $2 \
             ORDER BY created_at DESC, id DESC LIMIT $3",
            TURN_COLUMNS
        ))
        .bind(session_id.as_uuid())
        .bind(handle.as_str())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch recent turns", e))?;

        rows.iter().map(row_to_turn).collect()
    }

    async fn history_for_caller(
        &self,
        caller_id: &CallerId,
        tree_name: &str,
    ) -> Result<Vec<ResponseTurn>, DomainError> {
        let columns = TURN_COLUMNS
            .split(", ")
            .map(|c| format!("t.{}", c))
            .collect::<Vec<_>>()
            .join(", ");
        let rows = sqlx::query(&format!(
            "SELECT {} FROM response_turns t \
             JOIN call_sessions s ON s.id = t.session_id \
             WHERE s.caller_id = $1 AND s.tree_name = $2 \
             ORDER BY t.created_at, t.id",
            columns
        ))
        .bind(caller_id.as_uuid())
        .bind(tree_name)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch caller history", e))?;

        rows.iter().map(row_to_turn).collect()
    }
}

fn ensure_found(rows_affected: u64, id: &TurnId) -> Result<(), DomainError> {
    if rows_affected == 0 {
        return Err(DomainError::new(
            ErrorCode::TurnNotFound,
            format!("Turn not found: {}", id),
        ));
    }
    Ok(())
}

pub(super) fn row_to_turn(row: &PgRow) -> Result<ResponseTurn, DomainError> {
    let prompt_handle: String = get(row, "prompt_handle")?;
    let recording_id: Option<uuid::Uuid> = get(row, "recording_id")?;
    let created_at: chrono::DateTime<chrono::Utc> = get(row, "created_at")?;

    Ok(ResponseTurn::reconstitute(
        TurnId::from_uuid(get(row, "id")?),
        CallSessionId::from_uuid(get(row, "session_id")?),
        PromptHandle::from(prompt_handle),
        get(row, "digits")?,
        get(row, "transcription")?,
        get(row, "transcribed")?,
        get(row, "timeout")?,
        recording_id.map(RecordingId::from_uuid),
        Timestamp::from_datetime(created_at),
    ))
}
