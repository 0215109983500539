//! PostgreSQL implementation of CallSessionRepository.
//!
//! Session rows carry a `version` column. `update` only succeeds when the
//! stored version matches the one the caller loaded, which serialises the
//! check-then-set of racing webhooks on one call.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::PgPool;

use super::rows::{get, insert_error, parse_column};
use super::turn_repository::{row_to_turn, TURN_COLUMNS};
use crate::domain::call::{AnsweredBy, CallDetails, CallSession, CallStatus, Direction};
use crate::domain::foundation::{CallSessionId, CallerId, DomainError, ErrorCode, Timestamp};
use crate::ports::CallSessionRepository;

const SESSION_COLUMNS: &str = "id, sid, direction, tree_name, caller_id, from_number, to_number, \
     from_city, from_province, from_country, call_status, answered_by, finished, unanswered, \
     length_seconds, version, created_at";

/// PostgreSQL implementation of CallSessionRepository.
#[derive(Clone)]
pub struct PostgresCallSessionRepository {
    pool: PgPool,
}

impl PostgresCallSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load(&self, row: Option<PgRow>) -> Result<Option<CallSession>, DomainError> {
        let Some(row) = row else {
            return Ok(None);
        };
        let id = CallSessionId::from_uuid(get(&row, "id")?);

        let turn_rows = sqlx::query(&format!(
            "SELECT {} FROM response_turns WHERE session_id = $1 ORDER BY created_at, id",
            TURN_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch turns", e))?;
        let turns = turn_rows
            .iter()
            .map(row_to_turn)
            .collect::<Result<Vec<_>, _>>()?;

        row_to_session(&row, id, turns).map(Some)
    }
}

#[async_trait]
impl CallSessionRepository for PostgresCallSessionRepository {
    async fn save(&self, session: &CallSession) -> Result<(), DomainError> {
        let details = session.details();
        sqlx::query(
            r#"
            INSERT INTO call_sessions (
                id, sid, direction, tree_name, caller_id, from_number, to_number,
                from_city, from_province, from_country, call_status, answered_by,
                finished, unanswered, length_seconds, version, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(session.id().as_uuid())
        .bind(session.sid())
        .bind(session.direction().as_str())
        .bind(session.tree_name())
        .bind(session.caller_id().as_uuid())
        .bind(&details.from_number)
        .bind(&details.to_number)
        .bind(&details.from_city)
        .bind(&details.from_province)
        .bind(&details.from_country)
        .bind(session.call_status().map(|s| s.as_str()))
        .bind(session.answered_by().map(|a| a.as_str()))
        .bind(session.is_finished())
        .bind(session.is_unanswered())
        .bind(session.length_seconds())
        .bind(session.version())
        .bind(session.created_at().as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| insert_error("Failed to insert call session", e))?;

        Ok(())
    }

    async fn update(&self, session: &mut CallSession) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE call_sessions SET
                call_status = $3,
                answered_by = $4,
                finished = $5,
                unanswered = $6,
                length_seconds = $7,
                version = version + 1
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(session.id().as_uuid())
        .bind(session.version())
        .bind(session.call_status().map(|s| s.as_str()))
        .bind(session.answered_by().map(|a| a.as_str()))
        .bind(session.is_finished())
        .bind(session.is_unanswered())
        .bind(session.length_seconds())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to update call session", e))?;

        if result.rows_affected() == 0 {
            let exists: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM call_sessions WHERE id = $1")
                .bind(session.id().as_uuid())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| DomainError::database("Failed to check call session", e))?;
            return Err(if exists.0 == 0 {
                DomainError::new(
                    ErrorCode::CallSessionNotFound,
                    format!("Call session not found: {}", session.id()),
                )
            } else {
                DomainError::conflict(format!(
                    "Call {} was modified since version {}",
                    session.sid(),
                    session.version()
                ))
            });
        }

        session.advance_version();
        Ok(())
    }

    async fn find_by_id(&self, id: &CallSessionId) -> Result<Option<CallSession>, DomainError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM call_sessions WHERE id = $1",
            SESSION_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch call session", e))?;

        self.load(row).await
    }

    async fn find_by_sid(&self, sid: &str) -> Result<Option<CallSession>, DomainError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM call_sessions WHERE sid = $1",
            SESSION_COLUMNS
        ))
        .bind(sid)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch call session by sid", e))?;

        self.load(row).await
    }

    async fn count_for_caller(
        &self,
        caller_id: &CallerId,
        tree_name: &str,
        direction: Direction,
    ) -> Result<usize, DomainError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM call_sessions \
             WHERE caller_id = $1 AND tree_name = $2 AND direction = $3",
        )
        .bind(caller_id.as_uuid())
        .bind(tree_name)
        .bind(direction.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to count caller calls", e))?;

        Ok(usize::try_from(count.0).unwrap_or_default())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Helper functions
// ════════════════════════════════════════════════════════════════════════════

fn str_to_direction(s: &str) -> Result<Direction, DomainError> {
    match s {
        "inbound" => Ok(Direction::Inbound),
        "outbound" => Ok(Direction::Outbound),
        other => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid direction: {}", other),
        )),
    }
}

fn row_to_session(
    row: &PgRow,
    id: CallSessionId,
    turns: Vec<crate::domain::call::ResponseTurn>,
) -> Result<CallSession, DomainError> {
    let direction: String = get(row, "direction")?;
    let call_status: Option<String> = get(row, "call_status")?;
    let answered_by: Option<String> = get(row, "answered_by")?;
    let created_at: chrono::DateTime<chrono::Utc> = get(row, "created_at")?;

    let call_status = call_status
        .map(|s| parse_column("call_status", &s, |v| v.parse::<CallStatus>()))
        .transpose()?;

    Ok(CallSession::reconstitute(
        id,
        get(row, "sid")?,
        str_to_direction(&direction)?,
        get(row, "tree_name")?,
        CallerId::from_uuid(get(row, "caller_id")?),
        CallDetails {
            from_number: get(row, "from_number")?,
            to_number: get(row, "to_number")?,
            from_city: get(row, "from_city")?,
            from_province: get(row, "from_province")?,
            from_country: get(row, "from_country")?,
        },
        call_status,
        answered_by.as_deref().map(AnsweredBy::from_param),
        get(row, "finished")?,
        get(row, "unanswered")?,
        get(row, "length_seconds")?,
        get(row, "version")?,
        turns,
        Timestamp::from_datetime(created_at),
    ))
}
