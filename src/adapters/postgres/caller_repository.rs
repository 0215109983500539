//! PostgreSQL implementation of CallerRepository.

use async_trait::async_trait;
use sqlx::PgPool;

use super::rows::{get, insert_error};
use crate::domain::call::Caller;
use crate::domain::foundation::{CallerId, DomainError, Timestamp};
use crate::ports::CallerRepository;

#[derive(Clone)]
pub struct PostgresCallerRepository {
    pool: PgPool,
}

impl PostgresCallerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CallerRepository for PostgresCallerRepository {
    async fn find_by_number(&self, phone_number: &str) -> Result<Option<Caller>, DomainError> {
        let row = sqlx::query("SELECT id, phone_number, created_at FROM callers WHERE phone_number = $1")
            .bind(phone_number)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to fetch caller", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let created_at: chrono::DateTime<chrono::Utc> = get(&row, "created_at")?;
        Ok(Some(Caller::reconstitute(
            CallerId::from_uuid(get(&row, "id")?),
            get(&row, "phone_number")?,
            Timestamp::from_datetime(created_at),
        )))
    }

    async fn save(&self, caller: &Caller) -> Result<(), DomainError> {
        sqlx::query("INSERT INTO callers (id, phone_number, created_at) VALUES ($1, $2, $3)")
            .bind(caller.id().as_uuid())
            .bind(caller.phone_number())
            .bind(caller.created_at().as_datetime())
            .execute(&self.pool)
            .await
            .map_err(|e| insert_error("Failed to insert caller", e))?;

        Ok(())
    }
}
