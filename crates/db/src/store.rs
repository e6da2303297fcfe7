//! [`SubmissionStore`] backed by PostgreSQL.

use async_trait::async_trait;
use redacao_core::store::{StoreError, SubmissionStore};
use redacao_core::submission::{CorrectionUpdate, Submission};
use redacao_core::types::DbId;

use crate::repositories::SubmissionRepo;
use crate::DbPool;

/// SQLSTATE for `check_violation`.
const CHECK_VIOLATION: &str = "23514";

pub struct PgSubmissionStore {
    pool: DbPool,
}

impl PgSubmissionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubmissionStore for PgSubmissionStore {
    async fn find_by_id(&self, id: DbId) -> Result<Option<Submission>, StoreError> {
        let row = SubmissionRepo::find_by_id(&self.pool, id)
            .await
            .map_err(|e| classify_sqlx_error(id, e))?;
        Ok(row.map(Submission::from))
    }

    async fn apply_correction(
        &self,
        id: DbId,
        update: &CorrectionUpdate,
    ) -> Result<Submission, StoreError> {
        let row = SubmissionRepo::apply_correction(&self.pool, id, update)
            .await
            .map_err(|e| classify_sqlx_error(id, e))?;
        Ok(row.into())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        crate::health_check(&self.pool)
            .await
            .map_err(|e| StoreError::Other(e.to_string()))
    }
}

/// Classify a sqlx error for the correction flow.
///
/// - `RowNotFound` maps to [`StoreError::NotFound`].
/// - PostgreSQL check violations (`23514`) map to
///   [`StoreError::ConstraintViolation`] carrying the constraint name.
/// - Everything else maps to [`StoreError::Other`].
fn classify_sqlx_error(id: DbId, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::RowNotFound => StoreError::NotFound(id),
        sqlx::Error::Database(db_err) => {
            if db_err.code().as_deref() == Some(CHECK_VIOLATION) {
                let constraint = db_err.constraint().unwrap_or("unknown").to_string();
                tracing::debug!(record_id = %id, %constraint, "Check constraint violation");
                return StoreError::ConstraintViolation { constraint };
            }
            StoreError::Other(db_err.to_string())
        }
        other => StoreError::Other(other.to_string()),
    }
}
