//! Repository for the `submissions` table.

use redacao_core::submission::CorrectionUpdate;
use redacao_core::types::DbId;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::submission::SubmissionRow;

/// Column list for submissions queries.
const COLUMNS: &str = "id, owner_id, title, status, feedback, corrected_at, \
    created_at, updated_at";

/// Reads submissions and writes their corrections.
pub struct SubmissionRepo;

impl SubmissionRepo {
    /// Find a submission by its ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<SubmissionRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM submissions WHERE id = $1");
        sqlx::query_as::<_, SubmissionRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Write status, feedback and correction time in one statement.
    ///
    /// Returns `RowNotFound` when no submission has this ID.
    pub async fn apply_correction(
        pool: &PgPool,
        id: DbId,
        update: &CorrectionUpdate,
    ) -> Result<SubmissionRow, sqlx::Error> {
        let query = format!(
            "UPDATE submissions SET
                status = $1,
                feedback = $2,
                corrected_at = $3,
                updated_at = NOW()
             WHERE id = $4
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SubmissionRow>(&query)
            .bind(&update.status)
            .bind(Json(&update.feedback))
            .bind(update.corrected_at)
            .bind(id)
            .fetch_one(pool)
            .await
    }
}
