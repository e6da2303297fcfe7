//! Submission row model.

use redacao_core::feedback::Feedback;
use redacao_core::submission::Submission;
use redacao_core::types::{DbId, Timestamp};
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from the `submissions` table.
#[derive(Debug, Clone, FromRow)]
pub struct SubmissionRow {
    pub id: DbId,
    pub owner_id: DbId,
    pub title: Option<String>,
    pub status: String,
    pub feedback: Option<Json<Feedback>>,
    pub corrected_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<SubmissionRow> for Submission {
    fn from(row: SubmissionRow) -> Self {
        Submission {
            id: row.id,
            owner_id: row.owner_id,
            title: row.title,
            status: row.status,
            feedback: row.feedback.map(|Json(feedback)| feedback),
            corrected_at: row.corrected_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
