//! Persistence seam for submissions.
//!
//! The correction flow only ever reads a submission by id and writes its
//! status, feedback and correction timestamp. Implementations classify
//! their failures into [`StoreError`] so callers can react to a rejected
//! status without inspecting driver-specific error codes.

use async_trait::async_trait;

use crate::submission::{CorrectionUpdate, Submission};
use crate::types::DbId;

/// Classified store failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The record disappeared between lookup and write.
    #[error("Record {0} not found")]
    NotFound(DbId),

    /// A check constraint rejected a column value.
    #[error("Check constraint violated: {constraint}")]
    ConstraintViolation { constraint: String },

    /// Anything else (connectivity, serialization, other constraints).
    #[error("Store error: {0}")]
    Other(String),
}

impl StoreError {
    /// Whether this failure is a check constraint on the `status` column.
    pub fn is_status_constraint(&self) -> bool {
        match self {
            StoreError::ConstraintViolation { constraint } => {
                constraint.to_ascii_lowercase().contains("status")
            }
            _ => false,
        }
    }
}

/// Read-by-id and correction write for submissions.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Fetch a submission, `Ok(None)` when it does not exist.
    async fn find_by_id(&self, id: DbId) -> Result<Option<Submission>, StoreError>;

    /// Apply a correction to a submission and return the stored record.
    async fn apply_correction(
        &self,
        id: DbId,
        update: &CorrectionUpdate,
    ) -> Result<Submission, StoreError>;

    /// Cheap reachability probe used by the health endpoint.
    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
