//! In-memory [`SubmissionStore`] for tests.
//!
//! Mimics a relational store with a check constraint on `status`: writes
//! with a status outside the accepted set fail atomically with
//! [`StoreError::ConstraintViolation`] and leave the record untouched.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::store::{StoreError, SubmissionStore};
use crate::submission::{CorrectionUpdate, Submission, STATUS_SUBMITTED, VALID_STATUSES};
use crate::types::DbId;

/// Constraint name reported for rejected statuses.
pub const STATUS_CONSTRAINT: &str = "submissions_status_check";

pub struct InMemorySubmissionStore {
    records: Mutex<HashMap<DbId, Submission>>,
    accepted_statuses: Vec<String>,
    write_attempts: AtomicUsize,
    fail_writes_with: Option<StoreError>,
}

impl InMemorySubmissionStore {
    /// A store accepting every known status.
    pub fn new() -> Self {
        Self::accepting(VALID_STATUSES)
    }

    /// A store whose status constraint only admits `statuses`.
    pub fn accepting(statuses: &[&str]) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            accepted_statuses: statuses.iter().map(|s| s.to_string()).collect(),
            write_attempts: AtomicUsize::new(0),
            fail_writes_with: None,
        }
    }

    /// Make every write fail with `error` (before the status check).
    pub fn failing_writes(mut self, error: StoreError) -> Self {
        self.fail_writes_with = Some(error);
        self
    }

    /// Insert a `submitted` record owned by `owner_id` and return it.
    pub fn seed(&self, owner_id: DbId) -> Submission {
        let now = Utc::now();
        let submission = Submission {
            id: DbId::new_v4(),
            owner_id,
            title: Some("A persistência da violência contra a mulher".to_string()),
            status: STATUS_SUBMITTED.to_string(),
            feedback: None,
            corrected_at: None,
            created_at: now,
            updated_at: now,
        };
        self.lock().insert(submission.id, submission.clone());
        submission
    }

    /// Current stored copy of a record.
    pub fn get(&self, id: DbId) -> Option<Submission> {
        self.lock().get(&id).cloned()
    }

    /// Number of `apply_correction` calls, successful or not.
    pub fn write_attempts(&self) -> usize {
        self.write_attempts.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<DbId, Submission>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for InMemorySubmissionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubmissionStore for InMemorySubmissionStore {
    async fn find_by_id(&self, id: DbId) -> Result<Option<Submission>, StoreError> {
        Ok(self.get(id))
    }

    async fn apply_correction(
        &self,
        id: DbId,
        update: &CorrectionUpdate,
    ) -> Result<Submission, StoreError> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = &self.fail_writes_with {
            return Err(error.clone());
        }
        if !self.accepted_statuses.iter().any(|s| *s == update.status) {
            return Err(StoreError::ConstraintViolation {
                constraint: STATUS_CONSTRAINT.to_string(),
            });
        }

        let mut records = self.lock();
        let record = records.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        record.status = update.status.clone();
        record.feedback = Some(update.feedback.clone());
        record.corrected_at = Some(update.corrected_at);
        record.updated_at = Utc::now();
        Ok(record.clone())
    }
}
