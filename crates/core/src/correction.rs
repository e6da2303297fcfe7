//! Attaching canonical feedback to a submission.
//!
//! [`CorrectionPersister::persist`] looks the submission up, verifies the
//! caller owns it, then writes status, feedback and correction time in a
//! single update. When the store rejects the status value through its check
//! constraint, the write is retried once with the alternate corrected
//! spelling described by [`StatusFallbackPolicy`].

use std::sync::Arc;

use chrono::Utc;

use crate::error::CoreError;
use crate::feedback::Feedback;
use crate::store::{StoreError, SubmissionStore};
use crate::submission::{CorrectionUpdate, Submission, STATUS_CORRIGIDA, STATUS_CORRIGIDO};
use crate::types::DbId;

/// Status values tried for a correction write, in order.
///
/// At most two writes are ever attempted: `primary`, then `fallback` if the
/// first was rejected by a status constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusFallbackPolicy {
    pub primary: String,
    pub fallback: String,
}

impl Default for StatusFallbackPolicy {
    fn default() -> Self {
        Self {
            primary: STATUS_CORRIGIDA.to_string(),
            fallback: STATUS_CORRIGIDO.to_string(),
        }
    }
}

impl StatusFallbackPolicy {
    /// Status sequence for a write, honouring a caller-requested primary.
    ///
    /// The fallback is omitted when it equals the primary.
    pub fn attempts(&self, requested: Option<&str>) -> Vec<String> {
        let primary = requested.unwrap_or(&self.primary).to_string();
        if primary == self.fallback {
            vec![primary]
        } else {
            vec![primary, self.fallback.clone()]
        }
    }
}

/// Writes corrections through a [`SubmissionStore`].
#[derive(Clone)]
pub struct CorrectionPersister {
    store: Arc<dyn SubmissionStore>,
    policy: StatusFallbackPolicy,
}

impl CorrectionPersister {
    pub fn new(store: Arc<dyn SubmissionStore>) -> Self {
        Self::with_policy(store, StatusFallbackPolicy::default())
    }

    pub fn with_policy(store: Arc<dyn SubmissionStore>, policy: StatusFallbackPolicy) -> Self {
        Self { store, policy }
    }

    /// Fetch a submission and check that `caller_id` owns it.
    ///
    /// Used on its own before contacting the grader, and as the first step
    /// of [`persist`](Self::persist).
    pub async fn load_owned(
        &self,
        submission_id: DbId,
        caller_id: DbId,
    ) -> Result<Submission, CoreError> {
        let submission = self
            .store
            .find_by_id(submission_id)
            .await
            .map_err(|e| persistence_error(submission_id, e))?
            .ok_or(CoreError::NotFound {
                entity: "Submission",
                id: submission_id,
            })?;

        if !submission.is_owned_by(caller_id) {
            tracing::warn!(
                submission_id = %submission_id,
                caller_id = %caller_id,
                "Correction rejected: caller does not own submission"
            );
            return Err(CoreError::Forbidden(
                "You do not have permission to correct this submission".to_string(),
            ));
        }

        Ok(submission)
    }

    /// Attach `feedback` to the submission and mark it corrected.
    pub async fn persist(
        &self,
        submission_id: DbId,
        caller_id: DbId,
        feedback: Feedback,
        requested_status: Option<&str>,
    ) -> Result<Submission, CoreError> {
        self.load_owned(submission_id, caller_id).await?;

        let corrected_at = Utc::now();
        let attempts = self.policy.attempts(requested_status);
        let mut last_error = None;

        for status in attempts {
            let update = CorrectionUpdate {
                status,
                feedback: feedback.clone(),
                corrected_at,
            };

            match self.store.apply_correction(submission_id, &update).await {
                Ok(stored) => {
                    tracing::info!(
                        submission_id = %submission_id,
                        status = %stored.status,
                        final_score = feedback.final_score,
                        "Correction persisted"
                    );
                    return Ok(stored);
                }
                Err(e) if e.is_status_constraint() => {
                    tracing::warn!(
                        submission_id = %submission_id,
                        status = %update.status,
                        error = %e,
                        "Store rejected correction status"
                    );
                    last_error = Some(e);
                }
                Err(StoreError::NotFound(id)) => {
                    return Err(CoreError::NotFound {
                        entity: "Submission",
                        id,
                    });
                }
                Err(e) => return Err(persistence_error(submission_id, e)),
            }
        }

        let error = last_error.unwrap_or_else(|| StoreError::Other("no status attempted".into()));
        Err(CoreError::Persistence {
            message: error.to_string(),
            details: Some(format!(
                "No accepted correction status among: {}",
                self.policy.attempts(requested_status).join(", ")
            )),
        })
    }
}

fn persistence_error(submission_id: DbId, error: StoreError) -> CoreError {
    tracing::error!(submission_id = %submission_id, error = %error, "Submission store failure");
    CoreError::Persistence {
        message: error.to_string(),
        details: None,
    }
}
