//! Submission record and status vocabulary.
//!
//! Two spellings of the corrected state exist in deployed stores
//! (`corrigida` and `corrigido`); both are terminal and equivalent.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::feedback::Feedback;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Status constants
// ---------------------------------------------------------------------------

pub const STATUS_DRAFT: &str = "draft";
pub const STATUS_SUBMITTED: &str = "submitted";

/// Primary corrected spelling, tried first.
pub const STATUS_CORRIGIDA: &str = "corrigida";

/// Alternate corrected spelling, used when the store rejects the primary.
pub const STATUS_CORRIGIDO: &str = "corrigido";

/// Every status a submission may hold.
pub const VALID_STATUSES: &[&str] = &[
    STATUS_DRAFT,
    STATUS_SUBMITTED,
    STATUS_CORRIGIDA,
    STATUS_CORRIGIDO,
];

/// Statuses that mean "corrected"; feedback is present exactly in these.
pub const CORRECTED_STATUSES: &[&str] = &[STATUS_CORRIGIDA, STATUS_CORRIGIDO];

/// Whether `status` is one of the corrected spellings.
pub fn is_corrected_status(status: &str) -> bool {
    CORRECTED_STATUSES.contains(&status)
}

/// Validate a status requested for a correction write.
///
/// Only corrected spellings are accepted, since feedback is attached in the
/// same write.
pub fn validate_correction_status(status: &str) -> Result<(), CoreError> {
    if is_corrected_status(status) {
        return Ok(());
    }
    Err(CoreError::Validation(format!(
        "Invalid correction status '{status}'. Must be one of: {}",
        CORRECTED_STATUSES.join(", ")
    )))
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

/// A student's essay under correction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: DbId,
    pub owner_id: DbId,
    pub title: Option<String>,
    pub status: String,
    pub feedback: Option<Feedback>,
    pub corrected_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Submission {
    pub fn is_owned_by(&self, owner_id: DbId) -> bool {
        self.owner_id == owner_id
    }
}

/// The fields a correction writes, applied in a single store update.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionUpdate {
    pub status: String,
    pub feedback: Feedback,
    pub corrected_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn both_corrected_spellings_are_terminal() {
        assert!(is_corrected_status(STATUS_CORRIGIDA));
        assert!(is_corrected_status(STATUS_CORRIGIDO));
        assert!(!is_corrected_status(STATUS_SUBMITTED));
        assert!(!is_corrected_status(STATUS_DRAFT));
    }

    #[test]
    fn correction_status_rejects_non_terminal_values() {
        assert!(validate_correction_status("corrigido").is_ok());
        assert_matches!(
            validate_correction_status("draft"),
            Err(CoreError::Validation(msg)) if msg.contains("corrigida, corrigido")
        );
        assert_matches!(
            validate_correction_status("Corrigida"),
            Err(CoreError::Validation(_))
        );
    }
}
