//! Response envelopes for API handlers.

use redacao_core::submission::Submission;
use serde::Serialize;

/// `{ "success": true, "redacao": Submission }` returned after a stored correction.
#[derive(Debug, Serialize)]
pub struct CorrectionResponse {
    pub success: bool,
    pub redacao: Submission,
}

impl CorrectionResponse {
    pub fn new(redacao: Submission) -> Self {
        Self {
            success: true,
            redacao,
        }
    }
}
