//! Handlers for essay correction ingestion and grading.
//!
//! Both endpoints end in the same place: a normalized [`Feedback`] attached
//! to a submission the caller owns. Ingestion receives the grader's output
//! from the caller; grading fetches it from the webhook first.
//!
//! [`Feedback`]: redacao_core::feedback::Feedback

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::Json;
use redacao_core::normalizer::{normalize, normalize_reply, ReplyBody};
use redacao_core::submission::{validate_correction_status, Submission};
use redacao_core::types::DbId;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::CorrectionResponse;
use crate::state::AppState;

/* --------------------------------------------------------------------------
Request bodies
-------------------------------------------------------------------------- */

/// Body of `POST /corrections`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestCorrection {
    pub submission_id: Option<String>,
    /// Feedback-shaped object, raw grader JSON, or free-text report.
    pub correcao: Option<Value>,
    pub status: Option<String>,
}

/// Body of `POST /submissions/{id}/grade`. Every field is optional.
#[derive(Debug, Default, Deserialize)]
pub struct GradeSubmission {
    /// Sent to the grader verbatim; defaults to [`default_grading_payload`].
    pub payload: Option<Value>,
    pub status: Option<String>,
}

/* --------------------------------------------------------------------------
Helpers
-------------------------------------------------------------------------- */

fn parse_submission_id(raw: Option<&str>) -> AppResult<DbId> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("submissionId is required".into()))?;
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("submissionId '{raw}' is not a valid id")))
}

/// Reject any requested status that is not a corrected spelling.
fn checked_status(status: Option<&str>) -> AppResult<Option<&str>> {
    if let Some(status) = status {
        validate_correction_status(status)?;
    }
    Ok(status)
}

/// What the grader receives when the caller sends no payload.
pub fn default_grading_payload(submission: &Submission) -> Value {
    json!({
        "submissionId": submission.id,
        "ownerId": submission.owner_id,
        "title": submission.title,
    })
}

/* --------------------------------------------------------------------------
Handlers
-------------------------------------------------------------------------- */

/// POST /corrections
///
/// Normalize a grader reply supplied by the caller and attach it to the
/// caller's submission.
pub async fn ingest_correction(
    auth: AuthUser,
    State(state): State<AppState>,
    body: Result<Json<IngestCorrection>, JsonRejection>,
) -> AppResult<Json<CorrectionResponse>> {
    let Json(input) = body
        .map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e.body_text())))?;

    let submission_id = parse_submission_id(input.submission_id.as_deref())?;
    let correcao = input
        .correcao
        .ok_or_else(|| AppError::BadRequest("correcao is required".into()))?;
    let status = checked_status(input.status.as_deref())?;

    let feedback = normalize_reply(&ReplyBody::from_value(correcao));
    if feedback.is_placeholder() {
        tracing::warn!(%submission_id, "Correction carried no usable feedback");
    }

    let submission = state
        .persister()
        .persist(submission_id, auth.user_id, feedback, status)
        .await?;

    tracing::info!(
        %submission_id,
        user_id = %auth.user_id,
        status = %submission.status,
        "Correction ingested"
    );

    Ok(Json(CorrectionResponse::new(submission)))
}

/// POST /submissions/{id}/grade
///
/// Send the submission to the grading webhook, normalize whatever comes
/// back and store it. Ownership is checked before the grader is contacted.
pub async fn grade_submission(
    auth: AuthUser,
    State(state): State<AppState>,
    path: Result<Path<DbId>, PathRejection>,
    body: Result<Json<GradeSubmission>, JsonRejection>,
) -> AppResult<Json<CorrectionResponse>> {
    let Path(submission_id) =
        path.map_err(|e| AppError::BadRequest(format!("Invalid submission id: {}", e.body_text())))?;
    let input = match body {
        Ok(Json(input)) => input,
        Err(JsonRejection::MissingJsonContentType(_)) => GradeSubmission::default(),
        Err(e) => {
            return Err(AppError::BadRequest(format!(
                "Invalid request body: {}",
                e.body_text()
            )))
        }
    };
    let status = checked_status(input.status.as_deref())?;
    let relay = state.relay.clone().ok_or(AppError::WebhookNotConfigured)?;

    let persister = state.persister();
    let submission = persister.load_owned(submission_id, auth.user_id).await?;

    let payload = input
        .payload
        .unwrap_or_else(|| default_grading_payload(&submission));
    let reply = relay.relay(&payload).await;

    let feedback = normalize(&reply.body_text);
    if feedback.is_placeholder() {
        tracing::warn!(
            %submission_id,
            grader_status = ?reply.status_code,
            "Grader reply carried no usable feedback"
        );
    }

    let stored = persister
        .persist(submission_id, auth.user_id, feedback, status)
        .await?;

    tracing::info!(
        %submission_id,
        user_id = %auth.user_id,
        status = %stored.status,
        final_score = stored.feedback.as_ref().map(|f| f.final_score),
        "Submission graded"
    );

    Ok(Json(CorrectionResponse::new(stored)))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use redacao_core::error::CoreError;

    use super::*;

    #[test]
    fn submission_id_must_be_present_and_a_uuid() {
        assert_matches!(parse_submission_id(None), Err(AppError::BadRequest(_)));
        assert_matches!(parse_submission_id(Some("  ")), Err(AppError::BadRequest(_)));
        assert_matches!(parse_submission_id(Some("42")), Err(AppError::BadRequest(_)));

        let id = DbId::new_v4();
        assert_eq!(parse_submission_id(Some(id.to_string().as_str())).unwrap(), id);
    }

    #[test]
    fn only_corrected_statuses_are_accepted() {
        assert_eq!(checked_status(None).unwrap(), None);
        assert_eq!(checked_status(Some("corrigido")).unwrap(), Some("corrigido"));
        assert_matches!(
            checked_status(Some("draft")),
            Err(AppError::Core(CoreError::Validation(_)))
        );
    }
}
