//! Route definitions for essay corrections.

use axum::routing::post;
use axum::Router;

use crate::handlers::corrections;
use crate::state::AppState;

/// Correction routes, mounted under `/api/v1`.
///
/// ```text
/// POST   /corrections                 ingest_correction
/// POST   /submissions/{id}/grade      grade_submission
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/corrections", post(corrections::ingest_correction))
        .route("/submissions/{id}/grade", post(corrections::grade_submission))
}
