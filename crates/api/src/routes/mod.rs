pub mod corrections;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /corrections                     ingestion of grader output
/// /submissions/{id}/grade          grade through the webhook, then store
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().merge(corrections::router())
}
