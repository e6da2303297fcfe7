//! Caller identity extractor for Axum handlers.
//!
//! Sessions are issued and validated upstream. The gateway forwards the
//! resolved user as a JSON document in the [`IDENTITY_HEADER`] header.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use redacao_core::error::CoreError;
use redacao_core::types::DbId;
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

/// Header carrying the authenticated user, e.g. `{"id": "<uuid>"}`.
pub const IDENTITY_HEADER: &str = "x-user";

/// Fields read from the identity document. Anything else is ignored.
#[derive(Debug, Deserialize)]
struct IdentityDocument {
    id: DbId,
}

/// Authenticated caller extracted from the [`IDENTITY_HEADER`] header.
///
/// ```ignore
/// async fn my_handler(user: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = %user.user_id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: DbId,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(IDENTITY_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized("Missing user identity".into()))
            })?;

        let identity: IdentityDocument = serde_json::from_str(raw).map_err(|e| {
            tracing::debug!(error = %e, "Unparseable identity header");
            AppError::Core(CoreError::Unauthorized("Invalid user identity".into()))
        })?;

        Ok(AuthUser {
            user_id: identity.id,
        })
    }
}
