use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::warn;

use crate::auth::repo_types::User;
use crate::auth::services::AuthService;
use crate::error::AppError;
use crate::state::AppState;

/// Resolves `Authorization: Bearer <token>` to the session's user.
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let unauthorized = || AppError::Unauthorized("unauthorized".into());

        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(unauthorized)?;

        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .ok_or_else(unauthorized)?;

        let user = AuthService::new(state.users.as_ref(), &state.config.auth)
            .authenticate(token)
            .await
            .map_err(|e| {
                if matches!(e, AppError::Unauthorized(_)) {
                    warn!("invalid or expired session");
                }
                e
            })?;

        Ok(AuthUser(user))
    }
}
