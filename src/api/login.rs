//! Public login endpoint.

use axum::{extract::State, Json};
use serde::Serialize;

use super::{error, success, ApiResult};
use crate::auth::password::verify_password_async;
use crate::auth::token::IssuedToken;
use crate::errors::AppError;
use crate::models::{LoginRequest, User};
use crate::AppState;

const INVALID_CREDENTIALS: &str = "Invalid credentials. Please try again.";

/// Signed-in member and the bearer token for later requests.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: User,
    #[serde(flatten)]
    pub token: IssuedToken,
}

/// POST /api/login - Verify an email or username and password, then issue a token.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    let invalid = || AppError::Unauthorized(INVALID_CREDENTIALS.to_string());

    if request.identifier.trim().is_empty() || request.password.is_empty() {
        return error(invalid(), revision_id);
    }

    // Pending requests have no credential, so they fall through to the same error
    let (user, password_hash) = match state.repo.find_login(&request.identifier).await {
        Ok(Some(found)) => found,
        Ok(None) => return error(invalid(), revision_id),
        Err(e) => return error(e, revision_id),
    };

    match verify_password_async(request.password, password_hash).await {
        Ok(true) => match state.tokens.issue(&user) {
            Ok(token) => {
                tracing::info!(user_id = %user.id, "User logged in");
                success(LoginResponse { user, token }, revision_id)
            }
            Err(e) => error(e, revision_id),
        },
        Ok(false) => {
            tracing::debug!(user_id = %user.id, "Password mismatch");
            error(invalid(), revision_id)
        }
        Err(e) => error(e, revision_id),
    }
}
