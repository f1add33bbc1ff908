//! The signed-in member's own profile.

use axum::{extract::State, Extension, Json};

use super::users::parse_changes;
use super::{error, success, ApiResult};
use crate::auth::Caller;
use crate::errors::AppError;
use crate::models::{UpdateUserRequest, User};
use crate::AppState;

fn no_account() -> AppError {
    AppError::Forbidden("Sign in as a member to use this endpoint".to_string())
}

/// GET /api/me - The caller's own user record.
pub async fn get_me(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> ApiResult<User> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match caller {
        Caller::Member(user) => success(user, revision_id),
        Caller::Operator => error(no_account(), revision_id),
    }
}

/// PUT /api/me - Edit the caller's profile. Role, rank and membership stay
/// with administrators.
pub async fn update_me(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(request): Json<UpdateUserRequest>,
) -> ApiResult<User> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let Some(user) = caller.member() else {
        return error(no_account(), revision_id);
    };

    let changes = match parse_changes(request) {
        Ok(changes) => changes,
        Err(e) => return error(e, revision_id),
    };

    let self_promotion = changes.role.is_some_and(|r| r != user.role)
        || changes.rank.is_some_and(|r| Some(r) != user.rank)
        || changes
            .is_active_member
            .is_some_and(|a| a != user.is_active_member);
    if self_promotion && !caller.is_admin() {
        return error(
            AppError::Forbidden("Only administrators can change role or membership".to_string()),
            revision_id,
        );
    }

    match state.repo.update_user(&user.id, &changes).await {
        Ok(updated) => {
            if let Err(e) = state.search.index_user(&updated).await {
                tracing::warn!("Failed to re-index user: {}", e);
            }

            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(updated, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}
