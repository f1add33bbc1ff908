//! Public sign-up endpoint.

use axum::{extract::State, Json};
use serde::Serialize;

use super::{
    check_identity_format, check_rank, error, parse_rank, parse_role, require_field, success,
    ApiResult,
};
use crate::auth::password::{hash_password_async, validate_new_password};
use crate::db::{normalize_email, normalize_user_name};
use crate::errors::{AppError, DUPLICATE_IDENTITY_MESSAGE};
use crate::models::{AdminNotification, NewPendingUser, PendingUser, Role, SignupRequest};
use crate::AppState;

/// Sign-up acknowledgement.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub pending_user: PendingUser,
    pub notification: AdminNotification,
}

/// POST /api/signup - Submit a sign-up request for admin approval.
pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> ApiResult<SignupResponse> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let pending = match validate_signup(&request) {
        Ok(pending) => pending,
        Err(e) => return error(e, revision_id),
    };

    // Fail fast before paying for the hash; the insert re-checks inside its transaction
    match state
        .repo
        .identity_taken(&pending.email, &pending.user_name)
        .await
    {
        Ok(false) => {}
        Ok(true) => {
            return error(
                AppError::Duplicate(DUPLICATE_IDENTITY_MESSAGE.to_string()),
                revision_id,
            )
        }
        Err(e) => return error(e, revision_id),
    }

    let password_hash = match hash_password_async(request.password.clone()).await {
        Ok(hash) => hash,
        Err(e) => return error(e, revision_id),
    };

    let new_pending = NewPendingUser {
        password_hash,
        ..pending
    };

    match state.repo.create_pending_user(&new_pending).await {
        Ok((pending_user, notification)) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(
                SignupResponse {
                    pending_user,
                    notification,
                },
                new_revision,
            )
        }
        Err(e) => error(e, revision_id),
    }
}

/// Validate a sign-up form. The returned record has an empty password hash.
fn validate_signup(request: &SignupRequest) -> Result<NewPendingUser, AppError> {
    require_field(&request.user_name, "Username")?;
    require_field(&request.first_name, "First name")?;
    require_field(&request.last_name, "Last name")?;
    require_field(&request.email, "Email")?;
    require_field(&request.role, "Role")?;
    check_identity_format(&request.user_name, &request.email)?;

    validate_new_password(&request.password, &request.confirm_password)?;

    let role = parse_role(&request.role)?;
    if role == Role::Admin {
        return Err(AppError::Validation(
            "Role must be mentor or student".to_string(),
        ));
    }
    let rank = parse_rank(request.rank.as_deref())?;
    check_rank(role, rank)?;

    Ok(NewPendingUser {
        user_name: normalize_user_name(&request.user_name),
        first_name: request.first_name.trim().to_string(),
        last_name: request.last_name.trim().to_string(),
        address: request.address.trim().to_string(),
        dob: request.dob.trim().to_string(),
        email: normalize_email(&request.email),
        role,
        rank,
        profile_pic: request.profile_pic.clone().filter(|p| !p.trim().is_empty()),
        description: request.description.clone(),
        is_active_member: request.is_active_member,
        password_hash: String::new(),
    })
}
