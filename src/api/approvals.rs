//! Sign-up approval endpoints for administrators.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::{error, parse_rank, success, ApiResult};
use crate::errors::AppError;
use crate::models::{
    AdminNotification, ApprovalDecision, ApproveRequest, NotificationQuery, PendingUser,
    RejectRequest, RequestStatus, User,
};
use crate::AppState;

/// GET /api/admin/pending-users - List sign-up requests awaiting review.
pub async fn list_pending_users(State(state): State<AppState>) -> ApiResult<Vec<PendingUser>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.list_pending_users().await {
        Ok(pending) => success(pending, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/admin/pending-users/:id - Get a single sign-up request.
pub async fn get_pending_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<PendingUser> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_pending_user(&id).await {
        Ok(Some(pending)) => success(pending, revision_id),
        Ok(None) => error(
            AppError::NotFound(format!("Pending user {} not found", id)),
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/admin/notifications - List notifications, optionally by status.
pub async fn list_notifications(
    State(state): State<AppState>,
    Query(query): Query<NotificationQuery>,
) -> ApiResult<Vec<AdminNotification>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(s) => match RequestStatus::from_str(s) {
            Some(status) => Some(status),
            None => {
                return error(
                    AppError::BadRequest(format!("Unknown notification status: {}", s)),
                    revision_id,
                )
            }
        },
    };

    match state.repo.list_notifications(status).await {
        Ok(notifications) => success(notifications, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/admin/notifications/:id/read - Mark a notification as read.
pub async fn mark_notification_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<AdminNotification> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.mark_notification_read(&id).await {
        Ok(notification) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(notification, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/admin/pending-users/:id/approve - Approve a sign-up request.
pub async fn approve_pending_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<ApproveRequest>>,
) -> ApiResult<User> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    let request = body.map(|Json(b)| b).unwrap_or_default();

    let decision = match parse_decision(request) {
        Ok(decision) => decision,
        Err(e) => return error(e, revision_id),
    };

    match state.repo.approve_pending_user(&id, &decision).await {
        Ok(user) => {
            if let Err(e) = state.search.index_user(&user).await {
                tracing::warn!("Failed to index approved user: {}", e);
            }

            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(user, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/admin/pending-users/:id/reject - Reject a sign-up request.
pub async fn reject_pending_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<RejectRequest>>,
) -> ApiResult<PendingUser> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    let request = body.map(|Json(b)| b).unwrap_or_default();
    let note = request.note.filter(|n| !n.trim().is_empty());

    match state.repo.reject_pending_user(&id, note.as_deref()).await {
        Ok(pending) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(pending, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

fn parse_decision(request: ApproveRequest) -> Result<ApprovalDecision, AppError> {
    let role = match request.role.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(s) => Some(super::parse_role(s)?),
    };

    Ok(ApprovalDecision {
        role,
        rank: parse_rank(request.rank.as_deref())?,
        note: request.note.filter(|n| !n.trim().is_empty()),
    })
}
