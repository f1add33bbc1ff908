//! Public portfolio and change-detection endpoints.

use axum::extract::{Path, State};

use super::{error, success, ApiResult};
use crate::errors::{AppError, AppErrorWithRevision};
use crate::models::{PublicMember, PublicProfile, PublicProjects, RevisionInfo, Role};
use crate::AppState;

/// GET /api/public/projects - Public, non-archived projects of both kinds.
pub async fn list_public_projects(State(state): State<AppState>) -> ApiResult<PublicProjects> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let projects = state
        .repo
        .list_public_projects()
        .await
        .map_err(|e| AppErrorWithRevision {
            error: e,
            revision_id,
        })?;

    success(projects, revision_id)
}

/// GET /api/public/members - Active members, mentors first.
pub async fn list_public_members(State(state): State<AppState>) -> ApiResult<Vec<PublicMember>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let members = state
        .repo
        .list_active_members()
        .await
        .map_err(|e| AppErrorWithRevision {
            error: e,
            revision_id,
        })?;

    success(
        members.into_iter().map(PublicMember::from).collect(),
        revision_id,
    )
}

/// GET /api/public/members/:id - One active member's profile page.
pub async fn get_public_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<PublicProfile> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    // Inactive members are hidden the same way as missing ones
    let user = match state.repo.get_user(&id).await {
        Ok(Some(user)) if user.is_active_member => user,
        Ok(_) => {
            return error(
                AppError::NotFound(format!("Member {} not found", id)),
                revision_id,
            )
        }
        Err(e) => return error(e, revision_id),
    };

    let mentor_projects = if user.role == Role::Mentor {
        match state.repo.list_public_projects_by_mentor(&user.id).await {
            Ok(projects) => projects,
            Err(e) => return error(e, revision_id),
        }
    } else {
        Vec::new()
    };

    success(
        PublicProfile {
            member: PublicMember::from(user),
            mentor_projects,
        },
        revision_id,
    )
}

/// GET /api/revision - Get the current revision info.
pub async fn get_revision(State(state): State<AppState>) -> ApiResult<RevisionInfo> {
    let revision_info = state
        .repo
        .get_revision_info()
        .await
        .map_err(|e| AppErrorWithRevision {
            error: e,
            revision_id: 0,
        })?;

    success(revision_info.clone(), revision_info.revision_id)
}
