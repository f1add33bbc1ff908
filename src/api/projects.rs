//! Mentor project API endpoints.
//!
//! Administrators reach every project. A mentor signed in with a member token
//! only reaches projects whose `mentorId` is their own id.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};

use super::{error, require_field, success, ApiResult};
use crate::auth::Caller;
use crate::errors::AppError;
use crate::models::{CreateProjectRequest, Project, ProjectQuery, Role, UpdateProjectRequest};
use crate::AppState;

/// `None` for administrators, the mentor's own id otherwise.
fn project_scope(caller: &Caller) -> Result<Option<&str>, AppError> {
    if caller.is_admin() {
        return Ok(None);
    }
    match caller.member() {
        Some(user) if user.role == Role::Mentor => Ok(Some(user.id.as_str())),
        _ => Err(AppError::Forbidden(
            "Only mentors can manage projects".to_string(),
        )),
    }
}

fn not_owner() -> AppError {
    AppError::Forbidden("You can only manage your own projects".to_string())
}

/// Load a project and check that the caller may act on it.
async fn owned_project(state: &AppState, caller: &Caller, id: &str) -> Result<Project, AppError> {
    let scope = project_scope(caller)?;
    let project = state
        .repo
        .get_project(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Project {} not found", id)))?;

    if scope.is_some_and(|mentor_id| mentor_id != project.mentor_id) {
        tracing::warn!(project_id = %id, "Mentor denied access to another mentor's project");
        return Err(not_owner());
    }
    Ok(project)
}

/// GET /api/projects - List mentor projects, optionally for one mentor.
pub async fn list_projects(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<ProjectQuery>,
) -> ApiResult<Vec<Project>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    let requested = query.mentor_id.as_deref().filter(|m| !m.trim().is_empty());

    let mentor_id = match project_scope(&caller) {
        Ok(None) => requested,
        Ok(Some(own)) if requested.map_or(true, |m| m == own) => Some(own),
        Ok(Some(_)) => return error(not_owner(), revision_id),
        Err(e) => return error(e, revision_id),
    };

    match state.repo.list_projects(mentor_id).await {
        Ok(projects) => success(projects, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/projects/:id - Get a single project.
pub async fn get_project(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> ApiResult<Project> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match owned_project(&state, &caller, &id).await {
        Ok(project) => success(project, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/projects - Create a mentor project.
pub async fn create_project(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(mut request): Json<CreateProjectRequest>,
) -> ApiResult<Project> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match project_scope(&caller) {
        Ok(None) => {}
        Ok(Some(own)) => {
            let requested = request.mentor_id.trim();
            if !requested.is_empty() && requested != own {
                return error(not_owner(), revision_id);
            }
            request.mentor_id = own.to_string();
        }
        Err(e) => return error(e, revision_id),
    }

    let validation = require_field(&request.name, "Project name")
        .and_then(|_| require_field(&request.description, "Project description"))
        .and_then(|_| require_field(&request.mentor_id, "Mentor"));
    if let Err(e) = validation {
        return error(e, revision_id);
    }

    match state.repo.create_project(&request).await {
        Ok(project) => {
            tracing::info!(project_id = %project.id, mentor_id = %project.mentor_id, "Created project");
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(project, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/projects/:id - Update a mentor project.
pub async fn update_project(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    Json(request): Json<UpdateProjectRequest>,
) -> ApiResult<Project> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if let Err(e) = owned_project(&state, &caller, &id).await {
        return error(e, revision_id);
    }

    if let Some(name) = &request.name {
        if let Err(e) = require_field(name, "Project name") {
            return error(e, revision_id);
        }
    }
    if let Some(description) = &request.description {
        if let Err(e) = require_field(description, "Project description") {
            return error(e, revision_id);
        }
    }

    match state.repo.update_project(&id, &request).await {
        Ok(project) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(project, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/projects/:id/archive - Toggle the archived flag on a private project.
pub async fn toggle_project_archive(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> ApiResult<Project> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if let Err(e) = owned_project(&state, &caller, &id).await {
        return error(e, revision_id);
    }

    match state.repo.toggle_project_archive(&id).await {
        Ok(project) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(project, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/projects/:id - Delete a mentor project.
pub async fn delete_project(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if let Err(e) = owned_project(&state, &caller, &id).await {
        return error(e, revision_id);
    }

    match state.repo.delete_project(&id).await {
        Ok(()) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;

    fn member(id: &str, role: &str) -> Caller {
        let user: User = serde_json::from_value(serde_json::json!({
            "id": id,
            "userName": id,
            "firstName": "",
            "lastName": "",
            "address": "",
            "dob": "",
            "email": format!("{}@lab.edu", id),
            "role": role,
            "isActiveMember": true,
            "description": "",
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z"
        }))
        .unwrap();
        Caller::Member(user)
    }

    #[test]
    fn test_project_scope_by_role() {
        assert_eq!(project_scope(&Caller::Operator).unwrap(), None);
        assert_eq!(project_scope(&member("a1", "admin")).unwrap(), None);
        assert_eq!(project_scope(&member("m1", "mentor")).unwrap(), Some("m1"));

        let err = project_scope(&member("s1", "student")).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }
}
