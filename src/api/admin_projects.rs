//! Admin project API endpoints.

use std::collections::HashSet;

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::{error, require_field, success, ApiResult};
use crate::errors::AppError;
use crate::models::{AdminProject, AdminProjectQuery, AdminProjectRequest, MAX_PROJECT_STUDENTS};
use crate::AppState;

/// GET /api/admin-projects - List admin projects, optionally by type.
pub async fn list_admin_projects(
    State(state): State<AppState>,
    Query(query): Query<AdminProjectQuery>,
) -> ApiResult<Vec<AdminProject>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    let project_type = query
        .project_type
        .as_deref()
        .filter(|t| !t.trim().is_empty());

    match state.repo.list_admin_projects(project_type).await {
        Ok(projects) => success(projects, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/admin-projects/:id - Get a single admin project.
pub async fn get_admin_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<AdminProject> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_admin_project(&id).await {
        Ok(Some(project)) => success(project, revision_id),
        Ok(None) => error(
            AppError::NotFound(format!("Admin project {} not found", id)),
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/admin-projects - Create an admin project.
pub async fn create_admin_project(
    State(state): State<AppState>,
    Json(request): Json<AdminProjectRequest>,
) -> ApiResult<AdminProject> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if let Err(e) = validate_admin_project(&request) {
        return error(e, revision_id);
    }

    match state.repo.create_admin_project(&request).await {
        Ok(project) => {
            tracing::info!(
                project_id = %project.id,
                students = project.student_ids.len(),
                "Created admin project"
            );
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(project, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/admin-projects/:id - Replace an admin project's editable fields.
pub async fn replace_admin_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<AdminProjectRequest>,
) -> ApiResult<AdminProject> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if let Err(e) = validate_admin_project(&request) {
        return error(e, revision_id);
    }

    match state.repo.replace_admin_project(&id, &request).await {
        Ok(project) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(project, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/admin-projects/:id - Delete an admin project.
pub async fn delete_admin_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.delete_admin_project(&id).await {
        Ok(()) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

fn validate_admin_project(request: &AdminProjectRequest) -> Result<(), AppError> {
    require_field(&request.name, "Project name")?;
    require_field(&request.description, "Project description")?;
    require_field(&request.mentor_id, "Mentor")?;
    require_field(&request.project_type, "Project type")?;

    if request.student_ids.is_empty() || request.student_ids.len() > MAX_PROJECT_STUDENTS {
        return Err(AppError::Validation(format!(
            "A project needs between 1 and {} students",
            MAX_PROJECT_STUDENTS
        )));
    }

    let mut seen = HashSet::new();
    if !request.student_ids.iter().all(|s| seen.insert(s.as_str())) {
        return Err(AppError::Validation(
            "A student can only be assigned once".to_string(),
        ));
    }

    Ok(())
}
