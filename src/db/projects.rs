//! Mentor-authored and admin-authored project operations.

use chrono::Utc;

use super::repository::{
    admin_project_from_row, project_from_row, Repository, ADMIN_PROJECT_COLUMNS,
    PROJECT_COLUMNS,
};
use crate::errors::AppError;
use crate::models::{
    AdminProject, AdminProjectRequest, CreateProjectRequest, Project, ProjectStatus,
    PublicProjects, Role, UpdateProjectRequest, PLACEHOLDER_IMAGE,
};

impl Repository {
    // ==================== MENTOR PROJECTS ====================

    /// List mentor projects, optionally for a single mentor.
    pub async fn list_projects(&self, mentor_id: Option<&str>) -> Result<Vec<Project>, AppError> {
        let rows = match mentor_id {
            Some(mentor_id) => {
                sqlx::query(&format!(
                    "SELECT {} FROM projects WHERE mentor_id = ? ORDER BY created_at DESC",
                    PROJECT_COLUMNS
                ))
                .bind(mentor_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {} FROM projects ORDER BY created_at DESC",
                    PROJECT_COLUMNS
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.iter().map(project_from_row).collect())
    }

    /// Get a mentor project by ID.
    pub async fn get_project(&self, id: &str) -> Result<Option<Project>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM projects WHERE id = ?", PROJECT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(project_from_row))
    }

    /// Create a mentor project.
    pub async fn create_project(&self, request: &CreateProjectRequest) -> Result<Project, AppError> {
        self.require_role(&request.mentor_id, Role::Mentor).await?;

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let image = image_or_placeholder(request.image.as_deref());
        let status = request.status.unwrap_or_default();

        sqlx::query(
            r#"INSERT INTO projects (id, name, description, image, status, mentor_id, is_archived,
                   created_at, updated_at, version)
               VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?, 1)"#,
        )
        .bind(&id)
        .bind(&request.name)
        .bind(&request.description)
        .bind(&image)
        .bind(status.as_str())
        .bind(&request.mentor_id)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.increment_revision().await?;

        Ok(Project {
            id,
            name: request.name.clone(),
            description: request.description.clone(),
            image,
            status,
            mentor_id: request.mentor_id.clone(),
            is_archived: false,
            created_at: now.clone(),
            updated_at: now,
            version: 1,
        })
    }

    /// Update a mentor project. Archived projects are frozen; publishing unarchives.
    pub async fn update_project(
        &self,
        id: &str,
        request: &UpdateProjectRequest,
    ) -> Result<Project, AppError> {
        let existing = self
            .get_project(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Project {} not found", id)))?;

        if existing.is_archived {
            return Err(AppError::InvalidState(
                "Cannot edit archived projects.".to_string(),
            ));
        }

        if let Some(expected) = request.expected_version {
            if existing.version != expected {
                return Err(AppError::Conflict {
                    message: format!(
                        "Version mismatch: expected {}, current {}",
                        expected, existing.version
                    ),
                    current_version: existing.version,
                });
            }
        }

        let now = Utc::now().to_rfc3339();
        let new_version = existing.version + 1;

        let name = request.name.clone().unwrap_or(existing.name.clone());
        let description = request
            .description
            .clone()
            .unwrap_or(existing.description.clone());
        let image = match request.image.as_deref() {
            Some(image) => image_or_placeholder(Some(image)),
            None => existing.image.clone(),
        };
        let status = request.status.unwrap_or(existing.status);
        let is_archived = status == ProjectStatus::Private && existing.is_archived;

        self.write_project(
            id,
            &name,
            &description,
            &image,
            status,
            is_archived,
            &now,
            new_version,
            existing.version,
        )
        .await?;

        Ok(Project {
            id: id.to_string(),
            name,
            description,
            image,
            status,
            mentor_id: existing.mentor_id,
            is_archived,
            created_at: existing.created_at,
            updated_at: now,
            version: new_version,
        })
    }

    /// Toggle the archived flag. Only private projects can be archived.
    pub async fn toggle_project_archive(&self, id: &str) -> Result<Project, AppError> {
        let existing = self
            .get_project(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Project {} not found", id)))?;

        if existing.status != ProjectStatus::Private {
            return Err(AppError::InvalidState(
                "Only private projects can be archived.".to_string(),
            ));
        }

        let now = Utc::now().to_rfc3339();
        let new_version = existing.version + 1;
        let is_archived = !existing.is_archived;

        self.write_project(
            id,
            &existing.name,
            &existing.description,
            &existing.image,
            existing.status,
            is_archived,
            &now,
            new_version,
            existing.version,
        )
        .await?;

        tracing::info!(project_id = %id, is_archived, "Toggled project archive flag");

        Ok(Project {
            is_archived,
            updated_at: now,
            version: new_version,
            ..existing
        })
    }

    /// Delete a mentor project. Archived projects cannot be deleted.
    pub async fn delete_project(&self, id: &str) -> Result<(), AppError> {
        let existing = self
            .get_project(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Project {} not found", id)))?;

        if existing.is_archived {
            return Err(AppError::InvalidState(
                "Cannot delete archived projects.".to_string(),
            ));
        }

        let result = sqlx::query("DELETE FROM projects WHERE id = ? AND is_archived = 0")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::InvalidState(
                "Project changed while deleting; reload and retry.".to_string(),
            ));
        }

        self.increment_revision().await?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn write_project(
        &self,
        id: &str,
        name: &str,
        description: &str,
        image: &str,
        status: ProjectStatus,
        is_archived: bool,
        now: &str,
        new_version: i64,
        current_version: i64,
    ) -> Result<(), AppError> {
        // Conditional UPDATE with version check to prevent race conditions
        let result = sqlx::query(
            r#"UPDATE projects SET name = ?, description = ?, image = ?, status = ?, is_archived = ?,
                   updated_at = ?, version = ?
               WHERE id = ? AND version = ?"#,
        )
        .bind(name)
        .bind(description)
        .bind(image)
        .bind(status.as_str())
        .bind(is_archived as i32)
        .bind(now)
        .bind(new_version)
        .bind(id)
        .bind(current_version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let current = self.get_project(id).await?;
            return Err(AppError::Conflict {
                message: "Concurrent modification detected".to_string(),
                current_version: current.map(|p| p.version).unwrap_or(0),
            });
        }

        self.increment_revision().await?;
        Ok(())
    }

    // ==================== ADMIN PROJECTS ====================

    /// List admin projects, optionally of one type.
    pub async fn list_admin_projects(
        &self,
        project_type: Option<&str>,
    ) -> Result<Vec<AdminProject>, AppError> {
        let rows = match project_type {
            Some(project_type) => {
                sqlx::query(&format!(
                    "SELECT {} FROM admin_projects WHERE project_type = ? ORDER BY created_at DESC",
                    ADMIN_PROJECT_COLUMNS
                ))
                .bind(project_type)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {} FROM admin_projects ORDER BY created_at DESC",
                    ADMIN_PROJECT_COLUMNS
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.iter().map(admin_project_from_row).collect())
    }

    /// Get an admin project by ID.
    pub async fn get_admin_project(&self, id: &str) -> Result<Option<AdminProject>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM admin_projects WHERE id = ?",
            ADMIN_PROJECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(admin_project_from_row))
    }

    /// Create an admin project. It starts private and unarchived.
    pub async fn create_admin_project(
        &self,
        request: &AdminProjectRequest,
    ) -> Result<AdminProject, AppError> {
        self.require_role(&request.mentor_id, Role::Mentor).await?;
        for student_id in &request.student_ids {
            self.require_role(student_id, Role::Student).await?;
        }

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let image = image_or_placeholder(request.image.as_deref());
        let student_ids_json = serde_json::to_string(&request.student_ids)?;

        sqlx::query(
            r#"INSERT INTO admin_projects (id, name, description, mentor_id, student_ids, project_type,
                   image, status, is_archived, created_at, updated_at, version)
               VALUES (?, ?, ?, ?, ?, ?, ?, 'private', 0, ?, ?, 1)"#,
        )
        .bind(&id)
        .bind(&request.name)
        .bind(&request.description)
        .bind(&request.mentor_id)
        .bind(&student_ids_json)
        .bind(&request.project_type)
        .bind(&image)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.increment_revision().await?;

        Ok(AdminProject {
            id,
            name: request.name.clone(),
            description: request.description.clone(),
            mentor_id: request.mentor_id.clone(),
            student_ids: request.student_ids.clone(),
            project_type: request.project_type.clone(),
            image,
            status: ProjectStatus::Private,
            is_archived: false,
            created_at: now.clone(),
            updated_at: now,
            version: 1,
        })
    }

    /// Replace an admin project's editable fields. Status falls back to private and
    /// the archived flag is cleared.
    pub async fn replace_admin_project(
        &self,
        id: &str,
        request: &AdminProjectRequest,
    ) -> Result<AdminProject, AppError> {
        let existing = self
            .get_admin_project(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Admin project {} not found", id)))?;

        if let Some(expected) = request.expected_version {
            if existing.version != expected {
                return Err(AppError::Conflict {
                    message: format!(
                        "Version mismatch: expected {}, current {}",
                        expected, existing.version
                    ),
                    current_version: existing.version,
                });
            }
        }

        self.require_role(&request.mentor_id, Role::Mentor).await?;
        for student_id in &request.student_ids {
            self.require_role(student_id, Role::Student).await?;
        }

        let now = Utc::now().to_rfc3339();
        let new_version = existing.version + 1;
        let image = match request.image.as_deref() {
            Some(image) => image_or_placeholder(Some(image)),
            None => existing.image.clone(),
        };
        let status = request.status.unwrap_or_default();
        let student_ids_json = serde_json::to_string(&request.student_ids)?;

        let result = sqlx::query(
            r#"UPDATE admin_projects SET name = ?, description = ?, mentor_id = ?, student_ids = ?,
                   project_type = ?, image = ?, status = ?, is_archived = 0, updated_at = ?, version = ?
               WHERE id = ? AND version = ?"#,
        )
        .bind(&request.name)
        .bind(&request.description)
        .bind(&request.mentor_id)
        .bind(&student_ids_json)
        .bind(&request.project_type)
        .bind(&image)
        .bind(status.as_str())
        .bind(&now)
        .bind(new_version)
        .bind(id)
        .bind(existing.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let current = self.get_admin_project(id).await?;
            return Err(AppError::Conflict {
                message: "Concurrent modification detected".to_string(),
                current_version: current.map(|p| p.version).unwrap_or(0),
            });
        }

        self.increment_revision().await?;

        Ok(AdminProject {
            id: id.to_string(),
            name: request.name.clone(),
            description: request.description.clone(),
            mentor_id: request.mentor_id.clone(),
            student_ids: request.student_ids.clone(),
            project_type: request.project_type.clone(),
            image,
            status,
            is_archived: false,
            created_at: existing.created_at,
            updated_at: now,
            version: new_version,
        })
    }

    /// Delete an admin project.
    pub async fn delete_admin_project(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM admin_projects WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Admin project {} not found", id)));
        }

        self.increment_revision().await?;
        Ok(())
    }

    // ==================== PORTFOLIO ====================

    /// Public, non-archived projects of both shapes.
    pub async fn list_public_projects(&self) -> Result<PublicProjects, AppError> {
        let mentor_rows = sqlx::query(&format!(
            "SELECT {} FROM projects WHERE status = 'public' AND is_archived = 0 ORDER BY created_at DESC",
            PROJECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        let admin_rows = sqlx::query(&format!(
            "SELECT {} FROM admin_projects WHERE status = 'public' AND is_archived = 0 ORDER BY created_at DESC",
            ADMIN_PROJECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(PublicProjects {
            mentor_projects: mentor_rows.iter().map(project_from_row).collect(),
            admin_projects: admin_rows.iter().map(admin_project_from_row).collect(),
        })
    }

    /// One mentor's public, non-archived projects for their profile page.
    pub async fn list_public_projects_by_mentor(
        &self,
        mentor_id: &str,
    ) -> Result<Vec<Project>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM projects WHERE mentor_id = ? AND status = 'public' AND is_archived = 0 ORDER BY created_at DESC",
            PROJECT_COLUMNS
        ))
        .bind(mentor_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(project_from_row).collect())
    }

    /// Ensure a referenced user exists and holds the given role.
    async fn require_role(&self, user_id: &str, role: Role) -> Result<(), AppError> {
        match self.get_user(user_id).await? {
            Some(user) if user.role == role => Ok(()),
            Some(user) => Err(AppError::Validation(format!(
                "User {} is a {}, expected a {}",
                user.user_name,
                user.role.as_str(),
                role.as_str()
            ))),
            None => Err(AppError::Validation(format!(
                "{} {} not found",
                capitalize(role.as_str()),
                user_id
            ))),
        }
    }
}

fn image_or_placeholder(image: Option<&str>) -> String {
    match image.map(str::trim) {
        Some(image) if !image.is_empty() => image.to_string(),
        _ => PLACEHOLDER_IMAGE.to_string(),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_or_placeholder() {
        assert_eq!(image_or_placeholder(None), PLACEHOLDER_IMAGE);
        assert_eq!(image_or_placeholder(Some("  ")), PLACEHOLDER_IMAGE);
        assert_eq!(image_or_placeholder(Some("/img/a.png")), "/img/a.png");
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("mentor"), "Mentor");
        assert_eq!(capitalize(""), "");
    }
}
