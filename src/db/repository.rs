//! Database repository for CRUD operations.
//!
//! Uses prepared statements and transactions for data integrity. Operations are
//! split by collection across `users`, `projects` and `approval`.

use chrono::Utc;
use serde::de::DeserializeOwned;
use sqlx::{Row, Sqlite, SqlitePool};

use crate::errors::AppError;
use crate::models::{
    AdminNotification, AdminProject, PendingUser, Project, ProjectStatus, Rank, RequestStatus,
    RevisionInfo, Role, User,
};

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pub(super) pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the current revision ID.
    pub async fn get_revision_id(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT revision_id FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("revision_id"))
    }

    /// Get revision info.
    pub async fn get_revision_info(&self) -> Result<RevisionInfo, AppError> {
        let row = sqlx::query("SELECT revision_id, generated_at FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(RevisionInfo {
            revision_id: row.get("revision_id"),
            generated_at: row.get("generated_at"),
        })
    }

    /// Increment the revision ID and return the new value.
    pub async fn increment_revision(&self) -> Result<i64, AppError> {
        bump_revision(&self.pool).await?;
        self.get_revision_id().await
    }

    /// Whether an email or username is held by a user or by another pending request.
    pub async fn identity_taken(&self, email: &str, user_name: &str) -> Result<bool, AppError> {
        identity_taken(&self.pool, email, user_name, None).await
    }
}

/// Bump the revision counter on any executor, including an open transaction.
pub(super) async fn bump_revision<'e, E>(executor: E) -> Result<(), AppError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let now = Utc::now().to_rfc3339();
    sqlx::query("UPDATE meta SET revision_id = revision_id + 1, generated_at = ? WHERE id = 1")
        .bind(&now)
        .execute(executor)
        .await?;
    Ok(())
}

/// Scan users and pending requests for an email or username, optionally ignoring
/// one pending request (the one being approved).
pub(super) async fn identity_taken<'e, E>(
    executor: E,
    email: &str,
    user_name: &str,
    ignore_pending_id: Option<&str>,
) -> Result<bool, AppError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        r#"SELECT
            EXISTS(SELECT 1 FROM users WHERE email = ?1 OR user_name = ?2)
            OR EXISTS(SELECT 1 FROM pending_users
                      WHERE (email = ?1 OR user_name = ?2) AND id != ?3) AS taken"#,
    )
    .bind(email)
    .bind(user_name)
    .bind(ignore_pending_id.unwrap_or(""))
    .fetch_one(executor)
    .await?;
    let taken: i64 = row.get("taken");
    Ok(taken != 0)
}

/// Emails compare case-insensitively; usernames only ignore surrounding whitespace.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn normalize_user_name(user_name: &str) -> String {
    user_name.trim().to_string()
}

// Helper functions for row conversion

pub(super) const USER_COLUMNS: &str = "id, user_name, first_name, last_name, address, dob, email, role, rank, is_active_member, description, profile_pic, skills, social, projects, created_at, updated_at, version";

pub(super) fn user_from_row(row: &sqlx::sqlite::SqliteRow) -> User {
    let is_active_member: i32 = row.get("is_active_member");
    let role: String = row.get("role");
    let rank: Option<String> = row.get("rank");
    let skills: String = row.get("skills");
    let social: String = row.get("social");
    let projects: String = row.get("projects");
    User {
        id: row.get("id"),
        user_name: row.get("user_name"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        address: row.get("address"),
        dob: row.get("dob"),
        email: row.get("email"),
        role: Role::from_str(&role).unwrap_or(Role::Student),
        rank: rank.and_then(|r| Rank::from_str(&r)),
        is_active_member: is_active_member != 0,
        description: row.get("description"),
        profile_pic: row.get("profile_pic"),
        skills: parse_json_array(&skills),
        social: parse_json_or_default(&social),
        projects: parse_json_or_default(&projects),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        version: row.get("version"),
    }
}

pub(super) const PENDING_COLUMNS: &str = "id, user_name, first_name, last_name, address, dob, email, role, rank, profile_pic, description, is_active_member, password_hash, status, requested_at";

pub(super) fn pending_from_row(row: &sqlx::sqlite::SqliteRow) -> PendingUser {
    let is_active_member: i32 = row.get("is_active_member");
    let role: String = row.get("role");
    let rank: Option<String> = row.get("rank");
    let status: String = row.get("status");
    PendingUser {
        id: row.get("id"),
        user_name: row.get("user_name"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        address: row.get("address"),
        dob: row.get("dob"),
        email: row.get("email"),
        role: Role::from_str(&role).unwrap_or(Role::Student),
        rank: rank.and_then(|r| Rank::from_str(&r)),
        profile_pic: row.get("profile_pic"),
        description: row.get("description"),
        is_active_member: is_active_member != 0,
        status: RequestStatus::from_str(&status).unwrap_or_default(),
        requested_at: row.get("requested_at"),
        password_hash: row.get("password_hash"),
    }
}

pub(super) const NOTIFICATION_COLUMNS: &str = "id, kind, pending_user_id, user_name, email, first_name, last_name, role, message, read, status, created_at, reviewed_at, review_note";

pub(super) fn notification_from_row(row: &sqlx::sqlite::SqliteRow) -> AdminNotification {
    let read: i32 = row.get("read");
    let role: String = row.get("role");
    let status: String = row.get("status");
    AdminNotification {
        id: row.get("id"),
        kind: row.get("kind"),
        pending_user_id: row.get("pending_user_id"),
        user_name: row.get("user_name"),
        email: row.get("email"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        role: Role::from_str(&role).unwrap_or(Role::Student),
        message: row.get("message"),
        read: read != 0,
        status: RequestStatus::from_str(&status).unwrap_or_default(),
        created_at: row.get("created_at"),
        reviewed_at: row.get("reviewed_at"),
        review_note: row.get("review_note"),
    }
}

pub(super) const PROJECT_COLUMNS: &str =
    "id, name, description, image, status, mentor_id, is_archived, created_at, updated_at, version";

pub(super) fn project_from_row(row: &sqlx::sqlite::SqliteRow) -> Project {
    let is_archived: i32 = row.get("is_archived");
    let status: String = row.get("status");
    Project {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        image: row.get("image"),
        status: ProjectStatus::from_str(&status).unwrap_or_default(),
        mentor_id: row.get("mentor_id"),
        is_archived: is_archived != 0,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        version: row.get("version"),
    }
}

pub(super) const ADMIN_PROJECT_COLUMNS: &str = "id, name, description, mentor_id, student_ids, project_type, image, status, is_archived, created_at, updated_at, version";

pub(super) fn admin_project_from_row(row: &sqlx::sqlite::SqliteRow) -> AdminProject {
    let is_archived: i32 = row.get("is_archived");
    let status: String = row.get("status");
    let student_ids: String = row.get("student_ids");
    AdminProject {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        mentor_id: row.get("mentor_id"),
        student_ids: parse_json_array(&student_ids),
        project_type: row.get("project_type"),
        image: row.get("image"),
        status: ProjectStatus::from_str(&status).unwrap_or_default(),
        is_archived: is_archived != 0,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        version: row.get("version"),
    }
}

pub(super) fn parse_json_array(s: &str) -> Vec<String> {
    parse_json_or_default(s)
}

pub(super) fn parse_json_or_default<T: DeserializeOwned + Default>(s: &str) -> T {
    serde_json::from_str(s).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PersonalProject, SocialLinks};

    #[test]
    fn test_normalize_identity() {
        assert_eq!(normalize_email("  Sara@Lab.EDU "), "sara@lab.edu");
        assert_eq!(normalize_user_name(" Sara.A "), "Sara.A");
    }

    #[test]
    fn test_parse_json_array_tolerates_garbage() {
        assert_eq!(parse_json_array(r#"["a","b"]"#), vec!["a", "b"]);
        assert!(parse_json_array("not json").is_empty());

        let social: SocialLinks = parse_json_or_default(r#"{"github":"https://github.com/noor"}"#);
        assert_eq!(social["github"], "https://github.com/noor");
        assert!(parse_json_or_default::<Vec<PersonalProject>>("{").is_empty());
    }
}
