//! User directory and credential operations.

use chrono::Utc;
use sqlx::{Row, SqliteConnection};

use super::repository::{
    bump_revision, identity_taken, normalize_email, normalize_user_name, user_from_row,
    Repository, USER_COLUMNS,
};
use crate::errors::{AppError, DUPLICATE_IDENTITY_MESSAGE};
use crate::models::{NewAccount, Role, User, UserChanges};

impl Repository {
    /// List users ordered by username, optionally restricted to one role.
    pub async fn list_users(&self, role: Option<Role>) -> Result<Vec<User>, AppError> {
        let rows = match role {
            Some(role) => {
                sqlx::query(&format!(
                    "SELECT {} FROM users WHERE role = ? ORDER BY user_name",
                    USER_COLUMNS
                ))
                .bind(role.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!("SELECT {} FROM users ORDER BY user_name", USER_COLUMNS))
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(rows.iter().map(user_from_row).collect())
    }

    /// Active members for the portfolio, mentors first.
    pub async fn list_active_members(&self) -> Result<Vec<User>, AppError> {
        let rows = sqlx::query(&format!(
            r#"SELECT {} FROM users WHERE is_active_member = 1
               ORDER BY CASE role WHEN 'mentor' THEN 0 WHEN 'student' THEN 1 ELSE 2 END, user_name"#,
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(user_from_row).collect())
    }

    /// Get a user by ID.
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Create a credential and user record directly, without an approval step.
    pub async fn create_user(&self, account: &NewAccount) -> Result<User, AppError> {
        let mut tx = self.pool.begin().await?;

        if identity_taken(&mut *tx, &account.email, &account.user_name, None).await? {
            return Err(AppError::Duplicate(DUPLICATE_IDENTITY_MESSAGE.to_string()));
        }

        let user = insert_account(&mut tx, account).await?;
        bump_revision(&mut *tx).await?;
        tx.commit().await?;

        tracing::info!(user_id = %user.id, role = user.role.as_str(), "Created user account");
        Ok(user)
    }

    /// Update a user's profile with optimistic concurrency control.
    pub async fn update_user(&self, id: &str, changes: &UserChanges) -> Result<User, AppError> {
        let existing = self
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;

        if let Some(email) = &changes.email {
            if normalize_email(email) != existing.email {
                return Err(AppError::Validation("Email cannot be changed".to_string()));
            }
        }
        if let Some(user_name) = &changes.user_name {
            if normalize_user_name(user_name) != existing.user_name {
                return Err(AppError::Validation("Username cannot be changed".to_string()));
            }
        }

        // Check version for optimistic concurrency
        if let Some(expected) = changes.expected_version {
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

        let role = changes.role.unwrap_or(existing.role);
        let rank = match changes.rank {
            Some(rank) if !role.accepts(rank) => {
                return Err(AppError::Validation(format!(
                    "Rank {} is not valid for role {}",
                    rank.as_str(),
                    role.as_str()
                )));
            }
            Some(rank) => Some(rank),
            // A role change drops a rank that no longer fits
            None => existing.rank.filter(|r| role.accepts(*r)),
        };

        let now = Utc::now().to_rfc3339();
        let new_version = existing.version + 1;

        let first_name = changes
            .first_name
            .clone()
            .unwrap_or(existing.first_name.clone());
        let last_name = changes
            .last_name
            .clone()
            .unwrap_or(existing.last_name.clone());
        let address = changes.address.clone().unwrap_or(existing.address.clone());
        let dob = changes.dob.clone().unwrap_or(existing.dob.clone());
        let is_active_member = changes
            .is_active_member
            .unwrap_or(existing.is_active_member);
        let description = changes
            .description
            .clone()
            .unwrap_or(existing.description.clone());
        let profile_pic = match changes.profile_pic.as_deref().map(str::trim) {
            Some("") => None,
            Some(pic) => Some(pic.to_string()),
            None => existing.profile_pic.clone(),
        };
        let skills = changes.skills.clone().unwrap_or(existing.skills.clone());
        let social = changes.social.clone().unwrap_or(existing.social.clone());
        let projects = changes.projects.clone().unwrap_or(existing.projects.clone());

        let result = sqlx::query(
            r#"UPDATE users SET first_name = ?, last_name = ?, address = ?, dob = ?, role = ?, rank = ?,
                   is_active_member = ?, description = ?, profile_pic = ?, skills = ?, social = ?,
                   projects = ?, updated_at = ?, version = ?
               WHERE id = ? AND version = ?"#,
        )
        .bind(&first_name)
        .bind(&last_name)
        .bind(&address)
        .bind(&dob)
        .bind(role.as_str())
        .bind(rank.map(|r| r.as_str()))
        .bind(is_active_member as i32)
        .bind(&description)
        .bind(&profile_pic)
        .bind(serde_json::to_string(&skills)?)
        .bind(serde_json::to_string(&social)?)
        .bind(serde_json::to_string(&projects)?)
        .bind(&now)
        .bind(new_version)
        .bind(id)
        .bind(existing.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Race condition - version changed between read and write
            let current = self.get_user(id).await?;
            return Err(AppError::Conflict {
                message: "Concurrent modification detected".to_string(),
                current_version: current.map(|u| u.version).unwrap_or(0),
            });
        }

        self.increment_revision().await?;

        Ok(User {
            id: id.to_string(),
            user_name: existing.user_name,
            first_name,
            last_name,
            address,
            dob,
            email: existing.email,
            role,
            rank,
            is_active_member,
            description,
            profile_pic,
            skills,
            social,
            projects,
            created_at: existing.created_at,
            updated_at: now,
            version: new_version,
        })
    }

    /// Delete a user and its credential. Project references are left in place.
    pub async fn delete_user(&self, id: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }

        sqlx::query("DELETE FROM credentials WHERE user_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        bump_revision(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Look up a user together with the stored password hash. An identifier
    /// containing `@` is an email, anything else a username.
    pub async fn find_login(&self, identifier: &str) -> Result<Option<(User, String)>, AppError> {
        let (column, value) = if identifier.contains('@') {
            ("email", normalize_email(identifier))
        } else {
            ("user_name", normalize_user_name(identifier))
        };

        let row = sqlx::query(&format!(
            "SELECT {} FROM users WHERE {} = ?",
            USER_COLUMNS, column
        ))
        .bind(value)
        .fetch_optional(&self.pool)
        .await?;

        let Some(user) = row.as_ref().map(user_from_row) else {
            return Ok(None);
        };

        let credential = sqlx::query("SELECT password_hash FROM credentials WHERE user_id = ?")
            .bind(&user.id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(credential.map(|row| (user, row.get("password_hash"))))
    }
}

/// Write a credential and its user record on an open transaction. Both share one id.
pub(super) async fn insert_account(
    conn: &mut SqliteConnection,
    account: &NewAccount,
) -> Result<User, AppError> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        "INSERT INTO credentials (user_id, email, password_hash, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&account.email)
    .bind(&account.password_hash)
    .bind(&now)
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r#"INSERT INTO users (id, user_name, first_name, last_name, address, dob, email, role, rank,
               is_active_member, description, profile_pic, skills, social, projects,
               created_at, updated_at, version)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1)"#,
    )
    .bind(&id)
    .bind(&account.user_name)
    .bind(&account.first_name)
    .bind(&account.last_name)
    .bind(&account.address)
    .bind(&account.dob)
    .bind(&account.email)
    .bind(account.role.as_str())
    .bind(account.rank.map(|r| r.as_str()))
    .bind(account.is_active_member as i32)
    .bind(&account.description)
    .bind(&account.profile_pic)
    .bind(serde_json::to_string(&account.skills)?)
    .bind(serde_json::to_string(&account.social)?)
    .bind(serde_json::to_string(&account.projects)?)
    .bind(&now)
    .bind(&now)
    .execute(&mut *conn)
    .await?;

    Ok(User {
        id,
        user_name: account.user_name.clone(),
        first_name: account.first_name.clone(),
        last_name: account.last_name.clone(),
        address: account.address.clone(),
        dob: account.dob.clone(),
        email: account.email.clone(),
        role: account.role,
        rank: account.rank,
        is_active_member: account.is_active_member,
        description: account.description.clone(),
        profile_pic: account.profile_pic.clone(),
        skills: account.skills.clone(),
        social: account.social.clone(),
        projects: account.projects.clone(),
        created_at: now.clone(),
        updated_at: now,
        version: 1,
    })
}
