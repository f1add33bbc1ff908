//! Sign-up approval workflow.
//!
//! A sign-up writes a pending request and its notification together. Approval and
//! rejection each run in one transaction, so a notification leaves `pending`
//! exactly when its request is resolved.

use chrono::Utc;

use super::repository::{
    bump_revision, identity_taken, notification_from_row, pending_from_row, Repository,
    NOTIFICATION_COLUMNS, PENDING_COLUMNS,
};
use super::users::insert_account;
use crate::errors::{AppError, DUPLICATE_IDENTITY_MESSAGE};
use crate::models::{
    signup_message, AdminNotification, ApprovalDecision, NewAccount, NewPendingUser, PendingUser,
    RequestStatus, User, SIGNUP_REQUEST_TYPE,
};

impl Repository {
    /// Record a sign-up request and notify administrators.
    pub async fn create_pending_user(
        &self,
        request: &NewPendingUser,
    ) -> Result<(PendingUser, AdminNotification), AppError> {
        let mut tx = self.pool.begin().await?;

        if identity_taken(&mut *tx, &request.email, &request.user_name, None).await? {
            return Err(AppError::Duplicate(DUPLICATE_IDENTITY_MESSAGE.to_string()));
        }

        let pending_id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"INSERT INTO pending_users (id, user_name, first_name, last_name, address, dob, email, role,
                   rank, profile_pic, description, is_active_member, password_hash, status, requested_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'pending', ?)"#,
        )
        .bind(&pending_id)
        .bind(&request.user_name)
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(&request.address)
        .bind(&request.dob)
        .bind(&request.email)
        .bind(request.role.as_str())
        .bind(request.rank.map(|r| r.as_str()))
        .bind(&request.profile_pic)
        .bind(&request.description)
        .bind(request.is_active_member as i32)
        .bind(&request.password_hash)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        let notification = AdminNotification {
            id: uuid::Uuid::new_v4().to_string(),
            kind: SIGNUP_REQUEST_TYPE.to_string(),
            pending_user_id: pending_id.clone(),
            user_name: request.user_name.clone(),
            email: request.email.clone(),
            first_name: request.first_name.clone(),
            last_name: request.last_name.clone(),
            role: request.role,
            message: signup_message(
                &request.first_name,
                &request.last_name,
                &request.user_name,
                request.role,
            ),
            read: false,
            status: RequestStatus::Pending,
            created_at: now.clone(),
            reviewed_at: None,
            review_note: None,
        };

        sqlx::query(
            r#"INSERT INTO admin_notifications (id, kind, pending_user_id, user_name, email, first_name,
                   last_name, role, message, read, status, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0, 'pending', ?)"#,
        )
        .bind(&notification.id)
        .bind(&notification.kind)
        .bind(&notification.pending_user_id)
        .bind(&notification.user_name)
        .bind(&notification.email)
        .bind(&notification.first_name)
        .bind(&notification.last_name)
        .bind(notification.role.as_str())
        .bind(&notification.message)
        .bind(&notification.created_at)
        .execute(&mut *tx)
        .await?;

        bump_revision(&mut *tx).await?;
        tx.commit().await?;

        tracing::info!(
            pending_user_id = %pending_id,
            role = request.role.as_str(),
            "Recorded sign-up request"
        );

        let pending = PendingUser {
            id: pending_id,
            user_name: request.user_name.clone(),
            first_name: request.first_name.clone(),
            last_name: request.last_name.clone(),
            address: request.address.clone(),
            dob: request.dob.clone(),
            email: request.email.clone(),
            role: request.role,
            rank: request.rank,
            profile_pic: request.profile_pic.clone(),
            description: request.description.clone(),
            is_active_member: request.is_active_member,
            status: RequestStatus::Pending,
            requested_at: now,
            password_hash: request.password_hash.clone(),
        };

        Ok((pending, notification))
    }

    /// List sign-up requests, oldest first.
    pub async fn list_pending_users(&self) -> Result<Vec<PendingUser>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM pending_users ORDER BY requested_at",
            PENDING_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(pending_from_row).collect())
    }

    /// Get a sign-up request by ID.
    pub async fn get_pending_user(&self, id: &str) -> Result<Option<PendingUser>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM pending_users WHERE id = ?",
            PENDING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(pending_from_row))
    }

    /// List notifications, newest first, optionally filtered by status.
    pub async fn list_notifications(
        &self,
        status: Option<RequestStatus>,
    ) -> Result<Vec<AdminNotification>, AppError> {
        let rows = match status {
            Some(status) => {
                sqlx::query(&format!(
                    "SELECT {} FROM admin_notifications WHERE status = ? ORDER BY created_at DESC",
                    NOTIFICATION_COLUMNS
                ))
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {} FROM admin_notifications ORDER BY created_at DESC",
                    NOTIFICATION_COLUMNS
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.iter().map(notification_from_row).collect())
    }

    /// Get a notification by ID.
    pub async fn get_notification(&self, id: &str) -> Result<Option<AdminNotification>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM admin_notifications WHERE id = ?",
            NOTIFICATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(notification_from_row))
    }

    /// Mark a notification as read.
    pub async fn mark_notification_read(&self, id: &str) -> Result<AdminNotification, AppError> {
        let result = sqlx::query("UPDATE admin_notifications SET read = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Notification {} not found", id)));
        }

        self.increment_revision().await?;

        self.get_notification(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Notification {} not found", id)))
    }

    /// Approve a sign-up request: create the credential and user, drop the request and
    /// resolve its notification.
    pub async fn approve_pending_user(
        &self,
        id: &str,
        decision: &ApprovalDecision,
    ) -> Result<User, AppError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "SELECT {} FROM pending_users WHERE id = ?",
            PENDING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let pending = row
            .as_ref()
            .map(pending_from_row)
            .ok_or_else(|| AppError::NotFound(format!("Pending user {} not found", id)))?;

        let role = decision.role.unwrap_or(pending.role);
        let rank = match decision.rank {
            Some(rank) if !role.accepts(rank) => {
                return Err(AppError::Validation(format!(
                    "Rank {} is not valid for role {}",
                    rank.as_str(),
                    role.as_str()
                )));
            }
            Some(rank) => Some(rank),
            None => pending.rank.filter(|r| role.accepts(*r)),
        };

        // Another account may have claimed the identity since the request was filed
        if identity_taken(&mut *tx, &pending.email, &pending.user_name, Some(id)).await? {
            return Err(AppError::Duplicate(DUPLICATE_IDENTITY_MESSAGE.to_string()));
        }

        let account = NewAccount {
            user_name: pending.user_name.clone(),
            first_name: pending.first_name.clone(),
            last_name: pending.last_name.clone(),
            address: pending.address.clone(),
            dob: pending.dob.clone(),
            email: pending.email.clone(),
            role,
            rank,
            is_active_member: pending.is_active_member,
            description: pending.description.clone(),
            profile_pic: pending.profile_pic.clone(),
            skills: Vec::new(),
            social: Default::default(),
            projects: Vec::new(),
            password_hash: pending.password_hash.clone(),
        };
        let user = insert_account(&mut tx, &account).await?;

        sqlx::query("DELETE FROM pending_users WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let resolved = resolve_notifications(
            &mut tx,
            id,
            RequestStatus::Approved,
            decision.note.as_deref(),
        )
        .await?;

        bump_revision(&mut *tx).await?;
        tx.commit().await?;

        tracing::info!(
            pending_user_id = %id,
            user_id = %user.id,
            notifications = resolved,
            "Approved sign-up request"
        );
        Ok(user)
    }

    /// Reject a sign-up request: drop it and resolve its notification. No account is created.
    pub async fn reject_pending_user(
        &self,
        id: &str,
        note: Option<&str>,
    ) -> Result<PendingUser, AppError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "SELECT {} FROM pending_users WHERE id = ?",
            PENDING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let mut pending = row
            .as_ref()
            .map(pending_from_row)
            .ok_or_else(|| AppError::NotFound(format!("Pending user {} not found", id)))?;

        sqlx::query("DELETE FROM pending_users WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let resolved = resolve_notifications(&mut tx, id, RequestStatus::Rejected, note).await?;

        bump_revision(&mut *tx).await?;
        tx.commit().await?;

        tracing::info!(
            pending_user_id = %id,
            notifications = resolved,
            "Rejected sign-up request"
        );

        pending.status = RequestStatus::Rejected;
        Ok(pending)
    }
}

/// Move the request's pending notifications to `status`. Already resolved
/// notifications are never touched again.
async fn resolve_notifications(
    conn: &mut sqlx::SqliteConnection,
    pending_user_id: &str,
    status: RequestStatus,
    note: Option<&str>,
) -> Result<u64, AppError> {
    let now = Utc::now().to_rfc3339();
    let result = sqlx::query(
        r#"UPDATE admin_notifications SET status = ?, read = 1, reviewed_at = ?, review_note = ?
           WHERE pending_user_id = ? AND status = 'pending'"#,
    )
    .bind(status.as_str())
    .bind(&now)
    .bind(note)
    .bind(pending_user_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        tracing::warn!(
            pending_user_id = %pending_user_id,
            "No pending notification found for sign-up request"
        );
    }
    Ok(result.rows_affected())
}
