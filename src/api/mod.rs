//! REST API module.
//!
//! Contains all API routes and handlers following the frontend contract.

mod admin_projects;
mod approvals;
mod login;
mod me;
mod projects;
mod public;
mod search;
mod signup;
mod users;

pub use admin_projects::*;
pub use approvals::*;
pub use login::*;
pub use me::*;
pub use projects::*;
pub use public::*;
pub use search::*;
pub use signup::*;
pub use users::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::errors::AppError;
use crate::models::{Rank, Role};

/// Success response envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    pub revision_id: i64,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T, revision_id: i64) -> Self {
        Self {
            success: true,
            data,
            revision_id,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, crate::errors::AppErrorWithRevision>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T, revision_id: i64) -> ApiResult<T> {
    Ok(ApiResponse::new(data, revision_id))
}

/// Create an error API response.
pub fn error<T: Serialize>(err: crate::errors::AppError, revision_id: i64) -> ApiResult<T> {
    Err(crate::errors::AppErrorWithRevision {
        error: err,
        revision_id,
    })
}

/// Reject a blank required field with `"{label} is required"`.
pub(crate) fn require_field(value: &str, label: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} is required", label)));
    }
    Ok(())
}

/// Usernames never contain `@` and emails always do, so a login identifier
/// names at most one account.
pub(crate) fn check_identity_format(user_name: &str, email: &str) -> Result<(), AppError> {
    if user_name.contains('@') {
        return Err(AppError::Validation("Username cannot contain @".to_string()));
    }
    if !email.contains('@') {
        return Err(AppError::Validation(
            "Please enter a valid email address".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn parse_role(value: &str) -> Result<Role, AppError> {
    Role::from_str(value.trim())
        .ok_or_else(|| AppError::Validation(format!("Unknown role: {}", value)))
}

/// Parse an optional rank. An empty string means no rank.
pub(crate) fn parse_rank(value: Option<&str>) -> Result<Option<Rank>, AppError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => Rank::from_str(s)
            .map(Some)
            .ok_or_else(|| AppError::Validation(format!("Unknown rank: {}", s))),
    }
}

/// Check that a rank, if given, belongs to the role.
pub(crate) fn check_rank(role: Role, rank: Option<Rank>) -> Result<(), AppError> {
    match rank {
        Some(rank) if !role.accepts(rank) => Err(AppError::Validation(format!(
            "Rank {} is not valid for role {}",
            rank.as_str(),
            role.as_str()
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rank() {
        assert_eq!(parse_rank(None).unwrap(), None);
        assert_eq!(parse_rank(Some("")).unwrap(), None);
        assert_eq!(parse_rank(Some("alumni")).unwrap(), Some(Rank::Alumni));
        assert!(parse_rank(Some("emperor")).is_err());
    }

    #[test]
    fn test_check_rank_against_role() {
        assert!(check_rank(Role::Mentor, Some(Rank::Head)).is_ok());
        assert!(check_rank(Role::Student, Some(Rank::Head)).is_err());
        assert!(check_rank(Role::Admin, None).is_ok());
        assert!(check_rank(Role::Admin, Some(Rank::Alumni)).is_err());
    }

    #[test]
    fn test_check_identity_format() {
        assert!(check_identity_format("sara", "sara@lab.edu").is_ok());
        assert!(check_identity_format("sara@lab.edu", "sara@lab.edu").is_err());
        assert!(check_identity_format("sara", "sara").is_err());
    }

    #[test]
    fn test_require_field_message() {
        let err = require_field("  ", "Username").unwrap_err();
        assert_eq!(err.message(), "Username is required");
    }
}
