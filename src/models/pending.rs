//! Sign-up requests awaiting administrator approval.

use serde::{Deserialize, Serialize};

use super::{Rank, RequestStatus, Role};

/// A sign-up request. The password is held only as a hash until approval.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingUser {
    pub id: String,
    pub user_name: String,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub dob: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<Rank>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_pic: Option<String>,
    pub description: String,
    pub is_active_member: bool,
    pub status: RequestStatus,
    pub requested_at: String,
    #[serde(skip)]
    pub password_hash: String,
}

/// Sign-up form body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub dob: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub rank: Option<String>,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
    #[serde(default)]
    pub profile_pic: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_active_member: bool,
}

/// Validated sign-up handed to the repository.
#[derive(Debug, Clone)]
pub struct NewPendingUser {
    pub user_name: String,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub dob: String,
    pub email: String,
    pub role: Role,
    pub rank: Option<Rank>,
    pub profile_pic: Option<String>,
    pub description: String,
    pub is_active_member: bool,
    pub password_hash: String,
}

/// Optional admin overrides when approving a request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveRequest {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub rank: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Parsed approval overrides handed to the repository.
#[derive(Debug, Clone, Default)]
pub struct ApprovalDecision {
    pub role: Option<Role>,
    pub rank: Option<Rank>,
    pub note: Option<String>,
}

/// Optional reason when rejecting a request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectRequest {
    #[serde(default)]
    pub note: Option<String>,
}
