//! Administrator notifications for pending actions.

use serde::{Deserialize, Serialize};

use super::Role;

/// Notification type emitted for every sign-up request.
pub const SIGNUP_REQUEST_TYPE: &str = "user_signup_request";

/// Lifecycle of a sign-up request as seen by administrators.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RequestStatus::Pending),
            "approved" => Some(RequestStatus::Approved),
            "rejected" => Some(RequestStatus::Rejected),
            _ => None,
        }
    }
}

/// Denormalized notice about a sign-up request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminNotification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub pending_user_id: String,
    pub user_name: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub message: String,
    pub read: bool,
    pub status: RequestStatus,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_note: Option<String>,
}

/// Build the admin-facing message for a sign-up request.
pub fn signup_message(first_name: &str, last_name: &str, user_name: &str, role: Role) -> String {
    format!(
        "New user {} {} ({}) has requested to join as {}",
        first_name,
        last_name,
        user_name,
        role.as_str()
    )
}

/// Notification list filter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signup_message() {
        assert_eq!(
            signup_message("Sara", "Ali", "sara.a", Role::Mentor),
            "New user Sara Ali (sara.a) has requested to join as mentor"
        );
    }

    #[test]
    fn test_status_strings() {
        for status in [
            RequestStatus::Pending,
            RequestStatus::Approved,
            RequestStatus::Rejected,
        ] {
            assert_eq!(RequestStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(RequestStatus::from_str("archived"), None);
    }
}
