//! Lab projects: mentor-authored and admin-authored.

use serde::{Deserialize, Serialize};

/// Image used when a project is saved without one.
pub const PLACEHOLDER_IMAGE: &str = "/placeholder.svg";

/// Default category for admin-authored projects.
pub const DEFAULT_ADMIN_PROJECT_TYPE: &str = "fyp";

/// Maximum number of students on an admin-authored project.
pub const MAX_PROJECT_STUDENTS: usize = 3;

/// Visibility of a project on the public portfolio.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    #[default]
    Private,
    Public,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Private => "private",
            ProjectStatus::Public => "public",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "private" => Some(ProjectStatus::Private),
            "public" => Some(ProjectStatus::Public),
            _ => None,
        }
    }
}

/// A project owned by a mentor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub description: String,
    pub image: String,
    pub status: ProjectStatus,
    pub mentor_id: String,
    pub is_archived: bool,
    pub created_at: String,
    pub updated_at: String,
    /// Internal version for optimistic concurrency control
    #[serde(default)]
    pub version: i64,
}

/// Request body for creating a mentor project.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub name: String,
    pub description: String,
    /// Defaults to the signed-in mentor
    #[serde(default)]
    pub mentor_id: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub status: Option<ProjectStatus>,
}

/// Request body for updating a mentor project.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub status: Option<ProjectStatus>,
    /// Expected version for optimistic concurrency control
    #[serde(default)]
    pub expected_version: Option<i64>,
}

/// Filter for listing mentor projects.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectQuery {
    #[serde(default)]
    pub mentor_id: Option<String>,
}

/// A project created by an administrator, supervised by a mentor with assigned students.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminProject {
    pub id: String,
    pub name: String,
    pub description: String,
    pub mentor_id: String,
    pub student_ids: Vec<String>,
    #[serde(rename = "type")]
    pub project_type: String,
    pub image: String,
    pub status: ProjectStatus,
    pub is_archived: bool,
    pub created_at: String,
    pub updated_at: String,
    /// Internal version for optimistic concurrency control
    #[serde(default)]
    pub version: i64,
}

/// Request body for creating or replacing an admin project.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminProjectRequest {
    pub name: String,
    pub description: String,
    pub mentor_id: String,
    #[serde(default)]
    pub student_ids: Vec<String>,
    #[serde(rename = "type", default = "default_project_type")]
    pub project_type: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub status: Option<ProjectStatus>,
    /// Expected version for optimistic concurrency control
    #[serde(default)]
    pub expected_version: Option<i64>,
}

fn default_project_type() -> String {
    DEFAULT_ADMIN_PROJECT_TYPE.to_string()
}

/// Filter for listing admin projects.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminProjectQuery {
    #[serde(default, rename = "type")]
    pub project_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_project_request_defaults() {
        let req: AdminProjectRequest = serde_json::from_str(
            r#"{"name":"Drone mapping","description":"d","mentorId":"m1","studentIds":["s1"]}"#,
        )
        .unwrap();
        assert_eq!(req.project_type, "fyp");
        assert!(req.status.is_none());
        assert!(req.expected_version.is_none());
    }

    #[test]
    fn test_project_status_strings() {
        assert_eq!(ProjectStatus::default(), ProjectStatus::Private);
        assert_eq!(ProjectStatus::from_str("public"), Some(ProjectStatus::Public));
        assert_eq!(ProjectStatus::from_str("hidden"), None);
        assert_eq!(
            serde_json::to_value(ProjectStatus::Public).unwrap(),
            ProjectStatus::Public.as_str()
        );
    }
}
