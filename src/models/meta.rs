//! Change detection and public portfolio views.

use serde::{Deserialize, Serialize};

use super::{AdminProject, Project, PublicMember};

/// Revision information for change detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionInfo {
    pub revision_id: i64,
    pub generated_at: String,
}

/// Public, non-archived projects of both shapes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProjects {
    pub mentor_projects: Vec<Project>,
    pub admin_projects: Vec<AdminProject>,
}

/// A member's public profile page. Mentors also list their public projects.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub member: PublicMember,
    pub mentor_projects: Vec<Project>,
}
