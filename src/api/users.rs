//! User directory API endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use super::{
    check_identity_format, check_rank, error, parse_rank, parse_role, require_field, success,
    ApiResult,
};
use crate::auth::password::{hash_password_async, validate_new_password};
use crate::db::{normalize_email, normalize_user_name};
use crate::errors::{AppError, DUPLICATE_IDENTITY_MESSAGE};
use crate::models::{
    CreateUserRequest, NewAccount, PersonalProject, Role, SocialLinks, UpdateUserRequest, User,
    UserChanges, SOCIAL_PLATFORMS,
};
use crate::AppState;

/// User list filter.
#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    #[serde(default)]
    pub role: Option<String>,
}

/// GET /api/users - List users, optionally filtered by role.
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> ApiResult<Vec<User>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let role = match query.role.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(s) => match parse_role(s) {
            Ok(role) => Some(role),
            Err(e) => return error(e, revision_id),
        },
    };

    match state.repo.list_users(role).await {
        Ok(users) => success(users, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/users/:id - Get a single user.
pub async fn get_user(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<User> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_user(&id).await {
        Ok(Some(user)) => success(user, revision_id),
        Ok(None) => error(
            AppError::NotFound(format!("User {} not found", id)),
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/users - Create an account directly, skipping approval.
pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> ApiResult<User> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let account = match validate_new_user(&request) {
        Ok(account) => account,
        Err(e) => return error(e, revision_id),
    };

    match state
        .repo
        .identity_taken(&account.email, &account.user_name)
        .await
    {
        Ok(false) => {}
        Ok(true) => {
            return error(
                AppError::Duplicate(DUPLICATE_IDENTITY_MESSAGE.to_string()),
                revision_id,
            )
        }
        Err(e) => return error(e, revision_id),
    }

    let account = match hash_password_async(request.password.clone()).await {
        Ok(password_hash) => NewAccount {
            password_hash,
            ..account
        },
        Err(e) => return error(e, revision_id),
    };

    match state.repo.create_user(&account).await {
        Ok(user) => {
            if let Err(e) = state.search.index_user(&user).await {
                tracing::warn!("Failed to index user: {}", e);
            }

            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(user, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/users/:id - Update a user's profile.
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateUserRequest>,
) -> ApiResult<User> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let changes = match parse_changes(request) {
        Ok(changes) => changes,
        Err(e) => return error(e, revision_id),
    };

    match state.repo.update_user(&id, &changes).await {
        Ok(user) => {
            if let Err(e) = state.search.index_user(&user).await {
                tracing::warn!("Failed to re-index user: {}", e);
            }

            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(user, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/users/:id - Delete a user and its credential.
pub async fn delete_user(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.delete_user(&id).await {
        Ok(()) => {
            if let Err(e) = state.search.remove_user(&id).await {
                tracing::warn!("Failed to remove user from index: {}", e);
            }

            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// Validate an admin-created account. The returned record has an empty password hash.
fn validate_new_user(request: &CreateUserRequest) -> Result<NewAccount, AppError> {
    require_field(&request.user_name, "Username")?;
    require_field(&request.email, "Email")?;
    check_identity_format(&request.user_name, &request.email)?;

    validate_new_password(&request.password, &request.confirm_password)?;

    let role = match request.role.as_deref().map(str::trim) {
        None | Some("") => Role::Student,
        Some(s) => parse_role(s)?,
    };
    let rank = parse_rank(request.rank.as_deref())?;
    check_rank(role, rank)?;

    Ok(NewAccount {
        user_name: normalize_user_name(&request.user_name),
        first_name: request.first_name.trim().to_string(),
        last_name: request.last_name.trim().to_string(),
        address: request.address.trim().to_string(),
        dob: request.dob.trim().to_string(),
        email: normalize_email(&request.email),
        role,
        rank,
        is_active_member: request.is_active_member,
        description: request.description.clone(),
        profile_pic: request.profile_pic.clone().filter(|p| !p.trim().is_empty()),
        skills: clean_skills(request.skills.clone()),
        social: clean_social(request.social.clone())?,
        projects: check_personal_projects(request.projects.clone())?,
        password_hash: String::new(),
    })
}

pub(super) fn parse_changes(request: UpdateUserRequest) -> Result<UserChanges, AppError> {
    let role = match request.role.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(s) => Some(parse_role(s)?),
    };

    Ok(UserChanges {
        email: request.email,
        user_name: request.user_name,
        first_name: request.first_name,
        last_name: request.last_name,
        address: request.address,
        dob: request.dob,
        role,
        rank: parse_rank(request.rank.as_deref())?,
        is_active_member: request.is_active_member,
        description: request.description,
        profile_pic: request.profile_pic,
        skills: request.skills.map(clean_skills),
        social: request.social.map(clean_social).transpose()?,
        projects: request
            .projects
            .map(check_personal_projects)
            .transpose()?,
        expected_version: request.expected_version,
    })
}

/// Trim, drop blanks and repeats, keep first-seen order.
fn clean_skills(skills: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(skills.len());
    for skill in skills {
        let skill = skill.trim();
        if !skill.is_empty() && !cleaned.iter().any(|s| s == skill) {
            cleaned.push(skill.to_string());
        }
    }
    cleaned
}

/// Known platforms only; an empty link removes the entry.
fn clean_social(social: SocialLinks) -> Result<SocialLinks, AppError> {
    let mut cleaned = SocialLinks::new();
    for (platform, link) in social {
        let platform = platform.trim().to_lowercase();
        if !SOCIAL_PLATFORMS.contains(&platform.as_str()) {
            return Err(AppError::Validation(format!(
                "Unknown social platform: {}",
                platform
            )));
        }
        let link = link.trim();
        if !link.is_empty() {
            cleaned.insert(platform, link.to_string());
        }
    }
    Ok(cleaned)
}

fn check_personal_projects(
    projects: Vec<PersonalProject>,
) -> Result<Vec<PersonalProject>, AppError> {
    if projects
        .iter()
        .any(|p| p.name.trim().is_empty() || p.details.trim().is_empty())
    {
        return Err(AppError::Validation("All fields are required!".to_string()));
    }
    Ok(projects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Rank;

    #[test]
    fn test_new_user_defaults_to_student() {
        let request: CreateUserRequest = serde_json::from_value(serde_json::json!({
            "userName": "bilal",
            "email": "Bilal@Lab.edu",
            "password": "secret1",
            "confirmPassword": "secret1",
            "rank": "internee"
        }))
        .unwrap();
        let account = validate_new_user(&request).unwrap();
        assert_eq!(account.role, Role::Student);
        assert_eq!(account.rank, Some(Rank::Internee));
        assert_eq!(account.email, "bilal@lab.edu");
    }

    #[test]
    fn test_new_user_rejects_at_sign_in_username() {
        let request: CreateUserRequest = serde_json::from_value(serde_json::json!({
            "userName": "bilal@lab.edu",
            "email": "bilal@lab.edu",
            "password": "secret1",
            "confirmPassword": "secret1"
        }))
        .unwrap();
        assert_eq!(
            validate_new_user(&request).unwrap_err().message(),
            "Username cannot contain @"
        );
    }

    #[test]
    fn test_profile_lists_are_cleaned() {
        let request: UpdateUserRequest = serde_json::from_value(serde_json::json!({
            "skills": [" Rust ", "", "ROS", "Rust"],
            "social": { "GitHub": " https://github.com/noor ", "twitter": "" },
            "projects": [{ "name": "Line follower", "details": "PID tuned robot" }]
        }))
        .unwrap();
        let changes = parse_changes(request).unwrap();
        assert_eq!(changes.skills.unwrap(), vec!["Rust", "ROS"]);
        let social = changes.social.unwrap();
        assert_eq!(social.len(), 1);
        assert_eq!(social["github"], "https://github.com/noor");
        assert_eq!(changes.projects.unwrap()[0].image, "");
    }

    #[test]
    fn test_profile_lists_reject_bad_entries() {
        let request: UpdateUserRequest = serde_json::from_value(serde_json::json!({
            "social": { "myspace": "https://myspace.com/noor" }
        }))
        .unwrap();
        assert!(parse_changes(request).is_err());

        let request: UpdateUserRequest = serde_json::from_value(serde_json::json!({
            "projects": [{ "name": "Untitled", "details": " " }]
        }))
        .unwrap();
        assert_eq!(
            parse_changes(request).unwrap_err().message(),
            "All fields are required!"
        );
    }

    #[test]
    fn test_parse_changes_rejects_unknown_rank() {
        let request = UpdateUserRequest {
            rank: Some("captain".to_string()),
            ..Default::default()
        };
        assert!(parse_changes(request).is_err());
    }
}
