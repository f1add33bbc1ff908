//! User directory search endpoint.

use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};

use super::{error, parse_role, success, ApiResult};
use crate::models::User;
use crate::AppState;

/// Search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// Search query string.
    #[serde(default)]
    pub q: String,
    /// Maximum number of results (default: 20).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Offset for pagination (default: 0).
    #[serde(default)]
    pub offset: usize,
    /// Restrict hits to one role.
    #[serde(default)]
    pub role: Option<String>,
}

fn default_limit() -> usize {
    20
}

/// Search results with users and paging metadata.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<SearchResultItem>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

/// Single search result item.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultItem {
    pub user: User,
    pub score: f32,
}

/// Maximum number of search results allowed.
const MAX_SEARCH_LIMIT: usize = 100;

/// Deepest page a client may request.
const MAX_SEARCH_OFFSET: usize = 10_000;

/// GET /api/users/search - Search users by name, rank, skills and description.
pub async fn search_users(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> ApiResult<SearchResponse> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let limit = params.limit.clamp(1, MAX_SEARCH_LIMIT);
    let offset = params.offset.min(MAX_SEARCH_OFFSET);
    let role = match params.role.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(s) => match parse_role(s) {
            Ok(role) => Some(role),
            Err(e) => return error(e, revision_id),
        },
    };

    let page = match state.search.search(&params.q, role, limit, offset) {
        Ok(page) => page,
        Err(e) => return error(e, revision_id),
    };

    // Hits for users deleted since indexing are dropped
    let mut results = Vec::new();
    for sr in page.results {
        if let Ok(Some(user)) = state.repo.get_user(&sr.user_id).await {
            results.push(SearchResultItem {
                user,
                score: sr.score,
            });
        }
    }

    success(
        SearchResponse {
            results,
            total: page.total,
            limit,
            offset,
        },
        revision_id,
    )
}
