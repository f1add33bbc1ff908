//! Lab Portal Backend
//!
//! REST backend for a research lab's portfolio site: sign-up approval, user
//! directory and projects, with SQLite persistence and Tantivy member search.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod models;
mod search;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use auth::token::TokenKeys;
use config::Config;
use db::Repository;
use search::SearchIndex;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub search: Arc<SearchIndex>,
    pub config: Arc<Config>,
    pub tokens: Arc<TokenKeys>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Lab Portal Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Index path: {:?}", config.index_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.api_psk.is_none() {
        tracing::warn!("No API PSK configured (LAB_API_PSK). Admin routes are unprotected!");
    }

    let jwt_secret = match &config.jwt_secret {
        Some(secret) => {
            if secret.len() < config::MIN_JWT_SECRET_LENGTH {
                tracing::warn!(
                    "LAB_JWT_SECRET is shorter than {} characters",
                    config::MIN_JWT_SECRET_LENGTH
                );
            }
            secret.clone()
        }
        None => {
            tracing::warn!("No LAB_JWT_SECRET configured. Member sessions end on restart.");
            auth::token::ephemeral_secret()
        }
    };
    let tokens = Arc::new(TokenKeys::new(&jwt_secret, config.token_ttl_minutes));

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    // Initialize search index
    let search = Arc::new(SearchIndex::open(&config.index_path)?);

    tracing::info!("Building user search index...");
    let users = repo.list_users(None).await?;
    search.rebuild(&users).await?;

    let state = AppState {
        repo,
        search,
        config: Arc::new(config.clone()),
        tokens,
    };

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Open to visitors and applicants
    let public_routes = Router::new()
        .route("/signup", post(api::signup))
        .route("/login", post(api::login))
        .route("/public/projects", get(api::list_public_projects))
        .route("/public/members", get(api::list_public_members))
        .route("/public/members/{id}", get(api::get_public_profile))
        .route("/revision", get(api::get_revision));

    let admin_routes = Router::new()
        // Approval workflow
        .route("/admin/pending-users", get(api::list_pending_users))
        .route("/admin/pending-users/{id}", get(api::get_pending_user))
        .route(
            "/admin/pending-users/{id}/approve",
            post(api::approve_pending_user),
        )
        .route(
            "/admin/pending-users/{id}/reject",
            post(api::reject_pending_user),
        )
        .route("/admin/notifications", get(api::list_notifications))
        .route(
            "/admin/notifications/{id}/read",
            put(api::mark_notification_read),
        )
        // Users
        .route("/users", get(api::list_users).post(api::create_user))
        .route("/users/search", get(api::search_users))
        .route(
            "/users/{id}",
            get(api::get_user)
                .put(api::update_user)
                .delete(api::delete_user),
        )
        // Admin projects
        .route(
            "/admin-projects",
            get(api::list_admin_projects).post(api::create_admin_project),
        )
        .route(
            "/admin-projects/{id}",
            get(api::get_admin_project)
                .put(api::replace_admin_project)
                .delete(api::delete_admin_project),
        )
        .route_layer(middleware::from_fn(auth::require_admin));

    // Signed-in members; handlers check ownership
    let member_routes = Router::new()
        .route("/me", get(api::get_me).put(api::update_me))
        .route(
            "/projects",
            get(api::list_projects).post(api::create_project),
        )
        .route(
            "/projects/{id}",
            get(api::get_project)
                .put(api::update_project)
                .delete(api::delete_project),
        )
        .route("/projects/{id}/archive", post(api::toggle_project_archive));

    let protected_routes = admin_routes
        .merge(member_routes)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::authenticate,
        ));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", public_routes.merge(protected_routes))
        .merge(health_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
