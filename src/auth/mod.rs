//! Authentication for the lab portal.
//!
//! Operators present the pre-shared key, compared in constant time. Members
//! sign in with an Argon2-hashed password (see [`password`]) and then send the
//! token issued at login (see [`token`]). Every protected request is resolved
//! to a [`Caller`] stored in the request extensions.

pub mod password;
pub mod token;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use crate::errors::{AppError, AppErrorWithRevision};
use crate::models::{Role, User};
use crate::AppState;

/// Header name for the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Who is making a protected request.
#[derive(Debug, Clone)]
pub enum Caller {
    /// Holder of the pre-shared key, or anyone when no key is configured
    Operator,
    /// A signed-in member, as currently stored
    Member(User),
}

impl Caller {
    pub fn is_admin(&self) -> bool {
        match self {
            Caller::Operator => true,
            Caller::Member(user) => user.role == Role::Admin,
        }
    }

    pub fn member(&self) -> Option<&User> {
        match self {
            Caller::Operator => None,
            Caller::Member(user) => Some(user),
        }
    }
}

/// Resolve the caller and attach it to the request, or reject with 401.
pub async fn authenticate(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let resolved = resolve_caller(&state, request.headers()).await;
    match resolved {
        Ok(caller) => {
            request.extensions_mut().insert(caller);
            next.run(request).await
        }
        Err(e) => {
            tracing::warn!("Rejected request to {}: {}", request.uri().path(), e);
            reject(e)
        }
    }
}

/// Let only administrators through. Runs after [`authenticate`].
pub async fn require_admin(request: Request, next: Next) -> Response {
    match request.extensions().get::<Caller>() {
        Some(caller) if caller.is_admin() => next.run(request).await,
        Some(_) => {
            tracing::warn!("Member denied admin route {}", request.uri().path());
            reject(AppError::Forbidden(
                "Administrator access required".to_string(),
            ))
        }
        None => reject(AppError::Unauthorized(
            "Missing or invalid API key".to_string(),
        )),
    }
}

async fn resolve_caller(state: &AppState, headers: &HeaderMap) -> Result<Caller, AppError> {
    let psk = state.config.api_psk.as_deref();

    if let Some(provided) = header_value(headers, API_KEY_HEADER) {
        return match psk {
            Some(expected) if !constant_time_compare(provided, expected) => {
                Err(AppError::Unauthorized("Invalid API key".to_string()))
            }
            _ => Ok(Caller::Operator),
        };
    }

    if let Some(bearer) =
        header_value(headers, header::AUTHORIZATION.as_str()).and_then(|v| v.strip_prefix("Bearer "))
    {
        // The PSK is also accepted as a bearer token
        if psk.is_some_and(|expected| constant_time_compare(bearer, expected)) {
            return Ok(Caller::Operator);
        }

        let claims = state.tokens.verify(bearer)?;
        // Role and membership are read fresh, so changes apply to live tokens
        return match state.repo.get_user(&claims.sub).await? {
            Some(user) => Ok(Caller::Member(user)),
            None => Err(AppError::Unauthorized(
                "Account no longer exists".to_string(),
            )),
        };
    }

    match psk {
        // No PSK configured: protected API is open (dev mode)
        None => Ok(Caller::Operator),
        Some(_) => Err(AppError::Unauthorized(
            "Missing or invalid API key".to_string(),
        )),
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

fn reject(error: AppError) -> Response {
    AppErrorWithRevision {
        error,
        revision_id: 0,
    }
    .into_response()
}
