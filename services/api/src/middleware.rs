//! Session authentication middleware
//!
//! Resolves the session cookie to a request-scoped `Principal` and inserts
//! it into the request extensions; handlers never touch ambient session
//! state. The admin guard layers on top for the moderation routes.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::error;

use crate::error::ApiError;
use crate::models::Principal;
use crate::session::SESSION_COOKIE;
use crate::state::AppState;

/// Resolve the session cookie to a principal, or fail `Unauthenticated`.
/// An expired session resolves to nothing because Redis has dropped the
/// key.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let jar = CookieJar::from_headers(req.headers());

    let token = jar
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .ok_or(ApiError::Unauthenticated)?;

    let principal = state
        .sessions
        .get(&token)
        .await
        .map_err(|e| {
            error!("Failed to resolve session: {}", e);
            ApiError::Internal
        })?
        .ok_or(ApiError::Unauthenticated)?;

    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}

/// Require the already-resolved principal to hold the admin role.
/// Must be layered inside `session_middleware`.
pub async fn admin_middleware(req: Request<Body>, next: Next) -> Result<Response, ApiError> {
    let principal = req
        .extensions()
        .get::<Principal>()
        .ok_or(ApiError::Unauthenticated)?;

    if !principal.is_admin() {
        return Err(ApiError::Forbidden);
    }

    Ok(next.run(req).await)
}
