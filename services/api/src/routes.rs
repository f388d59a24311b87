//! API service routes
//!
//! The whole HTTP surface lives under `/auth`, matching the paths the
//! mobile client and admin dashboard call. Session-protected routes are
//! wrapped by the session middleware; the admin subset additionally by the
//! admin guard.

use axum::{
    Json, Router,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use serde_json::json;

use crate::middleware::{admin_middleware, session_middleware};
use crate::state::AppState;

pub mod admin;
pub mod auth;
pub mod posts;

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/auth/admin/check", get(admin::check))
        .route("/auth/admin/reported-posts", get(admin::reported_posts))
        .route("/auth/admin/stats", get(admin::stats))
        .route("/auth/admin/posts/:id/status", put(admin::set_status))
        .route(
            "/auth/admin/posts/:id/clear-reports",
            post(admin::clear_reports),
        )
        .route("/auth/admin/posts/:id", delete(admin::delete_post))
        .route_layer(middleware::from_fn(admin_middleware));

    let protected_routes = Router::new()
        .route("/auth/users/logout", post(auth::logout))
        .route("/auth/profile", get(auth::profile))
        .route("/auth/posts", get(posts::list_own).post(posts::create))
        .route(
            "/auth/posts/:id",
            put(posts::update).delete(posts::delete),
        )
        .route("/auth/posts/:id/upvote", post(posts::upvote))
        .route("/auth/posts/:id/downvote", post(posts::downvote))
        .route("/auth/posts/:id/report", post(posts::report))
        .route("/auth/posts/:id/reports", get(posts::report_status))
        .merge(admin_routes)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            session_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/auth/users/register", post(auth::register))
        .route("/auth/users/login", post(auth::login))
        .route("/auth/admin/login", post(auth::admin_login))
        .route("/auth/posts/public", get(posts::list_public))
        .merge(protected_routes)
        .fallback(not_found)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "nagrik-seva-api"
    }))
}

/// Fallback for unknown routes
async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Route not found",
            "code": "not_found"
        })),
    )
}
