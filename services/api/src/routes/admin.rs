//! Admin moderation handlers
//!
//! Every handler here sits behind both the session middleware and the
//! admin guard, so a resolved `Principal` with the admin role is a
//! precondition.

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::json;
use uuid::Uuid;

use crate::error::{ApiError, ApiJson, ApiResult};
use crate::models::{Principal, SetStatusRequest, UserResponse};
use crate::state::AppState;

/// Current admin session check
pub async fn check(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<impl IntoResponse> {
    let user = state
        .user_repository
        .find_by_id(principal.user_id)
        .await?
        .ok_or(ApiError::Unauthenticated)?;

    Ok(Json(json!({
        "user": UserResponse::from(user),
    })))
}

/// Posts at or above the report threshold, most reported first
pub async fn reported_posts(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let posts = state.moderation.list_flagged().await?;
    let total = posts.len();

    Ok(Json(json!({
        "posts": posts,
        "total": total,
    })))
}

/// Set the moderation status of a post; any-to-any transitions
pub async fn set_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<SetStatusRequest>,
) -> ApiResult<impl IntoResponse> {
    let post = state.moderation.set_status(id, &payload.status).await?;
    Ok(Json(post))
}

/// Reset a post's reports and counter
pub async fn clear_reports(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let post = state.moderation.clear_reports(id).await?;

    Ok(Json(json!({
        "message": "Reports cleared successfully",
        "post": post,
    })))
}

/// Admin delete, regardless of authorship
pub async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    state.post_repository.delete(id).await?;
    Ok(Json(json!({"message": "Post deleted successfully"})))
}

/// Totals for the admin dashboard
pub async fn stats(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let (total_posts, total_users) = tokio::try_join!(
        state.post_repository.count(),
        state.user_repository.count(),
    )?;

    Ok(Json(json!({
        "totalPosts": total_posts,
        "totalUsers": total_users,
    })))
}
