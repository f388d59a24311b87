//! Post handlers: CRUD, voting, and reporting

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use uuid::Uuid;

use crate::error::{ApiError, ApiJson, ApiResult};
use crate::models::{
    CreatePostRequest, Principal, ReportRequest, UpdatePostRequest, VoteDirection,
};
use crate::state::AppState;

/// All posts, public feed, newest first
pub async fn list_public(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let posts = state.post_repository.list_public().await?;
    Ok(Json(posts))
}

/// The requester's own posts, newest first
pub async fn list_own(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<impl IntoResponse> {
    let posts = state
        .post_repository
        .list_by_author(principal.user_id)
        .await?;
    Ok(Json(posts))
}

/// Create a new post; the requester becomes the immutable author
pub async fn create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(payload): ApiJson<CreatePostRequest>,
) -> ApiResult<impl IntoResponse> {
    if payload.title.trim().is_empty()
        || payload.description.trim().is_empty()
        || payload.image.is_empty()
    {
        return Err(ApiError::Validation("Missing required fields".to_string()));
    }

    let post = state
        .post_repository
        .create(principal.user_id, &payload)
        .await?;

    Ok((StatusCode::CREATED, Json(post)))
}

/// Owner edit; the patch can only touch title, description, and tags
pub async fn update(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<UpdatePostRequest>,
) -> ApiResult<impl IntoResponse> {
    let author = state
        .post_repository
        .author_of(id)
        .await?
        .ok_or(ApiError::NotFound("Post"))?;

    if author != principal.user_id {
        return Err(ApiError::Forbidden);
    }

    let post = state.post_repository.update(id, &payload).await?;
    Ok(Json(post))
}

/// Owner self-service delete
pub async fn delete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let author = state
        .post_repository
        .author_of(id)
        .await?
        .ok_or(ApiError::NotFound("Post"))?;

    if author != principal.user_id {
        return Err(ApiError::Forbidden);
    }

    state.post_repository.delete(id).await?;
    Ok(Json(json!({"message": "Post deleted"})))
}

/// Upvote; idempotent when already upvoted, replaces a downvote otherwise
pub async fn upvote(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let post = state
        .moderation
        .cast_vote(id, principal.user_id, VoteDirection::Up)
        .await?;
    Ok(Json(post))
}

/// Downvote; symmetric with upvote
pub async fn downvote(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let post = state
        .moderation
        .cast_vote(id, principal.user_id, VoteDirection::Down)
        .await?;
    Ok(Json(post))
}

/// Report a post with a reason
pub async fn report(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<ReportRequest>,
) -> ApiResult<impl IntoResponse> {
    state
        .moderation
        .report_post(id, principal.user_id, &payload.reason)
        .await?;

    Ok(Json(json!({"message": "Post reported"})))
}

/// Read-only report projection for a post
pub async fn report_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let status = state.moderation.check_report_status(id).await?;
    Ok(Json(status))
}
