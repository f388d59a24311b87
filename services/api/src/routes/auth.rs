//! Registration, login/logout, and profile handlers

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::json;
use tracing::{error, info};

use crate::error::{ApiError, ApiJson, ApiResult};
use crate::models::{LoginRequest, Principal, RegisterRequest, Role, User, UserResponse};
use crate::session::SESSION_COOKIE;
use crate::state::AppState;
use crate::validation;

fn validate_registration(payload: &RegisterRequest) -> Result<(), String> {
    validation::validate_username(&payload.username)?;
    validation::validate_phone(&payload.phone)?;
    validation::validate_aadhar(&payload.aadhar)?;
    validation::validate_email(&payload.email)?;
    validation::validate_password(&payload.password)?;
    Ok(())
}

/// Register a new user
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    validate_registration(&payload).map_err(ApiError::Validation)?;

    let user = state.user_repository.create(&payload).await?;

    info!("Registered user: {}", user.username);
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

async fn authenticate(state: &AppState, payload: &LoginRequest) -> ApiResult<User> {
    let rate_key = format!("login:{}", payload.email);

    if !state.rate_limiter.is_allowed(&rate_key).await {
        return Err(ApiError::RateLimited);
    }

    let user = state
        .user_repository
        .find_by_email(&payload.email)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    if !state.user_repository.verify_password(&user, &payload.password)? {
        return Err(ApiError::InvalidCredentials);
    }

    state.rate_limiter.reset(&rate_key).await;
    Ok(user)
}

async fn establish_session(
    state: &AppState,
    jar: CookieJar,
    user: &User,
) -> ApiResult<(CookieJar, Json<serde_json::Value>)> {
    let principal = Principal {
        user_id: user.id,
        role: user.role,
    };

    let token = state.sessions.create(&principal).await.map_err(|e| {
        error!("Failed to create session: {}", e);
        ApiError::Internal
    })?;

    let cookie = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);

    let body = Json(json!({
        "user": UserResponse::from(user.clone()),
    }));

    Ok((jar.add(cookie), body))
}

/// User login endpoint
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    info!("Login attempt for: {}", payload.email);

    let user = authenticate(&state, &payload).await?;
    establish_session(&state, jar, &user).await
}

/// Admin login endpoint. Credentials that resolve to a non-admin user fail
/// exactly like unknown credentials, so the role is not leaked.
pub async fn admin_login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    info!("Admin login attempt for: {}", payload.email);

    let user = authenticate(&state, &payload).await?;

    if user.role != Role::Admin {
        return Err(ApiError::InvalidCredentials);
    }

    establish_session(&state, jar, &user).await
}

/// Logout endpoint: drops the server-side session and clears the cookie
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> ApiResult<impl IntoResponse> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.delete(cookie.value()).await.map_err(|e| {
            error!("Failed to delete session: {}", e);
            ApiError::Internal
        })?;
    }

    let jar = jar.remove(Cookie::build((SESSION_COOKIE, "")).path("/"));

    Ok((
        jar,
        Json(json!({"message": "Logged out successfully"})),
    ))
}

/// Current principal's profile
pub async fn profile(
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
