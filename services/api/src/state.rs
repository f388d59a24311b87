//! Application state shared across handlers

use sqlx::PgPool;

use crate::moderation::ModerationEngine;
use crate::rate_limiter::RateLimiter;
use crate::repositories::{PostRepository, UserRepository};
use crate::session::SessionStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub user_repository: UserRepository,
    pub post_repository: PostRepository,
    pub moderation: ModerationEngine,
    pub sessions: SessionStore,
    pub rate_limiter: RateLimiter,
}
