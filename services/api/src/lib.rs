//! Nagrik Seva API service
//!
//! The REST backend for the civic-issue-reporting application: identity and
//! sessions, post CRUD, voting, reporting, and the admin moderation surface.

use anyhow::Result;
use tracing::info;

pub mod error;
pub mod middleware;
pub mod models;
pub mod moderation;
pub mod rate_limiter;
pub mod repositories;
pub mod routes;
pub mod session;
pub mod state;
pub mod validation;

use crate::moderation::{ModerationConfig, ModerationEngine};
use crate::rate_limiter::{RateLimiter, RateLimiterConfig};
use crate::repositories::{PostRepository, UserRepository};
use crate::session::{SessionConfig, SessionStore};
use crate::state::AppState;

/// Build the application state from the environment: database pool with
/// migrations applied, Redis-backed session store, repositories, and the
/// moderation engine.
pub async fn build_state() -> Result<AppState> {
    let db_config = common::database::DatabaseConfig::from_env()?;
    let pool = common::database::init_pool(&db_config).await?;

    if common::database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    sqlx::migrate!().run(&pool).await?;

    let redis_config = common::cache::RedisConfig::from_env()?;
    let redis_pool = common::cache::RedisPool::new(&redis_config).await?;
    let sessions = SessionStore::new(redis_pool, SessionConfig::from_env());

    if sessions.health_check().await? {
        info!("Redis connection successful");
    } else {
        anyhow::bail!("Failed to connect to Redis");
    }

    let user_repository = UserRepository::new(pool.clone());
    let post_repository = PostRepository::new(pool.clone());
    let moderation = ModerationEngine::new(post_repository.clone(), ModerationConfig::from_env());
    let rate_limiter = RateLimiter::new(RateLimiterConfig::default());

    Ok(AppState {
        db_pool: pool,
        user_repository,
        post_repository,
        moderation,
        sessions,
        rate_limiter,
    })
}
