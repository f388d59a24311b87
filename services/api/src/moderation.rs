//! Moderation engine: voting, reporting, and status transitions
//!
//! The engine owns the moderation rules (vote semantics, report threshold,
//! status vocabulary) and delegates the state mutations to the post
//! repository, which applies them atomically at the storage layer. It knows
//! nothing about HTTP; authorization happens before its mutating operations
//! are invoked.

use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{Post, PostStatus, ReportStatusResponse, VoteDirection};
use crate::repositories::PostRepository;
use crate::validation::validate_report_reason;

/// Moderation configuration
#[derive(Debug, Clone)]
pub struct ModerationConfig {
    /// Number of reports at which a post surfaces in the admin queue
    pub reports_threshold: i64,
    /// Whether repeat reports by the same reporter are ignored
    pub dedupe_reports: bool,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            reports_threshold: 5,
            dedupe_reports: false,
        }
    }
}

impl ModerationConfig {
    /// Create a new ModerationConfig from environment variables
    ///
    /// # Environment Variables
    /// - `REPORTS_THRESHOLD`: moderation queue threshold (default: 5)
    /// - `REPORT_DEDUPE`: ignore repeat reports per reporter (default: false)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let reports_threshold = std::env::var("REPORTS_THRESHOLD")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.reports_threshold);

        let dedupe_reports = std::env::var("REPORT_DEDUPE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.dedupe_reports);

        Self {
            reports_threshold,
            dedupe_reports,
        }
    }
}

/// Whether a report count has reached the moderation threshold
pub fn exceeds_threshold(report_count: i64, threshold: i64) -> bool {
    report_count >= threshold
}

/// Moderation engine over the post repository
#[derive(Clone)]
pub struct ModerationEngine {
    posts: PostRepository,
    config: ModerationConfig,
}

impl ModerationEngine {
    /// Create a new moderation engine
    pub fn new(posts: PostRepository, config: ModerationConfig) -> Self {
        Self { posts, config }
    }

    pub fn reports_threshold(&self) -> i64 {
        self.config.reports_threshold
    }

    /// Cast a vote. Re-voting the same direction is idempotent; the
    /// opposite direction atomically replaces the prior vote, so a voter
    /// is never in both sets.
    pub async fn cast_vote(
        &self,
        post_id: Uuid,
        voter: Uuid,
        direction: VoteDirection,
    ) -> ApiResult<Post> {
        self.posts.upsert_vote(post_id, voter, direction).await?;

        info!("User {} voted {} on post {}", voter, direction.as_str(), post_id);

        self.posts
            .get(post_id)
            .await?
            .ok_or(ApiError::NotFound("Post"))
    }

    /// File a report against a post. The reason must be non-empty after
    /// trimming; validation happens before any write.
    pub async fn report_post(&self, post_id: Uuid, reporter: Uuid, reason: &str) -> ApiResult<()> {
        validate_report_reason(reason).map_err(ApiError::Validation)?;

        self.posts
            .add_report(post_id, reporter, reason.trim(), self.config.dedupe_reports)
            .await
    }

    /// Read-only projection of a post's report state
    pub async fn check_report_status(&self, post_id: Uuid) -> ApiResult<ReportStatusResponse> {
        let post = self
            .posts
            .get(post_id)
            .await?
            .ok_or(ApiError::NotFound("Post"))?;

        let reports = self.posts.reports_for(post_id).await?;

        Ok(ReportStatusResponse {
            report_count: post.report_count,
            reports_threshold: self.config.reports_threshold,
            exceeds_threshold: exceeds_threshold(post.report_count, self.config.reports_threshold),
            reports,
        })
    }

    /// Posts at or above the report threshold, most reported first
    pub async fn list_flagged(&self) -> ApiResult<Vec<Post>> {
        self.posts.list_flagged(self.config.reports_threshold).await
    }

    /// Reset a post's reports and counter. Status is untouched.
    pub async fn clear_reports(&self, post_id: Uuid) -> ApiResult<Post> {
        self.posts.clear_reports(post_id).await?;

        self.posts
            .get(post_id)
            .await?
            .ok_or(ApiError::NotFound("Post"))
    }

    /// Set the moderation status. Any state is reachable from any state,
    /// including itself; an unrecognized status value is a validation
    /// error.
    pub async fn set_status(&self, post_id: Uuid, new_status: &str) -> ApiResult<Post> {
        let status = PostStatus::parse(new_status).ok_or_else(|| {
            ApiError::Validation(format!(
                "Unknown status '{}': expected pending, in-progress, or resolved",
                new_status
            ))
        })?;

        self.posts.set_status(post_id, status).await?;

        self.posts
            .get(post_id)
            .await?
            .ok_or(ApiError::NotFound("Post"))
    }
}
