//! Post repository for database operations
//!
//! All vote and report mutations are expressed as targeted statements
//! evaluated at the storage layer: the vote upsert keys on
//! (post_id, user_id), and report append/clear runs in a transaction that
//! locks the post row, so concurrent writers on the same post are
//! serialized by PostgreSQL rather than by this process.

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{
    CreatePostRequest, Location, Post, PostStatus, Report, UpdatePostRequest, VoteDirection,
};

/// Shared SELECT over posts with the vote sets aggregated per row.
const POST_SELECT: &str = r#"
    SELECT p.id, p.title, p.description, p.image, p.latitude, p.longitude, p.address,
           p.tags, p.author, p.created_at, p.status, p.report_count,
           COALESCE(array_agg(v.user_id) FILTER (WHERE v.direction = 'up'), '{}'::uuid[]) AS upvotes,
           COALESCE(array_agg(v.user_id) FILTER (WHERE v.direction = 'down'), '{}'::uuid[]) AS downvotes
    FROM posts p
    LEFT JOIN post_votes v ON v.post_id = p.id
"#;

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(
        err.as_database_error()
            .and_then(|db_err| db_err.code())
            .as_deref(),
        Some("23503")
    )
}

/// Post repository
#[derive(Clone)]
pub struct PostRepository {
    pool: PgPool,
}

impl PostRepository {
    /// Create a new post repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn post_from_row(row: &PgRow) -> ApiResult<Post> {
        let status: String = row.get("status");
        let status = PostStatus::parse(&status).ok_or(ApiError::Internal)?;

        Ok(Post {
            id: row.get("id"),
            title: row.get("title"),
            description: row.get("description"),
            image: row.get("image"),
            location: Location {
                latitude: row.get("latitude"),
                longitude: row.get("longitude"),
                address: row.get("address"),
            },
            tags: row.get("tags"),
            author: row.get("author"),
            created_at: row.get("created_at"),
            status,
            upvotes: row.get("upvotes"),
            downvotes: row.get("downvotes"),
            report_count: row.get("report_count"),
        })
    }

    /// Create a new post. Status starts at `pending` with empty votes and
    /// reports; the author is set here and never again.
    pub async fn create(&self, author: Uuid, fields: &CreatePostRequest) -> ApiResult<Post> {
        let row = sqlx::query(
            r#"
            INSERT INTO posts (title, description, image, latitude, longitude, address, tags, author)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, title, description, image, latitude, longitude, address,
                      tags, author, created_at, status, report_count
            "#,
        )
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(&fields.image)
        .bind(fields.location.latitude)
        .bind(fields.location.longitude)
        .bind(&fields.location.address)
        .bind(&fields.tags)
        .bind(author)
        .fetch_one(&self.pool)
        .await?;

        info!("Post created: {}", row.get::<Uuid, _>("id"));

        let status: String = row.get("status");
        let status = PostStatus::parse(&status).ok_or(ApiError::Internal)?;

        Ok(Post {
            id: row.get("id"),
            title: row.get("title"),
            description: row.get("description"),
            image: row.get("image"),
            location: Location {
                latitude: row.get("latitude"),
                longitude: row.get("longitude"),
                address: row.get("address"),
            },
            tags: row.get("tags"),
            author: row.get("author"),
            created_at: row.get("created_at"),
            status,
            upvotes: vec![],
            downvotes: vec![],
            report_count: row.get("report_count"),
        })
    }

    /// Get a post by ID with its vote sets
    pub async fn get(&self, id: Uuid) -> ApiResult<Option<Post>> {
        let query = format!("{} WHERE p.id = $1 GROUP BY p.id", POST_SELECT);
        let row = sqlx::query(&query).bind(id).fetch_optional(&self.pool).await?;

        match row {
            Some(row) => Ok(Some(Self::post_from_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Author of a post, if the post exists
    pub async fn author_of(&self, id: Uuid) -> ApiResult<Option<Uuid>> {
        let author = sqlx::query_scalar("SELECT author FROM posts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(author)
    }

    /// All posts, newest first, ties broken by id
    pub async fn list_public(&self) -> ApiResult<Vec<Post>> {
        let query = format!(
            "{} GROUP BY p.id ORDER BY p.created_at DESC, p.id DESC",
            POST_SELECT
        );
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        rows.iter().map(Self::post_from_row).collect()
    }

    /// Posts by one author, newest first
    pub async fn list_by_author(&self, author: Uuid) -> ApiResult<Vec<Post>> {
        let query = format!(
            "{} WHERE p.author = $1 GROUP BY p.id ORDER BY p.created_at DESC, p.id DESC",
            POST_SELECT
        );
        let rows = sqlx::query(&query)
            .bind(author)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::post_from_row).collect()
    }

    /// Posts whose report count has reached the threshold, most reported
    /// first
    pub async fn list_flagged(&self, threshold: i64) -> ApiResult<Vec<Post>> {
        let query = format!(
            "{} WHERE p.report_count >= $1 GROUP BY p.id ORDER BY p.report_count DESC",
            POST_SELECT
        );
        let rows = sqlx::query(&query)
            .bind(threshold)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::post_from_row).collect()
    }

    /// Apply an owner patch; only title, description, and tags are
    /// reachable. Returns the updated post.
    pub async fn update(&self, id: Uuid, patch: &UpdatePostRequest) -> ApiResult<Post> {
        let result = sqlx::query(
            r#"
            UPDATE posts
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                tags = COALESCE($4, tags)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&patch.title)
        .bind(&patch.description)
        .bind(&patch.tags)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("Post"));
        }

        self.get(id).await?.ok_or(ApiError::NotFound("Post"))
    }

    /// Delete a post; authorization is the caller's concern
    pub async fn delete(&self, id: Uuid) -> ApiResult<()> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("Post"));
        }

        info!("Post deleted: {}", id);
        Ok(())
    }

    /// Upsert a vote as a single storage-level statement. Re-voting the
    /// same direction is a no-op; the opposite direction replaces the
    /// prior vote. The (post_id, user_id) primary key guarantees a user is
    /// never in both sets.
    pub async fn upsert_vote(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        direction: VoteDirection,
    ) -> ApiResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO post_votes (post_id, user_id, direction)
            VALUES ($1, $2, $3)
            ON CONFLICT (post_id, user_id) DO UPDATE SET direction = EXCLUDED.direction
            "#,
        )
        .bind(post_id)
        .bind(user_id)
        .bind(direction.as_str())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_foreign_key_violation(&e) => Err(ApiError::NotFound("Post")),
            Err(e) => Err(e.into()),
        }
    }

    /// Append a report and bump the denormalized counter in one
    /// transaction, with the post row locked so the counter always equals
    /// the report sequence length. With `dedupe` set, a repeat report by
    /// the same reporter leaves the post untouched.
    pub async fn add_report(
        &self,
        post_id: Uuid,
        reporter: Uuid,
        reason: &str,
        dedupe: bool,
    ) -> ApiResult<()> {
        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query("SELECT 1 FROM posts WHERE id = $1 FOR UPDATE")
            .bind(post_id)
            .fetch_optional(&mut *tx)
            .await?;

        if locked.is_none() {
            return Err(ApiError::NotFound("Post"));
        }

        if dedupe {
            let existing =
                sqlx::query("SELECT 1 FROM post_reports WHERE post_id = $1 AND reporter_id = $2")
                    .bind(post_id)
                    .bind(reporter)
                    .fetch_optional(&mut *tx)
                    .await?;

            if existing.is_some() {
                tx.rollback().await?;
                return Ok(());
            }
        }

        sqlx::query("INSERT INTO post_reports (post_id, reporter_id, reason) VALUES ($1, $2, $3)")
            .bind(post_id)
            .bind(reporter)
            .bind(reason)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE posts SET report_count = report_count + 1 WHERE id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!("Post {} reported by {}", post_id, reporter);
        Ok(())
    }

    /// Reset the report sequence and counter together. Status is untouched.
    pub async fn clear_reports(&self, post_id: Uuid) -> ApiResult<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("UPDATE posts SET report_count = 0 WHERE id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("Post"));
        }

        sqlx::query("DELETE FROM post_reports WHERE post_id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!("Reports cleared for post {}", post_id);
        Ok(())
    }

    /// The report sequence for a post, oldest first
    pub async fn reports_for(&self, post_id: Uuid) -> ApiResult<Vec<Report>> {
        let rows = sqlx::query(
            r#"
            SELECT reporter_id, reason, created_at
            FROM post_reports
            WHERE post_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| Report {
                reporter: row.get("reporter_id"),
                reason: row.get("reason"),
                created_at: row.get("created_at"),
            })
            .collect())
    }

    /// Set the moderation status; any-to-any transitions are permitted
    pub async fn set_status(&self, post_id: Uuid, status: PostStatus) -> ApiResult<()> {
        let result = sqlx::query("UPDATE posts SET status = $2 WHERE id = $1")
            .bind(post_id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("Post"));
        }

        info!("Post {} status set to {}", post_id, status.as_str());
        Ok(())
    }

    /// Total number of posts
    pub async fn count(&self) -> ApiResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
