//! Post model: the moderated entity, its votes, reports, and status

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Moderation status of a post. Any state is reachable from any state;
/// transitions are guarded only by admin authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PostStatus {
    Pending,
    InProgress,
    Resolved,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Pending => "pending",
            PostStatus::InProgress => "in-progress",
            PostStatus::Resolved => "resolved",
        }
    }

    pub fn parse(s: &str) -> Option<PostStatus> {
        match s {
            "pending" => Some(PostStatus::Pending),
            "in-progress" => Some(PostStatus::InProgress),
            "resolved" => Some(PostStatus::Resolved),
            _ => None,
        }
    }
}

/// Vote direction: a user holds at most one of these per post
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteDirection::Up => "up",
            VoteDirection::Down => "down",
        }
    }

    pub fn parse(s: &str) -> Option<VoteDirection> {
        match s {
            "up" => Some(VoteDirection::Up),
            "down" => Some(VoteDirection::Down),
            _ => None,
        }
    }
}

/// Geographic location of a reported issue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub address: String,
}

/// Post as returned to clients, with vote sets aggregated
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub image: String,
    pub location: Location,
    pub tags: Vec<String>,
    pub author: Uuid,
    pub created_at: DateTime<Utc>,
    pub status: PostStatus,
    pub upvotes: Vec<Uuid>,
    pub downvotes: Vec<Uuid>,
    pub report_count: i64,
}

/// A report filed against a post
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub reporter: Uuid,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// Request for creating a post
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePostRequest {
    pub title: String,
    pub description: String,
    pub image: String,
    pub location: Location,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Patch for an owner edit; author, votes, reports, and status are not
/// reachable through this payload
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Request for reporting a post
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportRequest {
    pub reason: String,
}

/// Request for an admin status change. The status arrives as a raw string
/// so an unrecognized value maps to a validation error, not a decode error.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetStatusRequest {
    pub status: String,
}

/// Read-only projection of a post's report state
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportStatusResponse {
    pub report_count: i64,
    pub reports_threshold: i64,
    pub exceeds_threshold: bool,
    pub reports: Vec<Report>,
}
