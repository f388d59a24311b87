//! API models for entities and request/response payloads

pub mod post;
pub mod user;

// Re-export for convenience
pub use post::{
    CreatePostRequest, Location, Post, PostStatus, Report, ReportRequest, ReportStatusResponse,
    SetStatusRequest, UpdatePostRequest, VoteDirection,
};
pub use user::{LoginRequest, Principal, RegisterRequest, Role, User, UserResponse};
