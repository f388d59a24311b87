//! Repositories for database operations

pub mod post;
pub mod user;

// Re-export for convenience
pub use post::PostRepository;
pub use user::UserRepository;
