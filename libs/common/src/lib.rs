//! Common library for the Nagrik Seva backend
//!
//! This crate provides the infrastructure shared by the services in the
//! Nagrik Seva civic-issue-reporting application: PostgreSQL connection
//! pooling, the Redis pool used for server-side sessions, and the shared
//! database error types.

pub mod cache;
pub mod database;
pub mod error;
