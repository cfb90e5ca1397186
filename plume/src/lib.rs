//! Plume engagement core.
//!
//! Keeps follows, post likes, comment likes and the comment tree of a blog
//! consistent on a document store without cross-document transactions. Every
//! write is one atomic single-document command; operations that touch two
//! documents report a failed second step as [`EngageError::PartialFailure`],
//! and [`consistency`] can find and repair what was left behind.

pub mod client;
pub mod comments;
pub mod config;
pub mod consistency;
pub mod errors;
pub mod graph;
pub mod id;
pub mod keys;
pub mod models;
pub mod posts;
pub mod runtime;
pub mod users;
pub mod validators;

pub use client::Blog;
pub use config::{Limits, PlumeConfig};
pub use consistency::{AuditReport, Drift};
pub use errors::*;
pub use graph::{FollowOutcome, LikeOutcome, RelationKind, ToggleOutcome};
pub use keys::KeyContext;
pub use models::{Comment, CommentBody, CommentThread, Like, Page, Post, PostStatus, User};
pub use posts::{NewPost, PostUpdate};
pub use runtime::{MemoryExecutor, MutationExecutor, RedisExecutor};
pub use users::{NewUser, ProfileUpdate};

pub use redis;
pub use redis::aio::ConnectionManager;
