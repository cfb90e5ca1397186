pub mod audit;
pub mod comment;
pub mod post;
pub mod social;
pub mod user;

use anyhow::Result;
use plume::{Blog, MutationExecutor, User};

/// Accepts either a username or a user id.
pub async fn resolve_user<E: MutationExecutor>(blog: &mut Blog<E>, handle: &str) -> Result<User> {
    match blog.find_user_by_username(handle).await {
        Ok(user) => Ok(user),
        Err(err) if err.is_not_found() => Ok(blog.get_user(handle).await?),
        Err(err) => Err(err.into()),
    }
}
