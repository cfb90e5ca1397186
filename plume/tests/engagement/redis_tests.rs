//! Same flows against a live Redis, through the Lua scripts. Skipped when no
//! server answers on the default port.

use std::time::Duration;

use super::support::*;
use plume::{ConnectionManager, RedisExecutor};
use serial_test::serial;

const REDIS_URL: &str = "redis://127.0.0.1/";

async fn redis_blog() -> Option<Blog<RedisExecutor<ConnectionManager>>> {
    let client = redis::Client::open(REDIS_URL).ok()?;
    if client.get_connection_with_timeout(Duration::from_millis(250)).is_err() {
        eprintln!("redis not reachable at {REDIS_URL}; skipping");
        return None;
    }
    Some(Blog::connect(REDIS_URL, unique_keys()).await.expect("connect"))
}

#[tokio::test]
#[serial]
async fn redis_follow_toggle_round_trip() {
    let Some(mut blog) = redis_blog().await else {
        return;
    };
    let a = register(&mut blog, "alice").await;
    let b = register(&mut blog, "bobby").await;

    let followed = blog.toggle_follow(&a, &b).await.expect("follow");
    assert!(followed.is_following);
    assert_eq!((followed.followers_count, followed.following_count), (1, 1));

    let unfollowed = blog.toggle_follow(&a, &b).await.expect("unfollow");
    assert!(!unfollowed.is_following);
    assert_eq!((unfollowed.followers_count, unfollowed.following_count), (0, 0));

    // Empty arrays come back from the scripts as `{}`.
    let user = blog.get_user(&b).await.expect("reload");
    assert!(user.followers.is_empty());
}

#[tokio::test]
#[serial]
async fn redis_unique_username_claim() {
    let Some(mut blog) = redis_blog().await else {
        return;
    };
    let id = register(&mut blog, "alice").await;
    let err = blog
        .register_user(NewUser {
            username: "Alice".to_string(),
            email: "second@example.com".to_string(),
            password_hash: "hash".to_string(),
            full_name: "Second".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "unique_constraint_violation");
    assert_eq!(blog.find_user_by_username("ALICE").await.expect("lookup").id, id);
}

#[tokio::test]
#[serial]
async fn redis_like_guard_and_comment_lifecycle() {
    let Some(mut blog) = redis_blog().await else {
        return;
    };
    let author = register(&mut blog, "alice").await;
    let reader = register(&mut blog, "bobby").await;
    let draft = write_post(&mut blog, &author, PostStatus::Draft).await;
    let err = blog.toggle_post_like(&reader, &draft).await.unwrap_err();
    assert!(matches!(
        err,
        EngageError::InvalidState {
            reason: StateViolation::PostNotPublished,
            ..
        }
    ));

    let post = write_post(&mut blog, &author, PostStatus::Published).await;
    let like = blog.toggle_post_like(&reader, &post).await.expect("like");
    assert_eq!(like.likes_count, 1);

    let root = blog.create_comment(&reader, &post, "hi", None).await.expect("comment");
    let reply = blog
        .create_comment(&author, &post, "thanks", Some(&root.id))
        .await
        .expect("reply");
    assert_eq!(blog.get_post(&post).await.unwrap().comments_count, 2);

    blog.soft_delete_comment(&reader, &root.id).await.expect("delete");
    assert!(blog.soft_delete_comment(&reader, &root.id).await.unwrap_err().is_not_found());
    assert_eq!(blog.get_post(&post).await.unwrap().comments_count, 1);

    let thread = blog.comment_thread(&root.id).await.expect("thread");
    assert!(thread.comment.is_deleted());
    assert_eq!(thread.comment.replies, vec![reply.id]);

    blog.delete_post(&author, &post).await.expect("delete post");
    assert!(blog.get_user(&reader).await.unwrap().liked_posts.is_empty());
    assert_eq!(blog.get_user(&author).await.unwrap().posts_count, 1);
    assert!(blog.audit_user(&author).await.unwrap().is_consistent());
}
