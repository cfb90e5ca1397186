//! Relationship toggles: follows, post likes and comment likes.
//!
//! The direction of a toggle is decided from stored membership only. Each side
//! is one atomic member mutation that also resets the paired count to the
//! collection's length, so a count that drifted earlier is corrected by the
//! next toggle touching it.

use chrono::Utc;
use serde::Serialize;

use crate::{
    client::{Blog, partial_failure},
    errors::{EngageError, EntityKind, StateViolation},
    models::{Like, Page, Post, PostStatus},
    runtime::{MemberOp, MutationCommand, MutationExecutor, commands::FieldGuard},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    Follow,
    PostLike,
    CommentLike,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::Follow => "follow",
            RelationKind::PostLike => "post_like",
            RelationKind::CommentLike => "comment_like",
        }
    }
}

/// State after a toggle, as stored.
///
/// For follows `actor_count` is the actor's `following_count` and
/// `target_count` the target's `followers_count`. For post likes they are the
/// actor's liked-post count and the post's `likes_count`. Comment likes only
/// have one side, so both hold the comment's `likes_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToggleOutcome {
    pub active: bool,
    pub actor_count: i64,
    pub target_count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowOutcome {
    pub is_following: bool,
    pub followers_count: i64,
    pub following_count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeOutcome {
    pub is_liked: bool,
    pub likes_count: i64,
}

impl<E: MutationExecutor> Blog<E> {
    pub async fn toggle(
        &mut self,
        kind: RelationKind,
        actor_id: &str,
        target_id: &str,
    ) -> Result<ToggleOutcome, EngageError> {
        match kind {
            RelationKind::Follow => self.toggle_follow_edge(actor_id, target_id).await,
            RelationKind::PostLike => self.toggle_post_like_edge(actor_id, target_id).await,
            RelationKind::CommentLike => self.toggle_comment_like_edge(actor_id, target_id).await,
        }
    }

    pub async fn toggle_follow(&mut self, actor_id: &str, target_user_id: &str) -> Result<FollowOutcome, EngageError> {
        let outcome = self.toggle(RelationKind::Follow, actor_id, target_user_id).await?;
        Ok(FollowOutcome {
            is_following: outcome.active,
            followers_count: outcome.target_count,
            following_count: outcome.actor_count,
        })
    }

    pub async fn toggle_post_like(&mut self, actor_id: &str, post_id: &str) -> Result<LikeOutcome, EngageError> {
        let outcome = self.toggle(RelationKind::PostLike, actor_id, post_id).await?;
        Ok(LikeOutcome {
            is_liked: outcome.active,
            likes_count: outcome.target_count,
        })
    }

    pub async fn toggle_comment_like(&mut self, actor_id: &str, comment_id: &str) -> Result<LikeOutcome, EngageError> {
        let outcome = self.toggle(RelationKind::CommentLike, actor_id, comment_id).await?;
        Ok(LikeOutcome {
            is_liked: outcome.active,
            likes_count: outcome.target_count,
        })
    }

    async fn toggle_follow_edge(&mut self, actor_id: &str, target_id: &str) -> Result<ToggleOutcome, EngageError> {
        if actor_id == target_id {
            return Err(EngageError::SelfReference {
                user_id: actor_id.to_string(),
            });
        }
        self.get_user(target_id).await?;
        let actor = self.get_user(actor_id).await?;

        let op = MemberOp::toggle_from(actor.is_following(target_id));
        log::debug!("follow toggle {actor_id} -> {target_id}: {op:?}");

        let mut following = self.member_mutation(EntityKind::User, actor_id, "following", op, target_id);
        following.count_field = Some("following_count".to_string());
        let following = MutationCommand::MutateMembers(following);

        let mut followers = self.member_mutation(EntityKind::User, target_id, "followers", op, actor_id);
        followers.count_field = Some("followers_count".to_string());
        let followers = MutationCommand::MutateMembers(followers);

        let actor_side = self.apply_members(&following).await?;
        let target_side = match self.apply_members(&followers).await {
            Ok(change) => change,
            Err(err) => return Err(partial_failure("follow", &following, &followers, err)),
        };

        Ok(ToggleOutcome {
            active: actor_side.present,
            actor_count: actor_side.count,
            target_count: target_side.count,
        })
    }

    async fn toggle_post_like_edge(&mut self, actor_id: &str, post_id: &str) -> Result<ToggleOutcome, EngageError> {
        let post = self.get_post(post_id).await?;
        self.get_user(actor_id).await?;
        if post.status != PostStatus::Published {
            return Err(EngageError::invalid_state(
                EntityKind::Post,
                post_id,
                StateViolation::PostNotPublished,
            ));
        }

        let op = MemberOp::toggle_from(post.is_liked_by(actor_id));
        log::debug!("post like toggle {actor_id} -> {post_id}: {op:?}");

        let mut likes = self.member_mutation(EntityKind::Post, post_id, "likes", op, actor_id);
        likes.match_field = Some("user_id".to_string());
        likes.entry = serde_json::to_value(Like {
            user_id: actor_id.to_string(),
            liked_at: Utc::now(),
        })?;
        likes.count_field = Some("likes_count".to_string());
        likes.guards = vec![FieldGuard::new("status", PostStatus::Published.as_str())];
        let likes = MutationCommand::MutateMembers(likes);

        let liked_posts = MutationCommand::MutateMembers(self.member_mutation(
            EntityKind::User,
            actor_id,
            "liked_posts",
            op,
            post_id,
        ));

        let post_side = self
            .apply_members(&likes)
            .await
            .map_err(|err| err.guard_as(StateViolation::PostNotPublished))?;
        let actor_side = match self.apply_members(&liked_posts).await {
            Ok(change) => change,
            Err(err) => return Err(partial_failure("post_like", &likes, &liked_posts, err)),
        };

        Ok(ToggleOutcome {
            active: post_side.present,
            actor_count: actor_side.count,
            target_count: post_side.count,
        })
    }

    async fn toggle_comment_like_edge(
        &mut self,
        actor_id: &str,
        comment_id: &str,
    ) -> Result<ToggleOutcome, EngageError> {
        let comment = self.get_comment(comment_id).await?;
        self.get_user(actor_id).await?;
        if comment.is_deleted() {
            return Err(EngageError::invalid_state(
                EntityKind::Comment,
                comment_id,
                StateViolation::CommentDeleted,
            ));
        }
        self.get_post(&comment.post_id).await?;

        let op = MemberOp::toggle_from(comment.is_liked_by(actor_id));
        log::debug!("comment like toggle {actor_id} -> {comment_id}: {op:?}");

        let mut likes = self.member_mutation(EntityKind::Comment, comment_id, "likes", op, actor_id);
        likes.match_field = Some("user_id".to_string());
        likes.entry = serde_json::to_value(Like {
            user_id: actor_id.to_string(),
            liked_at: Utc::now(),
        })?;
        likes.count_field = Some("likes_count".to_string());
        likes.guards = vec![FieldGuard::new("body.state", "active")];

        let change = self
            .apply_members(&MutationCommand::MutateMembers(likes))
            .await
            .map_err(|err| err.guard_as(StateViolation::CommentDeleted))?;

        Ok(ToggleOutcome {
            active: change.present,
            actor_count: change.count,
            target_count: change.count,
        })
    }

    pub async fn is_following(&mut self, actor_id: &str, target_id: &str) -> Result<bool, EngageError> {
        Ok(self.get_user(actor_id).await?.is_following(target_id))
    }

    pub async fn has_liked_post(&mut self, actor_id: &str, post_id: &str) -> Result<bool, EngageError> {
        Ok(self.get_post(post_id).await?.is_liked_by(actor_id))
    }

    pub async fn has_liked_comment(&mut self, actor_id: &str, comment_id: &str) -> Result<bool, EngageError> {
        Ok(self.get_comment(comment_id).await?.is_liked_by(actor_id))
    }

    /// Users who liked a post, in like order.
    pub async fn post_likers(&mut self, post_id: &str) -> Result<Vec<String>, EngageError> {
        let post = self.get_post(post_id).await?;
        Ok(post.likes.into_iter().map(|like| like.user_id).collect())
    }

    pub async fn comment_likers(&mut self, comment_id: &str) -> Result<Vec<String>, EngageError> {
        let comment = self.get_comment(comment_id).await?;
        Ok(comment.likes.into_iter().map(|like| like.user_id).collect())
    }

    /// Published posts a user has liked, newest post first.
    pub async fn liked_posts(&mut self, user_id: &str, page: u64, page_size: u64) -> Result<Page<Post>, EngageError> {
        let user = self.get_user(user_id).await?;
        let mut posts: Vec<Post> = self
            .load_many(EntityKind::Post, &user.liked_posts)
            .await?
            .into_iter()
            .filter(|post: &Post| post.status == PostStatus::Published)
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let page_size = self.limits().page_size(page_size);
        Ok(Page::slice(posts, page, page_size))
    }
}
