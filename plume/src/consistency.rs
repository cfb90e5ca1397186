//! Drift detection and repair.
//!
//! Nothing here runs automatically. Audits only read; the repair operations
//! are idempotent single-document writes that can be retried freely.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;

use crate::{
    client::Blog,
    errors::{EngageError, EntityKind},
    graph::FollowOutcome,
    models::{Comment, Post, User},
    runtime::{MemberOp, MutationCommand, MutationExecutor},
};

/// Member id that never occurs in a relationship list. Removing it rewrites
/// nothing and resets the paired count.
const ABSENT_MEMBER: &str = "";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Drift {
    /// A stored count differs from the length of its collection.
    CountMismatch { field: String, stored: i64, actual: i64 },
    /// The same member appears more than once in a collection.
    DuplicateMember { field: String, member: String },
    /// The other document does not carry the reverse side of an edge.
    MissingReverse {
        field: String,
        other: EntityKind,
        other_id: String,
    },
    /// A collection references a document that no longer exists.
    DanglingReference {
        field: String,
        other: EntityKind,
        other_id: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub entity: EntityKind,
    pub id: String,
    pub drift: Vec<Drift>,
}

impl AuditReport {
    fn new(entity: EntityKind, id: &str) -> Self {
        Self {
            entity,
            id: id.to_string(),
            drift: Vec::new(),
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.drift.is_empty()
    }

    fn count(&mut self, field: &str, stored: i64, actual: usize) {
        let actual = actual as i64;
        if stored != actual {
            self.drift.push(Drift::CountMismatch {
                field: field.to_string(),
                stored,
                actual,
            });
        }
    }

    fn duplicates<'a>(&mut self, field: &str, members: impl IntoIterator<Item = &'a str>) {
        for member in duplicated(members) {
            self.drift.push(Drift::DuplicateMember {
                field: field.to_string(),
                member,
            });
        }
    }

    fn missing(&mut self, field: &str, other: EntityKind, other_id: &str) {
        self.drift.push(Drift::MissingReverse {
            field: field.to_string(),
            other,
            other_id: other_id.to_string(),
        });
    }

    fn dangling(&mut self, field: &str, other: EntityKind, other_id: &str) {
        self.drift.push(Drift::DanglingReference {
            field: field.to_string(),
            other,
            other_id: other_id.to_string(),
        });
    }

    fn log(self) -> Self {
        for drift in &self.drift {
            log::warn!("drift on {} '{}': {drift:?}", self.entity, self.id);
        }
        self
    }
}

fn duplicated<'a>(members: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut repeated = Vec::new();
    for member in members {
        if !seen.insert(member) && !repeated.iter().any(|r: &String| r == member) {
            repeated.push(member.to_string());
        }
    }
    repeated
}

impl<E: MutationExecutor> Blog<E> {
    /// Checks a user's counts, duplicate edges and the reverse side of every
    /// follow and liked post.
    pub async fn audit_user(&mut self, user_id: &str) -> Result<AuditReport, EngageError> {
        let user = self.get_user(user_id).await?;
        let mut report = AuditReport::new(EntityKind::User, user_id);

        report.count("followers_count", user.followers_count, user.followers.len());
        report.count("following_count", user.following_count, user.following.len());
        let index_key = self.keys().author_posts(user_id);
        let authored = self.index(&index_key).await?;
        report.count("posts_count", user.posts_count, authored.len());

        report.duplicates("followers", user.followers.iter().map(String::as_str));
        report.duplicates("following", user.following.iter().map(String::as_str));
        report.duplicates("liked_posts", user.liked_posts.iter().map(String::as_str));

        for target_id in &user.following {
            match self.try_load::<User>(EntityKind::User, target_id).await? {
                Some(target) if !target.is_followed_by(user_id) => {
                    report.missing("followers", EntityKind::User, target_id);
                }
                Some(_) => {}
                None => report.dangling("following", EntityKind::User, target_id),
            }
        }
        for follower_id in &user.followers {
            match self.try_load::<User>(EntityKind::User, follower_id).await? {
                Some(follower) if !follower.is_following(user_id) => {
                    report.missing("following", EntityKind::User, follower_id);
                }
                Some(_) => {}
                None => report.dangling("followers", EntityKind::User, follower_id),
            }
        }
        for post_id in &user.liked_posts {
            match self.try_load::<Post>(EntityKind::Post, post_id).await? {
                Some(post) if !post.is_liked_by(user_id) => report.missing("likes", EntityKind::Post, post_id),
                Some(_) => {}
                None => report.dangling("liked_posts", EntityKind::Post, post_id),
            }
        }
        Ok(report.log())
    }

    /// Checks `likes_count`, `comments_count` and each liker's `liked_posts`.
    pub async fn audit_post(&mut self, post_id: &str) -> Result<AuditReport, EngageError> {
        let post = self.get_post(post_id).await?;
        let mut report = AuditReport::new(EntityKind::Post, post_id);

        report.count("likes_count", post.likes_count, post.likes.len());
        report.duplicates("likes", post.likes.iter().map(|like| like.user_id.as_str()));
        let live = self.live_comment_count(post_id).await?;
        report.count("comments_count", post.comments_count, live);

        for like in &post.likes {
            match self.try_load::<User>(EntityKind::User, &like.user_id).await? {
                Some(user) if !user.liked_posts.iter().any(|id| id == post_id) => {
                    report.missing("liked_posts", EntityKind::User, &like.user_id);
                }
                Some(_) => {}
                None => report.dangling("likes", EntityKind::User, &like.user_id),
            }
        }
        Ok(report.log())
    }

    /// Checks `likes_count` and that every reply points back at the comment.
    pub async fn audit_comment(&mut self, comment_id: &str) -> Result<AuditReport, EngageError> {
        let comment = self.get_comment(comment_id).await?;
        let mut report = AuditReport::new(EntityKind::Comment, comment_id);

        report.count("likes_count", comment.likes_count, comment.likes.len());
        report.duplicates("likes", comment.likes.iter().map(|like| like.user_id.as_str()));
        report.duplicates("replies", comment.replies.iter().map(String::as_str));

        if self.try_load::<Post>(EntityKind::Post, &comment.post_id).await?.is_none() {
            report.dangling("post_id", EntityKind::Post, &comment.post_id);
        }
        for reply_id in &comment.replies {
            match self.try_load::<Comment>(EntityKind::Comment, reply_id).await? {
                Some(reply) if reply.parent_comment_id.as_deref() != Some(comment_id) => {
                    report.missing("parent_comment_id", EntityKind::Comment, reply_id);
                }
                Some(_) => {}
                None => report.dangling("replies", EntityKind::Comment, reply_id),
            }
        }
        Ok(report.log())
    }

    /// Makes the target's side of a follow agree with the actor's `following`,
    /// which is written first and therefore taken as the truth.
    pub async fn reconcile_follow(&mut self, actor_id: &str, target_id: &str) -> Result<FollowOutcome, EngageError> {
        let actor = self.get_user(actor_id).await?;
        self.get_user(target_id).await?;
        let op = if actor.is_following(target_id) {
            MemberOp::Add
        } else {
            MemberOp::Remove
        };

        let mut following = self.member_mutation(EntityKind::User, actor_id, "following", op, target_id);
        following.count_field = Some("following_count".to_string());
        let mut followers = self.member_mutation(EntityKind::User, target_id, "followers", op, actor_id);
        followers.count_field = Some("followers_count".to_string());

        let actor_side = self.apply_members(&MutationCommand::MutateMembers(following)).await?;
        let target_side = self.apply_members(&MutationCommand::MutateMembers(followers)).await?;
        if target_side.changed {
            log::info!("reconciled follow {actor_id} -> {target_id} ({op:?} on followers)");
        }
        Ok(FollowOutcome {
            is_following: actor_side.present,
            followers_count: target_side.count,
            following_count: actor_side.count,
        })
    }

    /// Resets the user's counts to the cardinality of their collections and
    /// drops duplicate edges.
    pub async fn recount_user(&mut self, user_id: &str) -> Result<User, EngageError> {
        let user = self.get_user(user_id).await?;
        self.recount_members(
            EntityKind::User,
            user_id,
            "followers",
            Some("followers_count"),
            None,
            user.followers.iter().map(String::as_str),
        )
        .await?;
        self.recount_members(
            EntityKind::User,
            user_id,
            "following",
            Some("following_count"),
            None,
            user.following.iter().map(String::as_str),
        )
        .await?;
        self.recount_members(
            EntityKind::User,
            user_id,
            "liked_posts",
            None,
            None,
            user.liked_posts.iter().map(String::as_str),
        )
        .await?;

        let index_key = self.keys().author_posts(user_id);
        let authored = self.index(&index_key).await?.len() as i64;
        let patch = self.patch(EntityKind::User, user_id, Vec::new(), vec![("posts_count", Value::from(authored))]);
        let response = self.apply(&patch).await?;
        Ok(serde_json::from_value(response["document"].clone())?)
    }

    pub async fn recount_post(&mut self, post_id: &str) -> Result<Post, EngageError> {
        let post = self.get_post(post_id).await?;
        self.recount_members(
            EntityKind::Post,
            post_id,
            "likes",
            Some("likes_count"),
            Some("user_id"),
            post.likes.iter().map(|like| like.user_id.as_str()),
        )
        .await?;

        let live = self.live_comment_count(post_id).await? as i64;
        let patch = self.patch(EntityKind::Post, post_id, Vec::new(), vec![("comments_count", Value::from(live))]);
        let response = self.apply(&patch).await?;
        Ok(serde_json::from_value(response["document"].clone())?)
    }

    pub async fn recount_comment(&mut self, comment_id: &str) -> Result<Comment, EngageError> {
        let comment = self.get_comment(comment_id).await?;
        self.recount_members(
            EntityKind::Comment,
            comment_id,
            "likes",
            Some("likes_count"),
            Some("user_id"),
            comment.likes.iter().map(|like| like.user_id.as_str()),
        )
        .await?;
        self.recount_members(
            EntityKind::Comment,
            comment_id,
            "replies",
            None,
            None,
            comment.replies.iter().map(String::as_str),
        )
        .await?;
        self.get_comment(comment_id).await
    }

    /// An add of a duplicated member keeps only its first entry; a remove of
    /// [`ABSENT_MEMBER`] changes nothing. Both rewrite the count atomically.
    async fn recount_members<'a>(
        &mut self,
        kind: EntityKind,
        id: &str,
        field: &str,
        count_field: Option<&str>,
        match_field: Option<&str>,
        members: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), EngageError> {
        let repeated = duplicated(members);
        let mut commands = Vec::with_capacity(repeated.len().max(1));
        if repeated.is_empty() {
            if count_field.is_some() {
                commands.push(self.member_mutation(kind, id, field, MemberOp::Remove, ABSENT_MEMBER));
            }
        } else {
            for member in &repeated {
                let mut add = self.member_mutation(kind, id, field, MemberOp::Add, member);
                // Never appended: the member is already present.
                add.entry = Value::Null;
                commands.push(add);
            }
        }

        for mut command in commands {
            command.count_field = count_field.map(str::to_string);
            command.match_field = match_field.map(str::to_string);
            command.updated_at = None;
            self.apply_members(&MutationCommand::MutateMembers(command)).await?;
        }
        Ok(())
    }

    async fn live_comment_count(&mut self, post_id: &str) -> Result<usize, EngageError> {
        let index_key = self.keys().post_comments(post_id);
        let ids = self.index(&index_key).await?;
        let comments: Vec<Comment> = self.load_many(EntityKind::Comment, &ids).await?;
        Ok(comments.iter().filter(|comment| !comment.is_deleted()).count())
    }
}
