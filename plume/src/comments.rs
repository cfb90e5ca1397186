//! Comment tree maintenance.
//!
//! Comments are never removed. A soft delete swaps the body for the
//! tombstone, keeps the comment in its parent's `replies` and takes it out of
//! the post's `comments_count`.

use chrono::Utc;

use crate::{
    client::{Blog, partial_failure},
    errors::{EngageError, EntityKind, StateViolation},
    id::generate_document_id,
    keys::COMMENTS,
    models::{Comment, CommentBody, CommentThread, Page},
    runtime::{
        MemberOp, MutationCommand, MutationExecutor,
        commands::{DocumentInsert, FieldGuard},
    },
    validators::validate_comment_body,
};

fn active_guard() -> FieldGuard {
    FieldGuard::new("body.state", "active")
}

impl<E: MutationExecutor> Blog<E> {
    pub async fn create_comment(
        &mut self,
        actor_id: &str,
        post_id: &str,
        body: &str,
        parent_comment_id: Option<&str>,
    ) -> Result<Comment, EngageError> {
        let body = body.trim();
        validate_comment_body(body, self.limits().comment_max_chars)?;
        self.get_post(post_id).await?;
        self.get_user(actor_id).await?;

        if let Some(parent_id) = parent_comment_id {
            let parent = self.get_comment(parent_id).await?;
            if parent.is_deleted() {
                return Err(EngageError::invalid_state(
                    EntityKind::Comment,
                    parent_id,
                    StateViolation::CommentDeleted,
                ));
            }
            if parent.post_id != post_id {
                return Err(EngageError::invalid_state(
                    EntityKind::Comment,
                    parent_id,
                    StateViolation::CrossPostReply,
                ));
            }
        }

        let now = Utc::now();
        let comment = Comment {
            id: generate_document_id(),
            post_id: post_id.to_string(),
            author_id: actor_id.to_string(),
            parent_comment_id: parent_comment_id.map(str::to_string),
            replies: Vec::new(),
            body: CommentBody::Active(body.to_string()),
            likes: Vec::new(),
            likes_count: 0,
            edited_at: None,
            created_at: now,
            updated_at: now,
        };

        let insert = MutationCommand::InsertDocument(DocumentInsert {
            key: self.keys().comment(&comment.id),
            collection: COMMENTS.to_string(),
            entity_id: comment.id.clone(),
            payload_json: serde_json::to_string(&comment)?,
            unique_claims: Vec::new(),
            index_appends: vec![self.keys().post_comments(post_id)],
        });
        self.apply(&insert).await?;

        if let Some(parent_id) = parent_comment_id {
            let append = MutationCommand::MutateMembers(self.member_mutation(
                EntityKind::Comment,
                parent_id,
                "replies",
                MemberOp::Add,
                &comment.id,
            ));
            if let Err(err) = self.apply(&append).await {
                return Err(partial_failure("create_comment", &insert, &append, err));
            }
        }

        let count = self.counter(EntityKind::Post, post_id, "comments_count", 1);
        if let Err(err) = self.apply(&count).await {
            return Err(partial_failure("create_comment", &insert, &count, err));
        }
        log::debug!("user {actor_id} commented {} on post {post_id}", comment.id);
        Ok(comment)
    }

    pub async fn update_comment(
        &mut self,
        actor_id: &str,
        comment_id: &str,
        body: &str,
    ) -> Result<Comment, EngageError> {
        let body = body.trim();
        validate_comment_body(body, self.limits().comment_max_chars)?;
        let comment = self.get_comment(comment_id).await?;
        if comment.author_id != actor_id {
            return Err(EngageError::unauthorized(actor_id, EntityKind::Comment, comment_id));
        }
        if comment.is_deleted() {
            return Err(EngageError::invalid_state(
                EntityKind::Comment,
                comment_id,
                StateViolation::CommentDeleted,
            ));
        }
        self.get_post(&comment.post_id).await?;

        let now = serde_json::to_value(Utc::now())?;
        let command = self.patch(
            EntityKind::Comment,
            comment_id,
            vec![active_guard()],
            vec![
                ("body", serde_json::to_value(CommentBody::Active(body.to_string()))?),
                ("edited_at", now.clone()),
                ("updated_at", now),
            ],
        );
        let response = self
            .apply(&command)
            .await
            .map_err(|err| err.guard_as(StateViolation::CommentDeleted))?;
        Ok(serde_json::from_value(response["document"].clone())?)
    }

    /// Replaces the body with the tombstone and decrements the post's
    /// `comments_count`. Deleting an already deleted comment is `NotFound`.
    pub async fn soft_delete_comment(&mut self, actor_id: &str, comment_id: &str) -> Result<(), EngageError> {
        let comment = self.get_comment(comment_id).await?;
        if comment.author_id != actor_id {
            return Err(EngageError::unauthorized(actor_id, EntityKind::Comment, comment_id));
        }
        if comment.is_deleted() {
            return Err(EngageError::not_found(EntityKind::Comment, comment_id));
        }
        self.get_post(&comment.post_id).await?;

        let tombstone = self.patch(
            EntityKind::Comment,
            comment_id,
            vec![active_guard()],
            vec![
                ("body", serde_json::to_value(CommentBody::Deleted)?),
                ("updated_at", serde_json::to_value(Utc::now())?),
            ],
        );
        // A concurrent delete won the guard.
        self.apply(&tombstone).await.map_err(|err| match err {
            EngageError::GuardFailed { id, .. } => EngageError::not_found(EntityKind::Comment, id),
            other => other,
        })?;

        let count = self.counter(EntityKind::Post, &comment.post_id, "comments_count", -1);
        if let Err(err) = self.apply(&count).await {
            return Err(partial_failure("soft_delete_comment", &tombstone, &count, err));
        }
        log::debug!("user {actor_id} deleted comment {comment_id}");
        Ok(())
    }

    /// A comment with its direct replies, in creation order.
    pub async fn comment_thread(&mut self, comment_id: &str) -> Result<CommentThread, EngageError> {
        let comment = self.get_comment(comment_id).await?;
        self.get_post(&comment.post_id).await?;
        let replies = self.load_many(EntityKind::Comment, &comment.replies).await?;
        Ok(CommentThread { comment, replies })
    }

    /// Top-level comments of a post that are not deleted, newest first, each
    /// with its direct replies loaded.
    pub async fn post_comments(
        &mut self,
        post_id: &str,
        page: u64,
        page_size: u64,
    ) -> Result<Page<CommentThread>, EngageError> {
        self.get_post(post_id).await?;
        let index_key = self.keys().post_comments(post_id);
        let ids = self.index(&index_key).await?;
        let mut comments: Vec<Comment> = self
            .load_many(EntityKind::Comment, &ids)
            .await?
            .into_iter()
            .filter(|comment: &Comment| !comment.is_reply() && !comment.is_deleted())
            .collect();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let page_size = self.limits().page_size(page_size);
        let roots = Page::slice(comments, page, page_size);

        let mut items = Vec::with_capacity(roots.items.len());
        for comment in roots.items {
            let replies = self.load_many(EntityKind::Comment, &comment.replies).await?;
            items.push(CommentThread { comment, replies });
        }
        Ok(Page {
            items,
            total: roots.total,
            page: roots.page,
            page_size: roots.page_size,
        })
    }
}
