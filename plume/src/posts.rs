//! Post lifecycle: creation, publishing, views and deletion.

use chrono::{Duration, Utc};
use serde_json::Value;

use crate::{
    client::{Blog, partial_failure},
    errors::{EngageError, EntityKind, StateViolation},
    id::generate_document_id,
    keys::POSTS,
    models::{Page, Post, PostStatus},
    runtime::{
        MemberOp, MutationCommand, MutationExecutor,
        commands::{DocumentDelete, DocumentInsert, FieldGuard},
    },
    validators::{Checks, strip_tags},
};

const EXCERPT_CHARS: usize = 200;
const WORDS_PER_MINUTE: usize = 200;
const TRENDING_DEFAULT_DAYS: i64 = 7;

#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub status: PostStatus,
}

/// First [`EXCERPT_CHARS`] characters of the text content.
pub fn excerpt(content: &str) -> String {
    let text = strip_tags(content);
    let text = text.trim();
    if text.chars().count() > EXCERPT_CHARS {
        let cut: String = text.chars().take(EXCERPT_CHARS).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}

/// Minutes to read at 200 words per minute, never below one.
pub fn reading_time(content: &str) -> i64 {
    let words = content.split_whitespace().count();
    words.div_ceil(WORDS_PER_MINUTE).max(1) as i64
}

/// Author edit of a post. Unset fields keep their stored value.
#[derive(Debug, Clone, Default)]
pub struct PostUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl PostUpdate {
    fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.tags.is_none()
    }
}

fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !normalized.contains(&tag) {
            normalized.push(tag);
        }
    }
    normalized
}

impl<E: MutationExecutor> Blog<E> {
    /// Stores a new post and bumps the author's `posts_count`.
    pub async fn create_post(&mut self, author_id: &str, new_post: NewPost) -> Result<Post, EngageError> {
        let title = new_post.title.trim().to_string();
        Checks::new()
            .length("title", &title, 1, 200)
            .length("content", &new_post.content, 1, 50_000)
            .check(
                new_post.status != PostStatus::Archived,
                "status",
                "status",
                "new posts are either draft or published",
            )
            .finish()?;
        self.get_user(author_id).await?;

        let now = Utc::now();
        let post = Post {
            id: generate_document_id(),
            author_id: author_id.to_string(),
            title,
            excerpt: excerpt(&new_post.content),
            reading_time: reading_time(&new_post.content),
            content: new_post.content,
            tags: normalize_tags(new_post.tags),
            status: new_post.status,
            published_at: (new_post.status == PostStatus::Published).then_some(now),
            likes: Vec::new(),
            likes_count: 0,
            comments_count: 0,
            views: 0,
            created_at: now,
            updated_at: now,
        };

        let insert = MutationCommand::InsertDocument(DocumentInsert {
            key: self.keys().post(&post.id),
            collection: POSTS.to_string(),
            entity_id: post.id.clone(),
            payload_json: serde_json::to_string(&post)?,
            unique_claims: Vec::new(),
            index_appends: vec![self.keys().author_posts(author_id), self.keys().directory(POSTS)],
        });
        self.apply(&insert).await?;

        let count = self.counter(EntityKind::User, author_id, "posts_count", 1);
        if let Err(err) = self.apply(&count).await {
            return Err(partial_failure("create_post", &insert, &count, err));
        }
        log::info!("user {author_id} created post {} ({})", post.id, post.status);
        Ok(post)
    }

    /// Moves a post between draft, published and archived. Only the author may
    /// do this and the status must actually change.
    pub async fn set_post_status(
        &mut self,
        actor_id: &str,
        post_id: &str,
        status: PostStatus,
    ) -> Result<Post, EngageError> {
        let post = self.get_post(post_id).await?;
        if post.author_id != actor_id {
            return Err(EngageError::unauthorized(actor_id, EntityKind::Post, post_id));
        }
        let allowed = matches!(
            (post.status, status),
            (PostStatus::Draft, PostStatus::Published)
                | (PostStatus::Published, PostStatus::Archived)
                | (PostStatus::Published, PostStatus::Draft)
                | (PostStatus::Archived, PostStatus::Published)
        );
        if !allowed {
            return Err(EngageError::invalid_state(
                EntityKind::Post,
                post_id,
                StateViolation::IllegalStatusTransition,
            ));
        }

        let now = Utc::now();
        let mut assign: Vec<(&str, Value)> = vec![
            ("status", Value::String(status.as_str().to_string())),
            ("updated_at", serde_json::to_value(now)?),
        ];
        if status == PostStatus::Published && post.published_at.is_none() {
            assign.push(("published_at", serde_json::to_value(now)?));
        }
        let command = self.patch(
            EntityKind::Post,
            post_id,
            vec![FieldGuard::new("status", post.status.as_str())],
            assign,
        );
        let response = self
            .apply(&command)
            .await
            .map_err(|err| err.guard_as(StateViolation::IllegalStatusTransition))?;
        log::info!("post {post_id}: {} -> {status}", post.status);
        Ok(serde_json::from_value(response["document"].clone())?)
    }

    /// Edits title, content or tags. A new body recomputes `excerpt` and
    /// `reading_time`; engagement fields are never touched.
    pub async fn update_post(
        &mut self,
        actor_id: &str,
        post_id: &str,
        update: PostUpdate,
    ) -> Result<Post, EngageError> {
        let title = update.title.as_deref().map(str::trim);
        let mut checks = Checks::new();
        if let Some(title) = title {
            checks.length("title", title, 1, 200);
        }
        if let Some(content) = &update.content {
            checks.length("content", content, 1, 50_000);
        }
        checks.check(!update.is_empty(), "update", "empty", "nothing to update");
        checks.finish()?;

        let post = self.get_post(post_id).await?;
        if post.author_id != actor_id {
            return Err(EngageError::unauthorized(actor_id, EntityKind::Post, post_id));
        }

        let mut assign: Vec<(&str, Value)> = Vec::new();
        if let Some(title) = title {
            assign.push(("title", Value::String(title.to_string())));
        }
        if let Some(content) = &update.content {
            assign.push(("excerpt", Value::String(excerpt(content))));
            assign.push(("reading_time", Value::from(reading_time(content))));
            assign.push(("content", Value::String(content.clone())));
        }
        if let Some(tags) = update.tags {
            assign.push(("tags", serde_json::to_value(normalize_tags(tags))?));
        }
        assign.push(("updated_at", serde_json::to_value(Utc::now())?));

        let command = self.patch(EntityKind::Post, post_id, Vec::new(), assign);
        let response = self.apply(&command).await?;
        log::info!("user {actor_id} edited post {post_id}");
        Ok(serde_json::from_value(response["document"].clone())?)
    }

    /// Counts one view and returns the new total.
    pub async fn record_view(&mut self, post_id: &str) -> Result<i64, EngageError> {
        let command = self.counter(EntityKind::Post, post_id, "views", 1);
        let response = self.apply(&command).await?;
        Ok(response["value"].as_i64().unwrap_or_default())
    }

    /// Deletes a post, decrements the author's `posts_count` and drops the
    /// post from every liker's `liked_posts`. Comments stay behind and become
    /// unreachable through the post.
    pub async fn delete_post(&mut self, actor_id: &str, post_id: &str) -> Result<(), EngageError> {
        let post = self.get_post(post_id).await?;
        if post.author_id != actor_id {
            return Err(EngageError::unauthorized(actor_id, EntityKind::Post, post_id));
        }

        let delete = MutationCommand::DeleteDocument(DocumentDelete {
            key: self.keys().post(post_id),
            collection: POSTS.to_string(),
            entity_id: post_id.to_string(),
            release_claims: Vec::new(),
            index_removals: vec![self.keys().author_posts(&post.author_id), self.keys().directory(POSTS)],
        });
        self.apply(&delete).await?;

        let count = self.counter(EntityKind::User, &post.author_id, "posts_count", -1);
        if let Err(err) = self.apply(&count).await {
            return Err(partial_failure("delete_post", &delete, &count, err));
        }

        for like in &post.likes {
            let unlike = MutationCommand::MutateMembers(self.member_mutation(
                EntityKind::User,
                &like.user_id,
                "liked_posts",
                MemberOp::Remove,
                post_id,
            ));
            match self.apply(&unlike).await {
                Ok(_) => {}
                // The liker's account is gone; nothing to repair.
                Err(err) if err.is_not_found() => {}
                Err(err) => return Err(partial_failure("delete_post", &delete, &unlike, err)),
            }
        }
        log::info!("user {actor_id} deleted post {post_id}");
        Ok(())
    }

    /// Posts by `author_id`, newest first. Drafts and archived posts are only
    /// listed for the author.
    pub async fn author_posts(
        &mut self,
        viewer_id: Option<&str>,
        author_id: &str,
        page: u64,
        page_size: u64,
    ) -> Result<Page<Post>, EngageError> {
        self.get_user(author_id).await?;
        let index_key = self.keys().author_posts(author_id);
        let ids = self.index(&index_key).await?;
        let own = viewer_id == Some(author_id);
        let mut posts: Vec<Post> = self
            .load_many(EntityKind::Post, &ids)
            .await?
            .into_iter()
            .filter(|post: &Post| own || post.status == PostStatus::Published)
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let page_size = self.limits().page_size(page_size);
        Ok(Page::slice(posts, page, page_size))
    }

    /// Published posts by the users `actor_id` follows, most recently
    /// published first. Someone who follows nobody gets every published post.
    pub async fn feed(&mut self, actor_id: &str, page: u64, page_size: u64) -> Result<Page<Post>, EngageError> {
        let actor = self.get_user(actor_id).await?;
        let ids = if actor.following.is_empty() {
            let directory_key = self.keys().directory(POSTS);
            self.index(&directory_key).await?
        } else {
            let mut ids = Vec::new();
            for author_id in &actor.following {
                let index_key = self.keys().author_posts(author_id);
                ids.extend(self.index(&index_key).await?);
            }
            ids
        };

        let mut posts: Vec<Post> = self
            .load_many(EntityKind::Post, &ids)
            .await?
            .into_iter()
            .filter(|post: &Post| post.status == PostStatus::Published)
            .collect();
        posts.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        let page_size = self.limits().page_size(page_size);
        Ok(Page::slice(posts, page, page_size))
    }

    /// Published posts from the last `days` days (default seven), ranked by
    /// likes, then views, then recency.
    pub async fn trending(&mut self, days: Option<i64>, limit: u64) -> Result<Vec<Post>, EngageError> {
        let since = Utc::now() - Duration::days(days.unwrap_or(TRENDING_DEFAULT_DAYS).clamp(0, 36_500));
        let directory_key = self.keys().directory(POSTS);
        let ids = self.index(&directory_key).await?;
        let mut posts: Vec<Post> = self
            .load_many(EntityKind::Post, &ids)
            .await?
            .into_iter()
            .filter(|post: &Post| {
                post.status == PostStatus::Published && post.published_at.is_some_and(|at| at >= since)
            })
            .collect();
        posts.sort_by(|a, b| {
            b.likes_count
                .cmp(&a.likes_count)
                .then(b.views.cmp(&a.views))
                .then(b.published_at.cmp(&a.published_at))
        });
        let limit = self.limits().page_size(limit);
        posts.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(posts)
    }

    /// Total likes across the author's published posts.
    pub async fn user_likes_received(&mut self, user_id: &str) -> Result<i64, EngageError> {
        self.get_user(user_id).await?;
        let index_key = self.keys().author_posts(user_id);
        let ids = self.index(&index_key).await?;
        let posts: Vec<Post> = self.load_many(EntityKind::Post, &ids).await?;
        Ok(posts
            .iter()
            .filter(|post| post.status == PostStatus::Published)
            .map(|post| post.likes_count)
            .sum())
    }
}
