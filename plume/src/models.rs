//! Stored documents.
//!
//! Relationship membership is embedded in the owning document: a user carries
//! `followers`/`following`, posts and comments carry `likes`. Each collection has
//! a denormalized count next to it that every mutation resets to the collection's
//! length.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::Value;

/// Text shown in place of a soft-deleted comment.
pub const COMMENT_TOMBSTONE: &str = "[This comment has been deleted]";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default, deserialize_with = "lenient_seq")]
    pub followers: Vec<String>,
    #[serde(default, deserialize_with = "lenient_seq")]
    pub following: Vec<String>,
    #[serde(default)]
    pub followers_count: i64,
    #[serde(default)]
    pub following_count: i64,
    #[serde(default)]
    pub posts_count: i64,
    #[serde(default, deserialize_with = "lenient_seq")]
    pub liked_posts: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_following(&self, user_id: &str) -> bool {
        self.following.iter().any(|id| id == user_id)
    }

    pub fn is_followed_by(&self, user_id: &str) -> bool {
        self.followers.iter().any(|id| id == user_id)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
            PostStatus::Archived => "archived",
        }
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PostStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(PostStatus::Draft),
            "published" => Ok(PostStatus::Published),
            "archived" => Ok(PostStatus::Archived),
            other => Err(format!("unknown post status '{other}'")),
        }
    }
}

/// One like entry. `user_id` is unique within a `likes` list.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Like {
    pub user_id: String,
    pub liked_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Post {
    pub id: String,
    pub author_id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default, deserialize_with = "lenient_seq")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub status: PostStatus,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_seq")]
    pub likes: Vec<Like>,
    #[serde(default)]
    pub likes_count: i64,
    #[serde(default)]
    pub comments_count: i64,
    #[serde(default)]
    pub views: i64,
    #[serde(default = "default_reading_time")]
    pub reading_time: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn is_liked_by(&self, user_id: &str) -> bool {
        self.likes.iter().any(|like| like.user_id == user_id)
    }
}

fn default_reading_time() -> i64 {
    1
}

/// Content of a comment. A deleted comment keeps its place in the thread but
/// no longer carries text.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "state", content = "text", rename_all = "snake_case")]
pub enum CommentBody {
    Active(String),
    Deleted,
}

impl CommentBody {
    /// Text to display; the tombstone for deleted comments.
    pub fn text(&self) -> &str {
        match self {
            CommentBody::Active(text) => text,
            CommentBody::Deleted => COMMENT_TOMBSTONE,
        }
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, CommentBody::Deleted)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    #[serde(default)]
    pub parent_comment_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_seq")]
    pub replies: Vec<String>,
    pub body: CommentBody,
    #[serde(default, deserialize_with = "lenient_seq")]
    pub likes: Vec<Like>,
    #[serde(default)]
    pub likes_count: i64,
    #[serde(default)]
    pub edited_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    pub fn is_deleted(&self) -> bool {
        self.body.is_deleted()
    }

    pub fn is_reply(&self) -> bool {
        self.parent_comment_id.is_some()
    }

    pub fn is_liked_by(&self, user_id: &str) -> bool {
        self.likes.iter().any(|like| like.user_id == user_id)
    }
}

/// A comment with its direct replies resolved, in creation order.
#[derive(Serialize, Debug, Clone)]
pub struct CommentThread {
    pub comment: Comment,
    pub replies: Vec<Comment>,
}

/// One page of results.
#[derive(Serialize, Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

impl<T> Page<T> {
    #[inline]
    pub fn has_more(&self) -> bool {
        self.page.saturating_mul(self.page_size) < self.total
    }

    pub fn pages(&self) -> u64 {
        if self.page_size == 0 {
            0
        } else {
            self.total.div_ceil(self.page_size)
        }
    }

    /// Slices `all` into the 1-based `page` of `page_size` items.
    pub fn slice(all: Vec<T>, page: u64, page_size: u64) -> Self {
        let total = all.len() as u64;
        let page = page.max(1);
        let skip = usize::try_from((page - 1).saturating_mul(page_size)).unwrap_or(usize::MAX);
        let take = usize::try_from(page_size).unwrap_or(usize::MAX);
        let items = all.into_iter().skip(skip).take(take).collect();
        Self {
            items,
            total,
            page,
            page_size,
        }
    }
}

/// Lua's cjson encodes an empty table as `{}`, so arrays rewritten by a script
/// may come back as an empty object.
fn lenient_seq<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(Vec::new()),
        Value::Object(map) if map.is_empty() => Ok(Vec::new()),
        other => serde_json::from_value(other).map_err(serde::de::Error::custom),
    }
}
