//! `Blog` is the entry point the API layer calls into.
//!
//! It owns a [`MutationExecutor`] and a [`KeyContext`]. The engagement
//! operations live in `graph`, `comments`, `posts`, `users` and `consistency`
//! as further `impl` blocks on this type.
//!
//! # Example
//! ```ignore
//! let mut blog = Blog::connect("redis://localhost:6379", KeyContext::new("plume", "blog")).await?;
//! let outcome = blog.toggle_follow(&alice_id, &bob_id).await?;
//! assert!(outcome.is_following);
//! ```

use chrono::Utc;
use redis::aio::ConnectionManager;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    config::{Limits, PlumeConfig},
    errors::{EngageError, EntityKind},
    keys::KeyContext,
    models::{Comment, Post, User},
    runtime::{
        MemberChange, MemberOp, MemoryExecutor, MutationCommand, MutationExecutor, RedisExecutor,
        commands::{CounterIncrement, DocumentPatch, FieldAssignment, FieldGuard, MemberMutation},
    },
};

pub struct Blog<E: MutationExecutor> {
    executor: E,
    keys: KeyContext,
    limits: Limits,
}

impl<E: MutationExecutor> Blog<E> {
    pub fn new(executor: E, keys: KeyContext) -> Self {
        Self {
            executor,
            keys,
            limits: Limits::default(),
        }
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn keys(&self) -> &KeyContext {
        &self.keys
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn executor_mut(&mut self) -> &mut E {
        &mut self.executor
    }

    pub async fn get_user(&mut self, user_id: &str) -> Result<User, EngageError> {
        self.load(EntityKind::User, user_id).await
    }

    pub async fn get_post(&mut self, post_id: &str) -> Result<Post, EngageError> {
        self.load(EntityKind::Post, post_id).await
    }

    pub async fn get_comment(&mut self, comment_id: &str) -> Result<Comment, EngageError> {
        self.load(EntityKind::Comment, comment_id).await
    }

    pub(crate) async fn load<T: DeserializeOwned>(&mut self, kind: EntityKind, id: &str) -> Result<T, EngageError> {
        self.try_load(kind, id)
            .await?
            .ok_or_else(|| EngageError::not_found(kind, id))
    }

    pub(crate) async fn try_load<T: DeserializeOwned>(
        &mut self,
        kind: EntityKind,
        id: &str,
    ) -> Result<Option<T>, EngageError> {
        let key = self.keys.entity(kind.collection(), id);
        match self.executor.fetch(&key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Loads every id in `ids`, skipping ones that no longer exist.
    pub(crate) async fn load_many<T: DeserializeOwned>(
        &mut self,
        kind: EntityKind,
        ids: &[String],
    ) -> Result<Vec<T>, EngageError> {
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(item) = self.try_load(kind, id).await? {
                found.push(item);
            }
        }
        Ok(found)
    }

    pub(crate) async fn index(&mut self, key: &str) -> Result<Vec<String>, EngageError> {
        self.executor.fetch_index(key).await
    }

    pub(crate) async fn apply(&mut self, command: &MutationCommand) -> Result<Value, EngageError> {
        self.executor.execute(command).await
    }

    pub(crate) async fn apply_members(&mut self, command: &MutationCommand) -> Result<MemberChange, EngageError> {
        let response = self.executor.execute(command).await?;
        MemberChange::from_response(&response)
    }

    /// Add/remove of a plain id in `field` of one document.
    pub(crate) fn member_mutation(
        &self,
        kind: EntityKind,
        id: &str,
        field: &str,
        op: MemberOp,
        member: &str,
    ) -> MemberMutation {
        MemberMutation {
            key: self.keys.entity(kind.collection(), id),
            collection: kind.collection().to_string(),
            entity_id: id.to_string(),
            field: field.to_string(),
            op,
            member: member.to_string(),
            match_field: None,
            entry: Value::String(member.to_string()),
            count_field: None,
            guards: Vec::new(),
            updated_at: Some(Utc::now()),
        }
    }

    pub(crate) fn counter(&self, kind: EntityKind, id: &str, field: &str, delta: i64) -> MutationCommand {
        MutationCommand::IncrementCounter(CounterIncrement {
            key: self.keys.entity(kind.collection(), id),
            collection: kind.collection().to_string(),
            entity_id: id.to_string(),
            field: field.to_string(),
            delta,
            floor: Some(0),
        })
    }

    pub(crate) fn patch(
        &self,
        kind: EntityKind,
        id: &str,
        guards: Vec<FieldGuard>,
        assign: Vec<(&str, Value)>,
    ) -> MutationCommand {
        MutationCommand::PatchDocument(DocumentPatch {
            key: self.keys.entity(kind.collection(), id),
            collection: kind.collection().to_string(),
            entity_id: id.to_string(),
            guards,
            assign: assign
                .into_iter()
                .map(|(path, value)| FieldAssignment {
                    path: path.to_string(),
                    value,
                })
                .collect(),
        })
    }
}

/// Builds the error for a multi-document operation whose later step failed.
pub(crate) fn partial_failure(
    operation: &'static str,
    completed: &MutationCommand,
    failed: &MutationCommand,
    source: EngageError,
) -> EngageError {
    log::warn!(
        "{operation}: {} applied but {} failed: {source}",
        completed.describe(),
        failed.describe()
    );
    EngageError::PartialFailure {
        operation,
        completed: completed.describe(),
        failed: failed.describe(),
        source: Box::new(source),
    }
}

impl Blog<RedisExecutor<ConnectionManager>> {
    /// Connects to Redis and wraps the connection in a [`RedisExecutor`].
    pub async fn connect(url: &str, keys: KeyContext) -> Result<Self, EngageError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self::new(RedisExecutor::new(conn), keys))
    }

    pub async fn from_config(config: &PlumeConfig, url: &str) -> Result<Self, EngageError> {
        let keys = KeyContext::new(config.keys.prefix.clone(), config.keys.service.clone());
        Ok(Self::connect(url, keys).await?.with_limits(config.limits.clone()))
    }
}

impl Blog<MemoryExecutor> {
    pub fn in_memory(keys: KeyContext) -> Self {
        Self::new(MemoryExecutor::new(), keys)
    }
}
