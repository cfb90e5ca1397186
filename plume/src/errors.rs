use std::{borrow::Cow, fmt};

use serde::Serialize;
use thiserror::Error;

/// Kind of record an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Post,
    Comment,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Post => "post",
            EntityKind::Comment => "comment",
        }
    }

    pub fn collection(&self) -> &'static str {
        match self {
            EntityKind::User => crate::keys::USERS,
            EntityKind::Post => crate::keys::POSTS,
            EntityKind::Comment => crate::keys::COMMENTS,
        }
    }

    pub fn from_collection(collection: &str) -> Option<Self> {
        match collection {
            crate::keys::USERS => Some(EntityKind::User),
            crate::keys::POSTS => Some(EntityKind::Post),
            crate::keys::COMMENTS => Some(EntityKind::Comment),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a target's current state forbids the requested operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateViolation {
    /// Likes are only accepted on published posts.
    PostNotPublished,
    /// The comment is soft-deleted.
    CommentDeleted,
    /// The parent comment belongs to another post.
    CrossPostReply,
    /// The requested post status change is not allowed.
    IllegalStatusTransition,
}

impl fmt::Display for StateViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StateViolation::PostNotPublished => "post is not published",
            StateViolation::CommentDeleted => "comment is deleted",
            StateViolation::CrossPostReply => "parent comment belongs to a different post",
            StateViolation::IllegalStatusTransition => "status transition is not allowed",
        };
        f.write_str(text)
    }
}

/// Top-level error type returned by the engagement core.
#[derive(Debug, Error)]
pub enum EngageError {
    /// Referenced record does not exist (or, for comments, is logically gone).
    #[error("{entity} '{id}' not found")]
    NotFound { entity: EntityKind, id: String },

    /// Actor and target of a follow are the same user.
    #[error("user '{user_id}' cannot follow themselves")]
    SelfReference { user_id: String },

    /// Target is in a state that forbids the operation.
    #[error("invalid state for {entity} '{id}': {reason}")]
    InvalidState {
        entity: EntityKind,
        id: String,
        reason: StateViolation,
    },

    /// Actor does not own the record it tried to mutate.
    #[error("user '{actor_id}' is not the author of {entity} '{id}'")]
    Authorization {
        actor_id: String,
        entity: EntityKind,
        id: String,
    },

    /// A multi-document update completed some steps and failed on a later one.
    /// Nothing is rolled back.
    #[error("{operation} partially applied: '{completed}' written, '{failed}' failed: {source}")]
    PartialFailure {
        operation: &'static str,
        completed: String,
        failed: String,
        #[source]
        source: Box<EngageError>,
    },

    /// A conditional single-document write found a guarded field with an
    /// unexpected value. Operations translate this into `InvalidState` or
    /// `NotFound` before returning.
    #[error("guard on '{path}' failed for {entity} '{id}'")]
    GuardFailed {
        entity: EntityKind,
        id: String,
        path: String,
    },

    /// Validation failed for one or more fields.
    #[error("validation failed")]
    Validation(#[from] ValidationError),

    /// Unique handle or email is already claimed by another user.
    #[error("unique constraint violation: {field} '{value}' is already taken")]
    UniqueConstraintViolation { field: String, value: String },

    /// Underlying Redis command failed.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// A stored document could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{message}")]
    Other { message: Cow<'static, str> },
}

impl EngageError {
    pub fn not_found(entity: EntityKind, id: impl Into<String>) -> Self {
        EngageError::NotFound { entity, id: id.into() }
    }

    pub fn invalid_state(entity: EntityKind, id: impl Into<String>, reason: StateViolation) -> Self {
        EngageError::InvalidState {
            entity,
            id: id.into(),
            reason,
        }
    }

    pub fn unauthorized(actor_id: impl Into<String>, entity: EntityKind, id: impl Into<String>) -> Self {
        EngageError::Authorization {
            actor_id: actor_id.into(),
            entity,
            id: id.into(),
        }
    }

    /// Stable machine-readable code, for callers mapping errors to status codes.
    pub fn kind(&self) -> &'static str {
        match self {
            EngageError::NotFound { .. } => "not_found",
            EngageError::SelfReference { .. } => "self_reference",
            EngageError::InvalidState { .. } => "invalid_state",
            EngageError::Authorization { .. } => "authorization",
            EngageError::PartialFailure { .. } => "partial_failure",
            EngageError::GuardFailed { .. } => "guard_failed",
            EngageError::Validation(_) => "validation",
            EngageError::UniqueConstraintViolation { .. } => "unique_constraint_violation",
            EngageError::Redis(_) => "redis",
            EngageError::Serialization(_) => "serialization",
            EngageError::Other { .. } => "other",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, EngageError::NotFound { .. })
    }

    /// Turns a failed write guard into the state violation it stands for.
    pub fn guard_as(self, reason: StateViolation) -> Self {
        match self {
            EngageError::GuardFailed { entity, id, .. } => EngageError::InvalidState { entity, id, reason },
            other => other,
        }
    }
}

/// Collection of validation issues encountered while preparing a mutation.
#[derive(Debug, Error)]
#[error("validation errors: {issues:?}")]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    pub fn new<I>(issues: I) -> Self
    where
        I: IntoIterator<Item = ValidationIssue>,
    {
        Self {
            issues: issues.into_iter().collect(),
        }
    }

    /// Convenience helper for constructing a single-field validation error.
    pub fn single(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new([ValidationIssue::new(field, code, message)])
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Detailed validation failure for a single field.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

pub type ValidationResult<T> = Result<T, ValidationError>;
