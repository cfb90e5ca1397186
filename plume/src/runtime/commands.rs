use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::errors::{EngageError, EntityKind};

/// A single-document write. Each command is applied atomically by the executor;
/// nothing spans two documents.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationCommand {
    InsertDocument(DocumentInsert),
    PatchDocument(DocumentPatch),
    MutateMembers(MemberMutation),
    IncrementCounter(CounterIncrement),
    DeleteDocument(DocumentDelete),
}

impl MutationCommand {
    pub fn key(&self) -> &str {
        match self {
            MutationCommand::InsertDocument(cmd) => &cmd.key,
            MutationCommand::PatchDocument(cmd) => &cmd.key,
            MutationCommand::MutateMembers(cmd) => &cmd.key,
            MutationCommand::IncrementCounter(cmd) => &cmd.key,
            MutationCommand::DeleteDocument(cmd) => &cmd.key,
        }
    }

    pub fn entity_id(&self) -> &str {
        match self {
            MutationCommand::InsertDocument(cmd) => &cmd.entity_id,
            MutationCommand::PatchDocument(cmd) => &cmd.entity_id,
            MutationCommand::MutateMembers(cmd) => &cmd.entity_id,
            MutationCommand::IncrementCounter(cmd) => &cmd.entity_id,
            MutationCommand::DeleteDocument(cmd) => &cmd.entity_id,
        }
    }

    pub fn collection(&self) -> &str {
        match self {
            MutationCommand::InsertDocument(cmd) => &cmd.collection,
            MutationCommand::PatchDocument(cmd) => &cmd.collection,
            MutationCommand::MutateMembers(cmd) => &cmd.collection,
            MutationCommand::IncrementCounter(cmd) => &cmd.collection,
            MutationCommand::DeleteDocument(cmd) => &cmd.collection,
        }
    }

    /// Short description used in logs and partial-failure reports,
    /// e.g. `users:abc.following`.
    pub fn describe(&self) -> String {
        let field = match self {
            MutationCommand::InsertDocument(_) => None,
            MutationCommand::PatchDocument(_) => None,
            MutationCommand::MutateMembers(cmd) => Some(cmd.field.as_str()),
            MutationCommand::IncrementCounter(cmd) => Some(cmd.field.as_str()),
            MutationCommand::DeleteDocument(_) => None,
        };
        match field {
            Some(field) => format!("{}:{}.{}", self.collection(), self.entity_id(), field),
            None => format!("{}:{}", self.collection(), self.entity_id()),
        }
    }
}

/// Claim on a unique value, released when the owning document is deleted.
#[derive(Debug, Clone, Serialize)]
pub struct UniqueClaim {
    pub key: String,
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentInsert {
    pub key: String,
    pub collection: String,
    pub entity_id: String,
    pub payload_json: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unique_claims: Vec<UniqueClaim>,
    /// List keys the new id is appended to, in creation order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub index_appends: Vec<String>,
}

/// Precondition checked inside the same atomic write: the value at `path`
/// (dot separated) must equal `equals`.
#[derive(Debug, Clone, Serialize)]
pub struct FieldGuard {
    pub path: String,
    pub equals: Value,
}

impl FieldGuard {
    pub fn new(path: impl Into<String>, equals: impl Into<Value>) -> Self {
        Self {
            path: path.into(),
            equals: equals.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldAssignment {
    pub path: String,
    pub value: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentPatch {
    pub key: String,
    pub collection: String,
    pub entity_id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub guards: Vec<FieldGuard>,
    pub assign: Vec<FieldAssignment>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MemberOp {
    Add,
    Remove,
}

impl MemberOp {
    /// Direction a toggle takes given whether the member is currently present.
    pub fn toggle_from(present: bool) -> Self {
        if present { MemberOp::Remove } else { MemberOp::Add }
    }
}

/// Add-if-absent or remove-by-identity on an embedded array.
///
/// Identity is the element itself, or `element[match_field]` when the
/// elements are objects. A remove drops every matching element, an add keeps
/// the first match and drops duplicates. When `count_field` is set it is
/// assigned the array's length after the change.
#[derive(Debug, Clone, Serialize)]
pub struct MemberMutation {
    pub key: String,
    pub collection: String,
    pub entity_id: String,
    pub field: String,
    pub op: MemberOp,
    pub member: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_field: Option<String>,
    pub entry: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count_field: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub guards: Vec<FieldGuard>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CounterIncrement {
    pub key: String,
    pub collection: String,
    pub entity_id: String,
    pub field: String,
    pub delta: i64,
    /// Lower bound applied after the increment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub floor: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentDelete {
    pub key: String,
    pub collection: String,
    pub entity_id: String,
    /// Unique claim keys to release if still owned by this document.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub release_claims: Vec<String>,
    /// List keys the id is removed from.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub index_removals: Vec<String>,
}

/// Outcome of a [`MemberMutation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberChange {
    /// Whether the array was modified.
    pub changed: bool,
    /// Whether the member is present after the write.
    pub present: bool,
    /// Array length after the write.
    pub count: i64,
}

impl MemberChange {
    pub fn from_response(value: &Value) -> Result<Self, EngageError> {
        let count = value.get("count").and_then(Value::as_i64).ok_or_else(|| EngageError::Other {
            message: "member mutation response is missing 'count'".into(),
        })?;
        Ok(Self {
            changed: value.get("changed").and_then(Value::as_bool).unwrap_or(false),
            present: value.get("present").and_then(Value::as_bool).unwrap_or(false),
            count,
        })
    }
}

/// Maps an executor response to either its payload or the error it encodes.
///
/// Both executors answer with a JSON object; failures carry an `error` code.
pub fn decode_response(value: Value, collection: &str) -> Result<Value, EngageError> {
    let Some(error) = value.get("error") else {
        return Ok(value);
    };
    let entity = EntityKind::from_collection(collection);
    let entity_id = value
        .get("entity_id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    match (error.as_str(), entity) {
        (Some("entity_not_found"), Some(entity)) => Err(EngageError::NotFound { entity, id: entity_id }),
        (Some("guard_failed"), Some(entity)) => {
            let path = value
                .get("path")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            Err(EngageError::GuardFailed {
                entity,
                id: entity_id,
                path,
            })
        }
        (Some("unique_constraint_violation"), _) => {
            let field = value.get("field").and_then(Value::as_str).unwrap_or_default().to_string();
            let conflicting = value.get("value").and_then(Value::as_str).unwrap_or_default().to_string();
            Err(EngageError::UniqueConstraintViolation {
                field,
                value: conflicting,
            })
        }
        (Some(other), _) => Err(EngageError::Other {
            message: format!("{other} ({collection}:{entity_id})").into(),
        }),
        (None, _) => Err(EngageError::Other {
            message: "store_error".into(),
        }),
    }
}
