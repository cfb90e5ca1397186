use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use serde_json::{Map, Value, json};

use crate::{
    errors::EngageError,
    runtime::{
        commands::{
            CounterIncrement, DocumentDelete, DocumentInsert, DocumentPatch, FieldGuard, MemberMutation, MemberOp,
            MutationCommand, decode_response,
        },
        executor::MutationExecutor,
    },
};

#[derive(Default)]
struct MemoryState {
    documents: HashMap<String, Value>,
    claims: HashMap<String, String>,
    lists: HashMap<String, Vec<String>>,
}

/// In-process executor with the same per-document semantics and responses as
/// the Lua scripts. Clones share one store.
#[derive(Clone, Default)]
pub struct MemoryExecutor {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    pub fn document_count(&self) -> Result<usize, EngageError> {
        Ok(self.lock()?.documents.len())
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, EngageError> {
        self.state.lock().map_err(|_| EngageError::Other {
            message: "memory store lock poisoned".into(),
        })
    }
}

impl MutationExecutor for MemoryExecutor {
    async fn execute(&mut self, command: &MutationCommand) -> Result<Value, EngageError> {
        log::debug!("memory write on {}", command.describe());
        let response = {
            let mut state = self.lock()?;
            match command {
                MutationCommand::InsertDocument(cmd) => insert(&mut state, cmd)?,
                MutationCommand::PatchDocument(cmd) => patch(&mut state, cmd),
                MutationCommand::MutateMembers(cmd) => mutate_members(&mut state, cmd)?,
                MutationCommand::IncrementCounter(cmd) => increment(&mut state, cmd),
                MutationCommand::DeleteDocument(cmd) => delete(&mut state, cmd),
            }
        };
        decode_response(response, command.collection())
    }

    async fn fetch(&mut self, key: &str) -> Result<Option<Value>, EngageError> {
        Ok(self.lock()?.documents.get(key).cloned())
    }

    async fn fetch_index(&mut self, key: &str) -> Result<Vec<String>, EngageError> {
        Ok(self.lock()?.lists.get(key).cloned().unwrap_or_default())
    }

    async fn fetch_claim(&mut self, key: &str) -> Result<Option<String>, EngageError> {
        Ok(self.lock()?.claims.get(key).cloned())
    }
}

fn not_found(entity_id: &str) -> Value {
    json!({ "error": "entity_not_found", "entity_id": entity_id })
}

fn resolve<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |node, part| node.get(part))
}

fn failed_guard<'a>(doc: &Value, guards: &'a [FieldGuard]) -> Option<&'a str> {
    guards
        .iter()
        .find(|guard| resolve(doc, &guard.path) != Some(&guard.equals))
        .map(|guard| guard.path.as_str())
}

fn assign(doc: &mut Value, path: &str, value: Value) {
    let mut parts: Vec<&str> = path.split('.').collect();
    let Some(last) = parts.pop() else {
        return;
    };
    let mut node = doc;
    for part in parts {
        if !node.get(part).is_some_and(Value::is_object) {
            if let Some(object) = node.as_object_mut() {
                object.insert(part.to_string(), Value::Object(Map::new()));
            }
        }
        match node.get_mut(part) {
            Some(next) => node = next,
            None => return,
        }
    }
    if let Some(object) = node.as_object_mut() {
        object.insert(last.to_string(), value);
    }
}

fn insert(state: &mut MemoryState, cmd: &DocumentInsert) -> Result<Value, EngageError> {
    if state.documents.contains_key(&cmd.key) {
        return Ok(json!({ "error": "already_exists", "entity_id": cmd.entity_id }));
    }
    for claim in &cmd.unique_claims {
        if let Some(owner) = state.claims.get(&claim.key)
            && owner != &cmd.entity_id
        {
            return Ok(json!({
                "error": "unique_constraint_violation",
                "entity_id": cmd.entity_id,
                "field": claim.field,
                "value": claim.value,
                "existing_entity_id": owner,
            }));
        }
    }

    let document: Value = serde_json::from_str(&cmd.payload_json)?;
    for claim in &cmd.unique_claims {
        state.claims.insert(claim.key.clone(), cmd.entity_id.clone());
    }
    state.documents.insert(cmd.key.clone(), document);
    for list_key in &cmd.index_appends {
        state.lists.entry(list_key.clone()).or_default().push(cmd.entity_id.clone());
    }
    Ok(json!({ "ok": true, "entity_id": cmd.entity_id }))
}

fn patch(state: &mut MemoryState, cmd: &DocumentPatch) -> Value {
    let Some(doc) = state.documents.get_mut(&cmd.key) else {
        return not_found(&cmd.entity_id);
    };
    if let Some(path) = failed_guard(doc, &cmd.guards) {
        return json!({ "error": "guard_failed", "entity_id": cmd.entity_id, "path": path });
    }
    for assignment in &cmd.assign {
        assign(doc, &assignment.path, assignment.value.clone());
    }
    json!({ "ok": true, "document": doc.clone() })
}

fn mutate_members(state: &mut MemoryState, cmd: &MemberMutation) -> Result<Value, EngageError> {
    let Some(doc) = state.documents.get_mut(&cmd.key) else {
        return Ok(not_found(&cmd.entity_id));
    };
    if let Some(path) = failed_guard(doc, &cmd.guards) {
        return Ok(json!({ "error": "guard_failed", "entity_id": cmd.entity_id, "path": path }));
    }

    let current = match doc.get(&cmd.field) {
        Some(Value::Array(items)) => items.clone(),
        _ => Vec::new(),
    };
    let identity = |entry: &Value| -> Option<String> {
        match &cmd.match_field {
            Some(field) => entry.get(field).and_then(Value::as_str).map(str::to_string),
            None => entry.as_str().map(str::to_string),
        }
    };

    let mut kept = Vec::with_capacity(current.len() + 1);
    let mut present = false;
    for entry in &current {
        if identity(entry).as_deref() == Some(cmd.member.as_str()) {
            if cmd.op == MemberOp::Add && !present {
                kept.push(entry.clone());
                present = true;
            }
        } else {
            kept.push(entry.clone());
        }
    }
    if cmd.op == MemberOp::Add && !present {
        kept.push(cmd.entry.clone());
        present = true;
    }

    let changed = kept.len() != current.len();
    let count = kept.len() as i64;
    assign(doc, &cmd.field, Value::Array(kept));
    if let Some(count_field) = &cmd.count_field {
        assign(doc, count_field, json!(count));
    }
    if let Some(updated_at) = &cmd.updated_at {
        assign(doc, "updated_at", serde_json::to_value(updated_at)?);
    }

    Ok(json!({ "ok": true, "changed": changed, "present": present, "count": count }))
}

fn increment(state: &mut MemoryState, cmd: &CounterIncrement) -> Value {
    let Some(doc) = state.documents.get_mut(&cmd.key) else {
        return not_found(&cmd.entity_id);
    };
    let mut value = doc.get(&cmd.field).and_then(Value::as_i64).unwrap_or(0) + cmd.delta;
    if let Some(floor) = cmd.floor {
        value = value.max(floor);
    }
    assign(doc, &cmd.field, json!(value));
    json!({ "ok": true, "value": value })
}

fn delete(state: &mut MemoryState, cmd: &DocumentDelete) -> Value {
    if state.documents.remove(&cmd.key).is_none() {
        return not_found(&cmd.entity_id);
    }
    for claim_key in &cmd.release_claims {
        if state.claims.get(claim_key) == Some(&cmd.entity_id) {
            state.claims.remove(claim_key);
        }
    }
    for list_key in &cmd.index_removals {
        if let Some(list) = state.lists.get_mut(list_key) {
            list.retain(|id| id != &cmd.entity_id);
        }
    }
    json!({ "ok": true })
}
