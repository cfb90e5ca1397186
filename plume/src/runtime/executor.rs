use redis::{AsyncCommands, aio::ConnectionLike};
use serde_json::Value;

use crate::{
    errors::EngageError,
    runtime::{
        commands::{MutationCommand, decode_response},
        scripts::{
            COUNTER_INCREMENT_SCRIPT, DOCUMENT_DELETE_SCRIPT, DOCUMENT_INSERT_SCRIPT, DOCUMENT_PATCH_SCRIPT,
            MEMBER_MUTATION_SCRIPT,
        },
    },
};

/// Applies single-document commands and reads documents back.
///
/// Every `execute` call is atomic on the document it names. Nothing is atomic
/// across calls.
#[allow(async_fn_in_trait)]
pub trait MutationExecutor {
    async fn execute(&mut self, command: &MutationCommand) -> Result<Value, EngageError>;

    async fn fetch(&mut self, key: &str) -> Result<Option<Value>, EngageError>;

    /// Reads an index list in insertion order.
    async fn fetch_index(&mut self, key: &str) -> Result<Vec<String>, EngageError>;

    /// Id of the document holding a unique claim.
    async fn fetch_claim(&mut self, key: &str) -> Result<Option<String>, EngageError>;
}

/// Executor backed by Redis. Documents are JSON strings; each command runs as
/// one Lua script.
#[derive(Clone)]
pub struct RedisExecutor<C>
where
    C: ConnectionLike + Send + Sync,
{
    connection: C,
}

impl<C> RedisExecutor<C>
where
    C: ConnectionLike + Send + Sync,
{
    pub fn new(connection: C) -> Self {
        Self { connection }
    }

    pub fn connection_mut(&mut self) -> &mut C {
        &mut self.connection
    }
}

impl<C> MutationExecutor for RedisExecutor<C>
where
    C: ConnectionLike + Send + Sync,
{
    async fn execute(&mut self, command: &MutationCommand) -> Result<Value, EngageError> {
        let script = match command {
            MutationCommand::InsertDocument(_) => &*DOCUMENT_INSERT_SCRIPT,
            MutationCommand::PatchDocument(_) => &*DOCUMENT_PATCH_SCRIPT,
            MutationCommand::MutateMembers(_) => &*MEMBER_MUTATION_SCRIPT,
            MutationCommand::IncrementCounter(_) => &*COUNTER_INCREMENT_SCRIPT,
            MutationCommand::DeleteDocument(_) => &*DOCUMENT_DELETE_SCRIPT,
        };

        // The command body is the script's only argument.
        let payload = match command {
            MutationCommand::InsertDocument(cmd) => serde_json::to_string(cmd)?,
            MutationCommand::PatchDocument(cmd) => serde_json::to_string(cmd)?,
            MutationCommand::MutateMembers(cmd) => serde_json::to_string(cmd)?,
            MutationCommand::IncrementCounter(cmd) => serde_json::to_string(cmd)?,
            MutationCommand::DeleteDocument(cmd) => serde_json::to_string(cmd)?,
        };

        log::debug!("redis {} on {}", script_name(command), command.describe());

        let mut invocation = script.prepare_invoke();
        invocation.arg(payload);
        let raw: String = invocation.invoke_async(&mut self.connection).await?;
        let value: Value = serde_json::from_str(&raw)?;

        decode_response(value, command.collection())
    }

    async fn fetch(&mut self, key: &str) -> Result<Option<Value>, EngageError> {
        let raw: Option<String> = self.connection.get(key).await?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn fetch_index(&mut self, key: &str) -> Result<Vec<String>, EngageError> {
        let ids: Vec<String> = self.connection.lrange(key, 0, -1).await?;
        Ok(ids)
    }

    async fn fetch_claim(&mut self, key: &str) -> Result<Option<String>, EngageError> {
        let owner: Option<String> = self.connection.get(key).await?;
        Ok(owner)
    }
}

fn script_name(command: &MutationCommand) -> &'static str {
    match command {
        MutationCommand::InsertDocument(_) => "document_insert",
        MutationCommand::PatchDocument(_) => "document_patch",
        MutationCommand::MutateMembers(_) => "member_mutation",
        MutationCommand::IncrementCounter(_) => "counter_increment",
        MutationCommand::DeleteDocument(_) => "document_delete",
    }
}
