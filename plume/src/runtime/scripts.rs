use redis::Script;
use std::sync::LazyLock;

pub const DOCUMENT_INSERT_SCRIPT_BODY: &str = include_str!("../../lua/document_insert.lua");
pub const DOCUMENT_PATCH_SCRIPT_BODY: &str = include_str!("../../lua/document_patch.lua");
pub const DOCUMENT_DELETE_SCRIPT_BODY: &str = include_str!("../../lua/document_delete.lua");
pub const MEMBER_MUTATION_SCRIPT_BODY: &str = include_str!("../../lua/member_mutation.lua");
pub const COUNTER_INCREMENT_SCRIPT_BODY: &str = include_str!("../../lua/counter_increment.lua");

pub static DOCUMENT_INSERT_SCRIPT: LazyLock<Script> = LazyLock::new(|| Script::new(DOCUMENT_INSERT_SCRIPT_BODY));
pub static DOCUMENT_PATCH_SCRIPT: LazyLock<Script> = LazyLock::new(|| Script::new(DOCUMENT_PATCH_SCRIPT_BODY));
pub static DOCUMENT_DELETE_SCRIPT: LazyLock<Script> = LazyLock::new(|| Script::new(DOCUMENT_DELETE_SCRIPT_BODY));
pub static MEMBER_MUTATION_SCRIPT: LazyLock<Script> = LazyLock::new(|| Script::new(MEMBER_MUTATION_SCRIPT_BODY));
pub static COUNTER_INCREMENT_SCRIPT: LazyLock<Script> = LazyLock::new(|| Script::new(COUNTER_INCREMENT_SCRIPT_BODY));
