//! Store runtime: serialisable single-document commands and the executors
//! that apply them.

pub mod commands;
mod executor;
mod memory;
pub mod scripts;

pub use commands::{MemberChange, MemberOp, MutationCommand};
pub use executor::{MutationExecutor, RedisExecutor};
pub use memory::MemoryExecutor;
