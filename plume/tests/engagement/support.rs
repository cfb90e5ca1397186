pub(crate) use plume::{
    Blog, EngageError, EntityKind, KeyContext, MemoryExecutor, MutationExecutor, NewPost, NewUser, PostStatus,
    StateViolation,
    runtime::MutationCommand,
};
pub(crate) use serde_json::Value;
pub(crate) use std::sync::atomic::{AtomicUsize, Ordering};

/// Wraps [`MemoryExecutor`] and fails the one command whose description
/// matches `fail_on`, e.g. `users:<id>.followers`.
#[derive(Clone, Default)]
pub(crate) struct FaultyExecutor {
    pub(crate) inner: MemoryExecutor,
    pub(crate) fail_on: Option<String>,
}

impl MutationExecutor for FaultyExecutor {
    async fn execute(&mut self, command: &MutationCommand) -> Result<Value, EngageError> {
        if self.fail_on.as_deref() == Some(command.describe().as_str()) {
            self.fail_on = None;
            return Err(EngageError::Other {
                message: format!("injected failure on {}", command.describe()).into(),
            });
        }
        self.inner.execute(command).await
    }

    async fn fetch(&mut self, key: &str) -> Result<Option<Value>, EngageError> {
        self.inner.fetch(key).await
    }

    async fn fetch_index(&mut self, key: &str) -> Result<Vec<String>, EngageError> {
        self.inner.fetch_index(key).await
    }

    async fn fetch_claim(&mut self, key: &str) -> Result<Option<String>, EngageError> {
        self.inner.fetch_claim(key).await
    }
}

pub(crate) static TEST_NAMESPACE_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Key context no other test shares.
pub(crate) fn unique_keys() -> KeyContext {
    let idx = TEST_NAMESPACE_COUNTER.fetch_add(1, Ordering::SeqCst);
    let salt = plume::id::generate_document_id();
    KeyContext::new(format!("plume_test_{idx}_{}", &salt[..8]), "blog")
}

pub(crate) fn memory_blog() -> Blog<MemoryExecutor> {
    Blog::in_memory(unique_keys())
}

pub(crate) fn faulty_blog() -> Blog<FaultyExecutor> {
    Blog::new(FaultyExecutor::default(), unique_keys())
}

pub(crate) async fn register<E: MutationExecutor>(blog: &mut Blog<E>, username: &str) -> String {
    blog.register_user(NewUser {
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password_hash: "$argon2id$v=19$test".to_string(),
        full_name: username.to_string(),
    })
    .await
    .expect("register user")
    .id
}

pub(crate) async fn write_post<E: MutationExecutor>(blog: &mut Blog<E>, author_id: &str, status: PostStatus) -> String {
    blog.create_post(
        author_id,
        NewPost {
            title: "Consistency without transactions".to_string(),
            content: "<p>Counters follow the collections they count.</p>".to_string(),
            tags: vec!["redis".to_string()],
            status,
        },
    )
    .await
    .expect("create post")
    .id
}
