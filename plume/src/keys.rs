/// Key-construction helpers shared by both executors.
#[derive(Debug, Clone)]
pub struct KeyContext {
    pub prefix: String,
    pub service: String,
}

pub const USERS: &str = "users";
pub const POSTS: &str = "posts";
pub const COMMENTS: &str = "comments";

impl KeyContext {
    pub fn new(prefix: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            service: service.into(),
        }
    }

    pub fn entity(&self, collection: &str, entity_id: &str) -> String {
        format!("{}:{}:{}:{}", self.prefix, self.service, collection, entity_id)
    }

    pub fn user(&self, user_id: &str) -> String {
        self.entity(USERS, user_id)
    }

    pub fn post(&self, post_id: &str) -> String {
        self.entity(POSTS, post_id)
    }

    pub fn comment(&self, comment_id: &str) -> String {
        self.entity(COMMENTS, comment_id)
    }

    /// Claim key for a unique field value. Values are lower-cased.
    pub fn unique(&self, collection: &str, field: &str, value: &str) -> String {
        format!(
            "{}:{}:{}:unique:{}:{}",
            self.prefix,
            self.service,
            collection,
            field,
            value.to_lowercase()
        )
    }

    /// Ordered list of children of `child_collection` pointing at `parent_id` through `alias`.
    /// Format: prefix:service:child_collection:rev_rel:alias:parent_id
    pub fn reverse_relation(&self, child_collection: &str, alias: &str, parent_id: &str) -> String {
        format!(
            "{}:{}:{}:rev_rel:{}:{}",
            self.prefix, self.service, child_collection, alias, parent_id
        )
    }

    pub fn post_comments(&self, post_id: &str) -> String {
        self.reverse_relation(COMMENTS, "post", post_id)
    }

    pub fn author_posts(&self, user_id: &str) -> String {
        self.reverse_relation(POSTS, "author", user_id)
    }

    /// Directory of every registered user, in registration order.
    pub fn directory(&self, collection: &str) -> String {
        format!("{}:{}:{}:all", self.prefix, self.service, collection)
    }
}
