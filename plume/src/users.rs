//! User registry and social-graph reads.

use chrono::Utc;
use serde_json::Value;

use crate::{
    client::Blog,
    errors::{EngageError, EntityKind},
    id::generate_document_id,
    keys::USERS,
    models::{Page, User},
    runtime::{
        MutationCommand, MutationExecutor,
        commands::{DocumentInsert, UniqueClaim},
    },
    validators::{Checks, is_valid_email, is_valid_url, is_valid_username},
};

/// Registration input. The credential hash is produced by the caller.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub website: Option<String>,
    pub location: Option<String>,
}

const MUTUAL_FOLLOWERS_LIMIT: usize = 10;

impl<E: MutationExecutor> Blog<E> {
    pub async fn register_user(&mut self, new_user: NewUser) -> Result<User, EngageError> {
        let username = new_user.username.trim().to_string();
        let email = new_user.email.trim().to_lowercase();
        let full_name = new_user.full_name.trim().to_string();

        Checks::new()
            .length("username", &username, 3, 30)
            .check(
                is_valid_username(&username),
                "username",
                "pattern",
                "username may only contain letters, digits, '.', '_' and '-'",
            )
            .check(is_valid_email(&email), "email", "email", "please enter a valid email")
            .require("password_hash", &new_user.password_hash)
            .length("full_name", &full_name, 1, 50)
            .finish()?;

        let now = Utc::now();
        let user = User {
            id: generate_document_id(),
            username,
            email,
            password_hash: new_user.password_hash,
            full_name,
            bio: String::new(),
            avatar: String::new(),
            website: String::new(),
            location: String::new(),
            is_verified: false,
            followers: Vec::new(),
            following: Vec::new(),
            followers_count: 0,
            following_count: 0,
            posts_count: 0,
            liked_posts: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        let keys = self.keys().clone();
        let command = MutationCommand::InsertDocument(DocumentInsert {
            key: keys.user(&user.id),
            collection: USERS.to_string(),
            entity_id: user.id.clone(),
            payload_json: serde_json::to_string(&user)?,
            unique_claims: vec![
                UniqueClaim {
                    key: keys.unique(USERS, "username", &user.username),
                    field: "username".to_string(),
                    value: user.username.clone(),
                },
                UniqueClaim {
                    key: keys.unique(USERS, "email", &user.email),
                    field: "email".to_string(),
                    value: user.email.clone(),
                },
            ],
            index_appends: vec![keys.directory(USERS)],
        });
        self.apply(&command).await?;
        log::info!("registered user {} ({})", user.username, user.id);
        Ok(user)
    }

    /// Case-insensitive lookup by handle.
    pub async fn find_user_by_username(&mut self, username: &str) -> Result<User, EngageError> {
        let claim_key = self.keys().unique(USERS, "username", username.trim());
        match self.executor_mut().fetch_claim(&claim_key).await? {
            Some(user_id) => self.get_user(&user_id).await,
            None => Err(EngageError::not_found(EntityKind::User, username)),
        }
    }

    pub async fn update_profile(&mut self, user_id: &str, update: ProfileUpdate) -> Result<User, EngageError> {
        let mut checks = Checks::new();
        if let Some(full_name) = &update.full_name {
            checks.length("full_name", full_name, 1, 50);
        }
        if let Some(bio) = &update.bio {
            checks.max_length("bio", bio, 500);
        }
        if let Some(website) = &update.website
            && !website.is_empty()
        {
            checks.check(is_valid_url(website), "website", "url", "website must be a valid URL");
        }
        checks.finish()?;

        let mut assign: Vec<(&str, Value)> = Vec::new();
        if let Some(full_name) = update.full_name {
            assign.push(("full_name", Value::String(full_name.trim().to_string())));
        }
        if let Some(bio) = update.bio {
            assign.push(("bio", Value::String(bio)));
        }
        if let Some(avatar) = update.avatar {
            assign.push(("avatar", Value::String(avatar)));
        }
        if let Some(website) = update.website {
            assign.push(("website", Value::String(website)));
        }
        if let Some(location) = update.location {
            assign.push(("location", Value::String(location)));
        }
        assign.push(("updated_at", serde_json::to_value(Utc::now())?));

        let command = self.patch(EntityKind::User, user_id, Vec::new(), assign);
        let response = self.apply(&command).await?;
        Ok(serde_json::from_value(response["document"].clone())?)
    }

    /// Users following `user_id`, in follow order.
    pub async fn followers(&mut self, user_id: &str, page: u64, page_size: u64) -> Result<Page<User>, EngageError> {
        let user = self.get_user(user_id).await?;
        self.user_page(user.followers, page, page_size).await
    }

    /// Users `user_id` follows, in follow order.
    pub async fn following(&mut self, user_id: &str, page: u64, page_size: u64) -> Result<Page<User>, EngageError> {
        let user = self.get_user(user_id).await?;
        self.user_page(user.following, page, page_size).await
    }

    async fn user_page(&mut self, ids: Vec<String>, page: u64, page_size: u64) -> Result<Page<User>, EngageError> {
        let page_size = self.limits().page_size(page_size);
        let ids = Page::slice(ids, page, page_size);
        let items = self.load_many(EntityKind::User, &ids.items).await?;
        Ok(Page {
            items,
            total: ids.total,
            page: ids.page,
            page_size: ids.page_size,
        })
    }

    /// Users with at least one follower that `user_id` does not follow yet,
    /// most followed first, newest first among equals.
    pub async fn follow_suggestions(&mut self, user_id: &str, limit: usize) -> Result<Vec<User>, EngageError> {
        let user = self.get_user(user_id).await?;
        let directory_key = self.keys().directory(USERS);
        let ids: Vec<String> = self
            .index(&directory_key)
            .await?
            .into_iter()
            .filter(|id| id != user_id && !user.is_following(id))
            .collect();

        let mut candidates: Vec<User> = self
            .load_many(EntityKind::User, &ids)
            .await?
            .into_iter()
            .filter(|candidate: &User| candidate.followers_count >= 1)
            .collect();
        candidates.sort_by(|a, b| {
            b.followers_count
                .cmp(&a.followers_count)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        candidates.truncate(limit);
        Ok(candidates)
    }

    /// Users who follow both `user_id` and `other_id`.
    pub async fn mutual_followers(&mut self, user_id: &str, other_id: &str) -> Result<Vec<User>, EngageError> {
        let user = self.get_user(user_id).await?;
        let other = self.get_user(other_id).await?;
        let shared: Vec<String> = user
            .followers
            .into_iter()
            .filter(|id| other.is_followed_by(id))
            .take(MUTUAL_FOLLOWERS_LIMIT)
            .collect();
        self.load_many(EntityKind::User, &shared).await
    }
}
