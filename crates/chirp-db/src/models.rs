/// Persisted record types. These map directly onto the JSON document on disk
/// and are distinct from the chirp-types views so the storage layer stays
/// independent of the wire format.
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use chirp_types::models::{PostId, PostView, UserId, UserView};

use crate::{Result, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub is_privileged: bool,
}

impl UserRecord {
    pub fn view(&self) -> UserView {
        UserView {
            id: self.id,
            email: self.email.clone(),
            is_privileged: self.is_privileged,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: PostId,
    pub author_id: UserId,
    pub body: String,
}

impl PostRecord {
    pub fn view(&self) -> PostView {
        PostView {
            id: self.id,
            author_id: self.author_id,
            body: self.body.clone(),
        }
    }
}

/// The whole store. Loaded and saved as one unit.
///
/// `last_user_id` / `last_post_id` are high-water marks so that ids are never
/// handed out twice, even after the highest record is deleted. Documents
/// written before the counters existed load with 0 and fall back to the
/// largest key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreDocument {
    pub users: BTreeMap<UserId, UserRecord>,
    pub posts: BTreeMap<PostId, PostRecord>,
    pub revoked_tokens: BTreeMap<String, DateTime<Utc>>,
    #[serde(default)]
    pub last_user_id: UserId,
    #[serde(default)]
    pub last_post_id: PostId,
}

impl StoreDocument {
    pub fn next_user_id(&mut self) -> Result<UserId> {
        let id = next_id(self.last_user_id, self.users.keys().next_back().copied())
            .ok_or(StoreError::IdsExhausted("user"))?;
        self.last_user_id = id;
        Ok(id)
    }

    pub fn next_post_id(&mut self) -> Result<PostId> {
        let id = next_id(self.last_post_id, self.posts.keys().next_back().copied())
            .ok_or(StoreError::IdsExhausted("post"))?;
        self.last_post_id = id;
        Ok(id)
    }

    /// Whether `id` belongs to a current user or to one allocated before.
    pub fn user_existed(&self, id: UserId) -> bool {
        self.users.contains_key(&id) || (id != 0 && id <= self.last_user_id)
    }

    /// First user (lowest id) with this email. Linear scan.
    pub fn find_user_by_email(&self, email: &str) -> Option<&UserRecord> {
        self.users.values().find(|u| u.email == email)
    }

    /// Whether a user other than `except` already uses `email`.
    pub fn email_taken(&self, email: &str, except: Option<UserId>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }

    /// Insert a new, unprivileged user under the next free id. Email
    /// uniqueness is up to the caller.
    pub fn insert_user(&mut self, email: &str, password_hash: &str) -> Result<UserRecord> {
        let user = UserRecord {
            id: self.next_user_id()?,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            is_privileged: false,
        };
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    /// Replace email and password hash, keeping id and privilege. `None` if
    /// the user does not exist.
    pub fn set_credentials(
        &mut self,
        id: UserId,
        email: &str,
        password_hash: &str,
    ) -> Option<UserRecord> {
        let user = self.users.get_mut(&id)?;
        user.email = email.to_string();
        user.password_hash = password_hash.to_string();
        Some(user.clone())
    }

    /// Insert a post under the next free id. Author checks are up to the
    /// caller.
    pub fn insert_post(&mut self, author_id: UserId, body: &str) -> Result<PostRecord> {
        let post = PostRecord {
            id: self.next_post_id()?,
            author_id,
            body: body.to_string(),
        };
        self.posts.insert(post.id, post.clone());
        Ok(post)
    }
}

/// `None` once the id space is used up.
fn next_id(last: u64, largest_key: Option<u64>) -> Option<u64> {
    last.max(largest_key.unwrap_or(0)).checked_add(1)
}
