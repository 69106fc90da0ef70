use chirp_types::api::SortOrder;
use chirp_types::models::{PostId, UserId};

use crate::models::{PostRecord, UserRecord};
use crate::{Database, Result, StoreError};

impl Database {
    // -- Users --

    pub fn get_user(&self, id: UserId) -> Result<Option<UserRecord>> {
        self.read(|doc| Ok(doc.users.get(&id).cloned()))
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        self.read(|doc| Ok(doc.find_user_by_email(email).cloned()))
    }

    /// Flip the privilege flag on. Returns `None` if the user does not exist.
    pub fn upgrade_user(&self, id: UserId) -> Result<Option<UserRecord>> {
        self.transaction_if_changed(|doc| {
            let Some(user) = doc.users.get_mut(&id) else {
                return Ok((None, false));
            };
            let changed = !user.is_privileged;
            user.is_privileged = true;
            Ok((Some(user.clone()), changed))
        })
    }

    // -- Posts --

    /// Insert a post as-is. Body validation is the caller's job. The author
    /// must be a current or former user.
    pub fn create_post(&self, author_id: UserId, body: &str) -> Result<PostRecord> {
        self.transaction(|doc| {
            if !doc.user_existed(author_id) {
                return Err(StoreError::UnknownUser(author_id));
            }
            doc.insert_post(author_id, body)
        })
    }

    pub fn get_post(&self, id: PostId) -> Result<Option<PostRecord>> {
        self.read(|doc| Ok(doc.posts.get(&id).cloned()))
    }

    /// All posts, optionally restricted to one author, ordered by id.
    pub fn list_posts(
        &self,
        author_id: Option<UserId>,
        order: SortOrder,
    ) -> Result<Vec<PostRecord>> {
        self.read(|doc| {
            let matching = doc
                .posts
                .values()
                .filter(|p| author_id.is_none_or(|a| p.author_id == a))
                .cloned();
            let posts = match order {
                SortOrder::Asc => matching.collect(),
                SortOrder::Desc => matching.rev().collect(),
            };
            Ok(posts)
        })
    }
}
