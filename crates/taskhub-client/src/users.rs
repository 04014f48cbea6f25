//! Accounts, as listed on the users screen.
//!
//! Root and admin sessions create and delete accounts here; every session
//! reads it to resolve assignees and chat senders.

use std::sync::Arc;

use taskhub_shared::ordering::sort_users_by_name;
use taskhub_shared::protocol::{NewUser, User, UserPatch};
use taskhub_shared::types::{Role, UserId};
use taskhub_shared::validation::{validate_new_user, validate_user_patch};
use tracing::{info, warn};

use crate::cache::EntityCache;
use crate::error::ClientError;
use crate::remote::ApiClient;

type Result<T> = std::result::Result<T, ClientError>;

pub struct UsersCache {
    api: Arc<ApiClient>,
    users: EntityCache<User>,
}

impl UsersCache {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            users: EntityCache::new(),
        }
    }

    pub fn cache(&self) -> &EntityCache<User> {
        &self.users
    }

    pub async fn load_all(&self) -> Result<usize> {
        self.users.load_with(|| self.api.list_users()).await
    }

    /// Create an account from the add-user form. A duplicate email or phone
    /// number comes back as [`ClientError::Conflict`] and leaves the cache as
    /// it was.
    pub async fn create_user(&self, user: &NewUser, confirm_password: &str) -> Result<User> {
        validate_new_user(user, Some(confirm_password))?;

        let epoch = self.users.epoch();
        let created = self.api.create_user(user).await.inspect_err(|e| {
            if let Some(field) = e.conflict_field() {
                warn!(%field, "user rejected as duplicate");
            }
        })?;
        self.users.add_in(epoch, created.clone());
        info!(id = created.id, role = %created.role, "user created");
        Ok(created)
    }

    pub async fn update_user(&self, id: UserId, patch: &UserPatch) -> Result<User> {
        validate_user_patch(patch)?;
        let epoch = self.users.epoch();
        let updated = self.api.update_user(id, patch).await?;
        self.users.upsert_in(epoch, updated.clone());
        info!(id, "user updated");
        Ok(updated)
    }

    pub async fn delete_user(&self, id: UserId) -> Result<()> {
        self.api.delete_user(id).await?;
        self.users.remove(id);
        info!(id, "user deleted");
        Ok(())
    }

    pub fn get(&self, id: UserId) -> Option<User> {
        self.users.get_by_id(id)
    }

    pub fn by_name(&self) -> Vec<User> {
        let mut users = self.users.get_all();
        sort_users_by_name(&mut users);
        users
    }

    /// Candidates for task assignment, by name.
    pub fn developers(&self) -> Vec<User> {
        self.by_name()
            .into_iter()
            .filter(|u| u.role == Role::Developer)
            .collect()
    }
}
