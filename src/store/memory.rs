use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::models::{NewUser, User};
use crate::store::UserStore;

/// In-memory user store. Uniqueness checks and the insert happen under a
/// single write lock, so concurrent registrations cannot both succeed.
#[derive(Default)]
pub struct MemoryUserStore {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_email_or_username(
        &self,
        email: &str,
        username: Option<&str>,
    ) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;

        if let Some(user) = users.values().find(|u| u.email == email) {
            return Ok(Some(user.clone()));
        }

        if let Some(username) = username {
            if let Some(user) = users.values().find(|u| u.username.as_deref() == Some(username)) {
                return Ok(Some(user.clone()));
            }
        }

        Ok(None)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.get(&id).cloned())
    }

    async fn create(&self, input: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;

        if users.values().any(|u| u.email == input.email) {
            return Err(StoreError::DuplicateEmail);
        }

        if let Some(username) = input.username.as_deref() {
            if users.values().any(|u| u.username.as_deref() == Some(username)) {
                return Err(StoreError::DuplicateUsername);
            }
        }

        let user = User::new(input);
        users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn save(&self, user: &User) -> Result<(), StoreError> {
        let mut users = self.users.write().await;

        match users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }
}
