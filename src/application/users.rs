use super::locks::{EntityKey, EntityLocks};
use crate::domain::ids::UserId;
use crate::domain::ports::{ChangeSet, StoreHandle, UnitOfWork, UserStore};
use crate::domain::user::{Role, User, Visibility};
use crate::error::{PaymentError, Result};
use serde::Deserialize;
use tracing::info;

/// Self-service signup. Accounts open with no connects; balances only grow
/// through the ledger or a trusted seed import.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub role: Role,
}

#[derive(Clone)]
pub struct Users {
    store: StoreHandle,
    locks: EntityLocks,
}

impl Users {
    pub fn new(store: StoreHandle, locks: EntityLocks) -> Self {
        Self { store, locks }
    }

    pub async fn register(&self, new: NewUser) -> Result<User> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(PaymentError::Validation("name is required".to_string()));
        }
        if new.role == Role::Admin {
            return Err(PaymentError::Unauthorized(
                "admin accounts cannot be self-registered".to_string(),
            ));
        }
        let mut user = User::new(name, new.role);
        if let Some(phone) = new.phone_number.as_deref().map(str::trim)
            && !phone.is_empty()
        {
            user = user.with_phone(phone);
        }
        let id = user.id;
        self.store.commit(ChangeSet::new().user(user)).await?;
        let user = self.get(id).await?;
        info!(user_id = %id, role = %user.role, "user registered");
        Ok(user)
    }

    /// Loads pre-built users (e.g. a seed file) in one commit.
    pub async fn import(&self, users: Vec<User>) -> Result<usize> {
        let count = users.len();
        let changes = users
            .into_iter()
            .fold(ChangeSet::new(), |changes, user| changes.user(user));
        self.store.commit(changes).await?;
        info!(count, "users imported");
        Ok(count)
    }

    pub async fn get(&self, id: UserId) -> Result<User> {
        self.store
            .user(id, Visibility::ActiveOnly)
            .await?
            .ok_or_else(|| PaymentError::not_found("user", id))
    }

    pub async fn all(&self, visibility: Visibility) -> Result<Vec<User>> {
        self.store.users(visibility).await
    }

    /// Hides the user from active lookups. Users are never deleted.
    pub async fn deactivate(&self, id: UserId) -> Result<User> {
        let _guard = self.locks.acquire([EntityKey::User(id)]).await;
        let mut user = self.get(id).await?;
        user.active = false;
        self.store.commit(ChangeSet::new().user(user)).await?;
        info!(user_id = %id, "user deactivated");
        self.store
            .user(id, Visibility::IncludeInactive)
            .await?
            .ok_or_else(|| PaymentError::not_found("user", id))
    }
}
