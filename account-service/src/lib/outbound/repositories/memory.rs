use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::domain::crud::models::ListQuery;
use crate::domain::crud::models::SortKey;
use crate::domain::user::models::PasswordSelection;
use crate::domain::user::models::PendingReset;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::models::UserPatch;
use crate::domain::user::ports::UserRepository;
use crate::user::errors::UserError;

/// Process-local user store with the same semantics as the Postgres one.
///
/// Backs the HTTP integration tests.
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<UserId, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn select(user: &User, selection: PasswordSelection) -> User {
        match selection {
            PasswordSelection::Include => user.clone(),
            PasswordSelection::Omit => user.clone().without_password(),
        }
    }

    fn email_taken(users: &HashMap<UserId, User>, email: &str, except: Option<UserId>) -> bool {
        users
            .values()
            .any(|u| u.email.as_str() == email && Some(u.id) != except)
    }

    fn compare(a: &User, b: &User, keys: &[SortKey]) -> Ordering {
        for key in keys {
            let ordering = match key.field.as_str() {
                "name" => a.name.as_str().cmp(b.name.as_str()),
                "email" => a.email.as_str().cmp(b.email.as_str()),
                "role" => a.role.as_str().cmp(b.role.as_str()),
                "createdAt" => a.created_at.cmp(&b.created_at),
                _ => Ordering::Equal,
            };
            let ordering = if key.descending {
                ordering.reverse()
            } else {
                ordering
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }

        if keys.is_empty() {
            let newest_first = b.created_at.cmp(&a.created_at);
            if newest_first != Ordering::Equal {
                return newest_first;
            }
        }
        a.id.0.cmp(&b.id.0)
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: User) -> Result<User, UserError> {
        let mut users = self.users.write().await;
        if Self::email_taken(&users, user.email.as_str(), None) {
            return Err(UserError::EmailAlreadyExists(user.email.to_string()));
        }

        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(
        &self,
        id: &UserId,
        selection: PasswordSelection,
    ) -> Result<Option<User>, UserError> {
        let users = self.users.read().await;
        Ok(users.get(id).map(|u| Self::select(u, selection)))
    }

    async fn find_by_email(
        &self,
        email: &str,
        selection: PasswordSelection,
    ) -> Result<Option<User>, UserError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.active && u.email.as_str() == email)
            .map(|u| Self::select(u, selection)))
    }

    async fn find_by_reset_digest(
        &self,
        digest: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, UserError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| {
                u.active
                    && u.pending_reset
                        .as_ref()
                        .is_some_and(|r| r.token_digest == digest && r.is_live(now))
            })
            .map(|u| Self::select(u, PasswordSelection::Omit)))
    }

    async fn update_partial(
        &self,
        id: &UserId,
        patch: UserPatch,
    ) -> Result<Option<User>, UserError> {
        let mut users = self.users.write().await;

        if let Some(email) = &patch.email {
            if Self::email_taken(&users, email.as_str(), Some(*id)) {
                return Err(UserError::EmailAlreadyExists(email.to_string()));
            }
        }

        let Some(user) = users.get_mut(id) else {
            return Ok(None);
        };

        if let Some(name) = patch.name {
            user.name = name;
        }
        if let Some(email) = patch.email {
            user.email = email;
        }
        if let Some(role) = patch.role {
            user.role = role;
        }
        if let Some(active) = patch.active {
            user.active = active;
        }

        Ok(Some(Self::select(user, PasswordSelection::Omit)))
    }

    async fn store_pending_reset(
        &self,
        id: &UserId,
        reset: &PendingReset,
    ) -> Result<bool, UserError> {
        let mut users = self.users.write().await;
        match users.get_mut(id) {
            Some(user) if user.active => {
                user.pending_reset = Some(reset.clone());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn clear_pending_reset(&self, id: &UserId, digest: &str) -> Result<(), UserError> {
        let mut users = self.users.write().await;
        if let Some(user) = users.get_mut(id) {
            if user
                .pending_reset
                .as_ref()
                .is_some_and(|r| r.token_digest == digest)
            {
                user.pending_reset = None;
            }
        }
        Ok(())
    }

    async fn redeem_reset(
        &self,
        digest: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, UserError> {
        let mut users = self.users.write().await;
        let Some(user) = users.values_mut().find(|u| {
            u.active
                && u.pending_reset
                    .as_ref()
                    .is_some_and(|r| r.token_digest == digest && r.is_live(now))
        }) else {
            return Ok(None);
        };

        user.change_password(password_hash.to_string(), now);
        Ok(Some(Self::select(user, PasswordSelection::Omit)))
    }

    async fn replace_password(
        &self,
        id: &UserId,
        current_hash: &str,
        new_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, UserError> {
        let mut users = self.users.write().await;
        let Some(user) = users
            .get_mut(id)
            .filter(|u| u.active && u.password_hash.as_deref() == Some(current_hash))
        else {
            return Ok(None);
        };

        user.change_password(new_hash.to_string(), now);
        Ok(Some(Self::select(user, PasswordSelection::Omit)))
    }

    async fn list_active(&self, query: &ListQuery) -> Result<Vec<User>, UserError> {
        let users = self.users.read().await;

        let mut active: Vec<&User> = users.values().filter(|u| u.active).collect();
        active.sort_by(|a, b| Self::compare(a, b, &query.sort));

        Ok(active
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.limit as usize)
            .map(|u| Self::select(u, PasswordSelection::Omit))
            .collect())
    }

    async fn delete(&self, id: &UserId) -> Result<Option<User>, UserError> {
        let mut users = self.users.write().await;
        Ok(users
            .remove(id)
            .map(|u| Self::select(&u, PasswordSelection::Omit)))
    }
}
