use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::crud::models::ListQuery;
use crate::domain::crud::models::Resource;
use crate::domain::crud::ports::ResourceStore;
use crate::domain::user::models::PasswordSelection;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::models::UserPatch;
use crate::user::errors::UserError;
use crate::user::ports::UserRepository;

impl Resource for User {
    type Id = UserId;
    type Create = User;
    type Patch = UserPatch;

    const NAME: &'static str = "user";
    const SORTABLE: &'static [&'static str] = &["name", "email", "role", "createdAt"];
}

/// Serves users to the generic CRUD layer.
///
/// Listing only returns active accounts, lookups by id return any account,
/// and every record leaves without its password hash.
pub struct UserResourceStore<UR: UserRepository> {
    repository: Arc<UR>,
}

impl<UR: UserRepository> UserResourceStore<UR> {
    pub fn new(repository: Arc<UR>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl<UR: UserRepository> ResourceStore<User> for UserResourceStore<UR> {
    async fn find_all(&self, query: &ListQuery) -> Result<Vec<User>, UserError> {
        let users = self.repository.list_active(query).await?;
        Ok(users.into_iter().map(User::without_password).collect())
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserError> {
        self.repository
            .find_by_id(id, PasswordSelection::Omit)
            .await
            .map(|user| user.map(User::without_password))
    }

    async fn create(&self, input: User) -> Result<User, UserError> {
        self.repository
            .create(input)
            .await
            .map(User::without_password)
    }

    async fn find_by_id_and_update(
        &self,
        id: &UserId,
        patch: UserPatch,
    ) -> Result<Option<User>, UserError> {
        self.repository
            .update_partial(id, patch)
            .await
            .map(|user| user.map(User::without_password))
    }

    async fn find_by_id_and_delete(&self, id: &UserId) -> Result<Option<User>, UserError> {
        self.repository
            .delete(id)
            .await
            .map(|user| user.map(User::without_password))
    }
}
