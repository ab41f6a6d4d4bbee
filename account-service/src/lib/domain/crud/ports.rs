use async_trait::async_trait;

use crate::domain::crud::models::ListQuery;
use crate::domain::crud::models::Resource;
use crate::user::errors::UserError;

/// Port for the generic per-resource operations exposed over HTTP.
#[async_trait]
pub trait CrudPort<R: Resource>: Send + Sync + 'static {
    /// List resources page by page.
    async fn get_all(&self, query: ListQuery) -> Result<Vec<R>, UserError>;

    /// Fetch one resource.
    ///
    /// # Errors
    /// * `NotFound` - No resource with that id
    async fn get_one(&self, id: &R::Id) -> Result<R, UserError>;

    /// Create a resource.
    async fn create_one(&self, input: R::Create) -> Result<R, UserError>;

    /// Apply a partial update and return the new state.
    ///
    /// # Errors
    /// * `NotFound` - No resource with that id
    async fn update_one(&self, id: &R::Id, patch: R::Patch) -> Result<R, UserError>;

    /// Remove a resource.
    ///
    /// # Errors
    /// * `NotFound` - No resource with that id
    async fn delete_one(&self, id: &R::Id) -> Result<(), UserError>;
}

/// Storage capabilities a resource must offer to be served generically.
#[async_trait]
pub trait ResourceStore<R: Resource>: Send + Sync + 'static {
    async fn find_all(&self, query: &ListQuery) -> Result<Vec<R>, UserError>;

    async fn find_by_id(&self, id: &R::Id) -> Result<Option<R>, UserError>;

    async fn create(&self, input: R::Create) -> Result<R, UserError>;

    /// # Returns
    /// Updated resource, None if the id is unknown
    async fn find_by_id_and_update(
        &self,
        id: &R::Id,
        patch: R::Patch,
    ) -> Result<Option<R>, UserError>;

    /// # Returns
    /// Removed resource, None if the id is unknown
    async fn find_by_id_and_delete(&self, id: &R::Id) -> Result<Option<R>, UserError>;
}
