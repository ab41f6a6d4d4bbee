use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::crud::models::ListQuery;
use crate::domain::crud::models::Resource;
use crate::domain::crud::ports::CrudPort;
use crate::domain::crud::ports::ResourceStore;
use crate::user::errors::UserError;

const NO_DOCUMENT: &str = "No document found with that ID";

/// Generic CRUD operations over any [`ResourceStore`].
pub struct CrudService<R, S>
where
    R: Resource,
    S: ResourceStore<R>,
{
    store: Arc<S>,
    _resource: PhantomData<fn() -> R>,
}

impl<R, S> CrudService<R, S>
where
    R: Resource,
    S: ResourceStore<R>,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            _resource: PhantomData,
        }
    }
}

#[async_trait]
impl<R, S> CrudPort<R> for CrudService<R, S>
where
    R: Resource,
    S: ResourceStore<R>,
{
    async fn get_all(&self, query: ListQuery) -> Result<Vec<R>, UserError> {
        self.store.find_all(&query).await
    }

    async fn get_one(&self, id: &R::Id) -> Result<R, UserError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| UserError::NotFound(NO_DOCUMENT.to_string()))
    }

    async fn create_one(&self, input: R::Create) -> Result<R, UserError> {
        let created = self.store.create(input).await?;
        tracing::info!(resource = R::NAME, "Resource created");
        Ok(created)
    }

    async fn update_one(&self, id: &R::Id, patch: R::Patch) -> Result<R, UserError> {
        self.store
            .find_by_id_and_update(id, patch)
            .await?
            .ok_or_else(|| UserError::NotFound(NO_DOCUMENT.to_string()))
    }

    async fn delete_one(&self, id: &R::Id) -> Result<(), UserError> {
        self.store
            .find_by_id_and_delete(id)
            .await?
            .ok_or_else(|| UserError::NotFound(NO_DOCUMENT.to_string()))?;

        tracing::info!(resource = R::NAME, id = %id, "Resource deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use tokio::sync::RwLock;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Tour {
        id: u32,
        name: String,
    }

    impl Resource for Tour {
        type Id = u32;
        type Create = Tour;
        type Patch = String;

        const NAME: &'static str = "tour";
        const SORTABLE: &'static [&'static str] = &["name"];
    }

    #[derive(Default)]
    struct TourStore {
        tours: RwLock<BTreeMap<u32, Tour>>,
    }

    #[async_trait]
    impl ResourceStore<Tour> for TourStore {
        async fn find_all(&self, query: &ListQuery) -> Result<Vec<Tour>, UserError> {
            Ok(self
                .tours
                .read()
                .await
                .values()
                .skip(query.offset() as usize)
                .take(query.limit as usize)
                .cloned()
                .collect())
        }

        async fn find_by_id(&self, id: &u32) -> Result<Option<Tour>, UserError> {
            Ok(self.tours.read().await.get(id).cloned())
        }

        async fn create(&self, input: Tour) -> Result<Tour, UserError> {
            self.tours.write().await.insert(input.id, input.clone());
            Ok(input)
        }

        async fn find_by_id_and_update(
            &self,
            id: &u32,
            patch: String,
        ) -> Result<Option<Tour>, UserError> {
            let mut tours = self.tours.write().await;
            Ok(tours.get_mut(id).map(|tour| {
                tour.name = patch;
                tour.clone()
            }))
        }

        async fn find_by_id_and_delete(&self, id: &u32) -> Result<Option<Tour>, UserError> {
            Ok(self.tours.write().await.remove(id))
        }
    }

    fn tour(id: u32, name: &str) -> Tour {
        Tour {
            id,
            name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_then_get_one() {
        let service = CrudService::<Tour, _>::new(Arc::new(TourStore::default()));

        service.create_one(tour(1, "Forest Hiker")).await.unwrap();

        assert_eq!(service.get_one(&1).await.unwrap(), tour(1, "Forest Hiker"));
    }

    #[tokio::test]
    async fn test_missing_resource_is_not_found() {
        let service = CrudService::<Tour, _>::new(Arc::new(TourStore::default()));

        for result in [
            service.get_one(&7).await.map(|_| ()),
            service.update_one(&7, "Sea Explorer".to_string()).await.map(|_| ()),
            service.delete_one(&7).await,
        ] {
            match result {
                Err(UserError::NotFound(message)) => assert_eq!(message, NO_DOCUMENT),
                other => panic!("expected NotFound, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let service = CrudService::<Tour, _>::new(Arc::new(TourStore::default()));
        service.create_one(tour(1, "Forest Hiker")).await.unwrap();

        let updated = service.update_one(&1, "Snow Adventurer".to_string()).await.unwrap();
        assert_eq!(updated.name, "Snow Adventurer");

        service.delete_one(&1).await.unwrap();
        assert!(service.get_one(&1).await.is_err());
    }

    #[tokio::test]
    async fn test_get_all_pages_through_store() {
        let service = CrudService::<Tour, _>::new(Arc::new(TourStore::default()));
        for id in 1..=5 {
            service.create_one(tour(id, "Tour")).await.unwrap();
        }

        let query = ListQuery::parse(Some(2), Some(2), None, Tour::SORTABLE).unwrap();
        let page = service.get_all(query).await.unwrap();

        assert_eq!(page.iter().map(|t| t.id).collect::<Vec<_>>(), vec![3, 4]);
    }
}
