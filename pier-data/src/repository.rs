use crate::entity::{Entity, Key};
use crate::error::DataError;
use crate::page::Page;
use crate::query::{Conditions, QueryArgs};
use std::future::Future;

/// Result of [`Repository::find`]: a single optional entity when the query
/// asked for one row, a list otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum Found<E> {
    One(Option<E>),
    Many(Vec<E>),
}

impl<E> Found<E> {
    pub fn into_vec(self) -> Vec<E> {
        match self {
            Found::One(entity) => entity.into_iter().collect(),
            Found::Many(entities) => entities,
        }
    }

    /// First entity, if any.
    pub fn into_first(self) -> Option<E> {
        match self {
            Found::One(entity) => entity,
            Found::Many(entities) => entities.into_iter().next(),
        }
    }
}

/// Generic async repository contract for one entity type.
///
/// Uses RPITIT (return-position `impl Trait` in traits); implementors write
/// plain `async fn`.
pub trait Repository<E: Entity>: Send + Sync {
    fn find(&self, args: &QueryArgs) -> impl Future<Output = Result<Found<E>, DataError>> + Send;
    fn find_all(&self, args: &QueryArgs) -> impl Future<Output = Result<Vec<E>, DataError>> + Send;
    fn find_one(&self, args: &QueryArgs) -> impl Future<Output = Result<Option<E>, DataError>> + Send;

    /// Look an entity up by primary key. Cached copies are returned unless
    /// `force_reload` is set, in which case the cache entry is refreshed.
    fn find_by_id(
        &self,
        key: &Key,
        force_reload: bool,
    ) -> impl Future<Output = Result<Option<E>, DataError>> + Send;

    fn count(&self, conditions: Option<&Conditions>) -> impl Future<Output = Result<u64, DataError>> + Send;

    /// Delete the rows matching `conditions`; `true` if any row was removed.
    fn delete(&self, conditions: &Conditions) -> impl Future<Output = Result<bool, DataError>> + Send;
    /// Delete every row of the table, returning how many were removed.
    fn delete_all(&self) -> impl Future<Output = Result<u64, DataError>> + Send;

    fn paginate(
        &self,
        args: &QueryArgs,
        items_per_page: u64,
        current_page: u64,
    ) -> impl Future<Output = Result<Page<E>, DataError>> + Send;

    /// Insert a new entity or update a stored one.
    fn save(&self, entity: &mut E) -> impl Future<Output = Result<(), DataError>> + Send;
    fn delete_entity(&self, entity: &E) -> impl Future<Output = Result<bool, DataError>> + Send;
    /// Refresh `entity` from storage; `NotFound` if its row is gone.
    fn reload(&self, entity: &mut E) -> impl Future<Output = Result<(), DataError>> + Send;
}
