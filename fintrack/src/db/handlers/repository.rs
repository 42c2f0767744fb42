//! The CRUD surface shared by the per-table repositories.

use crate::db::errors::Result;

/// Create, read, list, update and delete for one table.
///
/// Repositories borrow a `PgConnection` for their lifetime, so several of them can run against
/// the same transaction. Ownership is not checked here: per-user tables scope their lists through
/// a `Filter` that carries the owning user, and handlers check `get_by_id` results themselves.
#[async_trait::async_trait]
pub trait Repository {
    type CreateRequest;
    type UpdateRequest;
    type Response;
    type Id: Send + Sync;
    type Filter: Send + Sync;

    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response>;

    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>>;

    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>>;

    /// Returns whether a row was deleted
    async fn delete(&mut self, id: Self::Id) -> Result<bool>;

    /// Fails with `DbError::NotFound` when the row does not exist
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response>;
}
