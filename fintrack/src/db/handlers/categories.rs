//! Database repository for categories.
//!
//! Every user has at most one category per (name, kind). The category named
//! [`SENTINEL_CATEGORY_NAME`] of each kind is created on demand and receives the transactions of
//! categories that get deleted, so deleting a category never orphans or destroys transactions.

use crate::types::{CategoryId, EntryKind, Operation, UserId, abbrev_uuid};
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::categories::{
        CategoryCreateDBRequest, CategoryDBResponse, CategoryDeletion, CategoryUpdateDBRequest, DEFAULT_CATEGORIES,
        DEFAULT_CATEGORY_COLOR, SENTINEL_CATEGORY_NAME,
    },
};
use sqlx::{Connection, PgConnection};
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct CategoryFilter {
    pub user_id: UserId,
    pub kind: Option<EntryKind>,
}

impl CategoryFilter {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id, kind: None }
    }

    pub fn with_kind(mut self, kind: Option<EntryKind>) -> Self {
        self.kind = kind;
        self
    }
}

pub struct Categories<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Categories<'c> {
    type CreateRequest = CategoryCreateDBRequest;
    type UpdateRequest = CategoryUpdateDBRequest;
    type Response = CategoryDBResponse;
    type Id = CategoryId;
    type Filter = CategoryFilter;

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&request.user_id), kind = %request.kind), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let category = sqlx::query_as::<_, CategoryDBResponse>(
            r#"
            INSERT INTO categories (id, user_id, name, kind, color)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.user_id)
        .bind(request.name.trim())
        .bind(request.kind)
        .bind(request.color.as_deref().unwrap_or(DEFAULT_CATEGORY_COLOR))
        .fetch_one(&mut *self.db)
        .await?;

        Ok(category)
    }

    #[instrument(skip(self), fields(category_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let category = sqlx::query_as::<_, CategoryDBResponse>("SELECT * FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(category)
    }

    #[instrument(skip(self, filter), fields(user_id = %abbrev_uuid(&filter.user_id)), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let categories = sqlx::query_as::<_, CategoryDBResponse>(
            r#"
            SELECT * FROM categories
            WHERE user_id = $1 AND ($2::entry_kind IS NULL OR kind = $2)
            ORDER BY kind, name
            "#,
        )
        .bind(filter.user_id)
        .bind(filter.kind)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(categories)
    }

    /// Deletes with sentinel reassignment; see [`Categories::delete_reassigning`].
    #[instrument(skip(self), fields(category_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        match self.delete_reassigning(id).await {
            Ok(_) => Ok(true),
            Err(DbError::NotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, request), fields(category_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let category = sqlx::query_as::<_, CategoryDBResponse>(
            r#"
            UPDATE categories SET
                name = COALESCE($2, name),
                color = COALESCE($3, color)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(request.name.as_deref().map(str::trim))
        .bind(&request.color)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(category)
    }
}

impl<'c> Categories<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Find the user's sentinel category of `kind`, creating it if needed.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id), kind = %kind), err)]
    pub async fn get_or_create_sentinel(&mut self, user_id: UserId, kind: EntryKind) -> Result<CategoryDBResponse> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let sentinel = sqlx::query_as::<_, CategoryDBResponse>(
            r#"
            INSERT INTO categories (id, user_id, name, kind, color)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT ON CONSTRAINT categories_user_name_kind_unique
            DO UPDATE SET name = EXCLUDED.name
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(SENTINEL_CATEGORY_NAME)
        .bind(kind)
        .bind(DEFAULT_CATEGORY_COLOR)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(sentinel)
    }

    /// Delete a category, first moving its transactions to the sentinel of the same kind.
    ///
    /// The sentinel itself may only be deleted once it has no transactions.
    #[instrument(skip(self), fields(category_id = %abbrev_uuid(&id)), err)]
    pub async fn delete_reassigning(&mut self, id: CategoryId) -> Result<CategoryDeletion> {
        let mut tx = self.db.begin().await?;

        let category = sqlx::query_as::<_, CategoryDBResponse>("SELECT * FROM categories WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(DbError::NotFound)?;

        let dependents: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE category_id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        let deletion = if dependents == 0 {
            CategoryDeletion {
                reassigned: 0,
                sentinel_id: None,
            }
        } else if category.is_sentinel() {
            return Err(DbError::ProtectedEntity {
                operation: Operation::Delete,
                reason: format!("the {} fallback category still has {dependents} transactions", category.kind),
                entity_type: "Category".to_string(),
                entity_id: Some(id.to_string()),
            });
        } else {
            let sentinel = Categories::new(&mut tx)
                .get_or_create_sentinel(category.user_id, category.kind)
                .await?;

            let moved = sqlx::query("UPDATE transactions SET category_id = $2, updated_at = NOW() WHERE category_id = $1")
                .bind(id)
                .bind(sentinel.id)
                .execute(&mut *tx)
                .await?;

            CategoryDeletion {
                reassigned: moved.rows_affected() as i64,
                sentinel_id: Some(sentinel.id),
            }
        };

        sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        if deletion.reassigned > 0 {
            info!(
                category_id = %abbrev_uuid(&id),
                reassigned = deletion.reassigned,
                "Moved transactions to fallback category"
            );
        }

        Ok(deletion)
    }

    /// Seed the starter categories for a new account. Existing names are left alone.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn create_defaults(&mut self, user_id: UserId) -> Result<u64> {
        let mut created = 0;
        for (name, kind, color) in DEFAULT_CATEGORIES {
            let result = sqlx::query(
                r#"
                INSERT INTO categories (id, user_id, name, kind, color)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT ON CONSTRAINT categories_user_name_kind_unique DO NOTHING
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(*name)
            .bind(*kind)
            .bind(*color)
            .execute(&mut *self.db)
            .await?;
            created += result.rows_affected();
        }

        Ok(created)
    }
}
