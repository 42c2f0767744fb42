//! Database repository for savings goals.

use crate::types::{GoalId, UserId, abbrev_uuid};
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::goals::{GoalCreateDBRequest, GoalDBResponse, GoalUpdateDBRequest},
};
use rust_decimal::Decimal;
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct GoalFilter {
    pub user_id: UserId,
}

impl GoalFilter {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id }
    }
}

pub struct Goals<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Goals<'c> {
    type CreateRequest = GoalCreateDBRequest;
    type UpdateRequest = GoalUpdateDBRequest;
    type Response = GoalDBResponse;
    type Id = GoalId;
    type Filter = GoalFilter;

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&request.user_id)), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let goal = sqlx::query_as::<_, GoalDBResponse>(
            r#"
            INSERT INTO goals (id, user_id, name, target_amount, deadline)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.user_id)
        .bind(request.name.trim())
        .bind(request.target_amount)
        .bind(request.deadline)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(goal)
    }

    #[instrument(skip(self), fields(goal_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let goal = sqlx::query_as::<_, GoalDBResponse>("SELECT * FROM goals WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(goal)
    }

    #[instrument(skip(self, filter), fields(user_id = %abbrev_uuid(&filter.user_id)), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let goals = sqlx::query_as::<_, GoalDBResponse>(
            "SELECT * FROM goals WHERE user_id = $1 ORDER BY deadline ASC NULLS LAST, created_at ASC",
        )
        .bind(filter.user_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(goals)
    }

    /// Investments pointing at the goal are detached by the foreign key.
    #[instrument(skip(self), fields(goal_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM goals WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(goal_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let goal = sqlx::query_as::<_, GoalDBResponse>(
            r#"
            UPDATE goals SET
                name = COALESCE($2, name),
                target_amount = COALESCE($3, target_amount),
                deadline = CASE WHEN $4 THEN $5 ELSE deadline END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(request.name.as_deref().map(str::trim))
        .bind(request.target_amount)
        .bind(request.deadline.is_some())
        .bind(request.deadline.flatten())
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(goal)
    }
}

impl<'c> Goals<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Add `delta` (possibly negative) to a goal's progress, never going below zero.
    #[instrument(skip(self), fields(goal_id = %abbrev_uuid(&id), delta = %delta), err)]
    pub async fn adjust_progress(&mut self, id: GoalId, delta: Decimal) -> Result<GoalDBResponse> {
        let goal = sqlx::query_as::<_, GoalDBResponse>(
            r#"
            UPDATE goals SET
                progress = GREATEST(progress + $2, 0),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(delta)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(goal)
    }
}
