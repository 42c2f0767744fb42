//! Database repository for investments.
//!
//! A goal's progress is the sum of the investments attached to it. Every write here adjusts the
//! affected goals inside the same database transaction as the investment change.

use crate::types::{GoalId, InvestmentId, UserId, abbrev_uuid};
use crate::db::{
    errors::{DbError, Result},
    handlers::{Goals, repository::Repository},
    models::investments::{InvestmentCreateDBRequest, InvestmentDBResponse, InvestmentUpdateDBRequest},
};
use sqlx::{Connection, PgConnection};
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct InvestmentFilter {
    pub user_id: UserId,
    pub goal_id: Option<GoalId>,
}

impl InvestmentFilter {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id, goal_id: None }
    }
}

pub struct Investments<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Investments<'c> {
    type CreateRequest = InvestmentCreateDBRequest;
    type UpdateRequest = InvestmentUpdateDBRequest;
    type Response = InvestmentDBResponse;
    type Id = InvestmentId;
    type Filter = InvestmentFilter;

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&request.user_id), amount = %request.amount), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let mut tx = self.db.begin().await?;

        let investment = sqlx::query_as::<_, InvestmentDBResponse>(
            r#"
            INSERT INTO investments (id, user_id, goal_id, name, amount, category, invested_on)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.user_id)
        .bind(request.goal_id)
        .bind(request.name.trim())
        .bind(request.amount)
        .bind(request.category.trim())
        .bind(request.invested_on)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(goal_id) = investment.goal_id {
            Goals::new(&mut tx).adjust_progress(goal_id, investment.amount).await?;
        }

        tx.commit().await?;
        Ok(investment)
    }

    #[instrument(skip(self), fields(investment_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let investment = sqlx::query_as::<_, InvestmentDBResponse>("SELECT * FROM investments WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(investment)
    }

    #[instrument(skip(self, filter), fields(user_id = %abbrev_uuid(&filter.user_id)), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let investments = sqlx::query_as::<_, InvestmentDBResponse>(
            r#"
            SELECT * FROM investments
            WHERE user_id = $1 AND ($2::uuid IS NULL OR goal_id = $2)
            ORDER BY invested_on DESC, created_at DESC
            "#,
        )
        .bind(filter.user_id)
        .bind(filter.goal_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(investments)
    }

    #[instrument(skip(self), fields(investment_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let mut tx = self.db.begin().await?;

        let removed = sqlx::query_as::<_, InvestmentDBResponse>("DELETE FROM investments WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(removed) = removed else {
            return Ok(false);
        };

        if let Some(goal_id) = removed.goal_id {
            Goals::new(&mut tx).adjust_progress(goal_id, -removed.amount).await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    #[instrument(skip(self, request), fields(investment_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let mut tx = self.db.begin().await?;

        let before = sqlx::query_as::<_, InvestmentDBResponse>("SELECT * FROM investments WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(DbError::NotFound)?;

        let after = sqlx::query_as::<_, InvestmentDBResponse>(
            r#"
            UPDATE investments SET
                goal_id = CASE WHEN $2 THEN $3 ELSE goal_id END,
                name = COALESCE($4, name),
                amount = COALESCE($5, amount),
                category = COALESCE($6, category),
                invested_on = COALESCE($7, invested_on)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(request.goal_id.is_some())
        .bind(request.goal_id.flatten())
        .bind(request.name.as_deref().map(str::trim))
        .bind(request.amount)
        .bind(request.category.as_deref().map(str::trim))
        .bind(request.invested_on)
        .fetch_one(&mut *tx)
        .await?;

        let mut goals = Goals::new(&mut tx);
        if let Some(old_goal) = before.goal_id {
            goals.adjust_progress(old_goal, -before.amount).await?;
        }
        if let Some(new_goal) = after.goal_id {
            goals.adjust_progress(new_goal, after.amount).await?;
        }

        tx.commit().await?;
        Ok(after)
    }
}

impl<'c> Investments<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::goals::{GoalCreateDBRequest, GoalDBResponse};
    use crate::test_utils::create_test_user;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use sqlx::PgPool;

    async fn goal(conn: &mut PgConnection, user_id: UserId, name: &str) -> GoalDBResponse {
        Goals::new(conn)
            .create(&GoalCreateDBRequest {
                user_id,
                name: name.to_string(),
                target_amount: Decimal::from(10_000),
                deadline: None,
            })
            .await
            .unwrap()
    }

    async fn progress(conn: &mut PgConnection, goal_id: GoalId) -> Decimal {
        Goals::new(conn).get_by_id(goal_id).await.unwrap().unwrap().progress
    }

    fn request(user_id: UserId, goal_id: Option<GoalId>, amount: i64, category: &str) -> InvestmentCreateDBRequest {
        InvestmentCreateDBRequest {
            user_id,
            goal_id,
            name: format!("{category} position"),
            amount: Decimal::from(amount),
            category: category.to_string(),
            invested_on: NaiveDate::from_ymd_opt(2025, 3, 15).unwrap(),
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_progress_tracks_sum_of_investments(pool: PgPool) {
        let user = create_test_user(&pool, "invest@example.com").await;
        let mut conn = pool.acquire().await.unwrap();
        let house = goal(&mut conn, user.id, "House").await;

        let mut repo = Investments::new(&mut conn);
        let first = repo.create(&request(user.id, Some(house.id), 300, "Bonds")).await.unwrap();
        let second = repo.create(&request(user.id, Some(house.id), 200, "Stocks")).await.unwrap();
        repo.create(&request(user.id, None, 999, "Crypto")).await.unwrap();
        assert_eq!(progress(&mut conn, house.id).await, Decimal::from(500));

        let mut repo = Investments::new(&mut conn);
        repo.update(
            first.id,
            &InvestmentUpdateDBRequest {
                amount: Some(Decimal::from(100)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(progress(&mut conn, house.id).await, Decimal::from(300));

        assert!(Investments::new(&mut conn).delete(second.id).await.unwrap());
        assert_eq!(progress(&mut conn, house.id).await, Decimal::from(100));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_moving_between_goals_rebalances_both(pool: PgPool) {
        let user = create_test_user(&pool, "move@example.com").await;
        let mut conn = pool.acquire().await.unwrap();
        let car = goal(&mut conn, user.id, "Car").await;
        let trip = goal(&mut conn, user.id, "Trip").await;

        let investment = Investments::new(&mut conn)
            .create(&request(user.id, Some(car.id), 400, "Funds"))
            .await
            .unwrap();

        let moved = Investments::new(&mut conn)
            .update(
                investment.id,
                &InvestmentUpdateDBRequest {
                    goal_id: Some(Some(trip.id)),
                    amount: Some(Decimal::from(250)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(moved.goal_id, Some(trip.id));
        assert_eq!(progress(&mut conn, car.id).await, Decimal::ZERO);
        assert_eq!(progress(&mut conn, trip.id).await, Decimal::from(250));

        let detached = Investments::new(&mut conn)
            .update(
                investment.id,
                &InvestmentUpdateDBRequest {
                    goal_id: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(detached.goal_id, None);
        assert_eq!(progress(&mut conn, trip.id).await, Decimal::ZERO);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_delete_floors_progress_at_zero(pool: PgPool) {
        let user = create_test_user(&pool, "floor-invest@example.com").await;
        let mut conn = pool.acquire().await.unwrap();
        let savings = goal(&mut conn, user.id, "Savings").await;

        let investment = Investments::new(&mut conn)
            .create(&request(user.id, Some(savings.id), 100, "Cash"))
            .await
            .unwrap();
        Goals::new(&mut conn)
            .adjust_progress(savings.id, Decimal::from(-60))
            .await
            .unwrap();

        Investments::new(&mut conn).delete(investment.id).await.unwrap();
        assert_eq!(progress(&mut conn, savings.id).await, Decimal::ZERO);
        assert!(!Investments::new(&mut conn).delete(investment.id).await.unwrap());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_deleting_goal_detaches_investments(pool: PgPool) {
        let user = create_test_user(&pool, "detach@example.com").await;
        let mut conn = pool.acquire().await.unwrap();
        let old = goal(&mut conn, user.id, "Old").await;

        let investment = Investments::new(&mut conn)
            .create(&request(user.id, Some(old.id), 50, "Stocks"))
            .await
            .unwrap();
        Goals::new(&mut conn).delete(old.id).await.unwrap();

        let reloaded = Investments::new(&mut conn).get_by_id(investment.id).await.unwrap().unwrap();
        assert_eq!(reloaded.goal_id, None);

        let listed = Investments::new(&mut conn).list(&InvestmentFilter::new(user.id)).await.unwrap();
        assert_eq!(listed.len(), 1);
    }
}
