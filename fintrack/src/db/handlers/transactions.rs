//! Database repository for transactions.
//!
//! Rows are always returned joined with their category name. Kind/category agreement is checked
//! by the API layer before writes reach this repository.

use crate::types::{CategoryId, EntryKind, TransactionId, UserId, abbrev_uuid};
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::transactions::{TransactionCreateDBRequest, TransactionDBResponse, TransactionUpdateDBRequest},
};
use chrono::NaiveDate;
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

const SELECT_JOINED: &str = r#"
    SELECT t.*, c.name AS category_name
    FROM transactions t
    JOIN categories c ON c.id = t.category_id
"#;

/// Filter for listing a user's transactions. Bounds are inclusive; `limit: None` returns every
/// matching row.
#[derive(Debug, Clone)]
pub struct TransactionFilter {
    pub user_id: UserId,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub kind: Option<EntryKind>,
    pub category_id: Option<CategoryId>,
    pub skip: i64,
    pub limit: Option<i64>,
}

impl TransactionFilter {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            from: None,
            to: None,
            kind: None,
            category_id: None,
            skip: 0,
            limit: None,
        }
    }

    pub fn between(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    pub fn paginate(mut self, skip: i64, limit: i64) -> Self {
        self.skip = skip;
        self.limit = Some(limit);
        self
    }
}

pub struct Transactions<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Transactions<'c> {
    type CreateRequest = TransactionCreateDBRequest;
    type UpdateRequest = TransactionUpdateDBRequest;
    type Response = TransactionDBResponse;
    type Id = TransactionId;
    type Filter = TransactionFilter;

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&request.user_id), kind = %request.kind), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let transaction = sqlx::query_as::<_, TransactionDBResponse>(
            r#"
            WITH inserted AS (
                INSERT INTO transactions (id, user_id, category_id, kind, amount, description, occurred_on)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING *
            )
            SELECT t.*, c.name AS category_name
            FROM inserted t
            JOIN categories c ON c.id = t.category_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.user_id)
        .bind(request.category_id)
        .bind(request.kind)
        .bind(request.amount)
        .bind(request.description.trim())
        .bind(request.occurred_on)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(transaction)
    }

    #[instrument(skip(self), fields(transaction_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let transaction = sqlx::query_as::<_, TransactionDBResponse>(&format!("{SELECT_JOINED} WHERE t.id = $1"))
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(transaction)
    }

    #[instrument(skip(self, filter), fields(user_id = %abbrev_uuid(&filter.user_id), skip = filter.skip, limit = ?filter.limit), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let transactions = sqlx::query_as::<_, TransactionDBResponse>(&format!(
            r#"{SELECT_JOINED}
            WHERE t.user_id = $1
              AND ($2::date IS NULL OR t.occurred_on >= $2)
              AND ($3::date IS NULL OR t.occurred_on <= $3)
              AND ($4::entry_kind IS NULL OR t.kind = $4)
              AND ($5::uuid IS NULL OR t.category_id = $5)
            ORDER BY t.occurred_on DESC, t.created_at DESC
            LIMIT $6 OFFSET $7
            "#
        ))
        .bind(filter.user_id)
        .bind(filter.from)
        .bind(filter.to)
        .bind(filter.kind)
        .bind(filter.category_id)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(transactions)
    }

    #[instrument(skip(self), fields(transaction_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM transactions WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(transaction_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let transaction = sqlx::query_as::<_, TransactionDBResponse>(
            r#"
            WITH updated AS (
                UPDATE transactions SET
                    category_id = COALESCE($2, category_id),
                    kind = COALESCE($3, kind),
                    amount = COALESCE($4, amount),
                    description = COALESCE($5, description),
                    occurred_on = COALESCE($6, occurred_on),
                    updated_at = NOW()
                WHERE id = $1
                RETURNING *
            )
            SELECT t.*, c.name AS category_name
            FROM updated t
            JOIN categories c ON c.id = t.category_id
            "#,
        )
        .bind(id)
        .bind(request.category_id)
        .bind(request.kind)
        .bind(request.amount)
        .bind(request.description.as_deref().map(str::trim))
        .bind(request.occurred_on)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(transaction)
    }
}

impl<'c> Transactions<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Number of rows matching the filter, ignoring pagination
    #[instrument(skip(self, filter), fields(user_id = %abbrev_uuid(&filter.user_id)), err)]
    pub async fn count(&mut self, filter: &TransactionFilter) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM transactions t
            WHERE t.user_id = $1
              AND ($2::date IS NULL OR t.occurred_on >= $2)
              AND ($3::date IS NULL OR t.occurred_on <= $3)
              AND ($4::entry_kind IS NULL OR t.kind = $4)
              AND ($5::uuid IS NULL OR t.category_id = $5)
            "#,
        )
        .bind(filter.user_id)
        .bind(filter.from)
        .bind(filter.to)
        .bind(filter.kind)
        .bind(filter.category_id)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::Categories;
    use crate::db::models::categories::CategoryCreateDBRequest;
    use crate::test_utils::create_test_user;
    use rust_decimal::Decimal;
    use sqlx::PgPool;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    async fn category(conn: &mut PgConnection, user_id: UserId, name: &str, kind: EntryKind) -> CategoryId {
        Categories::new(conn)
            .create(&CategoryCreateDBRequest {
                user_id,
                name: name.to_string(),
                kind,
                color: None,
            })
            .await
            .unwrap()
            .id
    }

    fn entry(user_id: UserId, category_id: CategoryId, kind: EntryKind, amount: i64, on: &str) -> TransactionCreateDBRequest {
        TransactionCreateDBRequest {
            user_id,
            category_id,
            kind,
            amount: Decimal::from(amount),
            description: format!("{kind} on {on}"),
            occurred_on: date(on),
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_returns_category_name(pool: PgPool) {
        let user = create_test_user(&pool, "tx@example.com").await;
        let mut conn = pool.acquire().await.unwrap();
        let salary = category(&mut conn, user.id, "Salary", EntryKind::Income).await;

        let mut repo = Transactions::new(&mut conn);
        let created = repo
            .create(&entry(user.id, salary, EntryKind::Income, 500, "2025-03-01"))
            .await
            .unwrap();
        assert_eq!(created.category_name, "Salary");
        assert_eq!(created.amount, Decimal::from(500));

        let fetched = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_negative_amount_is_rejected_by_schema(pool: PgPool) {
        let user = create_test_user(&pool, "negative@example.com").await;
        let mut conn = pool.acquire().await.unwrap();
        let food = category(&mut conn, user.id, "Food", EntryKind::Expense).await;

        let err = Transactions::new(&mut conn)
            .create(&entry(user.id, food, EntryKind::Expense, -1, "2025-03-01"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_filters_and_orders_newest_first(pool: PgPool) {
        let user = create_test_user(&pool, "filters@example.com").await;
        let other = create_test_user(&pool, "someone-else@example.com").await;
        let mut conn = pool.acquire().await.unwrap();
        let salary = category(&mut conn, user.id, "Salary", EntryKind::Income).await;
        let food = category(&mut conn, user.id, "Food", EntryKind::Expense).await;
        let theirs = category(&mut conn, other.id, "Food", EntryKind::Expense).await;

        let mut repo = Transactions::new(&mut conn);
        repo.create(&entry(user.id, salary, EntryKind::Income, 500, "2025-03-01")).await.unwrap();
        repo.create(&entry(user.id, food, EntryKind::Expense, 200, "2025-03-10")).await.unwrap();
        repo.create(&entry(user.id, food, EntryKind::Expense, 50, "2025-04-02")).await.unwrap();
        repo.create(&entry(other.id, theirs, EntryKind::Expense, 999, "2025-03-05")).await.unwrap();

        let all = repo.list(&TransactionFilter::new(user.id)).await.unwrap();
        let dates: Vec<_> = all.iter().map(|t| t.occurred_on).collect();
        assert_eq!(dates, vec![date("2025-04-02"), date("2025-03-10"), date("2025-03-01")]);

        let march = TransactionFilter::new(user.id).between(Some(date("2025-03-01")), Some(date("2025-03-31")));
        assert_eq!(repo.list(&march).await.unwrap().len(), 2);
        assert_eq!(repo.count(&march).await.unwrap(), 2);

        let expenses = TransactionFilter {
            kind: Some(EntryKind::Expense),
            ..TransactionFilter::new(user.id)
        };
        assert_eq!(repo.count(&expenses).await.unwrap(), 2);

        let by_category = TransactionFilter {
            category_id: Some(salary),
            ..TransactionFilter::new(user.id)
        };
        assert_eq!(repo.list(&by_category).await.unwrap().len(), 1);

        let page = repo.list(&TransactionFilter::new(user.id).paginate(1, 1)).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].occurred_on, date("2025-03-10"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_and_delete(pool: PgPool) {
        let user = create_test_user(&pool, "edit@example.com").await;
        let mut conn = pool.acquire().await.unwrap();
        let food = category(&mut conn, user.id, "Food", EntryKind::Expense).await;
        let rent = category(&mut conn, user.id, "Rent", EntryKind::Expense).await;

        let mut repo = Transactions::new(&mut conn);
        let created = repo
            .create(&entry(user.id, food, EntryKind::Expense, 20, "2025-03-01"))
            .await
            .unwrap();

        let updated = repo
            .update(
                created.id,
                &TransactionUpdateDBRequest {
                    category_id: Some(rent),
                    amount: Some(Decimal::new(1250, 2)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.category_name, "Rent");
        assert_eq!(updated.amount, Decimal::new(1250, 2));
        assert_eq!(updated.occurred_on, created.occurred_on);

        assert!(repo.delete(created.id).await.unwrap());
        assert!(matches!(
            repo.update(created.id, &TransactionUpdateDBRequest::default()).await,
            Err(DbError::NotFound)
        ));
    }
}
