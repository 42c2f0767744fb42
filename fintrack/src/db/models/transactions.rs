//! Database models for transactions (income, expense and investment entries).

use crate::types::{CategoryId, EntryKind, TransactionId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct TransactionCreateDBRequest {
    pub user_id: UserId,
    pub category_id: CategoryId,
    pub kind: EntryKind,
    pub amount: Decimal,
    pub description: String,
    pub occurred_on: NaiveDate,
}

#[derive(Debug, Clone, Default)]
pub struct TransactionUpdateDBRequest {
    pub category_id: Option<CategoryId>,
    pub kind: Option<EntryKind>,
    pub amount: Option<Decimal>,
    pub description: Option<String>,
    pub occurred_on: Option<NaiveDate>,
}

/// A transaction joined with its category name.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct TransactionDBResponse {
    pub id: TransactionId,
    pub user_id: UserId,
    pub category_id: CategoryId,
    pub category_name: String,
    pub kind: EntryKind,
    pub amount: Decimal,
    pub description: String,
    pub occurred_on: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
