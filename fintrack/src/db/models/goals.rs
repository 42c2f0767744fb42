//! Database models for savings goals.

use crate::types::{GoalId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct GoalCreateDBRequest {
    pub user_id: UserId,
    pub name: String,
    pub target_amount: Decimal,
    pub deadline: Option<NaiveDate>,
}

/// Progress is deliberately absent: it only moves with investments.
#[derive(Debug, Clone, Default)]
pub struct GoalUpdateDBRequest {
    pub name: Option<String>,
    pub target_amount: Option<Decimal>,
    /// `Some(None)` clears the deadline
    pub deadline: Option<Option<NaiveDate>>,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct GoalDBResponse {
    pub id: GoalId,
    pub user_id: UserId,
    pub name: String,
    pub target_amount: Decimal,
    pub progress: Decimal,
    pub deadline: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
