//! Database models for investments.

use crate::types::{GoalId, InvestmentId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct InvestmentCreateDBRequest {
    pub user_id: UserId,
    pub goal_id: Option<GoalId>,
    pub name: String,
    pub amount: Decimal,
    pub category: String,
    pub invested_on: NaiveDate,
}

#[derive(Debug, Clone, Default)]
pub struct InvestmentUpdateDBRequest {
    /// `Some(None)` detaches the investment from its goal
    pub goal_id: Option<Option<GoalId>>,
    pub name: Option<String>,
    pub amount: Option<Decimal>,
    pub category: Option<String>,
    pub invested_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct InvestmentDBResponse {
    pub id: InvestmentId,
    pub user_id: UserId,
    pub goal_id: Option<GoalId>,
    pub name: String,
    pub amount: Decimal,
    pub category: String,
    pub invested_on: NaiveDate,
    pub created_at: DateTime<Utc>,
}
