//! API request/response models for investments.

use crate::{
    db::models::investments::InvestmentDBResponse,
    types::{GoalId, InvestmentId, UserId},
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InvestmentCreate {
    /// Goal whose progress this investment counts towards
    #[schema(value_type = Option<String>, format = "uuid")]
    pub goal_id: Option<GoalId>,
    pub name: String,
    #[schema(value_type = String)]
    pub amount: Decimal,
    /// Free-text label used for diversification, e.g. "Stocks"
    pub category: String,
    /// Defaults to today (UTC)
    pub invested_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct InvestmentUpdate {
    /// Send `null` to detach from the goal, omit to keep it
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>, format = "uuid")]
    pub goal_id: Option<Option<GoalId>>,
    pub name: Option<String>,
    #[schema(value_type = Option<String>)]
    pub amount: Option<Decimal>,
    pub category: Option<String>,
    pub invested_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InvestmentResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: InvestmentId,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub goal_id: Option<GoalId>,
    pub name: String,
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub category: String,
    pub invested_on: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl From<InvestmentDBResponse> for InvestmentResponse {
    fn from(db: InvestmentDBResponse) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            goal_id: db.goal_id,
            name: db.name,
            amount: db.amount,
            category: db.category,
            invested_on: db.invested_on,
            created_at: db.created_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListInvestmentsQuery {
    #[param(value_type = Option<String>, format = "uuid")]
    pub goal_id: Option<GoalId>,
}
