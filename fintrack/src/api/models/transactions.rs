//! API request/response models for income, expense and investment entries.

use super::pagination::Pagination;
use crate::{
    db::models::transactions::TransactionDBResponse,
    export::ExportFormat,
    types::{CategoryId, EntryKind, TransactionId, UserId},
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransactionCreate {
    #[schema(value_type = String, format = "uuid")]
    pub category_id: CategoryId,
    /// Must match the kind of the category
    pub kind: EntryKind,
    /// Non-negative amount (sent as string to preserve precision)
    #[schema(value_type = String)]
    pub amount: Decimal,
    #[serde(default)]
    pub description: String,
    /// Defaults to today (UTC)
    pub occurred_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct TransactionUpdate {
    #[schema(value_type = Option<String>, format = "uuid")]
    pub category_id: Option<CategoryId>,
    pub kind: Option<EntryKind>,
    #[schema(value_type = Option<String>)]
    pub amount: Option<Decimal>,
    pub description: Option<String>,
    pub occurred_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransactionResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: TransactionId,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    #[schema(value_type = String, format = "uuid")]
    pub category_id: CategoryId,
    pub category_name: String,
    pub kind: EntryKind,
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub description: String,
    pub occurred_on: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TransactionDBResponse> for TransactionResponse {
    fn from(db: TransactionDBResponse) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            category_id: db.category_id,
            category_name: db.category_name,
            kind: db.kind,
            amount: db.amount,
            description: db.description,
            occurred_on: db.occurred_on,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListTransactionsQuery {
    /// Inclusive start date
    pub from: Option<NaiveDate>,
    /// Inclusive end date
    pub to: Option<NaiveDate>,
    pub kind: Option<EntryKind>,
    #[param(value_type = Option<String>, format = "uuid")]
    pub category_id: Option<CategoryId>,

    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExportQuery {
    /// `xlsx` (default) or `pdf`
    #[serde(default)]
    #[param(value_type = Option<String>)]
    pub format: ExportFormat,
    /// Inclusive start date, defaults to the first day of the current month
    pub from: Option<NaiveDate>,
    /// Inclusive end date, defaults to the last day of the current month
    pub to: Option<NaiveDate>,
}
