//! API request/response models for savings goals.

use crate::{
    db::models::goals::GoalDBResponse,
    types::{GoalId, UserId},
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GoalCreate {
    pub name: String,
    /// Must be greater than zero
    #[schema(value_type = String)]
    pub target_amount: Decimal,
    pub deadline: Option<NaiveDate>,
}

/// Progress cannot be edited; it follows the investments attached to the goal.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct GoalUpdate {
    pub name: Option<String>,
    #[schema(value_type = Option<String>)]
    pub target_amount: Option<Decimal>,
    /// Send `null` to clear the deadline, omit to keep it
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<NaiveDate>)]
    pub deadline: Option<Option<NaiveDate>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GoalResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: GoalId,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    pub name: String,
    #[schema(value_type = String)]
    pub target_amount: Decimal,
    #[schema(value_type = String)]
    pub progress: Decimal,
    /// `progress / target_amount * 100`, rounded to 2 decimals
    #[schema(value_type = String)]
    pub progress_percent: Decimal,
    pub deadline: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Percentage of `part` in `whole`, rounded to 2 decimals. Zero when `whole` is zero.
pub fn percent(part: Decimal, whole: Decimal) -> Decimal {
    (part * Decimal::ONE_HUNDRED)
        .checked_div(whole)
        .unwrap_or(Decimal::ZERO)
        .round_dp(2)
}

impl From<GoalDBResponse> for GoalResponse {
    fn from(db: GoalDBResponse) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            name: db.name,
            progress_percent: percent(db.progress, db.target_amount),
            target_amount: db.target_amount,
            progress: db.progress,
            deadline: db.deadline,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent() {
        assert_eq!(percent(Decimal::from(250), Decimal::from(1000)), Decimal::from(25));
        assert_eq!(percent(Decimal::from(1), Decimal::from(3)), Decimal::new(3333, 2));
        assert_eq!(percent(Decimal::from(5), Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_update_distinguishes_null_from_missing() {
        let update: GoalUpdate = serde_json::from_str(r#"{"name": "Trip"}"#).unwrap();
        assert_eq!(update.deadline, None);

        let update: GoalUpdate = serde_json::from_str(r#"{"deadline": null}"#).unwrap();
        assert_eq!(update.deadline, Some(None));

        let update: GoalUpdate = serde_json::from_str(r#"{"deadline": "2026-01-31"}"#).unwrap();
        assert_eq!(update.deadline, Some(NaiveDate::from_ymd_opt(2026, 1, 31)));
    }
}
