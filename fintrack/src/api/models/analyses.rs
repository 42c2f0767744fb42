//! API request/response models for monthly analyses.

use crate::{
    analysis::summary::MonthlySummary,
    db::models::analyses::AnalysisDBResponse,
    types::{AnalysisId, UserId},
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct AnalysisGenerate {
    /// Month to analyse as `YYYY-MM`. Defaults to the current UTC month.
    pub month: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnalysisResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: AnalysisId,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    /// Generated narrative
    pub content: String,
    /// The aggregated figures the narrative was written from
    pub insights: MonthlySummary,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl From<AnalysisDBResponse> for AnalysisResponse {
    fn from(db: AnalysisDBResponse) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            content: db.content,
            insights: db.insights.0,
            period_start: db.period_start,
            period_end: db.period_end,
            created_at: db.created_at,
        }
    }
}
