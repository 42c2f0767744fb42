//! Database models for generated monthly analyses.

use crate::analysis::summary::MonthlySummary;
use crate::types::{AnalysisId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, types::Json};

#[derive(Debug, Clone)]
pub struct AnalysisCreateDBRequest {
    pub user_id: UserId,
    pub content: String,
    pub insights: MonthlySummary,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
}

#[derive(Debug, Clone, FromRow)]
pub struct AnalysisDBResponse {
    pub id: AnalysisId,
    pub user_id: UserId,
    pub content: String,
    pub insights: Json<MonthlySummary>,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub created_at: DateTime<Utc>,
}
