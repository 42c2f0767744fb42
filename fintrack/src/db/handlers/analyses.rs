//! Database repository for stored monthly analyses.
//!
//! Analyses are immutable once generated, so this repository exposes only the operations the
//! API needs instead of implementing the full [`Repository`](super::Repository) trait.

use crate::types::{AnalysisId, UserId, abbrev_uuid};
use crate::db::{
    errors::Result,
    models::analyses::{AnalysisCreateDBRequest, AnalysisDBResponse},
};
use chrono::NaiveDate;
use sqlx::{PgConnection, types::Json};
use tracing::instrument;
use uuid::Uuid;

pub struct Analyses<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Analyses<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&request.user_id)), err)]
    pub async fn create(&mut self, request: &AnalysisCreateDBRequest) -> Result<AnalysisDBResponse> {
        let analysis = sqlx::query_as::<_, AnalysisDBResponse>(
            r#"
            INSERT INTO ai_analyses (id, user_id, content, insights, period_start, period_end)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.user_id)
        .bind(&request.content)
        .bind(Json(&request.insights))
        .bind(request.period_start)
        .bind(request.period_end)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(analysis)
    }

    #[instrument(skip(self), fields(analysis_id = %abbrev_uuid(&id)), err)]
    pub async fn get_by_id(&mut self, id: AnalysisId) -> Result<Option<AnalysisDBResponse>> {
        let analysis = sqlx::query_as::<_, AnalysisDBResponse>("SELECT * FROM ai_analyses WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(analysis)
    }

    /// Newest first
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn list_for_user(&mut self, user_id: UserId, skip: i64, limit: i64) -> Result<Vec<AnalysisDBResponse>> {
        let analyses = sqlx::query_as::<_, AnalysisDBResponse>(
            "SELECT * FROM ai_analyses WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(limit)
        .bind(skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(analyses)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn count_for_user(&mut self, user_id: UserId) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ai_analyses WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(count)
    }

    /// Whether the user already generated an analysis on the given UTC calendar day.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id), day = %day), err)]
    pub async fn exists_created_on(&mut self, user_id: UserId, day: NaiveDate) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM ai_analyses WHERE user_id = $1 AND (created_at AT TIME ZONE 'UTC')::date = $2)",
        )
        .bind(user_id)
        .bind(day)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(exists)
    }

    /// Serialize analysis creation per user until the surrounding transaction ends.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn lock_user(&mut self, user_id: UserId) -> Result<()> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0))")
            .bind(user_id.to_string())
            .execute(&mut *self.db)
            .await?;

        Ok(())
    }

    #[instrument(skip(self), fields(analysis_id = %abbrev_uuid(&id)), err)]
    pub async fn delete(&mut self, id: AnalysisId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM ai_analyses WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
