use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;

use crate::{
    AppState,
    analysis::{generate_monthly_analysis, period::MonthPeriod},
    api::models::{
        analyses::{AnalysisGenerate, AnalysisResponse},
        pagination::{PaginatedResponse, Pagination},
        users::CurrentUser,
    },
    auth::permissions::owns,
    db::{handlers::Analyses, models::analyses::AnalysisDBResponse},
    errors::{Error, Result},
    types::AnalysisId,
};

async fn owned_analysis(state: &AppState, user: &CurrentUser, id: AnalysisId) -> Result<AnalysisDBResponse> {
    let mut conn = state.db.acquire().await?;
    Analyses::new(&mut conn)
        .get_by_id(id)
        .await?
        .filter(|analysis| owns(user, analysis.user_id))
        .ok_or_else(|| Error::not_found("Analysis", id))
}

#[utoipa::path(
    get,
    path = "/analyses",
    tag = "analyses",
    summary = "List analyses",
    params(Pagination),
    responses(
        (status = 200, description = "The caller's analyses, newest first", body = PaginatedResponse<AnalysisResponse>),
        (status = 401, description = "Unauthorized"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_analyses(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(pagination): Query<Pagination>,
) -> Result<Json<PaginatedResponse<AnalysisResponse>>> {
    let skip = pagination.skip();
    let limit = pagination.limit();

    let mut conn = state.db.acquire().await?;
    let mut repo = Analyses::new(&mut conn);
    let analyses = repo.list_for_user(current_user.id, skip, limit).await?;
    let total_count = repo.count_for_user(current_user.id).await?;

    Ok(Json(PaginatedResponse::new(
        analyses.into_iter().map(AnalysisResponse::from).collect(),
        total_count,
        skip,
        limit,
    )))
}

/// Generate the monthly analysis for the given month, or the current one.
///
/// At most one analysis can be generated per user per UTC day.
#[utoipa::path(
    post,
    path = "/analyses",
    tag = "analyses",
    summary = "Generate analysis",
    request_body = AnalysisGenerate,
    responses(
        (status = 201, description = "Analysis generated", body = AnalysisResponse),
        (status = 400, description = "Invalid month or no transactions in it"),
        (status = 409, description = "Already generated today"),
        (status = 502, description = "Text generation failed"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn generate_analysis(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<AnalysisGenerate>,
) -> Result<(StatusCode, Json<AnalysisResponse>)> {
    let period = match request.month.as_deref() {
        Some(month) => MonthPeriod::parse(month)?,
        None => MonthPeriod::current(),
    };

    let analysis = generate_monthly_analysis(
        &state.db,
        state.text_generator.as_ref(),
        &state.config.analysis,
        &current_user,
        period,
        Utc::now().date_naive(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(AnalysisResponse::from(analysis))))
}

#[utoipa::path(
    get,
    path = "/analyses/{id}",
    tag = "analyses",
    summary = "Get analysis",
    params(("id" = uuid::Uuid, Path, description = "Analysis ID")),
    responses(
        (status = 200, description = "The analysis", body = AnalysisResponse),
        (status = 404, description = "Analysis not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_analysis(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<AnalysisId>,
) -> Result<Json<AnalysisResponse>> {
    let analysis = owned_analysis(&state, &current_user, id).await?;
    Ok(Json(AnalysisResponse::from(analysis)))
}

#[utoipa::path(
    delete,
    path = "/analyses/{id}",
    tag = "analyses",
    summary = "Delete analysis",
    params(("id" = uuid::Uuid, Path, description = "Analysis ID")),
    responses(
        (status = 204, description = "Analysis deleted"),
        (status = 404, description = "Analysis not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_analysis(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<AnalysisId>,
) -> Result<StatusCode> {
    owned_analysis(&state, &current_user, id).await?;

    let mut conn = state.db.acquire().await?;
    Analyses::new(&mut conn).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        StubGenerator, auth_header, create_category, create_test_app, create_test_app_with_generator, create_test_user,
        insert_transaction,
    };
    use crate::types::EntryKind;
    use rust_decimal::Decimal;
    use serde_json::json;
    use sqlx::PgPool;
    use std::sync::Arc;

    #[sqlx::test]
    #[test_log::test]
    async fn test_generate_list_get_delete(pool: PgPool) {
        let generator = Arc::new(StubGenerator::replying("You spent less than you earned."));
        let (server, _state) = create_test_app_with_generator(pool.clone(), generator.clone()).await;
        let user = create_test_user(&pool, "analyst@example.com").await;
        {
            let mut conn = pool.acquire().await.unwrap();
            let salary = create_category(&mut conn, user.id, "Salary", EntryKind::Income).await;
            let food = create_category(&mut conn, user.id, "Food", EntryKind::Expense).await;
            insert_transaction(&mut conn, user.id, &salary, Decimal::from(500)).await;
            insert_transaction(&mut conn, user.id, &food, Decimal::from(200)).await;
        }
        let (name, value) = auth_header(&user);

        let response = server.post("/api/v1/analyses").add_header(&name, &value).json(&json!({})).await;
        response.assert_status(StatusCode::CREATED);
        let analysis: AnalysisResponse = response.json();
        assert_eq!(analysis.content, "You spent less than you earned.");
        assert_eq!(analysis.insights.balance, Decimal::from(300));
        assert_eq!(analysis.period_start, MonthPeriod::current().first_day());

        // Once per day
        server
            .post("/api/v1/analyses")
            .add_header(&name, &value)
            .json(&json!({}))
            .await
            .assert_status(StatusCode::CONFLICT);
        assert_eq!(generator.received().len(), 1);

        let response = server.get("/api/v1/analyses").add_header(&name, &value).await;
        response.assert_status_ok();
        let page: serde_json::Value = response.json();
        assert_eq!(page["total_count"], 1);

        let path = format!("/api/v1/analyses/{}", analysis.id);
        server.get(&path).add_header(&name, &value).await.assert_status_ok();
        server.delete(&path).add_header(&name, &value).await.assert_status(StatusCode::NO_CONTENT);
        server.get(&path).add_header(&name, &value).await.assert_status(StatusCode::NOT_FOUND);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_generation_rejections(pool: PgPool) {
        let (server, _state) = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, "empty@example.com").await;
        let (name, value) = auth_header(&user);

        server
            .post("/api/v1/analyses")
            .add_header(&name, &value)
            .json(&json!({"month": "2024-13"}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        // No transactions in that month
        server
            .post("/api/v1/analyses")
            .add_header(&name, &value)
            .json(&json!({"month": "2024-02"}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_upstream_failure_is_bad_gateway(pool: PgPool) {
        let (server, _state) = create_test_app_with_generator(pool.clone(), Arc::new(StubGenerator::failing())).await;
        let user = create_test_user(&pool, "upstream@example.com").await;
        {
            let mut conn = pool.acquire().await.unwrap();
            let food = create_category(&mut conn, user.id, "Food", EntryKind::Expense).await;
            insert_transaction(&mut conn, user.id, &food, Decimal::from(10)).await;
        }
        let (name, value) = auth_header(&user);

        server
            .post("/api/v1/analyses")
            .add_header(&name, &value)
            .json(&json!({}))
            .await
            .assert_status(StatusCode::BAD_GATEWAY);

        let response = server.get("/api/v1/analyses").add_header(&name, &value).await;
        let page: serde_json::Value = response.json();
        assert_eq!(page["total_count"], 0);
    }
}
