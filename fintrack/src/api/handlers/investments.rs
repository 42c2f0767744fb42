//! Investments. Attaching one to a goal counts its amount towards the goal's progress; the
//! repository keeps both in step inside one database transaction.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgConnection;

use crate::{
    AppState,
    api::{
        handlers::goals::owned_goal,
        models::{
            investments::{InvestmentCreate, InvestmentResponse, InvestmentUpdate, ListInvestmentsQuery},
            users::CurrentUser,
        },
    },
    auth::permissions::owns,
    db::{
        handlers::{Investments, Repository, investments::InvestmentFilter},
        models::investments::{InvestmentCreateDBRequest, InvestmentDBResponse, InvestmentUpdateDBRequest},
    },
    errors::{Error, Result},
    types::InvestmentId,
};

async fn owned_investment(conn: &mut PgConnection, user: &CurrentUser, id: InvestmentId) -> Result<InvestmentDBResponse> {
    Investments::new(conn)
        .get_by_id(id)
        .await?
        .filter(|investment| owns(user, investment.user_id))
        .ok_or_else(|| Error::not_found("Investment", id))
}

fn validate_amount(amount: Decimal) -> Result<()> {
    if amount < Decimal::ZERO {
        return Err(Error::BadRequest {
            message: "Amount cannot be negative".to_string(),
        });
    }
    Ok(())
}

fn validate_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::BadRequest {
            message: format!("Investment {field} cannot be empty"),
        });
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/investments",
    tag = "investments",
    summary = "List investments",
    params(ListInvestmentsQuery),
    responses(
        (status = 200, description = "The caller's investments, newest first", body = Vec<InvestmentResponse>),
        (status = 401, description = "Unauthorized"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_investments(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListInvestmentsQuery>,
) -> Result<Json<Vec<InvestmentResponse>>> {
    let mut conn = state.db.acquire().await?;
    let investments = Investments::new(&mut conn)
        .list(&InvestmentFilter {
            user_id: current_user.id,
            goal_id: query.goal_id,
        })
        .await?;

    Ok(Json(investments.into_iter().map(InvestmentResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/investments",
    tag = "investments",
    summary = "Create investment",
    request_body = InvestmentCreate,
    responses(
        (status = 201, description = "Investment created", body = InvestmentResponse),
        (status = 400, description = "Invalid amount, name or category"),
        (status = 404, description = "Goal not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_investment(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(create): Json<InvestmentCreate>,
) -> Result<(StatusCode, Json<InvestmentResponse>)> {
    validate_amount(create.amount)?;
    validate_text("name", &create.name)?;
    validate_text("category", &create.category)?;

    let mut conn = state.db.acquire().await?;
    if let Some(goal_id) = create.goal_id {
        owned_goal(&mut conn, &current_user, goal_id).await?;
    }

    let investment = Investments::new(&mut conn)
        .create(&InvestmentCreateDBRequest {
            user_id: current_user.id,
            goal_id: create.goal_id,
            name: create.name,
            amount: create.amount,
            category: create.category,
            invested_on: create.invested_on.unwrap_or_else(|| Utc::now().date_naive()),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(InvestmentResponse::from(investment))))
}

/// Update an investment. The old amount leaves the old goal and the new amount joins the new
/// one, which may be the same goal.
#[utoipa::path(
    patch,
    path = "/investments/{id}",
    tag = "investments",
    summary = "Update investment",
    request_body = InvestmentUpdate,
    params(("id" = uuid::Uuid, Path, description = "Investment ID")),
    responses(
        (status = 200, description = "Investment updated", body = InvestmentResponse),
        (status = 400, description = "Invalid amount, name or category"),
        (status = 404, description = "Investment or goal not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_investment(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<InvestmentId>,
    Json(update): Json<InvestmentUpdate>,
) -> Result<Json<InvestmentResponse>> {
    if let Some(amount) = update.amount {
        validate_amount(amount)?;
    }
    if let Some(name) = &update.name {
        validate_text("name", name)?;
    }
    if let Some(category) = &update.category {
        validate_text("category", category)?;
    }

    let mut conn = state.db.acquire().await?;
    owned_investment(&mut conn, &current_user, id).await?;
    if let Some(Some(goal_id)) = update.goal_id {
        owned_goal(&mut conn, &current_user, goal_id).await?;
    }

    let investment = Investments::new(&mut conn)
        .update(
            id,
            &InvestmentUpdateDBRequest {
                goal_id: update.goal_id,
                name: update.name,
                amount: update.amount,
                category: update.category,
                invested_on: update.invested_on,
            },
        )
        .await?;

    Ok(Json(InvestmentResponse::from(investment)))
}

/// Delete an investment, taking its amount back off its goal.
#[utoipa::path(
    delete,
    path = "/investments/{id}",
    tag = "investments",
    summary = "Delete investment",
    params(("id" = uuid::Uuid, Path, description = "Investment ID")),
    responses(
        (status = 204, description = "Investment deleted"),
        (status = 404, description = "Investment not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_investment(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<InvestmentId>,
) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await?;
    owned_investment(&mut conn, &current_user, id).await?;
    Investments::new(&mut conn).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
