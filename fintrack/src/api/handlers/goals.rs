use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use sqlx::PgConnection;

use crate::{
    AppState,
    api::models::{
        goals::{GoalCreate, GoalResponse, GoalUpdate},
        users::CurrentUser,
    },
    auth::permissions::owns,
    db::{
        handlers::{Goals, Repository, goals::GoalFilter},
        models::goals::{GoalCreateDBRequest, GoalDBResponse, GoalUpdateDBRequest},
    },
    errors::{Error, Result},
    types::GoalId,
};

pub(crate) async fn owned_goal(conn: &mut PgConnection, user: &CurrentUser, id: GoalId) -> Result<GoalDBResponse> {
    Goals::new(conn)
        .get_by_id(id)
        .await?
        .filter(|goal| owns(user, goal.user_id))
        .ok_or_else(|| Error::not_found("Goal", id))
}

fn validate_target(target_amount: Decimal) -> Result<()> {
    if target_amount <= Decimal::ZERO {
        return Err(Error::BadRequest {
            message: "Target amount must be greater than zero".to_string(),
        });
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::BadRequest {
            message: "Goal name cannot be empty".to_string(),
        });
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/goals",
    tag = "goals",
    summary = "List goals",
    responses(
        (status = 200, description = "The caller's goals", body = Vec<GoalResponse>),
        (status = 401, description = "Unauthorized"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_goals(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<Vec<GoalResponse>>> {
    let mut conn = state.db.acquire().await?;
    let goals = Goals::new(&mut conn).list(&GoalFilter::new(current_user.id)).await?;
    Ok(Json(goals.into_iter().map(GoalResponse::from).collect()))
}

/// Create a goal. Progress starts at zero and only moves with investments.
#[utoipa::path(
    post,
    path = "/goals",
    tag = "goals",
    summary = "Create goal",
    request_body = GoalCreate,
    responses(
        (status = 201, description = "Goal created", body = GoalResponse),
        (status = 400, description = "Invalid name or target amount"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_goal(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(create): Json<GoalCreate>,
) -> Result<(StatusCode, Json<GoalResponse>)> {
    validate_name(&create.name)?;
    validate_target(create.target_amount)?;

    let mut conn = state.db.acquire().await?;
    let goal = Goals::new(&mut conn)
        .create(&GoalCreateDBRequest {
            user_id: current_user.id,
            name: create.name,
            target_amount: create.target_amount,
            deadline: create.deadline,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(GoalResponse::from(goal))))
}

#[utoipa::path(
    get,
    path = "/goals/{id}",
    tag = "goals",
    summary = "Get goal",
    params(("id" = uuid::Uuid, Path, description = "Goal ID")),
    responses(
        (status = 200, description = "The goal", body = GoalResponse),
        (status = 404, description = "Goal not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_goal(State(state): State<AppState>, current_user: CurrentUser, Path(id): Path<GoalId>) -> Result<Json<GoalResponse>> {
    let mut conn = state.db.acquire().await?;
    let goal = owned_goal(&mut conn, &current_user, id).await?;
    Ok(Json(GoalResponse::from(goal)))
}

#[utoipa::path(
    patch,
    path = "/goals/{id}",
    tag = "goals",
    summary = "Update goal",
    request_body = GoalUpdate,
    params(("id" = uuid::Uuid, Path, description = "Goal ID")),
    responses(
        (status = 200, description = "Goal updated", body = GoalResponse),
        (status = 400, description = "Invalid name or target amount"),
        (status = 404, description = "Goal not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_goal(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<GoalId>,
    Json(update): Json<GoalUpdate>,
) -> Result<Json<GoalResponse>> {
    if let Some(name) = &update.name {
        validate_name(name)?;
    }
    if let Some(target_amount) = update.target_amount {
        validate_target(target_amount)?;
    }

    let mut conn = state.db.acquire().await?;
    owned_goal(&mut conn, &current_user, id).await?;

    let goal = Goals::new(&mut conn)
        .update(
            id,
            &GoalUpdateDBRequest {
                name: update.name,
                target_amount: update.target_amount,
                deadline: update.deadline,
            },
        )
        .await?;

    Ok(Json(GoalResponse::from(goal)))
}

/// Delete a goal. Its investments are kept and detached.
#[utoipa::path(
    delete,
    path = "/goals/{id}",
    tag = "goals",
    summary = "Delete goal",
    params(("id" = uuid::Uuid, Path, description = "Goal ID")),
    responses(
        (status = 204, description = "Goal deleted"),
        (status = 404, description = "Goal not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_goal(State(state): State<AppState>, current_user: CurrentUser, Path(id): Path<GoalId>) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await?;
    owned_goal(&mut conn, &current_user, id).await?;
    Goals::new(&mut conn).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
