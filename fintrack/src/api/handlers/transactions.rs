//! Income, expense and investment entries, plus their export.
//!
//! A transaction's kind must always match the kind of its category. Both are checked on create,
//! and on update after the patch is applied to the stored row.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgConnection;

use crate::{
    AppState,
    analysis::period::MonthPeriod,
    api::{
        handlers::categories::owned_category,
        models::{
            pagination::PaginatedResponse,
            transactions::{ExportQuery, ListTransactionsQuery, TransactionCreate, TransactionResponse, TransactionUpdate},
            users::CurrentUser,
        },
    },
    auth::permissions::owns,
    db::{
        handlers::{Repository, Transactions, transactions::TransactionFilter},
        models::{
            categories::CategoryDBResponse,
            transactions::{TransactionCreateDBRequest, TransactionDBResponse, TransactionUpdateDBRequest},
        },
    },
    errors::{Error, Result},
    export::ExportDocument,
    types::{EntryKind, TransactionId},
};

async fn owned_transaction(conn: &mut PgConnection, user: &CurrentUser, id: TransactionId) -> Result<TransactionDBResponse> {
    Transactions::new(conn)
        .get_by_id(id)
        .await?
        .filter(|transaction| owns(user, transaction.user_id))
        .ok_or_else(|| Error::not_found("Transaction", id))
}

fn validate_amount(amount: Decimal) -> Result<()> {
    if amount < Decimal::ZERO {
        return Err(Error::BadRequest {
            message: "Amount cannot be negative".to_string(),
        });
    }
    Ok(())
}

fn ensure_kind_matches(kind: EntryKind, category: &CategoryDBResponse) -> Result<()> {
    if category.kind != kind {
        return Err(Error::BadRequest {
            message: format!(
                "Category '{}' is for {} entries, not {}",
                category.name, category.kind, kind
            ),
        });
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/transactions",
    tag = "transactions",
    summary = "List transactions",
    params(ListTransactionsQuery),
    responses(
        (status = 200, description = "Page of transactions, newest first", body = PaginatedResponse<TransactionResponse>),
        (status = 400, description = "Invalid date range"),
        (status = 401, description = "Unauthorized"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_transactions(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListTransactionsQuery>,
) -> Result<Json<PaginatedResponse<TransactionResponse>>> {
    if matches!((query.from, query.to), (Some(from), Some(to)) if from > to) {
        return Err(Error::BadRequest {
            message: "`from` must not be after `to`".to_string(),
        });
    }

    let skip = query.pagination.skip();
    let limit = query.pagination.limit();
    let mut filter = TransactionFilter::new(current_user.id).between(query.from, query.to);
    filter.kind = query.kind;
    filter.category_id = query.category_id;

    let mut conn = state.db.acquire().await?;
    let mut repo = Transactions::new(&mut conn);
    let total_count = repo.count(&filter).await?;
    let transactions = repo.list(&filter.paginate(skip, limit)).await?;

    Ok(Json(PaginatedResponse::new(
        transactions.into_iter().map(TransactionResponse::from).collect(),
        total_count,
        skip,
        limit,
    )))
}

#[utoipa::path(
    post,
    path = "/transactions",
    tag = "transactions",
    summary = "Create transaction",
    request_body = TransactionCreate,
    responses(
        (status = 201, description = "Transaction created", body = TransactionResponse),
        (status = 400, description = "Negative amount or kind does not match category"),
        (status = 404, description = "Category not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_transaction(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(create): Json<TransactionCreate>,
) -> Result<(StatusCode, Json<TransactionResponse>)> {
    validate_amount(create.amount)?;

    let mut conn = state.db.acquire().await?;
    let category = owned_category(&mut conn, &current_user, create.category_id).await?;
    ensure_kind_matches(create.kind, &category)?;

    let transaction = Transactions::new(&mut conn)
        .create(&TransactionCreateDBRequest {
            user_id: current_user.id,
            category_id: category.id,
            kind: create.kind,
            amount: create.amount,
            description: create.description,
            occurred_on: create.occurred_on.unwrap_or_else(|| Utc::now().date_naive()),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(TransactionResponse::from(transaction))))
}

#[utoipa::path(
    get,
    path = "/transactions/{id}",
    tag = "transactions",
    summary = "Get transaction",
    params(("id" = uuid::Uuid, Path, description = "Transaction ID")),
    responses(
        (status = 200, description = "The transaction", body = TransactionResponse),
        (status = 404, description = "Transaction not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_transaction(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<TransactionId>,
) -> Result<Json<TransactionResponse>> {
    let mut conn = state.db.acquire().await?;
    let transaction = owned_transaction(&mut conn, &current_user, id).await?;
    Ok(Json(TransactionResponse::from(transaction)))
}

#[utoipa::path(
    patch,
    path = "/transactions/{id}",
    tag = "transactions",
    summary = "Update transaction",
    request_body = TransactionUpdate,
    params(("id" = uuid::Uuid, Path, description = "Transaction ID")),
    responses(
        (status = 200, description = "Transaction updated", body = TransactionResponse),
        (status = 400, description = "Negative amount or kind does not match category"),
        (status = 404, description = "Transaction or category not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_transaction(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<TransactionId>,
    Json(update): Json<TransactionUpdate>,
) -> Result<Json<TransactionResponse>> {
    if let Some(amount) = update.amount {
        validate_amount(amount)?;
    }

    let mut conn = state.db.acquire().await?;
    let existing = owned_transaction(&mut conn, &current_user, id).await?;

    let kind = update.kind.unwrap_or(existing.kind);
    let category_id = update.category_id.unwrap_or(existing.category_id);
    let category = owned_category(&mut conn, &current_user, category_id).await?;
    ensure_kind_matches(kind, &category)?;

    let transaction = Transactions::new(&mut conn)
        .update(
            id,
            &TransactionUpdateDBRequest {
                category_id: update.category_id,
                kind: update.kind,
                amount: update.amount,
                description: update.description,
                occurred_on: update.occurred_on,
            },
        )
        .await?;

    Ok(Json(TransactionResponse::from(transaction)))
}

#[utoipa::path(
    delete,
    path = "/transactions/{id}",
    tag = "transactions",
    summary = "Delete transaction",
    params(("id" = uuid::Uuid, Path, description = "Transaction ID")),
    responses(
        (status = 204, description = "Transaction deleted"),
        (status = 404, description = "Transaction not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_transaction(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<TransactionId>,
) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await?;
    owned_transaction(&mut conn, &current_user, id).await?;
    Transactions::new(&mut conn).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Download the caller's transactions in a date range as a spreadsheet or PDF.
///
/// Without bounds, the current UTC month is exported.
#[utoipa::path(
    get,
    path = "/transactions/export",
    tag = "transactions",
    summary = "Export transactions",
    params(ExportQuery),
    responses(
        (status = 200, description = "Export attachment, an XLSX workbook or a PDF depending on `format`", body = Vec<u8>, content_type = "application/octet-stream"),
        (status = 400, description = "Invalid date range"),
        (status = 401, description = "Unauthorized"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn export_transactions(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ExportQuery>,
) -> Result<Response> {
    let month = MonthPeriod::current();
    let from = query.from.unwrap_or_else(|| month.first_day());
    let to = query.to.unwrap_or_else(|| month.last_day());
    if from > to {
        return Err(Error::BadRequest {
            message: "`from` must not be after `to`".to_string(),
        });
    }

    let transactions = {
        let mut conn = state.db.acquire().await?;
        Transactions::new(&mut conn)
            .list(&TransactionFilter::new(current_user.id).between(Some(from), Some(to)))
            .await?
    };

    let format = query.format;
    let document = ExportDocument::new(from, to, &transactions);
    let filename = document.filename(format);
    let bytes = tokio::task::spawn_blocking(move || document.render(format))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn export rendering task: {e}"),
        })??;

    tracing::info!(rows = transactions.len(), format = format.extension(), "Transactions exported");

    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
        ],
        bytes,
    )
        .into_response())
}
