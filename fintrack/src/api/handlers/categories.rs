use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use sqlx::PgConnection;

use crate::{
    AppState,
    api::models::{
        categories::{CategoryCreate, CategoryDeleteResponse, CategoryResponse, CategoryUpdate, ListCategoriesQuery},
        users::CurrentUser,
    },
    auth::permissions::owns,
    db::{
        handlers::{Categories, Repository, categories::CategoryFilter},
        models::categories::{CategoryCreateDBRequest, CategoryDBResponse, CategoryUpdateDBRequest, SENTINEL_CATEGORY_NAME},
    },
    errors::{Error, Result},
    types::CategoryId,
};

/// Load a category owned by the caller. Other users' categories are reported as missing.
pub(crate) async fn owned_category(conn: &mut PgConnection, user: &CurrentUser, id: CategoryId) -> Result<CategoryDBResponse> {
    Categories::new(conn)
        .get_by_id(id)
        .await?
        .filter(|category| owns(user, category.user_id))
        .ok_or_else(|| Error::not_found("Category", id))
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::BadRequest {
            message: "Category name cannot be empty".to_string(),
        });
    }
    // The fallback category is only ever created by reassignment
    if name.trim().eq_ignore_ascii_case(SENTINEL_CATEGORY_NAME) {
        return Err(Error::BadRequest {
            message: format!("'{SENTINEL_CATEGORY_NAME}' is reserved for uncategorized transactions"),
        });
    }
    Ok(())
}

fn validate_color(color: Option<&str>) -> Result<()> {
    match color {
        Some(color) if !is_hex_color(color) => Err(Error::BadRequest {
            message: format!("Invalid color '{color}', expected #RRGGBB"),
        }),
        _ => Ok(()),
    }
}

fn is_hex_color(color: &str) -> bool {
    color
        .strip_prefix('#')
        .is_some_and(|hex| hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

#[utoipa::path(
    get,
    path = "/categories",
    tag = "categories",
    summary = "List categories",
    params(ListCategoriesQuery),
    responses(
        (status = 200, description = "The caller's categories", body = Vec<CategoryResponse>),
        (status = 401, description = "Unauthorized"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_categories(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListCategoriesQuery>,
) -> Result<Json<Vec<CategoryResponse>>> {
    let mut conn = state.db.acquire().await?;
    let categories = Categories::new(&mut conn)
        .list(&CategoryFilter::new(current_user.id).with_kind(query.kind))
        .await?;

    Ok(Json(categories.into_iter().map(CategoryResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/categories",
    tag = "categories",
    summary = "Create category",
    request_body = CategoryCreate,
    responses(
        (status = 201, description = "Category created", body = CategoryResponse),
        (status = 400, description = "Invalid name or color"),
        (status = 409, description = "A category with this name and kind exists"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_category(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(create): Json<CategoryCreate>,
) -> Result<(StatusCode, Json<CategoryResponse>)> {
    validate_name(&create.name)?;
    validate_color(create.color.as_deref())?;

    let mut conn = state.db.acquire().await?;
    let category = Categories::new(&mut conn)
        .create(&CategoryCreateDBRequest {
            user_id: current_user.id,
            name: create.name,
            kind: create.kind,
            color: create.color,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(CategoryResponse::from(category))))
}

#[utoipa::path(
    patch,
    path = "/categories/{id}",
    tag = "categories",
    summary = "Update category",
    request_body = CategoryUpdate,
    params(("id" = uuid::Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category updated", body = CategoryResponse),
        (status = 404, description = "Category not found"),
        (status = 409, description = "A category with this name and kind exists"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_category(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<CategoryId>,
    Json(update): Json<CategoryUpdate>,
) -> Result<Json<CategoryResponse>> {
    if let Some(name) = &update.name {
        validate_name(name)?;
    }
    validate_color(update.color.as_deref())?;

    let mut conn = state.db.acquire().await?;
    owned_category(&mut conn, &current_user, id).await?;

    let category = Categories::new(&mut conn)
        .update(
            id,
            &CategoryUpdateDBRequest {
                name: update.name,
                color: update.color,
            },
        )
        .await?;

    Ok(Json(CategoryResponse::from(category)))
}

/// Delete a category. Its transactions move to the `Unknown` category of the same kind.
#[utoipa::path(
    delete,
    path = "/categories/{id}",
    tag = "categories",
    summary = "Delete category",
    params(("id" = uuid::Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category deleted", body = CategoryDeleteResponse),
        (status = 403, description = "The fallback category still has transactions"),
        (status = 404, description = "Category not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_category(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<CategoryId>,
) -> Result<Json<CategoryDeleteResponse>> {
    let mut conn = state.db.acquire().await?;
    owned_category(&mut conn, &current_user, id).await?;

    let deletion = Categories::new(&mut conn).delete_reassigning(id).await?;
    Ok(Json(CategoryDeleteResponse::from(deletion)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{auth_header, create_category as insert_category, create_test_app, create_test_user, insert_transaction};
    use crate::types::EntryKind;
    use rust_decimal::Decimal;
    use serde_json::json;
    use sqlx::PgPool;

    #[test]
    fn test_hex_colors() {
        assert!(is_hex_color("#16a34A"));
        assert!(!is_hex_color("16a34a"));
        assert!(!is_hex_color("#16a34"));
        assert!(!is_hex_color("#16a34z"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_and_list(pool: PgPool) {
        let (server, _state) = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, "cats@example.com").await;
        let (name, value) = auth_header(&user);

        let response = server
            .post("/api/v1/categories")
            .add_header(&name, &value)
            .json(&json!({"name": "Travel", "kind": "expense", "color": "#0EA5E9"}))
            .await;
        response.assert_status(StatusCode::CREATED);
        let travel: CategoryResponse = response.json();
        assert_eq!(travel.kind, EntryKind::Expense);

        // Same name and kind is a conflict, another kind is fine
        server
            .post("/api/v1/categories")
            .add_header(&name, &value)
            .json(&json!({"name": "Travel", "kind": "expense"}))
            .await
            .assert_status(StatusCode::CONFLICT);
        server
            .post("/api/v1/categories")
            .add_header(&name, &value)
            .json(&json!({"name": "Travel", "kind": "income"}))
            .await
            .assert_status(StatusCode::CREATED);

        server
            .post("/api/v1/categories")
            .add_header(&name, &value)
            .json(&json!({"name": "Bad", "kind": "expense", "color": "red"}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        let response = server.get("/api/v1/categories?kind=income").add_header(&name, &value).await;
        response.assert_status_ok();
        let incomes: Vec<CategoryResponse> = response.json();
        assert_eq!(incomes.len(), 1);
        assert_eq!(incomes[0].name, "Travel");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_fallback_name_is_reserved(pool: PgPool) {
        let (server, _state) = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, "reserved@example.com").await;
        let category = {
            let mut conn = pool.acquire().await.unwrap();
            insert_category(&mut conn, user.id, "Hobbies", EntryKind::Expense).await
        };
        let (name, value) = auth_header(&user);

        for reserved in ["Unknown", " unknown "] {
            server
                .post("/api/v1/categories")
                .add_header(&name, &value)
                .json(&json!({"name": reserved, "kind": "expense"}))
                .await
                .assert_status(StatusCode::BAD_REQUEST);
        }

        server
            .patch(&format!("/api/v1/categories/{}", category.id))
            .add_header(&name, &value)
            .json(&json!({"name": "Unknown"}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        let response = server.get("/api/v1/categories").add_header(&name, &value).await;
        let categories: Vec<CategoryResponse> = response.json();
        assert!(categories.iter().all(|c| c.name != "Unknown"));
        assert!(categories.iter().any(|c| c.name == "Hobbies"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_other_users_categories_are_not_found(pool: PgPool) {
        let (server, _state) = create_test_app(pool.clone()).await;
        let owner = create_test_user(&pool, "owner@example.com").await;
        let intruder = create_test_user(&pool, "intruder@example.com").await;
        let category = {
            let mut conn = pool.acquire().await.unwrap();
            insert_category(&mut conn, owner.id, "Private", EntryKind::Expense).await
        };
        let (name, value) = auth_header(&intruder);

        server
            .patch(&format!("/api/v1/categories/{}", category.id))
            .add_header(&name, &value)
            .json(&json!({"name": "Mine now"}))
            .await
            .assert_status(StatusCode::NOT_FOUND);
        server
            .delete(&format!("/api/v1/categories/{}", category.id))
            .add_header(&name, &value)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_delete_reports_reassignment(pool: PgPool) {
        let (server, _state) = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, "reassign@example.com").await;
        let category = {
            let mut conn = pool.acquire().await.unwrap();
            let category = insert_category(&mut conn, user.id, "Gym", EntryKind::Expense).await;
            insert_transaction(&mut conn, user.id, &category, Decimal::from(30)).await;
            insert_transaction(&mut conn, user.id, &category, Decimal::from(30)).await;
            category
        };
        let (name, value) = auth_header(&user);

        let response = server
            .delete(&format!("/api/v1/categories/{}", category.id))
            .add_header(&name, &value)
            .await;
        response.assert_status_ok();
        let body: CategoryDeleteResponse = response.json();
        assert_eq!(body.reassigned_transactions, 2);
        let sentinel_id = body.sentinel_category_id.unwrap();

        // The fallback category cannot go while it holds transactions
        server
            .delete(&format!("/api/v1/categories/{sentinel_id}"))
            .add_header(&name, &value)
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }
}
