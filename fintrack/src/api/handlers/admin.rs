//! Account administration. Every handler requires an active admin.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::warn;

use crate::{
    AppState,
    accounts::{self, ProvisionedAccount},
    api::models::{
        pagination::PaginatedResponse,
        users::{AdminUserActionResponse, AdminUserCreate, AdminUserUpdate, ListUsersQuery, Role, UserResponse},
    },
    auth::current_user::AdminUser,
    db::{
        errors::DbError,
        handlers::{Repository, Users, users::UserFilter},
        models::users::UserUpdateDBRequest,
    },
    errors::{Error, Result},
    types::{UserId, abbrev_uuid},
};

#[utoipa::path(
    get,
    path = "/admin/users",
    tag = "admin",
    summary = "List users",
    params(ListUsersQuery),
    responses(
        (status = 200, description = "Page of users", body = PaginatedResponse<UserResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Administrator access required"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_users(
    State(state): State<AppState>,
    _: AdminUser,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<PaginatedResponse<UserResponse>>> {
    let skip = query.pagination.skip();
    let limit = query.pagination.limit();
    let filter = UserFilter::new(skip, limit).with_search(query.search);

    let mut conn = state.db.acquire().await?;
    let mut repo = Users::new(&mut conn);
    let users = repo.list(&filter).await?;
    let total_count = repo.count(&filter).await?;

    Ok(Json(PaginatedResponse::new(
        users.into_iter().map(UserResponse::from).collect(),
        total_count,
        skip,
        limit,
    )))
}

/// Create an account and email its temporary password.
///
/// The account is kept when the email cannot be sent; the response then carries a warning and
/// the admin can use the resend endpoint.
#[utoipa::path(
    post,
    path = "/admin/users",
    tag = "admin",
    summary = "Create user",
    request_body = AdminUserCreate,
    responses(
        (status = 201, description = "User created", body = AdminUserActionResponse),
        (status = 400, description = "Invalid email or name"),
        (status = 403, description = "Administrator access required"),
        (status = 409, description = "Email already in use"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_user(
    State(state): State<AppState>,
    _: AdminUser,
    Json(create): Json<AdminUserCreate>,
) -> Result<(StatusCode, Json<AdminUserActionResponse>)> {
    let email = create.email.trim();
    if !email.contains('@') {
        return Err(Error::BadRequest {
            message: "A valid email address is required".to_string(),
        });
    }
    let name = match create.name.trim() {
        "" => accounts::fallback_name(email),
        name => name.to_string(),
    };

    let mut conn = state.db.acquire().await?;
    let ProvisionedAccount {
        user,
        temporary_password,
    } = accounts::provision_account(&mut conn, email, &name, create.role.unwrap_or(Role::User), None).await?;
    drop(conn);

    let (email_sent, warning) = match state
        .email
        .send_welcome_email(&user.email, &user.name, &temporary_password)
        .await
    {
        Ok(()) => (true, None),
        Err(e) => {
            warn!(user_id = %abbrev_uuid(&user.id), error = %e, "Welcome email not sent");
            (
                false,
                Some("The account was created but the welcome email could not be sent".to_string()),
            )
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(AdminUserActionResponse {
            user: UserResponse::from(user),
            email_sent,
            warning,
        }),
    ))
}

#[utoipa::path(
    patch,
    path = "/admin/users/{id}",
    tag = "admin",
    summary = "Update user",
    request_body = AdminUserUpdate,
    params(("id" = uuid::Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 403, description = "Administrator access required"),
        (status = 404, description = "User not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_user(
    State(state): State<AppState>,
    _: AdminUser,
    Path(id): Path<UserId>,
    Json(update): Json<AdminUserUpdate>,
) -> Result<Json<UserResponse>> {
    if update.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
        return Err(Error::BadRequest {
            message: "Name cannot be empty".to_string(),
        });
    }

    let mut conn = state.db.acquire().await?;
    let user = Users::new(&mut conn)
        .update(id, &UserUpdateDBRequest::from(update))
        .await
        .map_err(|e| match e {
            DbError::NotFound => Error::not_found("User", id),
            e => e.into(),
        })?;

    Ok(Json(UserResponse::from(user)))
}

/// Delete an account and everything it owns.
#[utoipa::path(
    delete,
    path = "/admin/users/{id}",
    tag = "admin",
    summary = "Delete user",
    params(("id" = uuid::Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 400, description = "Admins cannot delete their own account"),
        (status = 403, description = "Administrator access required"),
        (status = 404, description = "User not found"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_user(State(state): State<AppState>, AdminUser(admin): AdminUser, Path(id): Path<UserId>) -> Result<StatusCode> {
    if admin.id == id {
        return Err(Error::BadRequest {
            message: "You cannot delete your own account".to_string(),
        });
    }

    let mut conn = state.db.acquire().await?;
    if Users::new(&mut conn).delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::not_found("User", id))
    }
}

/// Issue a new temporary password and send it. The account status is left as it is. Unlike
/// account creation, a failed email fails the request.
#[utoipa::path(
    post,
    path = "/admin/users/{id}/resend-welcome",
    tag = "admin",
    summary = "Resend welcome email",
    params(("id" = uuid::Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "New temporary password sent", body = AdminUserActionResponse),
        (status = 403, description = "Administrator access required"),
        (status = 404, description = "User not found"),
        (status = 500, description = "Email could not be sent"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn resend_welcome(
    State(state): State<AppState>,
    _: AdminUser,
    Path(id): Path<UserId>,
) -> Result<Json<AdminUserActionResponse>> {
    let mut conn = state.db.acquire().await?;
    let existing = Users::new(&mut conn)
        .get_by_id(id)
        .await?
        .ok_or_else(|| Error::not_found("User", id))?;

    let ProvisionedAccount {
        user,
        temporary_password,
    } = accounts::reset_temporary_password(&mut conn, &existing).await?;
    drop(conn);

    state
        .email
        .send_welcome_email(&user.email, &user.name, &temporary_password)
        .await?;

    Ok(Json(AdminUserActionResponse {
        user: UserResponse::from(user),
        email_sent: true,
        warning: None,
    }))
}
