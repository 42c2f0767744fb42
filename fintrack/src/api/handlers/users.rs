use axum::{Json, extract::State};

use crate::{
    AppState,
    api::models::users::{CurrentUser, ProfileUpdate, UserResponse},
    db::{
        handlers::{Repository, Users},
        models::users::UserUpdateDBRequest,
    },
    errors::{Error, Result},
};

/// Get the authenticated user's profile
#[utoipa::path(
    get,
    path = "/users/current",
    tag = "users",
    summary = "Get current user",
    responses(
        (status = 200, description = "Current user profile", body = UserResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Subscription is not active"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_current_user(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<UserResponse>> {
    let mut conn = state.db.acquire().await?;
    let user = Users::new(&mut conn)
        .get_by_id(current_user.id)
        .await?
        .ok_or_else(|| Error::not_found("User", current_user.id))?;

    Ok(Json(UserResponse::from(user)))
}

/// Update the authenticated user's own profile
#[utoipa::path(
    patch,
    path = "/users/current",
    tag = "users",
    summary = "Update current user",
    request_body = ProfileUpdate,
    responses(
        (status = 200, description = "Updated profile", body = UserResponse),
        (status = 400, description = "Invalid name"),
        (status = 401, description = "Unauthorized"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_current_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<UserResponse>> {
    if update.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
        return Err(Error::BadRequest {
            message: "Name cannot be empty".to_string(),
        });
    }

    let mut conn = state.db.acquire().await?;
    let user = Users::new(&mut conn)
        .update(
            current_user.id,
            &UserUpdateDBRequest {
                name: update.name,
                ..Default::default()
            },
        )
        .await?;

    Ok(Json(UserResponse::from(user)))
}

/// Record that the user accepted the terms of use
#[utoipa::path(
    post,
    path = "/users/current/consent",
    tag = "users",
    summary = "Record consent",
    responses(
        (status = 200, description = "Consent recorded", body = UserResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn record_consent(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<UserResponse>> {
    let mut conn = state.db.acquire().await?;
    let user = Users::new(&mut conn).record_consent(current_user.id).await?;

    Ok(Json(UserResponse::from(user)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::users::UserStatus;
    use crate::test_utils::{auth_header, create_test_app, create_test_user, set_user_status};
    use axum::http::StatusCode;
    use serde_json::json;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_get_and_update_profile(pool: PgPool) {
        let (server, _state) = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, "me@example.com").await;
        let (name, value) = auth_header(&user);

        let response = server.get("/api/v1/users/current").add_header(&name, &value).await;
        response.assert_status_ok();
        let profile: UserResponse = response.json();
        assert_eq!(profile.email, "me@example.com");
        assert!(profile.consent_at.is_none());

        let response = server
            .patch("/api/v1/users/current")
            .add_header(&name, &value)
            .json(&json!({"name": "  Renamed  "}))
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<UserResponse>().name, "Renamed");

        let response = server
            .patch("/api/v1/users/current")
            .add_header(&name, &value)
            .json(&json!({"name": " "}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_record_consent(pool: PgPool) {
        let (server, _state) = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, "consent@example.com").await;
        let (name, value) = auth_header(&user);

        let response = server.post("/api/v1/users/current/consent").add_header(&name, &value).await;
        response.assert_status_ok();
        assert!(response.json::<UserResponse>().consent_at.is_some());
    }

    #[sqlx::test]
    async fn test_requires_authentication(pool: PgPool) {
        let (server, _state) = create_test_app(pool.clone()).await;
        server.get("/api/v1/users/current").await.assert_status(StatusCode::UNAUTHORIZED);

        // Claims issued before suspension still carry `active`; the extractor trusts the token,
        // so suspension takes effect at the next session refresh.
        let user = create_test_user(&pool, "later@example.com").await;
        set_user_status(&pool, user.id, UserStatus::Suspended).await;
        let mut suspended = user.clone();
        suspended.status = UserStatus::Suspended;
        let (name, value) = auth_header(&suspended);
        server
            .get("/api/v1/users/current")
            .add_header(&name, &value)
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }
}
