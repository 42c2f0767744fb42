use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};

use crate::{
    AppState,
    api::models::{
        auth::{
            AuthResponse, AuthSuccessResponse, ChangePasswordRequest, LoginRequest, LoginResponse, LogoutResponse, with_cookie,
        },
        users::CurrentUser,
    },
    auth::{
        current_user::{SessionUser, require_active},
        password, session,
    },
    db::{
        handlers::{Repository, Users},
        models::users::UserUpdateDBRequest,
    },
    errors::{Error, Result},
    types::UserId,
};

fn invalid_credentials() -> Error {
    Error::Unauthenticated {
        message: Some("Invalid email or password".to_string()),
    }
}

/// The caller's claims plus a fresh session cookie carrying them.
fn session_response(user: CurrentUser, message: &str, state: &AppState) -> Result<LoginResponse> {
    let token = session::create_session_token(&user, &state.config)?;

    Ok(LoginResponse {
        auth_response: AuthResponse {
            user,
            message: message.to_string(),
        },
        cookie: session::create_session_cookie(&token, &state.config),
    })
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/authentication/login",
    request_body = LoginRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Subscription is not active"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Result<LoginResponse> {
    let mut conn = state.db.acquire().await?;
    let user = Users::new(&mut conn)
        .get_user_by_email(&request.email)
        .await?
        .ok_or_else(invalid_credentials)?;
    drop(conn);

    let hash = user.password_hash.clone().ok_or_else(invalid_credentials)?;
    if !password::verify_password(request.password, hash).await? {
        return Err(invalid_credentials());
    }

    let user = require_active(CurrentUser::from(user))?;
    session_response(user, "Login successful", &state)
}

/// Logout (clear session)
#[utoipa::path(
    post,
    path = "/authentication/logout",
    tag = "authentication",
    responses(
        (status = 200, description = "Logout successful", body = AuthSuccessResponse),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn logout(State(state): State<AppState>) -> Result<LogoutResponse> {
    Ok(LogoutResponse {
        auth_response: AuthSuccessResponse {
            message: "Logout successful".to_string(),
        },
        cookie: session::clear_session_cookie(&state.config),
    })
}

/// Refresh the session from the database.
///
/// Role, status and first-login state are re-read rather than trusted from the token, and the
/// cookie is reissued with the fresh values. An account that is no longer active gets its
/// cookie cleared and a 403.
#[utoipa::path(
    get,
    path = "/authentication/session",
    tag = "authentication",
    responses(
        (status = 200, description = "Session refreshed", body = AuthResponse),
        (status = 401, description = "Not authenticated or account removed"),
        (status = 403, description = "Subscription is not active"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_session(State(state): State<AppState>, SessionUser(claims): SessionUser) -> Response {
    match refresh_session(&state, claims.id).await {
        Ok(response) => response.into_response(),
        Err(e) => with_cookie(e.into_response(), &session::clear_session_cookie(&state.config)),
    }
}

async fn refresh_session(state: &AppState, user_id: UserId) -> Result<LoginResponse> {
    let mut conn = state.db.acquire().await?;
    let fresh = session::refresh_session_claims(&mut conn, user_id).await?;
    session_response(require_active(fresh)?, "Session refreshed", state)
}

/// Change password for the authenticated user. Clears the first-login flag.
#[utoipa::path(
    post,
    path = "/authentication/password-change",
    request_body = ChangePasswordRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Password changed successfully", body = AuthResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Current password is incorrect"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn change_password(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<LoginResponse> {
    password::validate_password(&request.new_password, &state.config.auth.password)?;
    if request.new_password == request.current_password {
        return Err(Error::BadRequest {
            message: "New password must be different from the current password".to_string(),
        });
    }

    let mut conn = state.db.acquire().await?;
    let user = Users::new(&mut conn)
        .get_by_id(current_user.id)
        .await?
        .ok_or(Error::Unauthenticated {
            message: Some("User not found".to_string()),
        })?;

    let hash = user.password_hash.clone().ok_or_else(|| Error::BadRequest {
        message: "Account has no password set".to_string(),
    })?;
    if !password::verify_password(request.current_password, hash).await? {
        return Err(Error::Unauthenticated {
            message: Some("Current password is incorrect".to_string()),
        });
    }

    let new_hash = password::hash_password(request.new_password).await?;
    let updated = Users::new(&mut conn)
        .update(
            user.id,
            &UserUpdateDBRequest {
                password_hash: Some(new_hash),
                first_login: Some(false),
                ..Default::default()
            },
        )
        .await?;

    // Reissue so the token no longer carries first_login
    session_response(CurrentUser::from(updated), "Password changed successfully", &state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::users::UserStatus;
    use crate::test_utils::{TEST_PASSWORD as PASSWORD, auth_header, create_test_app, create_test_user, set_user_status};
    use axum::http::StatusCode;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_login_sets_cookie(pool: PgPool) {
        let (server, _state) = create_test_app(pool.clone()).await;
        create_test_user(&pool, "login@example.com").await;

        let response = server
            .post("/authentication/login")
            .json(&LoginRequest {
                email: "LOGIN@example.com".to_string(),
                password: PASSWORD.to_string(),
            })
            .await;

        response.assert_status_ok();
        let cookie = response.headers().get("set-cookie").unwrap().to_str().unwrap().to_string();
        assert!(cookie.starts_with("fintrack_session="));
        assert!(cookie.contains("HttpOnly"));

        let body: AuthResponse = response.json();
        assert_eq!(body.user.email, "login@example.com");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_login_rejects_bad_credentials(pool: PgPool) {
        let (server, _state) = create_test_app(pool.clone()).await;
        create_test_user(&pool, "login@example.com").await;

        for (email, password) in [("login@example.com", "wrong-password"), ("nobody@example.com", PASSWORD)] {
            let response = server
                .post("/authentication/login")
                .json(&LoginRequest {
                    email: email.to_string(),
                    password: password.to_string(),
                })
                .await;
            response.assert_status(StatusCode::UNAUTHORIZED);
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_login_rejects_canceled_account(pool: PgPool) {
        let (server, _state) = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, "gone@example.com").await;
        set_user_status(&pool, user.id, UserStatus::Canceled).await;

        let response = server
            .post("/authentication/login")
            .json(&LoginRequest {
                email: "gone@example.com".to_string(),
                password: PASSWORD.to_string(),
            })
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
        assert!(response.headers().get("set-cookie").is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_session_refresh_reads_database(pool: PgPool) {
        let (server, _state) = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, "session@example.com").await;
        let (name, value) = auth_header(&user);

        let response = server.get("/authentication/session").add_header(&name, &value).await;
        response.assert_status_ok();
        assert!(response.headers().get("set-cookie").unwrap().to_str().unwrap().contains("Max-Age=86400"));

        // The token still says active, the database does not
        set_user_status(&pool, user.id, UserStatus::Suspended).await;
        let response = server.get("/authentication/session").add_header(&name, &value).await;
        response.assert_status(StatusCode::FORBIDDEN);
        assert!(response.headers().get("set-cookie").unwrap().to_str().unwrap().contains("Max-Age=0"));

        sqlx::query("DELETE FROM users WHERE id = $1").bind(user.id).execute(&pool).await.unwrap();
        let response = server.get("/authentication/session").add_header(&name, &value).await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_change_password_clears_first_login(pool: PgPool) {
        let (server, _state) = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, "first@example.com").await;
        let (name, value) = auth_header(&user);

        let response = server
            .post("/authentication/password-change")
            .add_header(&name, &value)
            .json(&ChangePasswordRequest {
                current_password: "not-it".to_string(),
                new_password: "a-new-password".to_string(),
            })
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);

        let response = server
            .post("/authentication/password-change")
            .add_header(&name, &value)
            .json(&ChangePasswordRequest {
                current_password: PASSWORD.to_string(),
                new_password: "short".to_string(),
            })
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let response = server
            .post("/authentication/password-change")
            .add_header(&name, &value)
            .json(&ChangePasswordRequest {
                current_password: PASSWORD.to_string(),
                new_password: "a-new-password".to_string(),
            })
            .await;
        response.assert_status_ok();
        let body: AuthResponse = response.json();
        assert!(!body.user.first_login);

        let response = server
            .post("/authentication/login")
            .json(&LoginRequest {
                email: "first@example.com".to_string(),
                password: "a-new-password".to_string(),
            })
            .await;
        response.assert_status_ok();
    }

    #[sqlx::test]
    async fn test_logout_expires_cookie(pool: PgPool) {
        let (server, _state) = create_test_app(pool).await;
        let response = server.post("/authentication/logout").await;
        response.assert_status_ok();
        assert!(response.headers().get("set-cookie").unwrap().to_str().unwrap().contains("Max-Age=0"));
    }
}
