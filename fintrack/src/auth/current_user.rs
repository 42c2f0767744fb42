//! Request extractors for the authenticated caller.
//!
//! The session token is read from the session cookie or, failing that, an
//! `Authorization: Bearer <token>` header.
//!
//! - [`SessionUser`]: any valid token, whatever the account status
//! - [`CurrentUser`]: a valid token for an `active` account (403 otherwise)
//! - [`AdminUser`]: an active admin

use crate::{
    AppState,
    api::models::users::CurrentUser,
    auth::{permissions, session},
    config::Config,
    errors::{Error, Result},
};
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use tracing::{instrument, trace};

/// Holder of a valid session token, active or not.
#[derive(Debug, Clone)]
pub struct SessionUser(pub CurrentUser);

/// An active administrator.
#[derive(Debug, Clone)]
pub struct AdminUser(pub CurrentUser);

fn cookie_token<'a>(parts: &'a Parts, cookie_name: &str) -> Option<&'a str> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|cookie| cookie.trim().split_once('='))
        .find(|(name, value)| *name == cookie_name && !value.is_empty())
        .map(|(_, value)| value)
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Verify whichever session token the request carries.
#[instrument(skip_all)]
fn authenticate(parts: &Parts, config: &Config) -> Result<CurrentUser> {
    let token = cookie_token(parts, &config.auth.session.cookie_name)
        .or_else(|| bearer_token(parts))
        .ok_or(Error::Unauthenticated { message: None })?;

    let user = session::verify_session_token(token, config)?;
    trace!(user_id = %user.id, "Session token verified");
    Ok(user)
}

/// Reject accounts whose subscription is not active.
pub fn require_active(user: CurrentUser) -> Result<CurrentUser> {
    if user.is_active() {
        Ok(user)
    } else {
        Err(Error::Forbidden {
            message: "Your subscription is not active".to_string(),
        })
    }
}

impl FromRequestParts<AppState> for SessionUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        authenticate(parts, &state.config).map(SessionUser)
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        require_active(authenticate(parts, &state.config)?)
    }
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        permissions::require_admin(&user)?;
        Ok(AdminUser(user))
    }
}
