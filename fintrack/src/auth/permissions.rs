//! Role checks.
//!
//! Ownership of finance records is not checked here: repositories load by ID and handlers
//! compare the row's `user_id` with the caller, answering 404 on mismatch.

use crate::{api::models::users::CurrentUser, errors::Error};

pub fn require_admin(user: &CurrentUser) -> Result<(), Error> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(Error::Forbidden {
            message: "Administrator access required".to_string(),
        })
    }
}

/// Whether `owner` is the caller. Used to hide other users' rows behind 404s.
pub fn owns(user: &CurrentUser, owner: crate::types::UserId) -> bool {
    user.id == owner
}
