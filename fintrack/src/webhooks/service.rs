//! Applies purchase events to accounts.
//!
//! | event     | no account          | inactive account     | active account |
//! |-----------|---------------------|----------------------|----------------|
//! | approved  | create + welcome    | reactivate + welcome | unchanged      |
//! | refunded  | ignored             | cancel + email       | cancel + email |
//! | canceled  | ignored             | cancel + email       | cancel + email |
//!
//! Refunds and cancellations of an already canceled account change nothing.
//!
//! Email delivery failures never fail the webhook: the account change is already committed and
//! the platform would otherwise retry it.

use tracing::{info, instrument, warn};

use crate::{
    accounts::{self, ProvisionedAccount},
    api::models::{
        users::{Role, UserStatus},
        webhooks::{WebhookAck, WebhookAction},
    },
    db::{
        Database,
        errors::DbError,
        handlers::{Repository, Users},
        models::users::{UserDBResponse, UserUpdateDBRequest},
    },
    email::EmailService,
    errors::Error,
    types::abbrev_uuid,
    webhooks::payload::{EventKind, PurchaseEvent},
};

/// Apply a classified purchase event.
#[instrument(skip(db, email, event), fields(event = %event.event), err)]
pub async fn process_purchase_event(
    db: &Database,
    email: &EmailService,
    kind: EventKind,
    event: &PurchaseEvent,
) -> Result<WebhookAck, Error> {
    match kind {
        EventKind::Approved => approve(db, email, event).await,
        EventKind::Refunded | EventKind::Canceled => cancel(db, email, event).await,
        EventKind::Ignored => {
            info!("Ignoring unhandled purchase event");
            Ok(WebhookAck::new(WebhookAction::Ignored))
        }
    }
}

async fn approve(db: &Database, email: &EmailService, event: &PurchaseEvent) -> Result<WebhookAck, Error> {
    let mut conn = db.acquire().await?;
    let existing = Users::new(&mut conn).get_user_by_email(&event.email).await?;

    let (action, account) = match existing {
        Some(user) if user.status == UserStatus::Active => {
            info!(user_id = %abbrev_uuid(&user.id), "Purchase approved for an already active account");
            return Ok(WebhookAck::new(WebhookAction::Unchanged));
        }
        Some(user) => {
            let account = accounts::reissue_access(&mut conn, &user, event.purchase_id.clone()).await?;
            info!(user_id = %abbrev_uuid(&user.id), "Account reactivated by purchase");
            (WebhookAction::Reactivated, account)
        }
        None => {
            let name = event.name.clone().unwrap_or_else(|| accounts::fallback_name(&event.email));
            match accounts::provision_account(&mut conn, &event.email, &name, Role::User, event.purchase_id.clone()).await {
                Ok(account) => (WebhookAction::Created, account),
                // A concurrent delivery of the same purchase created it first
                Err(Error::Database(DbError::UniqueViolation { .. })) => {
                    info!("Account created by a concurrent webhook delivery");
                    return Ok(WebhookAck::new(WebhookAction::Unchanged));
                }
                Err(e) => return Err(e),
            }
        }
    };
    drop(conn);

    let email_sent = send_welcome(email, &account).await;
    Ok(WebhookAck::with_email(action, email_sent))
}

async fn cancel(db: &Database, email: &EmailService, event: &PurchaseEvent) -> Result<WebhookAck, Error> {
    let mut conn = db.acquire().await?;
    let mut users = Users::new(&mut conn);

    let Some(user) = users.get_user_by_email(&event.email).await? else {
        info!("Cancellation for an unknown account");
        return Ok(WebhookAck::new(WebhookAction::Ignored));
    };
    if user.status == UserStatus::Canceled {
        return Ok(WebhookAck::new(WebhookAction::Unchanged));
    }

    let user = users
        .update(
            user.id,
            &UserUpdateDBRequest {
                status: Some(UserStatus::Canceled),
                ..Default::default()
            },
        )
        .await?;
    drop(conn);
    info!(user_id = %abbrev_uuid(&user.id), "Account canceled by purchase event");

    let email_sent = send_cancellation(email, &user).await;
    Ok(WebhookAck::with_email(WebhookAction::Canceled, email_sent))
}

async fn send_welcome(email: &EmailService, account: &ProvisionedAccount) -> bool {
    let user = &account.user;
    match email
        .send_welcome_email(&user.email, &user.name, &account.temporary_password)
        .await
    {
        Ok(()) => true,
        Err(e) => {
            warn!(user_id = %abbrev_uuid(&user.id), error = %e, "Failed to send welcome email");
            false
        }
    }
}

async fn send_cancellation(email: &EmailService, user: &UserDBResponse) -> bool {
    match email.send_cancellation_email(&user.email, &user.name).await {
        Ok(()) => true,
        Err(e) => {
            warn!(user_id = %abbrev_uuid(&user.id), error = %e, "Failed to send cancellation email");
            false
        }
    }
}
