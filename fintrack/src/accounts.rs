//! Account lifecycle shared by the admin API, the purchase webhook and startup.
//!
//! Accounts are never self-registered. They are provisioned with a temporary password that the
//! caller hands to the email service, and `first_login` stays set until the user picks their own
//! password.

use sqlx::{Connection, PgConnection};
use tracing::{info, instrument};

use crate::{
    api::models::users::{Role, UserStatus},
    auth::password,
    config::Config,
    db::{
        Database,
        errors::DbError,
        handlers::{Categories, Repository, Users},
        models::users::{UserCreateDBRequest, UserDBResponse, UserUpdateDBRequest},
    },
    errors::Error,
    types::{UserId, abbrev_uuid},
};

/// A user together with the plaintext temporary password just assigned to them.
#[derive(Debug)]
pub struct ProvisionedAccount {
    pub user: UserDBResponse,
    pub temporary_password: String,
}

/// Display name to use when none was supplied: the local part of the email.
pub fn fallback_name(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}

/// Create an active account with a temporary password and the default categories.
#[instrument(skip(conn, name, external_purchase_id), err)]
pub async fn provision_account(
    conn: &mut PgConnection,
    email: &str,
    name: &str,
    role: Role,
    external_purchase_id: Option<String>,
) -> Result<ProvisionedAccount, Error> {
    let temporary_password = password::generate_temporary_password();
    let password_hash = password::hash_password(temporary_password.clone()).await?;

    let mut tx = conn.begin().await.map_err(DbError::from)?;
    let user = Users::new(&mut tx)
        .create(&UserCreateDBRequest {
            role,
            external_purchase_id,
            ..UserCreateDBRequest::member(email, name, password_hash)
        })
        .await?;
    Categories::new(&mut tx).create_defaults(user.id).await?;
    tx.commit().await.map_err(DbError::from)?;

    info!(user_id = %abbrev_uuid(&user.id), "Account provisioned");
    Ok(ProvisionedAccount {
        user,
        temporary_password,
    })
}

async fn issue_temporary_password(
    conn: &mut PgConnection,
    user_id: UserId,
    status: Option<UserStatus>,
    external_purchase_id: Option<String>,
) -> Result<ProvisionedAccount, Error> {
    let temporary_password = password::generate_temporary_password();
    let password_hash = password::hash_password(temporary_password.clone()).await?;

    let user = Users::new(conn)
        .update(
            user_id,
            &UserUpdateDBRequest {
                status,
                password_hash: Some(password_hash),
                first_login: Some(true),
                external_purchase_id,
                ..Default::default()
            },
        )
        .await?;

    Ok(ProvisionedAccount {
        user,
        temporary_password,
    })
}

/// Issue a fresh temporary password, force a password change and set the account `active`.
#[instrument(skip(conn, user), fields(user_id = %abbrev_uuid(&user.id)), err)]
pub async fn reissue_access(
    conn: &mut PgConnection,
    user: &UserDBResponse,
    external_purchase_id: Option<String>,
) -> Result<ProvisionedAccount, Error> {
    issue_temporary_password(conn, user.id, Some(UserStatus::Active), external_purchase_id).await
}

/// Issue a fresh temporary password and force a password change. The account status is untouched.
#[instrument(skip(conn, user), fields(user_id = %abbrev_uuid(&user.id)), err)]
pub async fn reset_temporary_password(conn: &mut PgConnection, user: &UserDBResponse) -> Result<ProvisionedAccount, Error> {
    issue_temporary_password(conn, user.id, None, None).await
}

/// Make sure the configured admin exists and is an active admin.
///
/// When `admin_password` is configured it is (re)applied on every start.
#[instrument(skip_all, fields(admin_email = %config.admin_email), err)]
pub async fn seed_admin(db: &Database, config: &Config) -> Result<UserDBResponse, Error> {
    let password_hash = match &config.admin_password {
        Some(admin_password) => Some(password::hash_password(admin_password.clone()).await?),
        None => None,
    };

    let mut conn = db.acquire().await?;
    let mut users = Users::new(&mut conn);

    let admin = match users.get_user_by_email(&config.admin_email).await? {
        Some(existing) => {
            users
                .update(
                    existing.id,
                    &UserUpdateDBRequest {
                        role: Some(Role::Admin),
                        status: Some(UserStatus::Active),
                        first_login: password_hash.as_ref().map(|_| false),
                        password_hash,
                        ..Default::default()
                    },
                )
                .await?
        }
        None => {
            let created = users
                .create(&UserCreateDBRequest {
                    email: config.admin_email.clone(),
                    name: "Administrator".to_string(),
                    role: Role::Admin,
                    status: UserStatus::Active,
                    password_hash,
                    external_purchase_id: None,
                })
                .await?;
            Categories::new(&mut conn).create_defaults(created.id).await?;
            info!(user_id = %abbrev_uuid(&created.id), "Initial admin user created");
            created
        }
    };

    Ok(admin)
}
