//! Test utilities shared by the unit and integration tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum_test::TestServer;
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use crate::{
    AppState,
    analysis::llm::TextGenerator,
    api::models::users::{CurrentUser, Role, UserStatus},
    auth::{
        password::{Argon2Params, hash_string_with_params},
        session,
    },
    config::{Config, EmailConfig, EmailTransportConfig, RetryConfig},
    db::{
        Database,
        handlers::{Categories, Repository, Transactions, Users},
        models::{
            categories::{CategoryCreateDBRequest, CategoryDBResponse},
            transactions::{TransactionCreateDBRequest, TransactionDBResponse},
            users::{UserCreateDBRequest, UserDBResponse, UserUpdateDBRequest},
        },
    },
    email::EmailService,
    retry::RetryPolicy,
    types::{EntryKind, UserId},
};

/// Password given to every user made by [`create_test_user`] and [`create_test_admin`].
pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// Cheap hashing so tests don't spend their time in Argon2.
const TEST_ARGON2: Argon2Params = Argon2Params {
    memory_kib: 64,
    iterations: 1,
    parallelism: 1,
};

pub fn create_test_config() -> Config {
    // Use temp directory for test emails
    let temp_dir = std::env::temp_dir().join(format!("fintrack-test-emails-{}", std::process::id()));

    let mut config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        admin_email: "admin@test.com".to_string(),
        secret_key: Some("test-secret-key-for-testing-only".to_string()),
        email: EmailConfig {
            transport: EmailTransportConfig::File {
                path: temp_dir.to_string_lossy().to_string(),
            },
            ..Default::default()
        },
        retry: RetryConfig {
            max_attempts: 2,
            backoff: Duration::from_millis(1),
        },
        ..Default::default()
    };
    config.auth.session.cookie_secure = false;
    config.auth.session.timeout = Duration::from_secs(24 * 60 * 60);
    config.auth.session.cookie_name = "fintrack_session".to_string();
    config
}

/// Canned [`TextGenerator`] that records every user message it receives.
pub struct StubGenerator {
    reply: Option<String>,
    received: Mutex<Vec<String>>,
}

impl StubGenerator {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            received: Mutex::new(Vec::new()),
        }
    }

    /// A generator whose every call fails, as an unreachable upstream would.
    pub fn failing() -> Self {
        Self {
            reply: None,
            received: Mutex::new(Vec::new()),
        }
    }

    pub fn received(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for StubGenerator {
    async fn generate(&self, _system: &str, user: &str) -> anyhow::Result<String> {
        self.received.lock().unwrap().push(user.to_string());
        self.reply.clone().ok_or_else(|| anyhow::anyhow!("upstream unavailable"))
    }
}

fn build_state(pool: PgPool, config: Config, generator: Arc<dyn TextGenerator>) -> AppState {
    let email = EmailService::new(&config, RetryPolicy::none()).expect("Failed to create email service");

    AppState::builder()
        .db(Database::new(pool, RetryPolicy::none()))
        .config(config)
        .email(Arc::new(email))
        .text_generator(generator)
        .build()
}

pub fn create_test_state(pool: PgPool) -> AppState {
    build_state(pool, create_test_config(), Arc::new(StubGenerator::replying("Test analysis")))
}

fn into_test_server(state: AppState) -> (TestServer, AppState) {
    let router = crate::build_router(state.clone()).expect("Failed to build router");
    let server = TestServer::new(router).expect("Failed to create test server");
    (server, state)
}

pub async fn create_test_app(pool: PgPool) -> (TestServer, AppState) {
    into_test_server(create_test_state(pool))
}

pub async fn create_test_app_with_config(pool: PgPool, config: Config) -> (TestServer, AppState) {
    into_test_server(build_state(pool, config, Arc::new(StubGenerator::replying("Test analysis"))))
}

pub async fn create_test_app_with_generator(pool: PgPool, generator: Arc<StubGenerator>) -> (TestServer, AppState) {
    into_test_server(build_state(pool, create_test_config(), generator))
}

async fn insert_user(pool: &PgPool, email: &str, role: Role) -> UserDBResponse {
    let password_hash = hash_string_with_params(TEST_PASSWORD, Some(TEST_ARGON2)).expect("Failed to hash test password");
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");

    Users::new(&mut conn)
        .create(&UserCreateDBRequest {
            email: email.to_string(),
            name: "Test User".to_string(),
            role,
            status: UserStatus::Active,
            password_hash: Some(password_hash),
            external_purchase_id: None,
        })
        .await
        .expect("Failed to create test user")
}

/// An active regular user that still has to change its password.
pub async fn create_test_user(pool: &PgPool, email: &str) -> UserDBResponse {
    insert_user(pool, email, Role::User).await
}

pub async fn create_test_admin(pool: &PgPool, email: &str) -> UserDBResponse {
    insert_user(pool, email, Role::Admin).await
}

/// Bearer header for `user`, carrying the claims the user has right now.
pub fn auth_header(user: &UserDBResponse) -> (String, String) {
    let token = session::create_session_token(&CurrentUser::from(user.clone()), &create_test_config())
        .expect("Failed to create session token");
    ("authorization".to_string(), format!("Bearer {token}"))
}

pub async fn set_user_status(pool: &PgPool, user_id: UserId, status: UserStatus) {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    Users::new(&mut conn)
        .update(
            user_id,
            &UserUpdateDBRequest {
                status: Some(status),
                ..Default::default()
            },
        )
        .await
        .expect("Failed to update user status");
}

pub async fn create_category(conn: &mut PgConnection, user_id: UserId, name: &str, kind: EntryKind) -> CategoryDBResponse {
    Categories::new(conn)
        .create(&CategoryCreateDBRequest {
            user_id,
            name: name.to_string(),
            kind,
            color: None,
        })
        .await
        .expect("Failed to create test category")
}

/// Record `amount` against `category` today, with the category's kind.
pub async fn insert_transaction(
    conn: &mut PgConnection,
    user_id: UserId,
    category: &CategoryDBResponse,
    amount: Decimal,
) -> TransactionDBResponse {
    Transactions::new(conn)
        .create(&TransactionCreateDBRequest {
            user_id,
            category_id: category.id,
            kind: category.kind,
            amount,
            description: format!("{} entry", category.name),
            occurred_on: Utc::now().date_naive(),
        })
        .await
        .expect("Failed to create test transaction")
}
