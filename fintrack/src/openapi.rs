//! OpenAPI documentation, served with Scalar at `/docs`.
//!
//! Resource endpoints are documented relative to `/api/v1` and nested into the top-level
//! document, next to the authentication and webhook endpoints that live at the root.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::{analysis, api, errors, export, types};

/// Session token in the `Authorization` header or in the session cookie.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.security_schemes.insert(
            "BearerAuth".to_string(),
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .description(Some(
                        "Session token returned by login. Include it in the `Authorization` header:\n\n\
                        ```\nAuthorization: Bearer YOUR_TOKEN\n```",
                    ))
                    .build(),
            ),
        );
        components.security_schemes.insert(
            "CookieAuth".to_string(),
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "fintrack_session",
                "Session cookie set by login",
            ))),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::users::get_current_user,
        api::handlers::users::update_current_user,
        api::handlers::users::record_consent,
        api::handlers::categories::list_categories,
        api::handlers::categories::create_category,
        api::handlers::categories::update_category,
        api::handlers::categories::delete_category,
        api::handlers::transactions::list_transactions,
        api::handlers::transactions::create_transaction,
        api::handlers::transactions::get_transaction,
        api::handlers::transactions::update_transaction,
        api::handlers::transactions::delete_transaction,
        api::handlers::transactions::export_transactions,
        api::handlers::goals::list_goals,
        api::handlers::goals::create_goal,
        api::handlers::goals::get_goal,
        api::handlers::goals::update_goal,
        api::handlers::goals::delete_goal,
        api::handlers::investments::list_investments,
        api::handlers::investments::create_investment,
        api::handlers::investments::update_investment,
        api::handlers::investments::delete_investment,
        api::handlers::analyses::list_analyses,
        api::handlers::analyses::generate_analysis,
        api::handlers::analyses::get_analysis,
        api::handlers::analyses::delete_analysis,
        api::handlers::admin::list_users,
        api::handlers::admin::create_user,
        api::handlers::admin::update_user,
        api::handlers::admin::delete_user,
        api::handlers::admin::resend_welcome,
    ),
    components(schemas(
        types::EntryKind,
        api::models::users::Role,
        api::models::users::UserStatus,
        api::models::users::UserResponse,
        api::models::users::ProfileUpdate,
        api::models::users::AdminUserCreate,
        api::models::users::AdminUserUpdate,
        api::models::users::AdminUserActionResponse,
        api::models::categories::CategoryCreate,
        api::models::categories::CategoryUpdate,
        api::models::categories::CategoryResponse,
        api::models::categories::CategoryDeleteResponse,
        api::models::transactions::TransactionCreate,
        api::models::transactions::TransactionUpdate,
        api::models::transactions::TransactionResponse,
        api::models::goals::GoalCreate,
        api::models::goals::GoalUpdate,
        api::models::goals::GoalResponse,
        api::models::investments::InvestmentCreate,
        api::models::investments::InvestmentUpdate,
        api::models::investments::InvestmentResponse,
        api::models::analyses::AnalysisGenerate,
        api::models::analyses::AnalysisResponse,
        analysis::summary::MonthlySummary,
        analysis::summary::CategoryTotal,
        analysis::summary::Outlier,
        analysis::summary::GoalProgress,
        analysis::summary::InvestmentShare,
        export::ExportFormat,
    ))
)]
struct ResourceApiDoc;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Fintrack API",
        description = "Personal finance tracking: categories, transactions, goals, investments and monthly analyses."
    ),
    modifiers(&SecurityAddon),
    nest(
        (path = "/api/v1", api = ResourceApiDoc)
    ),
    paths(
        api::handlers::auth::login,
        api::handlers::auth::logout,
        api::handlers::auth::get_session,
        api::handlers::auth::change_password,
        api::handlers::webhooks::purchase_webhook,
    ),
    components(schemas(
        api::models::auth::LoginRequest,
        api::models::auth::ChangePasswordRequest,
        api::models::auth::AuthResponse,
        api::models::auth::AuthSuccessResponse,
        api::models::users::CurrentUser,
        api::models::webhooks::WebhookAction,
        api::models::webhooks::WebhookAck,
        errors::ErrorBody,
    )),
    tags(
        (name = "authentication", description = "Login, logout and session management"),
        (name = "users", description = "The caller's own profile"),
        (name = "categories", description = "Income, expense and investment categories"),
        (name = "transactions", description = "Financial entries and their export"),
        (name = "goals", description = "Savings goals"),
        (name = "investments", description = "Investments, optionally counted towards a goal"),
        (name = "analyses", description = "Generated monthly analyses"),
        (name = "admin", description = "Account administration"),
        (name = "webhooks", description = "Purchase-platform notifications"),
    )
)]
pub struct ApiDoc;
