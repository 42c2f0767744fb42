//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `FINTRACK_CONFIG`
//! environment variable.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `FINTRACK_` override YAML values
//! 3. **DATABASE_URL** - Special case: overrides `database.url` if set
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `FINTRACK_WEBHOOK__SECRET=...` sets the `webhook.secret` field.
//!
//! ## Usage
//!
//! ```no_run
//! use clap::Parser;
//! use fintrack::config::{Args, Config};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let args = Args::parse();
//! let config = Config::load(&args)?;
//!
//! println!("Server will bind to {}:{}", config.host, config.port);
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration Structure
//!
//! - **Server**: `host`, `port`, `dashboard_url`
//! - **Database**: `database.url`, `database.pool` - PostgreSQL connection settings
//! - **Admin User**: `admin_email`, `admin_password` - Initial admin user created on startup
//! - **Authentication**: `auth.session`, `auth.password`, `auth.security`
//! - **Email**: `email` - SMTP or file transport for welcome/cancellation emails
//! - **Webhook**: `webhook` - purchase-platform signature secret and event names
//! - **AI**: `ai` - OpenAI-compatible endpoint used for monthly analysis narratives
//! - **Retry**: `retry` - attempts and backoff for database and email calls
//! - **Analysis**: `analysis` - knobs for the monthly summary aggregation
//! - **Features**: `enable_metrics`, `enable_otel_export`

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::errors::Error;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "FINTRACK_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// All fields have defaults defined in the `Default` implementation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Base URL where the dashboard is accessible. Used for links in emails.
    pub dashboard_url: String,
    /// Populated from `DATABASE_URL`; folded into `database.url` on load.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
    pub database: DatabaseConfig,
    /// Email address for the initial admin user (created on first startup)
    pub admin_email: String,
    /// Password for the initial admin user
    pub admin_password: Option<String>,
    /// Secret key for JWT signing (required)
    pub secret_key: Option<String>,
    pub auth: AuthConfig,
    pub email: EmailConfig,
    pub webhook: WebhookConfig,
    pub ai: AiConfig,
    pub retry: RetryConfig,
    pub analysis: AnalysisConfig,
    /// Enable Prometheus metrics endpoint at `/internal/metrics`
    pub enable_metrics: bool,
    /// Enable OpenTelemetry OTLP export for distributed tracing
    pub enable_otel_export: bool,
}

/// PostgreSQL connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool: PoolSettings,
}

/// Connection pool parameters passed to `PgPoolOptions`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolSettings {
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of idle connections to maintain
    pub min_connections: u32,
    /// Maximum time to wait for a connection (seconds)
    pub acquire_timeout_secs: u64,
    /// Time before idle connections are closed (seconds, 0 = never)
    pub idle_timeout_secs: u64,
    /// Maximum lifetime of a connection (seconds, 0 = never)
    pub max_lifetime_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    pub session: SessionConfig,
    pub password: PasswordConfig,
    pub security: SecurityConfig,
}

/// Session cookie configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Cookie lifetime
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Cookie name for session token
    pub cookie_name: String,
    /// Set Secure flag on cookies (HTTPS only)
    pub cookie_secure: bool,
    /// SameSite cookie attribute ("strict", "lax", or "none")
    pub cookie_same_site: String,
}

/// Password validation rules.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PasswordConfig {
    pub min_length: usize,
    pub max_length: usize,
}

/// Security configuration for JWT and CORS.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SecurityConfig {
    /// JWT token expiry duration
    #[serde(with = "humantime_serde")]
    pub jwt_expiry: Duration,
    pub cors: CorsConfig,
}

/// CORS (Cross-Origin Resource Sharing) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    pub allowed_origins: Vec<CorsOrigin>,
    /// Allow credentials (cookies) in CORS requests
    pub allow_credentials: bool,
    /// Cache preflight requests for this many seconds
    pub max_age: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CorsOrigin {
    /// Allow all origins (`*`)
    #[serde(deserialize_with = "parse_wildcard")]
    Wildcard,
    /// Specific origin URL (e.g., `https://app.example.com`)
    #[serde(deserialize_with = "parse_url")]
    Url(Url),
}

fn parse_wildcard<'de, D>(deserializer: D) -> Result<(), D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    if s == "*" {
        Ok(())
    } else {
        Err(serde::de::Error::custom("Expected '*'"))
    }
}

fn parse_url<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Url::parse(&s).map_err(serde::de::Error::custom)
}

/// Email configuration for transactional messages.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
// Note: Cannot use deny_unknown_fields here due to #[serde(flatten)] on transport
pub struct EmailConfig {
    #[serde(flatten)]
    pub transport: EmailTransportConfig,
    pub from_email: String,
    pub from_name: String,
    pub reply_to: Option<String>,
}

/// Email transport configuration - either SMTP or file-based for testing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EmailTransportConfig {
    Smtp {
        host: String,
        port: u16,
        username: String,
        password: String,
        use_tls: bool,
    },
    /// Write emails to files (for development/testing)
    File { path: String },
}

/// Purchase-platform webhook configuration.
///
/// Event names are compared after uppercasing, against exact entries in these lists. Anything
/// not listed is acknowledged and ignored.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct WebhookConfig {
    /// Shared HMAC secret. When unset, signatures are not checked.
    pub secret: Option<String>,
    /// Header carrying the hex HMAC-SHA256 of the raw body
    pub signature_header: String,
    pub approved_events: Vec<String>,
    pub refunded_events: Vec<String>,
    pub canceled_events: Vec<String>,
}

/// OpenAI-compatible text generation endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AiConfig {
    /// Base URL up to and including the version segment, e.g. `https://api.openai.com/v1`
    pub base_url: Url,
    pub api_key: Option<String>,
    pub model: String,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Retry policy for outbound database and email calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Linear backoff step: the n-th retry waits `backoff * n`
    #[serde(with = "humantime_serde")]
    pub backoff: Duration,
}

/// Monthly summary aggregation settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Weeks per month used for weekly averages
    pub weekly_divisor: Decimal,
    pub top_income_categories: usize,
    pub top_expense_categories: usize,
    /// An expense is an outlier when it exceeds `outlier_factor` times the mean expense
    pub outlier_factor: Decimal,
    pub max_outliers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            dashboard_url: "http://localhost:5173".to_string(),
            database_url: None,
            database: DatabaseConfig::default(),
            admin_email: "admin@example.com".to_string(),
            admin_password: None,
            secret_key: None,
            auth: AuthConfig::default(),
            email: EmailConfig::default(),
            webhook: WebhookConfig::default(),
            ai: AiConfig::default(),
            retry: RetryConfig::default(),
            analysis: AnalysisConfig::default(),
            enable_metrics: false,
            enable_otel_export: false,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost:5432/fintrack".to_string(),
            pool: PoolSettings::default(),
        }
    }
}

impl Default for PoolSettings {
    /// Production defaults: balanced for reliability and resource usage
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 0,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,  // 10 minutes
            max_lifetime_secs: 1800, // 30 minutes
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(24 * 60 * 60),
            cookie_name: "fintrack_session".to_string(),
            cookie_secure: true,
            cookie_same_site: "strict".to_string(),
        }
    }
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 64,
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            jwt_expiry: Duration::from_secs(24 * 60 * 60),
            cors: CorsConfig::default(),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![CorsOrigin::Url(
                Url::parse("http://localhost:5173").expect("static URL is valid"),
            )],
            allow_credentials: true,
            max_age: Some(3600),
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            transport: EmailTransportConfig::default(),
            from_email: "noreply@example.com".to_string(),
            from_name: "Fintrack".to_string(),
            reply_to: None,
        }
    }
}

impl Default for EmailTransportConfig {
    fn default() -> Self {
        Self::File {
            path: "./emails".to_string(),
        }
    }
}

fn event_names(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            secret: None,
            signature_header: "x-webhook-signature".to_string(),
            approved_events: event_names(&[
                "APPROVED",
                "COMPLETE",
                "COMPLETED",
                "PURCHASE_APPROVED",
                "PURCHASE_COMPLETE",
                "COMPRA_APROVADA",
                "ORDER_APPROVED",
                "PAID",
            ]),
            refunded_events: event_names(&["REFUNDED", "PURCHASE_REFUNDED", "CHARGEBACK", "PURCHASE_CHARGEBACK", "COMPRA_REEMBOLSADA"]),
            canceled_events: event_names(&[
                "CANCELED",
                "CANCELLED",
                "PURCHASE_CANCELED",
                "SUBSCRIPTION_CANCELED",
                "SUBSCRIPTION_CANCELLATION",
                "ASSINATURA_CANCELADA",
            ]),
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse("https://api.openai.com/v1").expect("static URL is valid"),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            timeout: Duration::from_secs(60),
            temperature: 0.4,
            max_tokens: 1200,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            weekly_divisor: Decimal::new(43, 1),
            top_income_categories: 3,
            top_expense_categories: 5,
            outlier_factor: Decimal::TWO,
            max_outliers: 3,
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let mut config: Self = Self::figment(args).extract()?;

        if let Some(url) = config.database_url.take() {
            config.database.url = url;
        }

        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        if self.secret_key.as_deref().is_none_or(str::is_empty) {
            return Err(Error::Internal {
                operation: "Config validation: secret_key is not configured. \
                     Please set FINTRACK_SECRET_KEY environment variable or add secret_key to config file."
                    .to_string(),
            });
        }

        let password = &self.auth.password;
        if password.min_length > password.max_length {
            return Err(Error::Internal {
                operation: format!(
                    "Config validation: Invalid password configuration: min_length ({}) cannot be greater than max_length ({})",
                    password.min_length, password.max_length
                ),
            });
        }
        if password.min_length < 1 {
            return Err(Error::Internal {
                operation: "Config validation: Invalid password configuration: min_length must be at least 1".to_string(),
            });
        }

        if self.auth.security.jwt_expiry.as_secs() < 300 {
            return Err(Error::Internal {
                operation: "Config validation: JWT expiry duration is too short (minimum 5 minutes)".to_string(),
            });
        }
        if self.auth.security.jwt_expiry.as_secs() > 86400 * 30 {
            return Err(Error::Internal {
                operation: "Config validation: JWT expiry duration is too long (maximum 30 days)".to_string(),
            });
        }

        let cors = &self.auth.security.cors;
        if cors.allowed_origins.is_empty() {
            return Err(Error::Internal {
                operation: "Config validation: CORS allowed_origins cannot be empty. Add at least one allowed origin.".to_string(),
            });
        }
        let has_wildcard = cors.allowed_origins.iter().any(|origin| matches!(origin, CorsOrigin::Wildcard));
        if has_wildcard && cors.allow_credentials {
            return Err(Error::Internal {
                operation: "Config validation: CORS cannot use wildcard origin '*' with allow_credentials=true. Specify explicit origins."
                    .to_string(),
            });
        }

        if self.retry.max_attempts == 0 {
            return Err(Error::Internal {
                operation: "Config validation: retry.max_attempts must be at least 1".to_string(),
            });
        }

        if self.analysis.weekly_divisor <= Decimal::ZERO {
            return Err(Error::Internal {
                operation: "Config validation: analysis.weekly_divisor must be positive".to_string(),
            });
        }

        if self.webhook.secret.as_deref().is_some_and(str::is_empty) {
            return Err(Error::Internal {
                operation: "Config validation: webhook.secret is set but empty. Remove it to disable signature checks.".to_string(),
            });
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            .merge(Yaml::file(&args.config))
            .merge(Env::prefixed("FINTRACK_").split("__"))
            .merge(Env::raw().only(&["DATABASE_URL"]))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn args() -> Args {
        Args {
            config: "test.yaml".to_string(),
            validate: false,
        }
    }

    #[test]
    fn test_yaml_sections() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
secret_key: hello
webhook:
  secret: shh
  approved_events: [PAID]
retry:
  max_attempts: 5
  backoff: 250ms
ai:
  base_url: http://llm.internal/v1
  model: local-model
  timeout: 30s
"#,
            )?;

            let config = Config::load(&args())?;

            assert_eq!(config.webhook.secret.as_deref(), Some("shh"));
            assert_eq!(config.webhook.approved_events, vec!["PAID".to_string()]);
            // Unspecified lists keep their defaults
            assert!(config.webhook.canceled_events.contains(&"CANCELLED".to_string()));
            assert_eq!(config.retry.max_attempts, 5);
            assert_eq!(config.retry.backoff, Duration::from_millis(250));
            assert_eq!(config.ai.base_url.as_str(), "http://llm.internal/v1");
            assert_eq!(config.ai.timeout, Duration::from_secs(30));
            assert_eq!(config.analysis.weekly_divisor, Decimal::new(43, 1));

            Ok(())
        });
    }

    #[test]
    fn test_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file("test.yaml", "secret_key: hello\nport: 4000\n")?;

            jail.set_env("FINTRACK_HOST", "127.0.0.1");
            jail.set_env("FINTRACK_PORT", "8080");
            jail.set_env("FINTRACK_RETRY__MAX_ATTEMPTS", "7");
            jail.set_env("DATABASE_URL", "postgres://override/db");

            let config = Config::load(&args())?;

            assert_eq!(config.host, "127.0.0.1");
            assert_eq!(config.port, 8080);
            assert_eq!(config.retry.max_attempts, 7);
            assert_eq!(config.database.url, "postgres://override/db");
            assert!(config.database_url.is_none());

            Ok(())
        });
    }

    #[test]
    fn test_missing_secret_key_is_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("test.yaml", "port: 4000\n")?;

            let result = Config::load(&args());
            assert!(result.is_err());
            assert!(result.unwrap_err().to_string().contains("secret_key"));

            Ok(())
        });
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("test.yaml", "secret_key: hello\nnot_a_setting: true\n")?;

            assert!(Config::load(&args()).is_err());
            Ok(())
        });
    }

    #[test]
    fn test_validate_rules() {
        let base = Config {
            secret_key: Some("secret".to_string()),
            ..Default::default()
        };
        assert!(base.validate().is_ok());

        let mut config = base.clone();
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.auth.password.min_length = 100;
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.auth.security.jwt_expiry = Duration::from_secs(60);
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.auth.security.cors.allowed_origins = vec![CorsOrigin::Wildcard];
        assert!(config.validate().is_err());
        config.auth.security.cors.allow_credentials = false;
        assert!(config.validate().is_ok());

        let mut config = base;
        config.analysis.weekly_divisor = Decimal::ZERO;
        assert!(config.validate().is_err());
    }
}
