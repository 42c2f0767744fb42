//! Email service for account notifications: welcome messages with a temporary password, and
//! subscription cancellation notices.

use askama::Template;
use lettre::{
    Address, AsyncFileTransport, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use std::path::Path;
use tracing::{info, instrument};

use crate::{
    config::{Config, EmailTransportConfig},
    errors::Error,
    retry::RetryPolicy,
};

pub struct EmailService {
    transport: EmailTransport,
    from: Mailbox,
    reply_to: Option<Mailbox>,
    dashboard_url: String,
    retry: RetryPolicy,
}

enum EmailTransport {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    File(AsyncFileTransport<Tokio1Executor>),
}

fn mailbox(name: Option<&str>, email: &str) -> Result<Mailbox, Error> {
    let address = email.parse::<Address>().map_err(|e| Error::Internal {
        operation: format!("parse email address {email}: {e}"),
    })?;
    Ok(Mailbox::new(name.map(str::to_string), address))
}

#[derive(Template)]
#[template(path = "email/welcome.html")]
struct WelcomeEmail<'a> {
    name: &'a str,
    email: &'a str,
    temporary_password: &'a str,
    login_link: &'a str,
}

#[derive(Template)]
#[template(path = "email/cancellation.html")]
struct CancellationEmail<'a> {
    name: &'a str,
}

fn render(template: &impl Template) -> Result<String, Error> {
    template.render().map_err(|e| Error::Internal {
        operation: format!("render email template: {e}"),
    })
}

impl EmailService {
    pub fn new(config: &Config, retry: RetryPolicy) -> Result<Self, Error> {
        let email_config = &config.email;

        let transport = match &email_config.transport {
            EmailTransportConfig::Smtp {
                host,
                port,
                username,
                password,
                use_tls,
            } => {
                if !use_tls {
                    tracing::warn!("SMTP TLS is disabled - this is not recommended for production");
                }

                let smtp_builder = if *use_tls {
                    AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                } else {
                    Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host))
                }
                .map_err(|e| Error::Internal {
                    operation: format!("create SMTP transport: {e}"),
                })?
                .port(*port)
                .credentials(Credentials::new(username.clone(), password.clone()));

                EmailTransport::Smtp(smtp_builder.build())
            }
            EmailTransportConfig::File { path } => {
                // Development/testing: one .eml file per message
                let emails_dir = Path::new(path);
                if !emails_dir.exists() {
                    std::fs::create_dir_all(emails_dir).map_err(|e| Error::Internal {
                        operation: format!("create emails directory: {e}"),
                    })?;
                }
                EmailTransport::File(AsyncFileTransport::<Tokio1Executor>::new(emails_dir))
            }
        };

        Ok(Self {
            transport,
            from: mailbox(Some(&email_config.from_name), &email_config.from_email)?,
            reply_to: email_config
                .reply_to
                .as_deref()
                .map(|reply_to| mailbox(None, reply_to))
                .transpose()?,
            dashboard_url: config.dashboard_url.trim_end_matches('/').to_string(),
            retry,
        })
    }

    /// Send account access details. Used for new accounts, reactivations and admin resends.
    #[instrument(skip(self, to_name, temporary_password), err)]
    pub async fn send_welcome_email(&self, to_email: &str, to_name: &str, temporary_password: &str) -> Result<(), Error> {
        let body = self.create_welcome_body(to_name, to_email, temporary_password)?;
        self.send_email(to_email, Some(to_name), "Your fintrack account is ready", &body)
            .await
    }

    #[instrument(skip(self, to_name), err)]
    pub async fn send_cancellation_email(&self, to_email: &str, to_name: &str) -> Result<(), Error> {
        let body = self.create_cancellation_body(to_name)?;
        self.send_email(to_email, Some(to_name), "Your fintrack subscription has ended", &body)
            .await
    }

    async fn send_email(&self, to_email: &str, to_name: Option<&str>, subject: &str, body: &str) -> Result<(), Error> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .to(mailbox(to_name, to_email)?)
            .subject(subject)
            .header(ContentType::TEXT_HTML);
        if let Some(reply_to) = &self.reply_to {
            builder = builder.reply_to(reply_to.clone());
        }

        let message = builder.body(body.to_string()).map_err(|e| Error::Internal {
            operation: format!("build email message: {e}"),
        })?;

        self.retry
            .run("send email", || self.deliver(message.clone()))
            .await?;

        info!(subject, "Email sent");
        Ok(())
    }

    async fn deliver(&self, message: Message) -> Result<(), Error> {
        match &self.transport {
            EmailTransport::Smtp(smtp) => {
                smtp.send(message).await.map_err(|e| Error::Internal {
                    operation: format!("send SMTP email: {e}"),
                })?;
            }
            EmailTransport::File(file) => {
                file.send(message).await.map_err(|e| Error::Internal {
                    operation: format!("send file email: {e}"),
                })?;
            }
        }
        Ok(())
    }

    fn create_welcome_body(&self, to_name: &str, to_email: &str, temporary_password: &str) -> Result<String, Error> {
        let login_link = format!("{}/login", self.dashboard_url);
        render(&WelcomeEmail {
            name: to_name,
            email: to_email,
            temporary_password,
            login_link: &login_link,
        })
    }

    fn create_cancellation_body(&self, to_name: &str) -> Result<String, Error> {
        render(&CancellationEmail { name: to_name })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_config;

    fn service_writing_to(dir: &Path) -> EmailService {
        let mut config = create_test_config();
        config.email.transport = EmailTransportConfig::File {
            path: dir.to_string_lossy().to_string(),
        };
        EmailService::new(&config, RetryPolicy::none()).unwrap()
    }

    #[tokio::test]
    async fn test_welcome_body_contains_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_writing_to(dir.path());

        let body = service
            .create_welcome_body("Ana <script>", "ana@example.com", "Xy7!abcDEF23")
            .unwrap();
        assert!(body.contains("Hello Ana &lt;script&gt;,"));
        assert!(!body.contains("<script>"));
        assert!(body.contains("ana@example.com"));
        assert!(body.contains("Xy7!abcDEF23"));
        assert!(body.contains("/login\""));
    }

    #[tokio::test]
    async fn test_cancellation_body() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_writing_to(dir.path());

        let body = service.create_cancellation_body("Bo & Co").unwrap();
        assert!(body.contains("Hello Bo &amp; Co,"));
        assert!(body.contains("no longer active"));
    }

    #[tokio::test]
    async fn test_file_transport_writes_messages() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_writing_to(dir.path());

        service
            .send_welcome_email("new@example.com", "New Person", "Tmp-Pass-123")
            .await
            .unwrap();
        service.send_cancellation_email("new@example.com", "New Person").await.unwrap();

        let written: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(written.len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_recipient_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_writing_to(dir.path());

        let result = service.send_cancellation_email("not-an-address", "X").await;
        assert!(matches!(result, Err(Error::Internal { .. })));
    }
}
