//! API response models for the purchase-platform webhook.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// What happened to the buyer's account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum WebhookAction {
    Created,
    Reactivated,
    Unchanged,
    Canceled,
    Ignored,
}

/// Acknowledgement returned to the purchase platform.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WebhookAck {
    pub received: bool,
    pub action: WebhookAction,
    /// Whether the notification email went out. Absent when no email was due.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_sent: Option<bool>,
}

impl WebhookAck {
    pub fn new(action: WebhookAction) -> Self {
        Self {
            received: true,
            action,
            email_sent: None,
        }
    }

    pub fn with_email(action: WebhookAction, email_sent: bool) -> Self {
        Self {
            email_sent: Some(email_sent),
            ..Self::new(action)
        }
    }
}
