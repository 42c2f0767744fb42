//! Purchase-platform webhook payloads.
//!
//! Platforms disagree on where they put the buyer, so the body is matched against a closed set of
//! known shapes and normalized into a [`PurchaseEvent`]. A body matching none of them is rejected
//! rather than guessed at.

use serde::Deserialize;
use serde_json::Value;

use crate::{config::WebhookConfig, errors::Error};

/// The known body shapes, tried in order.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PurchasePayload {
    /// `{"event": "...", "email": "...", "name": "...", "purchase_id": "..."}`
    Flat {
        event: String,
        email: String,
        name: Option<String>,
        purchase_id: Option<Value>,
    },
    /// `{"event": "...", "data": {"buyer": {...}, "purchase": {"transaction": "..."}}}`
    Nested { event: String, data: NestedData },
    /// `{"webhook_event_type": "...", "order_status": "...", "Customer": {...}, "order_id": "..."}`
    ///
    /// Either event key may be present, and often both are.
    Customer {
        webhook_event_type: Option<String>,
        order_status: Option<String>,
        #[serde(rename = "Customer")]
        customer: CustomerData,
        order_id: Option<Value>,
    },
}

#[derive(Debug, Deserialize)]
pub struct NestedData {
    pub buyer: Buyer,
    pub purchase: Option<Purchase>,
}

#[derive(Debug, Deserialize)]
pub struct Buyer {
    pub email: String,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Purchase {
    pub transaction: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct CustomerData {
    pub email: String,
    pub full_name: Option<String>,
}

/// A purchase notification with the fields we act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseEvent {
    /// Uppercased event name
    pub event: String,
    /// Lowercased buyer email
    pub email: String,
    pub name: Option<String>,
    pub purchase_id: Option<String>,
}

/// What a purchase event means for the buyer's account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Approved,
    Refunded,
    Canceled,
    Ignored,
}

/// Identifiers arrive as strings or numbers depending on the platform.
fn id_string(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl PurchasePayload {
    pub fn into_event(self) -> Result<PurchaseEvent, Error> {
        let (event, email, name, purchase_id) = match self {
            PurchasePayload::Flat {
                event,
                email,
                name,
                purchase_id,
            } => (event, email, name, id_string(purchase_id)),
            PurchasePayload::Nested { event, data } => (
                event,
                data.buyer.email,
                data.buyer.name,
                id_string(data.purchase.and_then(|p| p.transaction)),
            ),
            PurchasePayload::Customer {
                webhook_event_type,
                order_status,
                customer,
                order_id,
            } => {
                let event = non_empty(webhook_event_type)
                    .or_else(|| non_empty(order_status))
                    .ok_or_else(|| Error::Unprocessable {
                        message: "Webhook event name is missing".to_string(),
                    })?;
                (event, customer.email, customer.full_name, id_string(order_id))
            }
        };

        let event = event.trim().to_uppercase();
        if event.is_empty() {
            return Err(Error::Unprocessable {
                message: "Webhook event name is empty".to_string(),
            });
        }

        let email = email.trim().to_lowercase();
        if !email.contains('@') {
            return Err(Error::Unprocessable {
                message: "Webhook buyer email is not a valid address".to_string(),
            });
        }

        Ok(PurchaseEvent {
            event,
            email,
            name: non_empty(name),
            purchase_id,
        })
    }
}

/// Parse a raw webhook body into a normalized event.
pub fn parse_purchase_event(body: &[u8]) -> Result<PurchaseEvent, Error> {
    let payload: PurchasePayload = serde_json::from_slice(body).map_err(|_| Error::Unprocessable {
        message: "Unrecognized webhook payload".to_string(),
    })?;
    payload.into_event()
}

impl EventKind {
    /// Exact match of the (uppercased) event name against the configured lists.
    pub fn classify(event: &str, config: &WebhookConfig) -> Self {
        let listed = |names: &[String]| names.iter().any(|name| name.eq_ignore_ascii_case(event));

        if listed(&config.approved_events) {
            EventKind::Approved
        } else if listed(&config.refunded_events) {
            EventKind::Refunded
        } else if listed(&config.canceled_events) {
            EventKind::Canceled
        } else {
            EventKind::Ignored
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> Result<PurchaseEvent, Error> {
        parse_purchase_event(&serde_json::to_vec(&value).unwrap())
    }

    #[test]
    fn test_flat_shape() {
        let event = parse(json!({
            "event": "purchase_approved",
            "email": " Buyer@Example.com ",
            "name": "Buyer",
            "purchase_id": 12345,
            "extra": "ignored"
        }))
        .unwrap();

        assert_eq!(
            event,
            PurchaseEvent {
                event: "PURCHASE_APPROVED".to_string(),
                email: "buyer@example.com".to_string(),
                name: Some("Buyer".to_string()),
                purchase_id: Some("12345".to_string()),
            }
        );
    }

    #[test]
    fn test_nested_shape() {
        let event = parse(json!({
            "event": "PURCHASE_COMPLETE",
            "data": {
                "buyer": {"email": "nested@example.com", "name": "Nested Buyer"},
                "purchase": {"transaction": "HP123"}
            }
        }))
        .unwrap();

        assert_eq!(event.event, "PURCHASE_COMPLETE");
        assert_eq!(event.email, "nested@example.com");
        assert_eq!(event.name.as_deref(), Some("Nested Buyer"));
        assert_eq!(event.purchase_id.as_deref(), Some("HP123"));
    }

    #[test]
    fn test_customer_shape_with_order_status_only() {
        let event = parse(json!({
            "order_status": "refunded",
            "Customer": {"email": "cust@example.com", "full_name": "  "},
            "order_id": "ord_9"
        }))
        .unwrap();

        assert_eq!(event.event, "REFUNDED");
        assert_eq!(event.email, "cust@example.com");
        assert_eq!(event.name, None);
        assert_eq!(event.purchase_id.as_deref(), Some("ord_9"));
    }

    #[test]
    fn test_customer_shape_prefers_webhook_event_type() {
        let event = parse(json!({
            "order_id": "abc",
            "order_status": "paid",
            "webhook_event_type": "order_approved",
            "Customer": {"email": "buyer@example.com", "full_name": "Buyer"}
        }))
        .unwrap();

        assert_eq!(event.event, "ORDER_APPROVED");
        assert_eq!(event.email, "buyer@example.com");
        assert_eq!(event.purchase_id.as_deref(), Some("abc"));
    }

    #[test]
    fn test_customer_shape_without_event_is_rejected() {
        let result = parse(json!({
            "order_id": "abc",
            "Customer": {"email": "buyer@example.com"}
        }));
        assert!(matches!(result, Err(Error::Unprocessable { .. })));

        let blank = parse(json!({
            "webhook_event_type": " ",
            "Customer": {"email": "buyer@example.com"}
        }));
        assert!(matches!(blank, Err(Error::Unprocessable { .. })));
    }

    #[test]
    fn test_unknown_shapes_are_rejected() {
        for body in [
            json!({"type": "sale", "buyer_email": "x@example.com"}),
            json!({"event": "APPROVED"}),
            json!({"event": "APPROVED", "data": {"purchase": {}}}),
            json!(["APPROVED", "x@example.com"]),
        ] {
            assert!(matches!(parse(body), Err(Error::Unprocessable { .. })));
        }

        assert!(matches!(
            parse_purchase_event(b"not json"),
            Err(Error::Unprocessable { .. })
        ));
    }

    #[test]
    fn test_invalid_email_is_rejected() {
        let result = parse(json!({"event": "APPROVED", "email": "nobody"}));
        assert!(matches!(result, Err(Error::Unprocessable { .. })));
    }

    #[test]
    fn test_classify_is_exact() {
        let config = WebhookConfig::default();

        assert_eq!(EventKind::classify("PURCHASE_APPROVED", &config), EventKind::Approved);
        assert_eq!(EventKind::classify("CHARGEBACK", &config), EventKind::Refunded);
        assert_eq!(EventKind::classify("SUBSCRIPTION_CANCELED", &config), EventKind::Canceled);
        // No substring matching
        assert_eq!(EventKind::classify("PURCHASE_APPROVED_PENDING", &config), EventKind::Ignored);
        assert_eq!(EventKind::classify("NOT_APPROVED", &config), EventKind::Ignored);
        assert_eq!(EventKind::classify("PURCHASE_DELAYED", &config), EventKind::Ignored);
    }

    #[test]
    fn test_classify_uses_configured_lists() {
        let config = WebhookConfig {
            approved_events: vec!["paid".to_string()],
            ..Default::default()
        };
        assert_eq!(EventKind::classify("PAID", &config), EventKind::Approved);
        assert_eq!(EventKind::classify("APPROVED", &config), EventKind::Ignored);
    }
}
