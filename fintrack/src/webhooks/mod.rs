//! Purchase-platform webhook intake.
//!
//! - [`signing`]: HMAC-SHA256 verification of the raw request body
//! - [`payload`]: the accepted body shapes and event classification
//! - [`service`]: account changes driven by purchase events

pub mod payload;
pub mod service;
pub mod signing;

pub use payload::{EventKind, PurchaseEvent, parse_purchase_event};
pub use service::process_purchase_event;
pub use signing::{sign_payload, verify_signature};
