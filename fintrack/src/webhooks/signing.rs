//! HMAC-SHA256 signatures for incoming purchase-platform webhooks.
//!
//! The platform signs the raw request body with the shared secret and sends the hex digest in a
//! header, optionally prefixed with `sha256=`.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Prefix some platforms put in front of the hex digest
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Sign a webhook body, returning the lowercase hex HMAC-SHA256.
pub fn sign_payload(payload: &[u8], secret: &str) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(payload);
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Verify a signature header value against the raw body.
///
/// Returns `false` for malformed hex as well as for mismatches.
pub fn verify_signature(payload: &[u8], signature: &str, secret: &str) -> bool {
    let signature = signature.trim();
    let hex_value = signature.strip_prefix(SIGNATURE_PREFIX).unwrap_or(signature);

    let Ok(provided) = hex::decode(hex_value) else {
        return false;
    };
    let Some(expected) = sign_payload(payload, secret).and_then(|s| hex::decode(s).ok()) else {
        return false;
    };

    constant_time_eq(&provided, &expected)
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "purchase-webhook-secret";
    const BODY: &[u8] = br#"{"event":"PURCHASE_APPROVED","email":"buyer@example.com"}"#;

    #[test]
    fn test_sign_is_deterministic_hex() {
        let signature = sign_payload(BODY, SECRET).unwrap();
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(Some(signature), sign_payload(BODY, SECRET));
    }

    #[test]
    fn test_known_vector() {
        // RFC 4231 test case 2
        let signature = sign_payload(b"what do ya want for nothing?", "Jefe").unwrap();
        assert_eq!(signature, "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843");
    }

    #[test]
    fn test_sign_and_verify() {
        let signature = sign_payload(BODY, SECRET).unwrap();

        assert!(verify_signature(BODY, &signature, SECRET));
        assert!(verify_signature(BODY, &format!("sha256={signature}"), SECRET));
        assert!(verify_signature(BODY, &signature.to_uppercase(), SECRET));

        // Wrong body
        assert!(!verify_signature(b"{}", &signature, SECRET));
        // Wrong secret
        assert!(!verify_signature(BODY, &signature, "other-secret"));
    }

    #[test]
    fn test_verify_malformed_signature() {
        assert!(!verify_signature(BODY, "", SECRET));
        assert!(!verify_signature(BODY, "not-hex", SECRET));
        assert!(!verify_signature(BODY, "abcd", SECRET));
    }
}
