//! Slack request signature verification.
//!
//! Slack signs every Events API request using HMAC-SHA256.
//! Reference: https://api.slack.com/authentication/verifying-requests-from-slack

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the request timestamp.
pub const TIMESTAMP_HEADER: &str = "X-Slack-Request-Timestamp";

/// Header carrying the `v0=` signature.
pub const SIGNATURE_HEADER: &str = "X-Slack-Signature";

const VERSION: &str = "v0";

const SIGNATURE_PREFIX: &str = "v0=";

/// Verify a Slack request signature.
///
/// The signature is `v0=` followed by the hex HMAC-SHA256 of
/// `v0:{timestamp}:{body}` keyed with the app's signing secret.
///
/// # Arguments
///
/// * `signing_secret` - The app's signing secret
/// * `timestamp` - The `X-Slack-Request-Timestamp` header value
/// * `body` - The raw, undecoded request body
/// * `signature` - The `X-Slack-Signature` header value
/// * `max_age_seconds` - Maximum allowed age of the timestamp (prevents replay attacks)
///
/// # Returns
///
/// `true` if the signature is valid and not stale, `false` otherwise.
pub fn verify_slack_signature(
    signing_secret: &str,
    timestamp: &str,
    body: &[u8],
    signature: &str,
    max_age_seconds: u64,
) -> bool {
    if signing_secret.is_empty() || timestamp.is_empty() || signature.is_empty() {
        warn!(
            has_signing_secret = !signing_secret.is_empty(),
            has_timestamp = !timestamp.is_empty(),
            has_signature = !signature.is_empty(),
            "slack_signature_missing_fields"
        );
        return false;
    }

    let request_time: u64 = match timestamp.parse() {
        Ok(t) => t,
        Err(_) => {
            warn!(timestamp = %timestamp, "slack_signature_invalid_timestamp");
            return false;
        }
    };

    let current_time = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    let age = current_time.abs_diff(request_time);
    if age > max_age_seconds {
        warn!(
            request_time = request_time,
            current_time = current_time,
            age_seconds = age,
            max_age_seconds = max_age_seconds,
            "slack_signature_stale"
        );
        return false;
    }

    let provided = match signature
        .strip_prefix(SIGNATURE_PREFIX)
        .and_then(|hex_digest| hex::decode(hex_digest).ok())
    {
        Some(bytes) => bytes,
        None => {
            warn!(actual_length = signature.len(), "slack_signature_malformed");
            return false;
        }
    };

    let mac = match signing_mac(signing_secret, timestamp, body) {
        Some(mac) => mac,
        None => return false,
    };

    // verify_slice compares in constant time.
    let valid = mac.verify_slice(&provided).is_ok();

    if !valid {
        warn!(actual_length = signature.len(), "slack_signature_mismatch");
    }

    valid
}

/// Compute the `v0=` signature for a request.
///
/// Returns `None` if the signing secret is rejected as an HMAC key.
pub fn compute_signature(signing_secret: &str, timestamp: &str, body: &[u8]) -> Option<String> {
    let mac = signing_mac(signing_secret, timestamp, body)?;
    Some(format!(
        "{}{}",
        SIGNATURE_PREFIX,
        hex::encode(mac.finalize().into_bytes())
    ))
}

/// HMAC over the `v0:{timestamp}:{body}` base string.
fn signing_mac(signing_secret: &str, timestamp: &str, body: &[u8]) -> Option<HmacSha256> {
    let mut mac = match HmacSha256::new_from_slice(signing_secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => {
            warn!("slack_signature_invalid_key");
            return None;
        }
    };

    mac.update(format!("{}:{}:", VERSION, timestamp).as_bytes());
    mac.update(body);
    Some(mac)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> String {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
            .to_string()
    }

    #[test]
    fn test_verify_signature_missing_fields() {
        assert!(!verify_slack_signature("", "123", b"{}", "v0=abc", 300));
        assert!(!verify_slack_signature("secret", "", b"{}", "v0=abc", 300));
        assert!(!verify_slack_signature("secret", "123", b"{}", "", 300));
    }

    #[test]
    fn test_verify_signature_invalid_timestamp() {
        assert!(!verify_slack_signature(
            "secret",
            "not-a-number",
            b"{}",
            "v0=abc",
            300
        ));
    }

    #[test]
    fn test_verify_signature_stale() {
        let signature = compute_signature("secret", "946684800", b"{}").unwrap();
        assert!(!verify_slack_signature(
            "secret",
            "946684800",
            b"{}",
            &signature,
            300
        ));
    }

    #[test]
    fn test_verify_signature_valid() {
        let timestamp = now();
        let body = br#"{"token":"t","type":"url_verification","challenge":"abc"}"#;
        let signature = compute_signature("test-signing-secret", &timestamp, body).unwrap();

        assert!(signature.starts_with("v0="));
        assert!(verify_slack_signature(
            "test-signing-secret",
            &timestamp,
            body,
            &signature,
            300
        ));
    }

    #[test]
    fn test_verify_signature_tampered_body() {
        let timestamp = now();
        let signature = compute_signature("test-signing-secret", &timestamp, b"original").unwrap();

        assert!(!verify_slack_signature(
            "test-signing-secret",
            &timestamp,
            b"tampered",
            &signature,
            300
        ));
    }

    #[test]
    fn test_verify_signature_malformed() {
        let timestamp = now();
        let signature = compute_signature("secret", &timestamp, b"{}").unwrap();
        let digest = signature.trim_start_matches("v0=");

        // Missing version prefix, wrong version, and non-hex digest.
        for candidate in [
            digest.to_string(),
            format!("v1={}", digest),
            "v0=not-hex".to_string(),
        ] {
            assert!(!verify_slack_signature("secret", &timestamp, b"{}", &candidate, 300));
        }
    }

    #[test]
    fn test_verify_signature_wrong_secret() {
        let timestamp = now();
        let signature = compute_signature("other-secret", &timestamp, b"{}").unwrap();
        assert!(!verify_slack_signature("secret", &timestamp, b"{}", &signature, 300));
    }
}
