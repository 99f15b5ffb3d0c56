//! GitHub webhook handling
//!
//! Verifies webhook signatures and acknowledges events before any business
//! logic runs.

use serde::{Deserialize, Serialize};

use crate::error::{ApiError, Result};

/// Header carrying the HMAC-SHA256 signature
pub const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";

/// Header carrying the event name
pub const EVENT_HEADER: &str = "X-GitHub-Event";

/// Header carrying the delivery id
pub const DELIVERY_HEADER: &str = "X-GitHub-Delivery";

const SIGNATURE_PREFIX: &str = "sha256=";

/// Hex length of a SHA-256 digest
const SIGNATURE_HEX_LEN: usize = 64;

/// How deliveries are authenticated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignaturePolicy<'a> {
    /// Deliveries must carry a valid signature for this secret
    Required(&'a str),
    /// No secret is configured; signatures are not checked
    Open,
}

impl<'a> SignaturePolicy<'a> {
    pub fn from_secret(secret: Option<&'a str>) -> Self {
        match secret {
            Some(secret) if !secret.is_empty() => Self::Required(secret),
            _ => Self::Open,
        }
    }
}

/// Platform-neutral webhook request
pub struct WebhookRequest {
    pub body: Vec<u8>,
    pub signature: Option<String>,
    pub event_type: Option<String>,
    pub delivery_id: Option<String>,
}

/// Acknowledgement returned with `202 Accepted`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookAck {
    pub status: &'static str,
    pub message: String,
}

impl WebhookAck {
    fn accepted(message: impl Into<String>) -> Self {
        Self {
            status: "accepted",
            message: message.into(),
        }
    }

    fn ignored(message: impl Into<String>) -> Self {
        Self {
            status: "ignored",
            message: message.into(),
        }
    }
}

/// Handle an incoming webhook delivery
#[tracing::instrument(skip_all, fields(event = ?request.event_type, delivery = ?request.delivery_id))]
pub fn handle(request: &WebhookRequest, policy: SignaturePolicy<'_>) -> Result<WebhookAck> {
    match policy {
        SignaturePolicy::Required(secret) => {
            let signature = request
                .signature
                .as_deref()
                .ok_or_else(|| ApiError::unauthorized(format!("missing {} header", SIGNATURE_HEADER)))?;

            if !verify_signature(&request.body, signature, secret) {
                tracing::warn!("rejected webhook delivery with invalid signature");
                return Err(ApiError::unauthorized("invalid webhook signature"));
            }
        }
        SignaturePolicy::Open => {
            tracing::warn!("webhook secret not configured; accepting delivery without signature check");
        }
    }

    let payload: serde_json::Value = serde_json::from_slice(&request.body)
        .map_err(|_| ApiError::invalid_request("webhook payload must be valid JSON"))?;

    let ack = match request.event_type.as_deref() {
        Some("ping") => WebhookAck::accepted("pong"),
        Some("pull_request") => handle_pull_request_event(payload)?,
        Some(other) => WebhookAck::ignored(format!("event '{}' ignored", other)),
        None => WebhookAck::ignored(format!("no {} header; event ignored", EVENT_HEADER)),
    };

    tracing::info!(status = ack.status, "webhook delivery acknowledged");
    Ok(ack)
}

/// Verify webhook signature using HMAC-SHA256.
///
/// Returns `false` for malformed signatures, an empty secret or a digest
/// mismatch. The digest comparison is constant-time.
pub fn verify_signature(body: &[u8], signature: &str, secret: &str) -> bool {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let Some(signature_hex) = signature.strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };
    if signature_hex.len() != SIGNATURE_HEX_LEN || !signature_hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return false;
    }
    if secret.is_empty() {
        return false;
    }

    let Ok(expected) = hex::decode(signature_hex) else {
        return false;
    };

    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);

    mac.verify_slice(&expected).is_ok()
}

#[derive(Deserialize)]
struct PullRequestEvent {
    action: String,
    number: u64,
    repository: Repository,
}

#[derive(Deserialize)]
struct Repository {
    full_name: String,
}

fn handle_pull_request_event(payload: serde_json::Value) -> Result<WebhookAck> {
    let event: PullRequestEvent = serde_json::from_value(payload)
        .map_err(|_| ApiError::invalid_request("malformed pull_request payload"))?;

    if !matches!(event.action.as_str(), "opened" | "synchronize" | "reopened") {
        return Ok(WebhookAck::ignored(format!(
            "pull_request action '{}' ignored",
            event.action
        )));
    }

    tracing::info!(
        repository = %event.repository.full_name,
        number = event.number,
        action = %event.action,
        "pull request accepted for review"
    );

    Ok(WebhookAck::accepted(format!(
        "pull request {}#{} accepted for review",
        event.repository.full_name, event.number
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hmac::{Hmac, Mac};
    use proptest::prelude::*;
    use sha2::Sha256;

    fn sign(body: &[u8], secret: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    fn request(body: &[u8], signature: Option<String>, event: Option<&str>) -> WebhookRequest {
        WebhookRequest {
            body: body.to_vec(),
            signature,
            event_type: event.map(str::to_string),
            delivery_id: Some("72d3162e-cc78-11e3-81ab-4c9367dc0958".to_string()),
        }
    }

    /// Replace one hex digit with a different one
    fn flip_hex_char(signature: &str, index: usize) -> String {
        let mut chars: Vec<char> = signature.chars().collect();
        chars[index] = if chars[index] == '0' { '1' } else { '0' };
        chars.into_iter().collect()
    }

    #[test]
    fn test_verify_valid_signature() {
        let body = br#"{"a":1}"#;
        assert!(verify_signature(body, &sign(body, "shh"), "shh"));
    }

    #[test]
    fn test_verify_empty_body() {
        assert!(verify_signature(b"", &sign(b"", "shh"), "shh"));
    }

    #[test]
    fn test_verify_any_flipped_bit_fails() {
        let body = br#"{"action":"opened"}"#;
        let signature = sign(body, "shh");
        let digest = hex::decode(&signature[7..]).unwrap();

        for byte in 0..digest.len() {
            for bit in 0..8 {
                let mut tampered = digest.clone();
                tampered[byte] ^= 1 << bit;
                let tampered = format!("sha256={}", hex::encode(tampered));
                assert!(!verify_signature(body, &tampered, "shh"), "byte {} bit {}", byte, bit);
            }
        }
    }

    #[test]
    fn test_verify_flipped_hex_char_fails() {
        let body = br#"{"a":1}"#;
        let signature = sign(body, "shh");
        assert!(!verify_signature(body, &flip_hex_char(&signature, 7), "shh"));
        assert!(!verify_signature(body, &flip_hex_char(&signature, signature.len() - 1), "shh"));
    }

    #[test]
    fn test_verify_wrong_secret_or_body() {
        let body = br#"{"a":1}"#;
        let signature = sign(body, "shh");
        assert!(!verify_signature(body, &signature, "other"));
        assert!(!verify_signature(br#"{"a":2}"#, &signature, "shh"));
    }

    #[test]
    fn test_verify_malformed_signatures() {
        let body = br#"{"a":1}"#;
        let valid = sign(body, "shh");
        let hex_part = &valid[7..];

        assert!(!verify_signature(body, "", "shh"));
        assert!(!verify_signature(body, "sha256=", "shh"));
        assert!(!verify_signature(body, hex_part, "shh"));
        assert!(!verify_signature(body, &format!("sha1={}", hex_part), "shh"));
        assert!(!verify_signature(body, &format!("SHA256={}", hex_part), "shh"));
        assert!(!verify_signature(body, &valid[..valid.len() - 1], "shh"));
        assert!(!verify_signature(body, &format!("{}0", valid), "shh"));
        assert!(!verify_signature(body, &format!("sha256={}", "z".repeat(64)), "shh"));
        assert!(!verify_signature(body, &format!(" {}", valid), "shh"));
        // 63 hex chars plus a multibyte char: right byte length, wrong shape
        assert!(!verify_signature(body, &format!("sha256={}é", &hex_part[..62]), "shh"));
    }

    #[test]
    fn test_verify_uppercase_hex_accepted() {
        let body = br#"{"a":1}"#;
        let signature = sign(body, "shh");
        let upper = format!("sha256={}", signature[7..].to_ascii_uppercase());
        assert!(verify_signature(body, &upper, "shh"));
    }

    #[test]
    fn test_verify_empty_secret_never_valid() {
        let body = br#"{"a":1}"#;
        assert!(!verify_signature(body, &sign(body, ""), ""));
    }

    #[test]
    fn test_policy_from_secret() {
        assert_eq!(SignaturePolicy::from_secret(Some("shh")), SignaturePolicy::Required("shh"));
        assert_eq!(SignaturePolicy::from_secret(Some("")), SignaturePolicy::Open);
        assert_eq!(SignaturePolicy::from_secret(None), SignaturePolicy::Open);
    }

    #[test]
    fn test_handle_accepts_signed_delivery() {
        let body = br#"{"a":1}"#;
        let ack = handle(&request(body, Some(sign(body, "shh")), None), SignaturePolicy::Required("shh"))
            .expect("signed delivery should be accepted");
        assert_eq!(ack.status, "ignored");
    }

    #[test]
    fn test_handle_rejects_tampered_signature() {
        let body = br#"{"a":1}"#;
        let tampered = flip_hex_char(&sign(body, "shh"), 10);
        let err = handle(&request(body, Some(tampered), None), SignaturePolicy::Required("shh")).unwrap_err();
        assert_eq!(err.status_code(), 401);
    }

    #[test]
    fn test_handle_rejects_missing_signature() {
        let err = handle(&request(br#"{"a":1}"#, None, Some("ping")), SignaturePolicy::Required("shh")).unwrap_err();
        assert_eq!(err.status_code(), 401);
        assert!(err.to_string().contains(SIGNATURE_HEADER));
    }

    #[test]
    fn test_handle_open_mode_skips_verification() {
        let ack = handle(&request(br#"{"zen":"hi"}"#, None, Some("ping")), SignaturePolicy::Open).unwrap();
        assert_eq!(ack, WebhookAck::accepted("pong"));
    }

    #[test]
    fn test_handle_rejects_non_json_after_auth() {
        let body = b"payload=%7B%7D";
        let err = handle(&request(body, Some(sign(body, "shh")), Some("push")), SignaturePolicy::Required("shh"))
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_pull_request_events() {
        let opened = br#"{"action":"opened","number":42,"repository":{"full_name":"lornu/app"}}"#;
        let ack = handle(&request(opened, Some(sign(opened, "shh")), Some("pull_request")), SignaturePolicy::Required("shh"))
            .unwrap();
        assert_eq!(ack.status, "accepted");
        assert_eq!(ack.message, "pull request lornu/app#42 accepted for review");

        let closed = br#"{"action":"closed","number":42,"repository":{"full_name":"lornu/app"}}"#;
        let ack = handle(&request(closed, None, Some("pull_request")), SignaturePolicy::Open).unwrap();
        assert_eq!(ack.status, "ignored");

        let malformed = br#"{"action":"opened"}"#;
        let err = handle(&request(malformed, None, Some("pull_request")), SignaturePolicy::Open).unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_other_events_ignored() {
        let ack = handle(&request(br#"{}"#, None, Some("push")), SignaturePolicy::Open).unwrap();
        assert_eq!(ack.status, "ignored");
        assert!(ack.message.contains("push"));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn prop_signed_body_verifies(
            body in proptest::collection::vec(any::<u8>(), 0..2048),
            secret in "\\PC{1,64}",
        ) {
            prop_assert!(verify_signature(&body, &sign(&body, &secret), &secret));
        }

        #[test]
        fn prop_flipped_bit_rejected(
            body in proptest::collection::vec(any::<u8>(), 0..2048),
            secret in "\\PC{1,64}",
            bit in 0usize..256,
        ) {
            let signature = sign(&body, &secret);
            let mut digest = hex::decode(&signature[7..]).unwrap();
            digest[bit / 8] ^= 1 << (bit % 8);
            let tampered = format!("sha256={}", hex::encode(digest));
            prop_assert!(!verify_signature(&body, &tampered, &secret));
        }

        #[test]
        fn prop_malformed_signature_rejected(
            body in proptest::collection::vec(any::<u8>(), 0..256),
            signature in "\\PC*",
        ) {
            let well_formed = signature
                .strip_prefix("sha256=")
                .map(|hex| hex.len() == 64 && hex.bytes().all(|b| b.is_ascii_hexdigit()))
                .unwrap_or(false);
            prop_assume!(!well_formed);
            prop_assert!(!verify_signature(&body, &signature, "shh"));
        }

        #[test]
        fn prop_prefixed_garbage_rejected(
            body in proptest::collection::vec(any::<u8>(), 0..256),
            tail in "[0-9a-fA-Fg-zG-Z]{0,80}",
        ) {
            let signature = format!("sha256={}", tail);
            prop_assume!(tail.len() != 64 || !tail.bytes().all(|b| b.is_ascii_hexdigit()));
            prop_assert!(!verify_signature(&body, &signature, "shh"));
        }
    }
}
