use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Default timestamp tolerance for webhook signatures, in seconds.
pub const DEFAULT_TOLERANCE_SECONDS: i64 = 300;

/// Why a `layercode-signature` header failed verification.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("malformed signature header")]
    MalformedHeader,
    #[error("signature header missing required fields")]
    MissingFields,
    #[error("invalid timestamp in signature header")]
    InvalidTimestamp,
    #[error("signature timestamp outside tolerance window")]
    TimestampOutOfTolerance,
    #[error("signature mismatch")]
    Mismatch,
}

/// Verify a webhook signature header against the raw request body.
///
/// Header grammar: comma-separated `key=value` pairs containing at least
/// `t` (decimal unix seconds) and `v1` (hex HMAC-SHA256 of `"<t>.<body>"`).
/// Unknown keys are ignored. The MAC comparison is constant-time.
pub fn verify_signature(
    payload: &str,
    signature_header: &str,
    secret: &str,
    tolerance_seconds: i64,
) -> Result<(), SignatureError> {
    let mut timestamp_str: Option<&str> = None;
    let mut provided_sig: Option<&str> = None;

    for part in signature_header.split(',') {
        let (key, value) = part
            .trim()
            .split_once('=')
            .ok_or(SignatureError::MalformedHeader)?;
        match key {
            "t" => timestamp_str = Some(value),
            "v1" => provided_sig = Some(value),
            _ => {}
        }
    }

    let (timestamp_str, provided_sig) = match (timestamp_str, provided_sig) {
        (Some(t), Some(v)) if !t.is_empty() && !v.is_empty() => (t, v),
        _ => return Err(SignatureError::MissingFields),
    };

    let timestamp: i64 = timestamp_str
        .parse()
        .map_err(|_| SignatureError::InvalidTimestamp)?;

    let now = Utc::now().timestamp();
    if (now - timestamp).abs() > tolerance_seconds {
        return Err(SignatureError::TimestampOutOfTolerance);
    }

    let provided = hex::decode(provided_sig).map_err(|_| SignatureError::Mismatch)?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| SignatureError::Mismatch)?;
    mac.update(timestamp_str.as_bytes());
    mac.update(b".");
    mac.update(payload.as_bytes());

    // Mac::verify_slice is constant-time.
    mac.verify_slice(&provided)
        .map_err(|_| SignatureError::Mismatch)
}

/// Produce a valid signature header for a body at the given unix timestamp.
/// Counterpart of [`verify_signature`]; used by tests and local tooling.
pub fn sign_payload(payload: &str, secret: &str, timestamp: i64) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload.as_bytes());
    let digest = hex::encode(mac.finalize().into_bytes());
    format!("t={timestamp},v1={digest}")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";

    fn signed(payload: &str) -> String {
        sign_payload(payload, SECRET, Utc::now().timestamp())
    }

    #[test]
    fn valid_signature_verifies() {
        let payload = r#"{"type":"message"}"#;
        let header = signed(payload);
        verify_signature(payload, &header, SECRET, DEFAULT_TOLERANCE_SECONDS).unwrap();
    }

    #[test]
    fn single_character_mutation_fails() {
        let payload = r#"{"type":"message"}"#;
        let header = signed(payload);
        let (prefix, mac) = header.split_at(header.len() - 1);
        let flipped = if mac == "0" { "1" } else { "0" };
        let tampered = format!("{prefix}{flipped}");
        assert_eq!(
            verify_signature(payload, &tampered, SECRET, DEFAULT_TOLERANCE_SECONDS),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn wrong_secret_fails() {
        let payload = "body";
        let header = signed(payload);
        assert_eq!(
            verify_signature(payload, &header, "other-secret", DEFAULT_TOLERANCE_SECONDS),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn modified_payload_fails() {
        let header = signed("original");
        assert_eq!(
            verify_signature("modified", &header, SECRET, DEFAULT_TOLERANCE_SECONDS),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn malformed_header_fails() {
        assert_eq!(
            verify_signature("body", "garbage-without-pairs", SECRET, 300),
            Err(SignatureError::MalformedHeader)
        );
    }

    #[test]
    fn missing_fields_fail() {
        let ts = Utc::now().timestamp();
        assert_eq!(
            verify_signature("body", &format!("t={ts}"), SECRET, 300),
            Err(SignatureError::MissingFields)
        );
        assert_eq!(
            verify_signature("body", "v1=abcdef", SECRET, 300),
            Err(SignatureError::MissingFields)
        );
    }

    #[test]
    fn non_integer_timestamp_fails() {
        assert_eq!(
            verify_signature("body", "t=yesterday,v1=abcdef", SECRET, 300),
            Err(SignatureError::InvalidTimestamp)
        );
    }

    #[test]
    fn stale_timestamp_fails() {
        let old = Utc::now().timestamp() - 1000;
        let header = sign_payload("body", SECRET, old);
        assert_eq!(
            verify_signature("body", &header, SECRET, DEFAULT_TOLERANCE_SECONDS),
            Err(SignatureError::TimestampOutOfTolerance)
        );
    }

    #[test]
    fn future_timestamp_outside_tolerance_fails() {
        let future = Utc::now().timestamp() + 1000;
        let header = sign_payload("body", SECRET, future);
        assert_eq!(
            verify_signature("body", &header, SECRET, DEFAULT_TOLERANCE_SECONDS),
            Err(SignatureError::TimestampOutOfTolerance)
        );
    }

    #[test]
    fn unknown_header_keys_are_ignored() {
        let payload = "body";
        let ts = Utc::now().timestamp();
        let base = sign_payload(payload, SECRET, ts);
        let with_extra = format!("v0=legacy,{base}");
        verify_signature(payload, &with_extra, SECRET, DEFAULT_TOLERANCE_SECONDS).unwrap();
    }
}
