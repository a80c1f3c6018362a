//! `X-Hub-Signature-256` webhook signature verification.
//!
//! Meta signs every webhook delivery with HMAC-SHA256 over the raw request
//! body, keyed with the app secret, and sends the lowercase hex digest as
//! `sha256=<digest>`. The digest must be computed over the exact wire bytes,
//! never over re-serialized JSON.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::{error, info, warn};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";

/// Literal prefix in front of the hex digest.
pub const SIGNATURE_PREFIX: &str = "sha256=";

const NO_VERIFICATION: &str = "no-verification";

/// Outcome of a successful [`verify`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifiedToken {
    /// No secret is configured, so nothing was checked. Treat as unverified.
    Skipped,
    /// The hex digest received in the header, which matched the body.
    Signature(String),
}

impl VerifiedToken {
    /// String form: the digest, or the `"no-verification"` sentinel.
    pub fn as_str(&self) -> &str {
        match self {
            VerifiedToken::Skipped => NO_VERIFICATION,
            VerifiedToken::Signature(digest) => digest,
        }
    }

    /// Whether a signature was actually checked.
    pub fn is_verified(&self) -> bool {
        matches!(self, VerifiedToken::Signature(_))
    }
}

/// Reasons a webhook signature is rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Missing signature header")]
    MissingSignature,

    #[error("Invalid signature format")]
    InvalidSignatureFormat,

    #[error("Invalid signature")]
    InvalidSignature,

    /// Unexpected fault while reading the body or computing the digest.
    #[error("Signature verification error: {0}")]
    Verification(String),
}

impl SignatureError {
    /// HTTP status the request layer answers with: 401 for authentication
    /// failures, 500 for unexpected faults.
    pub fn status_code(&self) -> u16 {
        match self {
            SignatureError::Verification(_) => 500,
            _ => 401,
        }
    }

    /// Message safe to return to the caller.
    pub fn detail(&self) -> &'static str {
        match self {
            SignatureError::MissingSignature => "Missing signature header",
            SignatureError::InvalidSignatureFormat => "Invalid signature format",
            SignatureError::InvalidSignature => "Invalid signature",
            SignatureError::Verification(_) => "Signature verification error",
        }
    }
}

fn hex_digest(secret: &str, payload: &[u8]) -> Result<String, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| SignatureError::Verification(e.to_string()))?;
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verify a webhook body against its `X-Hub-Signature-256` header.
///
/// An absent or empty `secret` disables verification and yields
/// [`VerifiedToken::Skipped`].
pub fn verify(
    secret: Option<&str>,
    raw_body: &[u8],
    signature_header: Option<&str>,
) -> Result<VerifiedToken, SignatureError> {
    let Some(secret) = secret.filter(|s| !s.is_empty()) else {
        warn!("Webhook secret not configured, skipping signature verification");
        return Ok(VerifiedToken::Skipped);
    };

    let Some(header) = signature_header else {
        error!("Missing {} header", SIGNATURE_HEADER);
        return Err(SignatureError::MissingSignature);
    };

    let Some(received) = header.strip_prefix(SIGNATURE_PREFIX) else {
        error!("Invalid signature format");
        return Err(SignatureError::InvalidSignatureFormat);
    };

    let expected = hex_digest(secret, raw_body).inspect_err(|e| {
        error!(error = %e, "Error verifying webhook signature");
    })?;

    // Length mismatches also compare unequal.
    if !bool::from(expected.as_bytes().ct_eq(received.as_bytes())) {
        error!("Signature verification failed");
        return Err(SignatureError::InvalidSignature);
    }

    info!("Webhook signature verified successfully");
    Ok(VerifiedToken::Signature(received.to_string()))
}

/// Build a `sha256=<hex>` header value for `payload`, as the platform would.
pub fn generate_signature(payload: &[u8], secret: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(payload);
    format!(
        "{}{}",
        SIGNATURE_PREFIX,
        hex::encode(mac.finalize().into_bytes())
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "testsecret";

    #[test]
    fn test_generate_signature_format() {
        let sig = generate_signature(b"hello", SECRET);
        let digest = sig.strip_prefix("sha256=").unwrap();
        assert_eq!(digest.len(), 64);
        assert!(digest
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_known_vector() {
        // RFC 4231 test case 2
        let sig = generate_signature(b"what do ya want for nothing?", "Jefe");
        assert_eq!(
            sig,
            "sha256=5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_round_trip_returns_digest() {
        let body = br#"{"object":"whatsapp_business_account","entry":[]}"#;
        let header = generate_signature(body, SECRET);

        let token = verify(Some(SECRET), body, Some(&header)).unwrap();
        assert!(token.is_verified());
        assert_eq!(token.as_str(), &header[7..]);
    }

    #[test]
    fn test_flipped_body_byte_rejected() {
        let body = b"hello world".to_vec();
        let header = generate_signature(&body, SECRET);

        for i in 0..body.len() {
            let mut tampered = body.clone();
            tampered[i] ^= 0x01;
            assert_eq!(
                verify(Some(SECRET), &tampered, Some(&header)),
                Err(SignatureError::InvalidSignature),
                "byte {} flipped",
                i
            );
        }
    }

    #[test]
    fn test_no_secret_skips_verification() {
        for secret in [None, Some("")] {
            for header in [None, Some("garbage"), Some("sha256=00")] {
                let token = verify(secret, b"anything", header).unwrap();
                assert_eq!(token, VerifiedToken::Skipped);
                assert_eq!(token.as_str(), "no-verification");
                assert!(!token.is_verified());
            }
        }
    }

    #[test]
    fn test_missing_header() {
        assert_eq!(
            verify(Some(SECRET), b"hello", None),
            Err(SignatureError::MissingSignature)
        );
    }

    #[test]
    fn test_wrong_prefix_even_with_valid_digest() {
        let header = generate_signature(b"hello", SECRET);
        let digest = &header[7..];

        for bad in [
            digest.to_string(),
            format!("sha1={}", digest),
            format!("SHA256={}", digest),
        ] {
            assert_eq!(
                verify(Some(SECRET), b"hello", Some(&bad)),
                Err(SignatureError::InvalidSignatureFormat)
            );
        }
    }

    #[test]
    fn test_truncated_digest_rejected() {
        let header = generate_signature(b"hello", SECRET);
        let truncated = &header[..header.len() - 1];

        assert_eq!(
            verify(Some(SECRET), b"hello", Some(truncated)),
            Err(SignatureError::InvalidSignature)
        );
    }

    #[test]
    fn test_empty_digest_rejected() {
        assert_eq!(
            verify(Some(SECRET), b"hello", Some("sha256=")),
            Err(SignatureError::InvalidSignature)
        );
    }

    #[test]
    fn test_uppercase_digest_rejected() {
        let header = generate_signature(b"hello", SECRET);
        let upper = format!("sha256={}", header[7..].to_uppercase());

        assert_eq!(
            verify(Some(SECRET), b"hello", Some(&upper)),
            Err(SignatureError::InvalidSignature)
        );
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let header = generate_signature(b"hello", "other-secret");
        assert_eq!(
            verify(Some(SECRET), b"hello", Some(&header)),
            Err(SignatureError::InvalidSignature)
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(SignatureError::MissingSignature.status_code(), 401);
        assert_eq!(SignatureError::InvalidSignatureFormat.status_code(), 401);
        assert_eq!(SignatureError::InvalidSignature.status_code(), 401);
        assert_eq!(
            SignatureError::Verification("boom".to_string()).status_code(),
            500
        );
    }
}
