//! Billing webhook signature scheme
//!
//! The billing processor signs every notification it delivers. The
//! `Stripe-Signature` header carries a unix timestamp and one or more
//! `v1` signatures:
//!
//! ```text
//! t=1730000000,v1=5257a869e7ecebeda32affa62cdca3fa51cad7e77a0e56ff536d0ce8e108d8bd
//! ```
//!
//! Each `v1` value is `hex(HMAC-SHA256(secret, "<t>.<raw body>"))`.
//! A notification is accepted when any `v1` matches and `t` is within the
//! tolerance window of the current time.
//!
//! # Pure Functions
//!
//! The current time is passed in by the caller so verification is
//! deterministic under test.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Maximum accepted age (and future skew) of a signature timestamp
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Signature verification failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// Header could not be parsed
    #[error("Malformed signature header: {0}")]
    MalformedHeader(String),

    /// Header parsed but carried no `v1` signature
    #[error("No v1 signature in header")]
    NoSignatures,

    /// Timestamp outside the tolerance window
    #[error("Timestamp outside tolerance: {timestamp} (now {now}, tolerance {tolerance}s)")]
    TimestampOutOfTolerance {
        timestamp: i64,
        now: i64,
        tolerance: i64,
    },

    /// No signature matched the payload
    #[error("No signature matches the expected signature for payload")]
    Mismatch,

    /// Secret is empty
    #[error("Webhook secret is empty")]
    EmptySecret,
}

/// Parsed `Stripe-Signature` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    pub signatures: Vec<String>,
}

impl SignatureHeader {
    /// Parse `t=<unix>,v1=<hex>[,v1=<hex>...]`
    ///
    /// Unknown schemes (e.g. `v0`) are skipped.
    pub fn parse(header: &str) -> Result<Self, SignatureError> {
        let mut timestamp = None;
        let mut signatures = Vec::new();

        for item in header.split(',') {
            let (key, value) = item
                .trim()
                .split_once('=')
                .ok_or_else(|| SignatureError::MalformedHeader(item.to_string()))?;

            match key {
                "t" => {
                    let t = value.parse::<i64>().map_err(|e| {
                        SignatureError::MalformedHeader(format!("Invalid timestamp: {}", e))
                    })?;
                    timestamp = Some(t);
                }
                "v1" => signatures.push(value.to_string()),
                _ => {}
            }
        }

        let timestamp = timestamp
            .ok_or_else(|| SignatureError::MalformedHeader("Missing timestamp".to_string()))?;

        if signatures.is_empty() {
            return Err(SignatureError::NoSignatures);
        }

        Ok(Self {
            timestamp,
            signatures,
        })
    }
}

fn mac_for(secret: &str, timestamp: i64, payload: &[u8]) -> Result<HmacSha256, SignatureError> {
    if secret.is_empty() {
        return Err(SignatureError::EmptySecret);
    }

    // HMAC accepts keys of any length
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| SignatureError::EmptySecret)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Compute the hex `v1` signature for a payload
///
/// # Examples
///
/// ```
/// use chronicle_common::api::signature::compute_signature;
///
/// let sig = compute_signature("whsec_test", 1730000000, b"{}").unwrap();
/// assert_eq!(sig.len(), 64); // SHA-256 is 64 hex chars
/// ```
pub fn compute_signature(
    secret: &str,
    timestamp: i64,
    payload: &[u8],
) -> Result<String, SignatureError> {
    let mac = mac_for(secret, timestamp, payload)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Build a complete signature header value for a payload
///
/// Used by tests and local tooling that replay notifications.
pub fn sign_payload(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String, SignatureError> {
    let signature = compute_signature(secret, timestamp, payload)?;
    Ok(format!("t={},v1={}", timestamp, signature))
}

/// Verify a raw notification body against its signature header
///
/// Comparison is constant-time. `now` is unix seconds.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<SignatureHeader, SignatureError> {
    let parsed = SignatureHeader::parse(header)?;

    if (now - parsed.timestamp).abs() > tolerance_secs {
        return Err(SignatureError::TimestampOutOfTolerance {
            timestamp: parsed.timestamp,
            now,
            tolerance: tolerance_secs,
        });
    }

    for candidate in &parsed.signatures {
        let Ok(bytes) = hex::decode(candidate) else {
            continue;
        };
        let mac = mac_for(secret, parsed.timestamp, payload)?;
        if mac.verify_slice(&bytes).is_ok() {
            return Ok(parsed);
        }
    }

    Err(SignatureError::Mismatch)
}
