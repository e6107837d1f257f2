//! `Stripe-Signature` verification.
//!
//! The header looks like `t=1700000000,v1=5257a8...,v0=...`. Each `v1` is
//! `hex(HMAC-SHA256(secret, "<t>.<raw body>"))`; Stripe sends several while a
//! secret is being rolled, and any one of them may match.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const TIMESTAMP_KEY: &str = "t";
const SIGNATURE_KEY: &str = "v1";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("Webhook secret is not configured")]
    EmptySecret,
    #[error("Missing timestamp")]
    MissingTimestamp,
    #[error("Missing v1 signature")]
    MissingSignature,
    #[error("Invalid timestamp")]
    InvalidTimestamp,
    #[error("Timestamp outside tolerance ({age}s old)")]
    Expired { age: i64 },
    #[error("No signature matches the payload")]
    Mismatch,
}

/// Verifies `header` against the raw request body.
///
/// `now` is a unix timestamp in seconds; deliveries signed more than
/// `tolerance` seconds away from it are rejected.
///
/// # Errors
/// Returns the first check that failed.
pub fn verify_webhook_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance: u64,
    now: i64,
) -> Result<(), SignatureError> {
    if secret.is_empty() {
        return Err(SignatureError::EmptySecret);
    }

    let mut timestamp = None;
    let mut signatures = Vec::new();
    for (key, value) in header.split(',').filter_map(|part| part.trim().split_once('=')) {
        match key {
            TIMESTAMP_KEY if timestamp.is_none() => timestamp = Some(value),
            SIGNATURE_KEY => signatures.push(value),
            _ => {},
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MissingTimestamp)?;
    if signatures.is_empty() {
        return Err(SignatureError::MissingSignature);
    }

    let signed_at: i64 = timestamp.parse().map_err(|_| SignatureError::InvalidTimestamp)?;
    let age = now.saturating_sub(signed_at);
    if age.unsigned_abs() > tolerance {
        return Err(SignatureError::Expired { age });
    }

    let mac = signed_mac(secret, timestamp, payload);
    let matched = signatures
        .iter()
        .filter_map(|sig| hex::decode(sig).ok())
        .any(|expected| mac.clone().verify_slice(&expected).is_ok());

    if matched { Ok(()) } else { Err(SignatureError::Mismatch) }
}

/// Produces a header value Stripe would send for `payload` at `timestamp`.
#[must_use]
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let signature = signed_mac(secret, &timestamp.to_string(), payload).finalize().into_bytes();
    format!("{TIMESTAMP_KEY}={timestamp},{SIGNATURE_KEY}={}", hex::encode(signature))
}

fn signed_mac(secret: &str, timestamp: &str, payload: &[u8]) -> HmacSha256 {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC takes keys of any size"));
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    mac
}
