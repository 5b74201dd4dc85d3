//! Webhook signature verification.
//!
//! Gateways sign `"{t}.{raw body}"` with HMAC-SHA256 and send
//! `t=<unix secs>,v1=<hex digest>` in a header. Verification runs on the raw
//! request bytes; a re-serialized body will not verify.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::domain::foundation::Timestamp;

type HmacSha256 = Hmac<Sha256>;

/// Replay window: signatures whose timestamp is further than this from `now`
/// (in either direction) are rejected.
pub const REPLAY_TOLERANCE_SECS: i64 = 300;

/// Reason a signature was rejected. Only used for internal diagnostics; the
/// public surface is the boolean [`verify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureRejection {
    MalformedHeader,
    MissingTimestamp,
    MissingDigest,
    EmptySecret,
    Stale,
    Mismatch,
}

/// Parsed components of a signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    /// Unix timestamp the gateway signed.
    pub timestamp: i64,
    /// Every `v1` digest present. Gateways send more than one while
    /// rotating secrets.
    pub v1_digests: Vec<Vec<u8>>,
}

impl SignatureHeader {
    /// Parses `t=<timestamp>,v1=<hex>[,v1=<hex>...]`. Unknown keys are ignored.
    pub fn parse(header: &str) -> Result<Self, SignatureRejection> {
        let mut timestamp: Option<i64> = None;
        let mut v1_digests = Vec::new();

        for part in header.split(',') {
            let (key, value) = part
                .trim()
                .split_once('=')
                .ok_or(SignatureRejection::MalformedHeader)?;

            match key {
                "t" => {
                    timestamp = Some(
                        value
                            .parse()
                            .map_err(|_| SignatureRejection::MalformedHeader)?,
                    );
                }
                "v1" => {
                    let digest =
                        hex::decode(value).map_err(|_| SignatureRejection::MalformedHeader)?;
                    v1_digests.push(digest);
                }
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or(SignatureRejection::MissingTimestamp)?;
        if v1_digests.is_empty() {
            return Err(SignatureRejection::MissingDigest);
        }

        Ok(SignatureHeader {
            timestamp,
            v1_digests,
        })
    }
}

/// Returns true when `signature_header` authenticates `raw_payload` under
/// `secret` and its timestamp is within [`REPLAY_TOLERANCE_SECS`] of `now`.
///
/// Never panics; every failure is `false`.
pub fn verify(signature_header: &str, secret: &str, raw_payload: &[u8], now: Timestamp) -> bool {
    check(signature_header, secret, raw_payload, now).is_ok()
}

/// Same as [`verify`] but reports which check failed.
pub fn check(
    signature_header: &str,
    secret: &str,
    raw_payload: &[u8],
    now: Timestamp,
) -> Result<(), SignatureRejection> {
    if secret.is_empty() {
        return Err(SignatureRejection::EmptySecret);
    }

    let header = SignatureHeader::parse(signature_header)?;

    let skew = now.as_unix_secs().saturating_sub(header.timestamp);
    if skew.checked_abs().map_or(true, |s| s > REPLAY_TOLERANCE_SECS) {
        return Err(SignatureRejection::Stale);
    }

    let expected =
        compute_digest(secret, header.timestamp, raw_payload).ok_or(SignatureRejection::Mismatch)?;

    let matched = header
        .v1_digests
        .iter()
        .fold(false, |acc, candidate| acc | constant_time_eq(&expected, candidate));

    if matched {
        Ok(())
    } else {
        Err(SignatureRejection::Mismatch)
    }
}

/// Builds a signature header for `raw_payload`, as a gateway would.
pub fn sign(secret: &str, timestamp: i64, raw_payload: &[u8]) -> String {
    let digest = compute_digest(secret, timestamp, raw_payload)
        .map(hex::encode)
        .unwrap_or_default();
    format!("t={},v1={}", timestamp, digest)
}

fn compute_digest(secret: &str, timestamp: i64, raw_payload: &[u8]) -> Option<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(raw_payload);
    Some(mac.finalize().into_bytes().to_vec())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
