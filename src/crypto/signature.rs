use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};

use hmac::{Hmac, Mac};

use sha2::Sha256;

use super::WebhookKey;

/// Key of the Unix timestamp entry in a signature header
const TIMESTAMP_KEY: &str = "t";
/// The only signature scheme accepted for live events
const SIGNATURE_SCHEME: &str = "v1";

/// Default tolerance between the signed timestamp and the time of verification
pub const DEFAULT_TOLERANCE_SECONDS: i64 = 300;
/// Largest tolerance accepted from configuration (one week)
pub const MAX_TOLERANCE_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Various errors that can occur when verifying a webhook signature
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("No signature header found on request")]
    MissingHeader,
    #[error("Unable to extract timestamp and signatures from header")]
    MalformedHeader,
    #[error("No signatures found matching the expected signature for payload")]
    SignatureMismatch,
    #[error("Timestamp outside the tolerance zone")]
    Expired,
}

/// Wrapper for signature results
pub type SignatureResult<T> = Result<T, SignatureError>;

/// A parsed signature header of the form `t=<unix>,v1=<hex>[,v1=<hex>...]`
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

impl FromStr for SignatureHeader {
    type Err = SignatureError;

    fn from_str(header: &str) -> SignatureResult<Self> {
        let mut timestamp = None;
        let mut signatures = Vec::new();

        for pair in header.split(',') {
            let Some((key, value)) = pair.trim().split_once('=') else {
                continue;
            };
            match key {
                TIMESTAMP_KEY => timestamp = value.parse::<i64>().ok(),
                // Undecodable signatures can never match, so they are skipped
                SIGNATURE_SCHEME => {
                    if let Ok(signature) = hex::decode(value) {
                        signatures.push(signature);
                    }
                }
                _ => {}
            }
        }

        match timestamp {
            Some(timestamp) if !signatures.is_empty() => Ok(Self {
                timestamp,
                signatures,
            }),
            _ => Err(SignatureError::MalformedHeader),
        }
    }
}

/// Verifies that webhook payloads were signed with the endpoint secret
#[derive(Clone)]
pub struct WebhookVerifier {
    key: WebhookKey,
    tolerance: Duration,
}

impl WebhookVerifier {
    /// Create a verifier. A zero tolerance disables the timestamp check.
    pub fn new(key: WebhookKey, tolerance: Duration) -> Self {
        Self { key, tolerance }
    }

    /// Verify the exact payload bytes against the signature header value
    pub fn verify(&self, payload: &[u8], header: Option<&str>) -> SignatureResult<()> {
        self.verify_at(payload, header, Utc::now())
    }

    fn verify_at(
        &self,
        payload: &[u8],
        header: Option<&str>,
        now: DateTime<Utc>,
    ) -> SignatureResult<()> {
        let header: SignatureHeader = header.ok_or(SignatureError::MissingHeader)?.parse()?;

        // `verify_slice` compares in constant time
        let matched = header.signatures.iter().any(|signature| {
            self.signed_payload_mac(header.timestamp, payload)
                .verify_slice(signature)
                .is_ok()
        });
        if !matched {
            return Err(SignatureError::SignatureMismatch);
        }

        if self.tolerance > Duration::zero() {
            // No representable cutoff means every past timestamp is within tolerance
            let expired = now
                .checked_sub_signed(self.tolerance)
                .map_or(false, |cutoff| header.timestamp < cutoff.timestamp());
            if expired {
                return Err(SignatureError::Expired);
            }
        }

        Ok(())
    }

    /// Produce a valid signature header for a payload signed at `timestamp`
    pub fn signature_header(&self, timestamp: i64, payload: &[u8]) -> String {
        let signature = self
            .signed_payload_mac(timestamp, payload)
            .finalize()
            .into_bytes();

        format!(
            "{}={},{}={}",
            TIMESTAMP_KEY,
            timestamp,
            SIGNATURE_SCHEME,
            hex::encode(signature)
        )
    }

    /// MAC over `"{timestamp}." ++ payload`
    fn signed_payload_mac(&self, timestamp: i64, payload: &[u8]) -> Hmac<Sha256> {
        let mut mac = self.key.as_ref().clone();
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        mac
    }
}
