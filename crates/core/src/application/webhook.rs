// Webhook signature verification (Ed25519 over `timestamp.body`)

use crate::domain::Headers;
use crate::port::{KeyCache, PublicKeyFetcher, TimeProvider};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub const SIGNATURE_HEADER: &str = "x-fal-signature";
pub const TIMESTAMP_HEADER: &str = "x-fal-timestamp";
pub const PUBLIC_KEY_URL: &str = "https://fal.run/webhook/keys";
pub const PUBLIC_KEY_CACHE_KEY: &str = "fal_webhook_public_key";

/// Maximum allowed clock skew between sender and receiver
pub const TIMESTAMP_TOLERANCE_SECS: i64 = 300;
pub const PUBLIC_KEY_TTL: Duration = Duration::from_secs(3600);

/// Preconditions that make a webhook unverifiable.
///
/// A signature that is present but wrong is not an error; `verify` returns
/// `Ok(false)` for it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    #[error("missing headers")]
    MissingHeaders,

    #[error("timestamp outside tolerance")]
    TimestampOutsideTolerance,

    #[error("public key unavailable")]
    PublicKeyUnavailable,
}

#[derive(Deserialize)]
struct KeyDocument {
    public_key: Option<String>,
}

/// Verifies webhook notifications against the published Ed25519 key
pub struct WebhookVerifier {
    cache: Arc<dyn KeyCache>,
    fetcher: Arc<dyn PublicKeyFetcher>,
    time_provider: Arc<dyn TimeProvider>,
    key_url: String,
}

impl WebhookVerifier {
    pub fn new(
        cache: Arc<dyn KeyCache>,
        fetcher: Arc<dyn PublicKeyFetcher>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            cache,
            fetcher,
            time_provider,
            key_url: PUBLIC_KEY_URL.to_string(),
        }
    }

    pub fn with_key_url(mut self, url: impl Into<String>) -> Self {
        self.key_url = url.into();
        self
    }

    /// Verify a webhook body against its signature headers
    ///
    /// # Errors
    ///
    /// - `MissingHeaders` if either header is absent or empty
    /// - `TimestampOutsideTolerance` if the timestamp is more than 300 s away
    ///   from now (or not a number)
    /// - `PublicKeyUnavailable` if the key can't be fetched or decoded
    pub fn verify(&self, body: &[u8], headers: &Headers) -> Result<bool, VerificationError> {
        let signature = non_empty_header(headers, SIGNATURE_HEADER)?;
        let timestamp = non_empty_header(headers, TIMESTAMP_HEADER)?;

        let sent_at: i64 = timestamp
            .trim()
            .parse()
            .map_err(|_| VerificationError::TimestampOutsideTolerance)?;
        let now = self.time_provider.now_secs();
        if now.abs_diff(sent_at) > TIMESTAMP_TOLERANCE_SECS.unsigned_abs() {
            debug!(sent_at, now, "Webhook timestamp outside tolerance");
            return Err(VerificationError::TimestampOutsideTolerance);
        }

        let key = self.public_key()?;

        let signature = match STANDARD
            .decode(signature.trim())
            .ok()
            .and_then(|bytes| Signature::from_slice(&bytes).ok())
        {
            Some(signature) => signature,
            None => {
                debug!("Webhook signature is not a base64 Ed25519 signature");
                return Ok(false);
            }
        };

        let mut message = Vec::with_capacity(timestamp.len() + 1 + body.len());
        message.extend_from_slice(timestamp.as_bytes());
        message.push(b'.');
        message.extend_from_slice(body);

        Ok(key.verify(&message, &signature).is_ok())
    }

    fn public_key(&self) -> Result<VerifyingKey, VerificationError> {
        let encoded = match self.cache.get(PUBLIC_KEY_CACHE_KEY) {
            Some(cached) => cached,
            None => {
                let fetched = self.fetch_public_key()?;
                self.cache.set(PUBLIC_KEY_CACHE_KEY, &fetched, PUBLIC_KEY_TTL);
                fetched
            }
        };
        decode_public_key(&encoded).ok_or(VerificationError::PublicKeyUnavailable)
    }

    fn fetch_public_key(&self) -> Result<String, VerificationError> {
        debug!(url = %self.key_url, "Fetching webhook public key");
        let body = self.fetcher.fetch(&self.key_url).map_err(|e| {
            warn!(error = %e, "Failed to fetch webhook public key");
            VerificationError::PublicKeyUnavailable
        })?;

        let document: KeyDocument = serde_json::from_slice(&body).map_err(|e| {
            warn!(error = %e, "Webhook key document is not valid JSON");
            VerificationError::PublicKeyUnavailable
        })?;

        document
            .public_key
            .filter(|key| !key.trim().is_empty())
            .ok_or(VerificationError::PublicKeyUnavailable)
    }
}

fn non_empty_header<'h>(headers: &'h Headers, name: &str) -> Result<&'h str, VerificationError> {
    headers
        .get(name)
        .filter(|value| !value.trim().is_empty())
        .ok_or(VerificationError::MissingHeaders)
}

fn decode_public_key(encoded: &str) -> Option<VerifyingKey> {
    let bytes: [u8; 32] = STANDARD.decode(encoded.trim()).ok()?.try_into().ok()?;
    VerifyingKey::from_bytes(&bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::key_fetcher::MockPublicKeyFetcher;
    use crate::port::time_provider::mocks::FixedTimeProvider;
    use crate::port::{MemoryKeyCache, TransportError};
    use ed25519_dalek::{Signer, SigningKey};
    use serde_json::json;

    const NOW: i64 = 1_700_000_000;
    const BODY: &[u8] = br#"{"request_id":"r1","status":"OK"}"#;

    fn signing_key() -> SigningKey {
        SigningKey::from_bytes(&[7u8; 32])
    }

    fn key_document(key: &SigningKey) -> Vec<u8> {
        json!({ "public_key": STANDARD.encode(key.verifying_key().to_bytes()) })
            .to_string()
            .into_bytes()
    }

    fn signed_headers(key: &SigningKey, timestamp: i64, body: &[u8]) -> Headers {
        let mut message = format!("{}.", timestamp).into_bytes();
        message.extend_from_slice(body);
        let signature = STANDARD.encode(key.sign(&message).to_bytes());
        Headers::new()
            .with("X-Fal-Signature", signature)
            .with("X-Fal-Timestamp", timestamp.to_string())
    }

    fn fetcher_returning(document: Vec<u8>, times: usize) -> MockPublicKeyFetcher {
        let mut fetcher = MockPublicKeyFetcher::new();
        fetcher
            .expect_fetch()
            .withf(|url| url.ends_with("/webhook/keys"))
            .times(times)
            .returning(move |_| Ok(document.clone()));
        fetcher
    }

    fn verifier(fetcher: MockPublicKeyFetcher, clock: Arc<FixedTimeProvider>) -> WebhookVerifier {
        let cache = Arc::new(MemoryKeyCache::with_time_provider(clock.clone()));
        WebhookVerifier::new(cache, Arc::new(fetcher), clock)
    }

    #[test]
    fn test_valid_signature() {
        let key = signing_key();
        let clock = Arc::new(FixedTimeProvider::at_secs(NOW));
        let verifier = verifier(fetcher_returning(key_document(&key), 1), clock);

        let headers = signed_headers(&key, NOW - 299, BODY);
        assert_eq!(verifier.verify(BODY, &headers), Ok(true));
    }

    #[test]
    fn test_timestamp_outside_tolerance() {
        let key = signing_key();
        let clock = Arc::new(FixedTimeProvider::at_secs(NOW));
        let verifier = verifier(fetcher_returning(key_document(&key), 0), clock);

        for timestamp in [NOW - 301, NOW + 301] {
            let headers = signed_headers(&key, timestamp, BODY);
            assert_eq!(
                verifier.verify(BODY, &headers),
                Err(VerificationError::TimestampOutsideTolerance)
            );
        }
    }

    #[test]
    fn test_non_numeric_timestamp() {
        let clock = Arc::new(FixedTimeProvider::at_secs(NOW));
        let verifier = verifier(fetcher_returning(Vec::new(), 0), clock);
        let headers = Headers::new()
            .with("x-fal-signature", "c2ln")
            .with("x-fal-timestamp", "yesterday");
        assert_eq!(
            verifier.verify(BODY, &headers),
            Err(VerificationError::TimestampOutsideTolerance)
        );
    }

    #[test]
    fn test_missing_or_empty_headers() {
        let clock = Arc::new(FixedTimeProvider::at_secs(NOW));
        let verifier = verifier(fetcher_returning(Vec::new(), 0), clock);

        let cases = [
            Headers::new(),
            Headers::new().with("x-fal-signature", "c2ln"),
            Headers::new().with("x-fal-timestamp", NOW.to_string()),
            Headers::new()
                .with("x-fal-signature", "")
                .with("x-fal-timestamp", NOW.to_string()),
        ];
        for headers in cases {
            let err = verifier.verify(BODY, &headers).unwrap_err();
            assert_eq!(err, VerificationError::MissingHeaders);
            assert_eq!(err.to_string(), "missing headers");
        }
    }

    #[test]
    fn test_tampered_body_is_false() {
        let key = signing_key();
        let clock = Arc::new(FixedTimeProvider::at_secs(NOW));
        let verifier = verifier(fetcher_returning(key_document(&key), 1), clock);

        let headers = signed_headers(&key, NOW, BODY);
        assert_eq!(verifier.verify(b"{\"status\":\"ERROR\"}", &headers), Ok(false));
    }

    #[test]
    fn test_undecodable_signature_is_false() {
        let key = signing_key();
        let clock = Arc::new(FixedTimeProvider::at_secs(NOW));
        let verifier = verifier(fetcher_returning(key_document(&key), 1), clock);

        for signature in ["not base64!!", "c2hvcnQ="] {
            let headers = Headers::new()
                .with("x-fal-signature", signature)
                .with("x-fal-timestamp", NOW.to_string());
            assert_eq!(verifier.verify(BODY, &headers), Ok(false));
        }
    }

    #[test]
    fn test_public_key_is_cached() {
        let key = signing_key();
        let clock = Arc::new(FixedTimeProvider::at_secs(NOW));
        let verifier = verifier(fetcher_returning(key_document(&key), 1), clock.clone());

        for _ in 0..3 {
            let headers = signed_headers(&key, clock.now_secs(), BODY);
            assert_eq!(verifier.verify(BODY, &headers), Ok(true));
            clock.advance_secs(60);
        }
    }

    #[test]
    fn test_public_key_refetched_after_expiry() {
        let key = signing_key();
        let clock = Arc::new(FixedTimeProvider::at_secs(NOW));
        let verifier = verifier(fetcher_returning(key_document(&key), 2), clock.clone());

        let headers = signed_headers(&key, NOW, BODY);
        assert_eq!(verifier.verify(BODY, &headers), Ok(true));

        clock.advance_secs(3601);
        let headers = signed_headers(&key, clock.now_secs(), BODY);
        assert_eq!(verifier.verify(BODY, &headers), Ok(true));
    }

    #[test]
    fn test_public_key_unavailable() {
        let key = signing_key();
        let headers = signed_headers(&key, NOW, BODY);

        let mut failing = MockPublicKeyFetcher::new();
        failing
            .expect_fetch()
            .returning(|_| Err(TransportError::Network("unreachable".into())));

        let fetchers = vec![
            failing,
            fetcher_returning(b"not json".to_vec(), 1),
            fetcher_returning(json!({"other": 1}).to_string().into_bytes(), 1),
            fetcher_returning(json!({"public_key": "AAAA"}).to_string().into_bytes(), 1),
        ];
        for fetcher in fetchers {
            let clock = Arc::new(FixedTimeProvider::at_secs(NOW));
            let verifier = verifier(fetcher, clock);
            assert_eq!(
                verifier.verify(BODY, &headers),
                Err(VerificationError::PublicKeyUnavailable)
            );
        }
    }

    #[test]
    fn test_cached_key_is_used_without_fetch() {
        let key = signing_key();
        let clock = Arc::new(FixedTimeProvider::at_secs(NOW));
        let cache = Arc::new(MemoryKeyCache::with_time_provider(clock.clone()));
        cache.set(
            PUBLIC_KEY_CACHE_KEY,
            &STANDARD.encode(key.verifying_key().to_bytes()),
            PUBLIC_KEY_TTL,
        );

        let verifier = WebhookVerifier::new(
            cache,
            Arc::new(fetcher_returning(Vec::new(), 0)),
            clock,
        );
        let headers = signed_headers(&key, NOW, BODY);
        assert_eq!(verifier.verify(BODY, &headers), Ok(true));
    }
}
