// HTTP PublicKeyFetcher implementation

use falqueue_core::port::{PublicKeyFetcher, TransportError};
use reqwest::blocking::Client;
use std::time::Duration;
use tracing::debug;

/// Fetches the webhook key document over plain HTTPS (no API key)
pub struct HttpKeyFetcher {
    client: Client,
}

impl HttpKeyFetcher {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl PublicKeyFetcher for HttpKeyFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        debug!(url = %url, "Fetching public key document");
        let response = self.client.get(url).send().map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(e.to_string())
            } else {
                TransportError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Network(format!(
                "key endpoint returned HTTP {}",
                status.as_u16()
            )));
        }

        let body = response
            .bytes()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server::{http_response, serve_once};

    fn fetcher() -> HttpKeyFetcher {
        HttpKeyFetcher::with_client(Client::builder().no_proxy().build().unwrap())
    }

    #[test]
    fn test_fetch_returns_body() {
        let (base_url, requests) = serve_once(http_response(
            "200 OK",
            &[("Content-Type", "application/json")],
            r#"{"public_key": "abc"}"#,
        ));

        let body = fetcher()
            .fetch(&format!("{}/webhook/keys", base_url))
            .unwrap();
        assert_eq!(body, br#"{"public_key": "abc"}"#.to_vec());

        let recorded = requests.recv().unwrap();
        assert!(recorded.request_line.starts_with("GET /webhook/keys"));
        assert_eq!(recorded.header("authorization"), None);
    }

    #[test]
    fn test_non_success_is_error() {
        let (base_url, _requests) = serve_once(http_response("404 Not Found", &[], "missing"));
        let err = fetcher()
            .fetch(&format!("{}/webhook/keys", base_url))
            .unwrap_err();
        assert_eq!(
            err,
            TransportError::Network("key endpoint returned HTTP 404".into())
        );
    }
}
