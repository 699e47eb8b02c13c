// Public Key Fetcher Port

use super::transport::TransportError;

/// Fetches the raw JSON document that publishes the webhook verification key
#[cfg_attr(test, mockall::automock)]
pub trait PublicKeyFetcher: Send + Sync {
    /// GET `url` and return the response body bytes.
    ///
    /// Non-success HTTP statuses must be reported as errors.
    fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError>;
}
