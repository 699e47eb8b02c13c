// Port Layer - Interfaces for external dependencies

pub mod key_cache;
pub mod key_fetcher;
pub mod time_provider; // For webhook freshness checks
pub mod transport;

// Re-exports
pub use key_cache::{KeyCache, MemoryKeyCache};
pub use key_fetcher::PublicKeyFetcher;
pub use time_provider::TimeProvider;
pub use transport::{
    BufferedBody, ByteStream, HttpRequest, HttpResponse, Method, StreamResponse, Transport,
    TransportError,
};
