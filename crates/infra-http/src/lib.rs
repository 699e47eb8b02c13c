// Falqueue Infrastructure - HTTP Adapters
// Implements: Transport, PublicKeyFetcher

pub mod key_fetcher_impl;
pub mod reqwest_transport;

pub use key_fetcher_impl::HttpKeyFetcher;
pub use reqwest_transport::{ReadBody, ReqwestTransport, STREAM_CHUNK_SIZE};

#[cfg(test)]
mod test_server;
