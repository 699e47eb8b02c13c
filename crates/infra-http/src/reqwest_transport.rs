// Reqwest-backed Transport
// reason: blocking client, since the core ports are synchronous

use falqueue_core::domain::Headers;
use falqueue_core::port::{
    ByteStream, HttpRequest, HttpResponse, Method, StreamResponse, Transport, TransportError,
};
use reqwest::blocking::{Client, ClientBuilder, RequestBuilder, Response};
use reqwest::header::HeaderMap;
use std::error::Error;
use std::io::{self, ErrorKind, Read};
use std::time::Duration;
use tracing::{debug, warn};

/// Read size for incremental bodies
pub const STREAM_CHUNK_SIZE: usize = 8 * 1024;

/// HTTP transport for one API host.
///
/// Paths from the core are joined onto `base_url`; every request carries
/// `Authorization: Key <api key>`. Buffered requests use `timeout` end to
/// end. Streams connect within `timeout` and are then bounded by
/// `stream_timeout`, so a stalled event stream surfaces as
/// `TransportError::Timeout` instead of blocking the reader.
pub struct ReqwestTransport {
    client: Client,
    stream_client: Client,
    base_url: String,
    api_key: String,
}

impl ReqwestTransport {
    /// Create a transport with its own connection pools
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
        stream_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(map_error)?;
        let stream_client = stream_client_builder(timeout, stream_timeout)
            .build()
            .map_err(map_error)?;
        Ok(Self::with_clients(base_url, api_key, client, stream_client))
    }

    /// Create a transport over pre-built clients
    pub fn with_clients(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        client: Client,
        stream_client: Client,
    ) -> Self {
        Self {
            client,
            stream_client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    fn build(&self, client: &Client, request: &HttpRequest) -> RequestBuilder {
        let url = self.url(&request.path);
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
        };

        let mut builder = client
            .request(method, url)
            .header("Authorization", format!("Key {}", self.api_key))
            .header("Content-Type", "application/json");
        if request.headers.get("accept").is_none() {
            builder = builder.header("Accept", "application/json");
        }
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        builder
    }

    fn dispatch(&self, client: &Client, request: &HttpRequest) -> Result<Response, TransportError> {
        debug!(method = %request.method, path = %request.path, "Sending HTTP request");
        let response = self.build(client, request).send().map_err(|e| {
            warn!(method = %request.method, path = %request.path, error = %e, "HTTP request failed");
            map_error(e)
        })?;
        debug!(status = response.status().as_u16(), "HTTP response received");
        Ok(response)
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let response = self.dispatch(&self.client, request)?;
        let status = response.status().as_u16();
        let headers = convert_headers(response.headers());
        let body = response.bytes().map_err(map_error)?;
        Ok(HttpResponse::new(status, headers, body.to_vec()))
    }

    fn open_stream(&self, request: &HttpRequest) -> Result<StreamResponse, TransportError> {
        let response = self.dispatch(&self.stream_client, request)?;
        Ok(StreamResponse {
            status: response.status().as_u16(),
            headers: convert_headers(response.headers()),
            body: Box::new(ReadBody::new(response)),
        })
    }
}

/// Incremental body over any reader (a blocking response in production)
pub struct ReadBody<R: Read> {
    reader: R,
    buffer: Vec<u8>,
}

impl<R: Read> ReadBody<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: vec![0; STREAM_CHUNK_SIZE],
        }
    }
}

impl<R: Read> ByteStream for ReadBody<R> {
    fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        loop {
            match self.reader.read(&mut self.buffer) {
                Ok(0) => return Ok(None),
                Ok(n) => return Ok(Some(self.buffer[..n].to_vec())),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(map_read_error(e)),
            }
        }
    }
}

fn stream_client_builder(connect_timeout: Duration, stream_timeout: Duration) -> ClientBuilder {
    Client::builder()
        .connect_timeout(connect_timeout)
        .timeout(stream_timeout)
}

fn join_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn convert_headers(headers: &HeaderMap) -> Headers {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect()
}

fn map_error(err: reqwest::Error) -> TransportError {
    let message = err.to_string();
    if err.is_timeout() {
        TransportError::Timeout(message)
    } else if is_tls_failure(&err) {
        TransportError::Tls(message)
    } else if err.is_connect() {
        TransportError::Network(message)
    } else if err.is_decode() || err.is_body() {
        TransportError::StreamProtocol(message)
    } else {
        TransportError::Network(message)
    }
}

/// Classify a failed body read.
///
/// Truncated or malformed bodies are stream-protocol failures; dropped
/// connections stay network failures. The blocking reader wraps its own
/// errors in `ErrorKind::Other`, so the wrapped chain is inspected too.
fn map_read_error(err: io::Error) -> TransportError {
    let message = err.to_string();
    match err.kind() {
        ErrorKind::TimedOut => return TransportError::Timeout(message),
        ErrorKind::UnexpectedEof | ErrorKind::InvalidData => {
            return TransportError::StreamProtocol(message)
        }
        kind if is_connection_kind(kind) => return TransportError::Network(message),
        _ => {}
    }

    let Some(inner) = err.get_ref() else {
        return TransportError::Network(message);
    };
    if let Some(reqwest_err) = inner.downcast_ref::<reqwest::Error>() {
        if reqwest_err.is_timeout() {
            return TransportError::Timeout(message);
        }
    }

    let mut cause: Option<&(dyn Error + 'static)> = Some(inner as &(dyn Error + 'static));
    while let Some(current) = cause {
        if let Some(io_err) = current.downcast_ref::<io::Error>() {
            match io_err.kind() {
                ErrorKind::TimedOut => return TransportError::Timeout(message),
                kind if is_connection_kind(kind) => return TransportError::Network(message),
                ErrorKind::UnexpectedEof | ErrorKind::InvalidData => {
                    return TransportError::StreamProtocol(message)
                }
                _ => {}
            }
        }
        cause = current.source();
    }

    match inner.downcast_ref::<reqwest::Error>() {
        Some(reqwest_err) if reqwest_err.is_body() || reqwest_err.is_decode() => {
            TransportError::StreamProtocol(message)
        }
        _ => TransportError::Network(message),
    }
}

fn is_connection_kind(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::NotConnected
    )
}

/// reqwest has no TLS predicate; look for it in the source chain
fn is_tls_failure(err: &reqwest::Error) -> bool {
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string().to_ascii_lowercase();
        if text.contains("certificate") || text.contains("tls") || text.contains("ssl") {
            return true;
        }
        source = cause.source();
    }
    false
}
