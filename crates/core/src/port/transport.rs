// Transport Port - the HTTP contract the core requires

use crate::domain::Headers;
use serde_json::Value;
use thiserror::Error;

/// Infrastructure failures raised by a transport.
///
/// HTTP error statuses are NOT transport errors; they come back as a normal
/// [`HttpResponse`] and are classified into job outcomes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("TLS error: {0}")]
    Tls(String),

    /// Malformed event-stream framing
    #[error("Stream protocol error: {0}")]
    StreamProtocol(String),
}

impl TransportError {
    pub fn is_stream_protocol(&self) -> bool {
        matches!(self, TransportError::StreamProtocol(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outgoing request: method + path relative to the transport's base URL
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub headers: Headers,
}

impl HttpRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            headers: Headers::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Post, path).with_body(body)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// First query value for `key`
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Fully buffered response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, headers: Headers, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// View a buffered response as a single-chunk stream
    pub fn into_stream(self) -> StreamResponse {
        StreamResponse {
            status: self.status,
            headers: self.headers,
            body: Box::new(BufferedBody::new(self.body)),
        }
    }
}

/// Source of response body bytes, pulled chunk by chunk
pub trait ByteStream {
    /// Next available chunk, `Ok(None)` at end of body
    fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, TransportError>;
}

impl<S: ByteStream + ?Sized> ByteStream for Box<S> {
    fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        (**self).next_chunk()
    }
}

/// A body that is already fully in memory
#[derive(Debug, Clone, Default)]
pub struct BufferedBody {
    body: Option<Vec<u8>>,
}

impl BufferedBody {
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: Some(body.into()),
        }
    }
}

impl ByteStream for BufferedBody {
    fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        Ok(self.body.take().filter(|body| !body.is_empty()))
    }
}

/// Response whose body is consumed incrementally
pub struct StreamResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Box<dyn ByteStream + Send>,
}

impl std::fmt::Debug for StreamResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Synchronous HTTP transport.
///
/// The transport owns connection handling, authentication and timeouts; the
/// core only builds requests and interprets responses.
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send + Sync {
    /// Send a request and buffer the whole response
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;

    /// Send a request and hand back the body as it arrives.
    ///
    /// Transports without incremental delivery can keep the default, which
    /// buffers the response and replays it as a single chunk.
    fn open_stream(&self, request: &HttpRequest) -> Result<StreamResponse, TransportError> {
        Ok(self.send(request)?.into_stream())
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Mutex, PoisonError};

    /// Body that yields pre-recorded chunks (or errors) in order
    pub struct ScriptedChunks {
        chunks: VecDeque<Result<Vec<u8>, TransportError>>,
    }

    impl ScriptedChunks {
        pub fn new(chunks: Vec<Result<Vec<u8>, TransportError>>) -> Self {
            Self {
                chunks: chunks.into(),
            }
        }

        pub fn from_strs(chunks: &[&str]) -> Self {
            Self::new(chunks.iter().map(|c| Ok(c.as_bytes().to_vec())).collect())
        }
    }

    impl ByteStream for ScriptedChunks {
        fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
            match self.chunks.pop_front() {
                Some(Ok(chunk)) => Ok(Some(chunk)),
                Some(Err(e)) => Err(e),
                None => Ok(None),
            }
        }
    }

    /// One scripted reply
    pub enum Reply {
        Response(HttpResponse),
        Stream {
            status: u16,
            headers: Headers,
            chunks: Vec<Result<Vec<u8>, TransportError>>,
        },
        Fail(TransportError),
    }

    impl Reply {
        pub fn json(status: u16, body: &Value) -> Self {
            Reply::Response(HttpResponse::new(
                status,
                Headers::new().with("content-type", "application/json"),
                body.to_string(),
            ))
        }

        pub fn event_stream(chunks: &[&str]) -> Self {
            Reply::Stream {
                status: 200,
                headers: Headers::new().with("content-type", "text/event-stream"),
                chunks: chunks.iter().map(|c| Ok(c.as_bytes().to_vec())).collect(),
            }
        }
    }

    /// Transport that replays scripted replies in order and records requests
    #[derive(Default)]
    pub struct ScriptedTransport {
        replies: Mutex<VecDeque<Reply>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedTransport {
        pub fn new(replies: Vec<Reply>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        /// Requests received so far, in order
        pub fn requests(&self) -> Vec<HttpRequest> {
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        pub fn remaining(&self) -> usize {
            self.replies
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .len()
        }

        fn next_reply(&self, request: &HttpRequest) -> Option<Reply> {
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(request.clone());
            self.replies
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front()
        }
    }

    impl Transport for ScriptedTransport {
        fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
            match self.next_reply(request) {
                Some(Reply::Response(response)) => Ok(response),
                Some(Reply::Fail(e)) => Err(e),
                Some(Reply::Stream { .. }) => Err(TransportError::Network(
                    "stream reply scripted for a buffered request".to_string(),
                )),
                None => Err(TransportError::Network("no scripted reply".to_string())),
            }
        }

        fn open_stream(&self, request: &HttpRequest) -> Result<StreamResponse, TransportError> {
            match self.next_reply(request) {
                Some(Reply::Response(response)) => Ok(response.into_stream()),
                Some(Reply::Stream {
                    status,
                    headers,
                    chunks,
                }) => Ok(StreamResponse {
                    status,
                    headers,
                    body: Box::new(ScriptedChunks::new(chunks)),
                }),
                Some(Reply::Fail(e)) => Err(e),
                None => Err(TransportError::Network("no scripted reply".to_string())),
            }
        }
    }
}
