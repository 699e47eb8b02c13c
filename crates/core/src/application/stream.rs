// Event-stream status reading
//
// `StreamStatusReader` turns a response body into outcomes line by line as
// bytes arrive. `StatusStream` wraps it for the client and owns the single
// non-streaming fallback taken when the stream framing breaks.

use super::classify::{classify, classify_json};
use crate::domain::{Headers, JobOutcome, JobStatus};
use crate::port::{ByteStream, HttpRequest, StreamResponse, Transport, TransportError};
use std::sync::Arc;
use tracing::{debug, warn};

const DATA_PREFIX: &str = "data:";

/// Lazily reads outcomes from an event-stream (or plain JSON) body.
///
/// Finite and not restartable. Keeps the unterminated tail of the last chunk
/// between pulls, so each line is decoded exactly once however the bytes are
/// split. Stops right after yielding a `COMPLETED` outcome.
pub struct StreamStatusReader<S: ByteStream> {
    source: S,
    status_code: u16,
    headers: Headers,
    event_stream: bool,
    pending: Vec<u8>,
    /// Bytes of `pending` already searched for a newline
    scanned: usize,
    source_done: bool,
    finished: bool,
}

impl<S: ByteStream> StreamStatusReader<S> {
    pub fn new(status_code: u16, headers: Headers, source: S) -> Self {
        let event_stream = headers
            .content_type()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("event-stream"));
        Self {
            source,
            status_code,
            headers,
            event_stream,
            pending: Vec::new(),
            scanned: 0,
            source_done: false,
            finished: false,
        }
    }

    pub fn is_event_stream(&self) -> bool {
        self.event_stream
    }

    /// Whole body as one JSON document: at most one outcome
    fn read_document(&mut self) -> Option<Result<JobOutcome, TransportError>> {
        self.finished = true;
        let mut body = std::mem::take(&mut self.pending);
        loop {
            match self.source.next_chunk() {
                Ok(Some(chunk)) => body.extend_from_slice(&chunk),
                Ok(None) => break,
                Err(e) => return Some(Err(e)),
            }
        }
        if body.iter().all(u8::is_ascii_whitespace) {
            return None;
        }
        Some(Ok(classify(self.status_code, &self.headers, &body)))
    }

    /// Pop the next complete line from the buffer, or the tail at end of body
    fn next_line(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        loop {
            if let Some(offset) = self.pending[self.scanned..].iter().position(|b| *b == b'\n') {
                let mut line: Vec<u8> = self.pending.drain(..=self.scanned + offset).collect();
                line.pop();
                self.scanned = 0;
                return Ok(Some(line));
            }
            self.scanned = self.pending.len();
            if self.source_done {
                if self.pending.is_empty() {
                    return Ok(None);
                }
                self.scanned = 0;
                return Ok(Some(std::mem::take(&mut self.pending)));
            }
            match self.source.next_chunk()? {
                Some(chunk) => self.pending.extend_from_slice(&chunk),
                None => self.source_done = true,
            }
        }
    }
}

/// Decode one event-stream line; `None` for lines that carry no outcome
fn decode_line(line: &[u8]) -> Option<JobOutcome> {
    let line = match std::str::from_utf8(line) {
        Ok(line) => line.trim(),
        Err(_) => {
            warn!("Skipping non-UTF-8 event-stream line");
            return None;
        }
    };

    // blank separators and `: ping` style keep-alives
    if line.is_empty() || line.starts_with(':') {
        return None;
    }

    let data = line.strip_prefix(DATA_PREFIX)?.trim_start();
    if data.is_empty() {
        return None;
    }

    match serde_json::from_str(data) {
        Ok(value) => Some(classify_json(value)),
        Err(e) => {
            warn!(error = %e, "Skipping undecodable event-stream data line");
            None
        }
    }
}

impl StreamStatusReader<Box<dyn ByteStream + Send>> {
    pub fn from_response(response: StreamResponse) -> Self {
        Self::new(response.status, response.headers, response.body)
    }
}

impl<S: ByteStream> Iterator for StreamStatusReader<S> {
    type Item = Result<JobOutcome, TransportError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if !self.event_stream {
            return self.read_document();
        }

        loop {
            let line = match self.next_line() {
                Ok(Some(line)) => line,
                Ok(None) => {
                    self.finished = true;
                    return None;
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            };

            if let Some(outcome) = decode_line(&line) {
                if outcome.status() == Some(JobStatus::Completed) {
                    debug!("Stream reported COMPLETED; closing");
                    self.finished = true;
                }
                return Some(Ok(outcome));
            }
        }
    }
}

enum StreamState {
    Open(StreamStatusReader<Box<dyn ByteStream + Send>>),
    FallbackPending,
    Done,
}

/// Outcome stream handed out by the client.
///
/// If the event stream breaks with a protocol error before any finished
/// outcome was seen, the prepared non-streaming request is sent once and its
/// classified outcome takes the stream's place. A protocol error after a
/// finished outcome just ends the stream. Other transport errors are yielded
/// once and end the stream.
pub struct StatusStream {
    transport: Arc<dyn Transport>,
    state: StreamState,
    fallback: Option<HttpRequest>,
    saw_finished: bool,
    used_fallback: bool,
}

impl std::fmt::Debug for StatusStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.state {
            StreamState::Open(_) => "open",
            StreamState::FallbackPending => "fallback-pending",
            StreamState::Done => "done",
        };
        f.debug_struct("StatusStream")
            .field("state", &state)
            .field("fallback", &self.fallback.as_ref().map(|r| r.path.as_str()))
            .field("saw_finished", &self.saw_finished)
            .field("used_fallback", &self.used_fallback)
            .finish()
    }
}

impl StatusStream {
    /// Open `request` as a stream, keeping `fallback` for protocol failures
    pub fn open(
        transport: Arc<dyn Transport>,
        request: &HttpRequest,
        fallback: HttpRequest,
    ) -> Result<Self, TransportError> {
        let state = match transport.open_stream(request) {
            Ok(response) => StreamState::Open(StreamStatusReader::from_response(response)),
            Err(e) if e.is_stream_protocol() => {
                warn!(path = %request.path, error = %e, "Stream could not be opened; using fallback request");
                StreamState::FallbackPending
            }
            Err(e) => return Err(e),
        };

        Ok(Self {
            transport,
            state,
            fallback: Some(fallback),
            saw_finished: false,
            used_fallback: false,
        })
    }

    /// Whether the fallback request replaced (part of) the stream
    pub fn used_fallback(&self) -> bool {
        self.used_fallback
    }

    fn run_fallback(&mut self) -> Option<Result<JobOutcome, TransportError>> {
        self.state = StreamState::Done;
        let request = self.fallback.take()?;
        self.used_fallback = true;
        debug!(method = %request.method, path = %request.path, "Sending fallback request");
        Some(
            self.transport
                .send(&request)
                .map(|response| classify(response.status, &response.headers, &response.body)),
        )
    }
}

impl Iterator for StatusStream {
    type Item = Result<JobOutcome, TransportError>;

    fn next(&mut self) -> Option<Self::Item> {
        if matches!(self.state, StreamState::FallbackPending) {
            return self.run_fallback();
        }
        let item = match &mut self.state {
            StreamState::Open(reader) => reader.next(),
            _ => return None,
        };

        match item {
            Some(Ok(outcome)) => {
                if outcome.is_finished() {
                    self.saw_finished = true;
                }
                Some(Ok(outcome))
            }
            Some(Err(e)) if e.is_stream_protocol() => {
                if self.saw_finished {
                    debug!(error = %e, "Stream protocol error after finished outcome; ignoring");
                    self.state = StreamState::Done;
                    None
                } else {
                    warn!(error = %e, "Stream protocol error; using fallback request");
                    self.run_fallback()
                }
            }
            Some(Err(e)) => {
                self.state = StreamState::Done;
                Some(Err(e))
            }
            None => {
                self.state = StreamState::Done;
                None
            }
        }
    }
}
