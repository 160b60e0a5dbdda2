//! HttpSession port - the boundary to the embedded HTTP server.
//!
//! The server owns connections, parses request lines and headers, matches
//! routes, and buffers at most one chunk of request body at a time. It calls
//! a handler repeatedly for one request, as body bytes arrive or as its
//! outgoing buffer drains; the handler never blocks and keeps whatever must
//! survive between calls in the session's transfer slot.
//!
//! ```text
//!  client ──► [ rx chunk ] ──recv()──► handler ──send()──► [ tx chunk ] ──► client
//!                 ▲                       │
//!                 └──── schedule(RecvUnhold) (flow control)
//! ```

use core::fmt;

use crate::domain::entities::TransferSession;
use crate::domain::error::WebAdminError;

/// What a handler tells the server after one invocation.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerStatus {
    /// The request is fully handled.
    Complete,
    /// Call again when more body arrives or the send buffer drains.
    More,
}

/// Signals a handler can queue for the server.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Resume delivery of a request body paused by the intake throttle.
    RecvUnhold,
}

/// Response status line.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    /// Numeric status code.
    pub code: u16,
    /// Reason phrase.
    pub reason: &'static str,
}

impl Status {
    /// `200 OK`
    pub const OK: Self = Self::new(200, "OK");
    /// `404 Not Found`
    pub const NOT_FOUND: Self = Self::new(404, "Not Found");
    /// `700 On` - relay switched on.
    pub const POWER_ON: Self = Self::new(700, "On");
    /// `701 Off` - relay switched off.
    pub const POWER_OFF: Self = Self::new(701, "Off");

    /// Create a status line.
    pub const fn new(code: u16, reason: &'static str) -> Self {
        Self { code, reason }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.reason)
    }
}

/// A response header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header<'a> {
    /// Header name.
    pub name: &'a str,
    /// Header value.
    pub value: &'a str,
}

/// Response content types the handlers produce.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    /// `text/html`
    Html,
    /// `text/plain`
    Text,
    /// `application/json`
    Json,
}

impl ContentType {
    /// MIME type string.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Html => "text/html",
            Self::Text => "text/plain",
            Self::Json => "application/json",
        }
    }
}

/// Errors reported by the server for response operations.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportError {
    /// The outgoing buffer cannot take the data.
    BufferFull,
    /// The connection is gone.
    Closed,
    /// Server-specific failure code.
    Other(i16),
}

impl TransportError {
    /// Numeric code as the server reports it.
    pub const fn code(&self) -> i16 {
        match self {
            Self::BufferFull => -2,
            Self::Closed => -3,
            Self::Other(code) => *code,
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferFull => write!(f, "Response buffer full"),
            Self::Closed => write!(f, "Connection closed"),
            Self::Other(code) => write!(f, "Server error {}", code),
        }
    }
}

impl core::error::Error for TransportError {}

/// Callback type used for form field iteration.
pub type FieldVisitor<'f> = dyn FnMut(&str, Option<&str>) -> Result<(), WebAdminError> + 'f;

/// One request/response exchange as seen by a handler.
pub trait HttpSession {
    /// Request path, e.g. `/firmware`.
    fn path(&self) -> &str;

    /// How many times a handler has been invoked for this request,
    /// counting the current call (the first call sees 1).
    fn handler_calls(&self) -> u32;

    /// Declared `Content-Length` of the request body.
    fn content_length(&self) -> u32;

    /// Body bytes buffered by the server and not yet read by the handler.
    fn available(&self) -> usize;

    /// Body bytes the client has not delivered to the server yet.
    fn body_remaining(&self) -> u32;

    /// Move up to `buf.len()` buffered body bytes into `buf`.
    ///
    /// Returns the number of bytes copied.
    fn recv(&mut self, buf: &mut [u8]) -> usize;

    /// Bytes sitting in the outgoing buffer, not yet on the wire.
    fn response_pending(&self) -> usize;

    /// Largest piece the outgoing buffer accepts in one `send`.
    fn chunk_capacity(&self) -> usize;

    /// Start a response with a declared content length.
    fn response_start(
        &mut self,
        status: Status,
        headers: &[Header<'_>],
        content_type: ContentType,
        content_length: u32,
    ) -> Result<(), TransportError>;

    /// Queue body bytes of a started response.
    fn send(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Mark a started response complete.
    fn response_finalize(&mut self) -> Result<(), TransportError>;

    /// Queue a signal for the server to process on its own schedule.
    ///
    /// Returns `false` if the server's bounded signal queue is full.
    fn schedule(&mut self, signal: Signal) -> bool;

    /// The per-request slot carrying transfer state across invocations.
    fn transfer(&mut self) -> &mut Option<TransferSession>;

    /// Visit each `name=value` pair of a complete urlencoded body, in order.
    ///
    /// Stops at, and returns, the first error the visitor yields.
    fn for_each_form_field(&mut self, visit: &mut FieldVisitor<'_>) -> Result<(), WebAdminError>;

    /// Send a complete response with a small body.
    fn respond(
        &mut self,
        status: Status,
        content_type: ContentType,
        body: &[u8],
    ) -> Result<(), TransportError> {
        self.response_start(status, &[], content_type, body.len() as u32)?;
        self.send(body)?;
        self.response_finalize()
    }

    /// Send a header-only response.
    fn respond_head(&mut self, status: Status) -> Result<(), TransportError> {
        self.response_start(status, &[], ContentType::Text, 0)?;
        self.response_finalize()
    }
}
