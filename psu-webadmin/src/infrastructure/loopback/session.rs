//! One in-process request/response exchange.

use alloc::collections::VecDeque;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use super::form;
use crate::domain::entities::TransferSession;
use crate::domain::error::WebAdminError;
use crate::domain::ports::{
    ContentType, FieldVisitor, Header, HttpSession, Signal, Status, TransportError,
};
use crate::domain::value_objects::SECTOR_SIZE;

/// Transport code for a response operation out of order.
const ERR_RESPONSE_STATE: i16 = -1;

/// Knobs of the loopback transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopbackConfig {
    /// Body bytes delivered per step, and the outgoing buffer size.
    pub chunk: usize,
    /// Body bytes delivered before intake holds until a `RecvUnhold`.
    ///
    /// Writers release intake only after committing a sector, so a window
    /// smaller than the sector size stalls any upload longer than it.
    pub window: usize,
    /// Capacity of the signal queue.
    pub signal_depth: usize,
    /// Drop the connection once this many handler calls have been made.
    pub disconnect_after: Option<u32>,
}

impl LoopbackConfig {
    /// Set the chunk size.
    pub fn with_chunk(mut self, chunk: usize) -> Self {
        self.chunk = chunk;
        self
    }

    /// Set the intake window. See [`LoopbackConfig::window`] for the lower
    /// bound uploads need.
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    /// Set the signal queue capacity.
    pub fn with_signal_depth(mut self, depth: usize) -> Self {
        self.signal_depth = depth;
        self
    }

    /// Disconnect after `calls` handler invocations.
    pub fn disconnect_after(mut self, calls: u32) -> Self {
        self.disconnect_after = Some(calls);
        self
    }
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        Self {
            chunk: 1024,
            window: SECTOR_SIZE,
            signal_depth: 4,
            disconnect_after: None,
        }
    }
}

/// A response as the client saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status line.
    pub status: Status,
    /// Headers besides the content type and length.
    pub headers: Vec<(String, String)>,
    /// Declared content type.
    pub content_type: ContentType,
    /// Declared content length.
    pub content_length: u32,
    /// Body bytes put on the wire.
    pub body: Vec<u8>,
    /// Whether the handler finalized the response.
    pub finalized: bool,
}

impl Response {
    /// Value of the header `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body as text; empty if it is not UTF-8.
    pub fn text(&self) -> &str {
        core::str::from_utf8(&self.body).unwrap_or_default()
    }
}

/// [`HttpSession`] over an in-memory request body.
///
/// Body bytes move into the receive buffer one chunk per
/// [`deliver`](Self::deliver). After `window` bytes intake holds until a
/// queued [`Signal::RecvUnhold`] is processed. Sent bytes wait in the
/// outgoing buffer until [`flush`](Self::flush).
#[derive(Debug)]
pub struct LoopbackSession {
    config: LoopbackConfig,
    path: String,
    calls: u32,
    body: Vec<u8>,
    declared_length: Option<u32>,
    delivered: usize,
    rx: VecDeque<u8>,
    since_unhold: usize,
    held: bool,
    signals: VecDeque<Signal>,
    unholds: u32,
    refused_signals: u32,
    response: Option<Response>,
    pending: Vec<u8>,
    transfer: Option<TransferSession>,
}

impl LoopbackSession {
    /// Create a session for a request to `path` carrying `body`.
    pub fn new(config: LoopbackConfig, path: &str, body: &[u8]) -> Self {
        Self {
            config,
            path: path.to_string(),
            calls: 0,
            body: body.to_vec(),
            declared_length: None,
            delivered: 0,
            rx: VecDeque::new(),
            since_unhold: 0,
            held: false,
            signals: VecDeque::new(),
            unholds: 0,
            refused_signals: 0,
            response: None,
            pending: Vec::new(),
            transfer: None,
        }
    }

    /// Declare `length` as the content length instead of the body size.
    pub fn with_content_length(mut self, length: u32) -> Self {
        self.declared_length = Some(length);
        self
    }

    /// Count a handler invocation about to happen.
    pub fn begin_call(&mut self) {
        self.calls += 1;
    }

    /// Move the next chunk of body into the receive buffer.
    ///
    /// Returns `false` if intake is held or the body is fully delivered.
    pub fn deliver(&mut self) -> bool {
        if self.held || self.delivered == self.body.len() {
            return false;
        }
        let n = self.config.chunk.min(self.body.len() - self.delivered);
        self.rx
            .extend(&self.body[self.delivered..self.delivered + n]);
        self.delivered += n;
        self.since_unhold += n;
        if self.since_unhold >= self.config.window {
            self.held = true;
        }
        true
    }

    /// Process queued signals.
    pub fn process_signals(&mut self) {
        while let Some(signal) = self.signals.pop_front() {
            match signal {
                Signal::RecvUnhold => {
                    self.held = false;
                    self.since_unhold = 0;
                    self.unholds += 1;
                }
            }
        }
    }

    /// Put the outgoing buffer on the wire.
    pub fn flush(&mut self) {
        if let Some(response) = self.response.as_mut() {
            response.body.append(&mut self.pending);
        }
    }

    /// Whether intake is held.
    pub fn is_held(&self) -> bool {
        self.held
    }

    /// `RecvUnhold` signals processed.
    pub fn unholds(&self) -> u32 {
        self.unholds
    }

    /// Signals refused because the queue was full.
    pub fn refused_signals(&self) -> u32 {
        self.refused_signals
    }

    /// The response so far.
    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    /// Whether the response was finalized.
    pub fn is_finalized(&self) -> bool {
        self.response.as_ref().is_some_and(|r| r.finalized)
    }

    /// Whether a transfer state is parked in the slot.
    pub fn has_transfer(&self) -> bool {
        self.transfer.is_some()
    }

    /// Take the response out of the session.
    pub fn into_response(mut self) -> Option<Response> {
        self.flush();
        self.response
    }
}

impl HttpSession for LoopbackSession {
    fn path(&self) -> &str {
        &self.path
    }

    fn handler_calls(&self) -> u32 {
        self.calls
    }

    fn content_length(&self) -> u32 {
        self.declared_length.unwrap_or(self.body.len() as u32)
    }

    fn available(&self) -> usize {
        self.rx.len()
    }

    fn body_remaining(&self) -> u32 {
        (self.body.len() - self.delivered) as u32
    }

    fn recv(&mut self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.rx.len());
        for (dst, src) in buf.iter_mut().zip(self.rx.drain(..n)) {
            *dst = src;
        }
        n
    }

    fn response_pending(&self) -> usize {
        self.pending.len()
    }

    fn chunk_capacity(&self) -> usize {
        self.config.chunk
    }

    fn response_start(
        &mut self,
        status: Status,
        headers: &[Header<'_>],
        content_type: ContentType,
        content_length: u32,
    ) -> Result<(), TransportError> {
        if self.response.is_some() {
            return Err(TransportError::Other(ERR_RESPONSE_STATE));
        }
        self.response = Some(Response {
            status,
            headers: headers
                .iter()
                .map(|h| (h.name.to_string(), h.value.to_string()))
                .collect(),
            content_type,
            content_length,
            body: Vec::new(),
            finalized: false,
        });
        Ok(())
    }

    fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        match self.response.as_ref() {
            Some(r) if !r.finalized => {}
            _ => return Err(TransportError::Other(ERR_RESPONSE_STATE)),
        }
        if self.pending.len() + data.len() > self.config.chunk {
            return Err(TransportError::BufferFull);
        }
        self.pending.extend_from_slice(data);
        Ok(())
    }

    fn response_finalize(&mut self) -> Result<(), TransportError> {
        match self.response.as_mut() {
            Some(r) if !r.finalized => {
                r.finalized = true;
                Ok(())
            }
            _ => Err(TransportError::Other(ERR_RESPONSE_STATE)),
        }
    }

    fn schedule(&mut self, signal: Signal) -> bool {
        if self.signals.len() >= self.config.signal_depth {
            self.refused_signals += 1;
            return false;
        }
        self.signals.push_back(signal);
        true
    }

    fn transfer(&mut self) -> &mut Option<TransferSession> {
        &mut self.transfer
    }

    fn for_each_form_field(&mut self, visit: &mut FieldVisitor<'_>) -> Result<(), WebAdminError> {
        let raw: Vec<u8> = self.rx.drain(..).collect();
        form::parse_urlencoded(&raw, visit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_holds_intake() {
        let config = LoopbackConfig::default().with_chunk(10).with_window(20);
        let mut session = LoopbackSession::new(config, "/", &[7; 50]);

        assert!(session.deliver());
        assert!(session.deliver());
        assert!(session.is_held());
        assert!(!session.deliver());
        assert_eq!(session.available(), 20);

        assert!(session.schedule(Signal::RecvUnhold));
        session.process_signals();
        assert!(session.deliver());
        assert_eq!(session.unholds(), 1);
        assert_eq!(session.body_remaining(), 20);
    }

    #[test]
    fn test_signal_queue_bound() {
        let config = LoopbackConfig::default().with_signal_depth(1);
        let mut session = LoopbackSession::new(config, "/", b"");
        assert!(session.schedule(Signal::RecvUnhold));
        assert!(!session.schedule(Signal::RecvUnhold));
        assert_eq!(session.refused_signals(), 1);
    }

    #[test]
    fn test_send_respects_chunk_capacity() {
        let config = LoopbackConfig::default().with_chunk(4);
        let mut session = LoopbackSession::new(config, "/", b"");
        session
            .response_start(Status::OK, &[], ContentType::Text, 6)
            .unwrap();
        session.send(b"abcd").unwrap();
        assert_eq!(session.send(b"ef"), Err(TransportError::BufferFull));

        session.flush();
        session.send(b"ef").unwrap();
        session.response_finalize().unwrap();

        let response = session.into_response().unwrap();
        assert_eq!(response.body, b"abcdef");
        assert!(response.finalized);
    }

    #[test]
    fn test_recv_drains_in_order() {
        let mut session = LoopbackSession::new(LoopbackConfig::default(), "/", b"hello world");
        session.deliver();
        let mut buf = [0u8; 5];
        assert_eq!(session.recv(&mut buf), 5);
        assert_eq!(&buf, b"hello");
        assert_eq!(session.available(), 6);
    }
}
