//! Per-request transfer state.
//!
//! A handler that needs several invocations to finish a request parks its
//! state in the session's transfer slot between calls. Exactly one variant is
//! live per request; it is dropped on completion, on any error, and when the
//! client disconnects.

use super::SectorBuffer;
use crate::domain::value_objects::{FlashAddress, SectorIndex};

/// Progress of serving the stored page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadState {
    cursor: FlashAddress,
    remaining: u32,
}

impl ReadState {
    pub(crate) const fn new(cursor: FlashAddress, remaining: u32) -> Self {
        Self { cursor, remaining }
    }

    /// Flash address of the next byte to send.
    pub const fn cursor(&self) -> FlashAddress {
        self.cursor
    }

    /// Bytes still to send.
    pub const fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Record that `sent` bytes went to the transport.
    pub(crate) fn advance(&mut self, sent: u32) {
        self.cursor = self.cursor.add(sent);
        self.remaining -= sent;
    }
}

/// Progress of replacing the stored page.
#[derive(Debug)]
pub struct WriteState {
    buffer: SectorBuffer,
    dest: SectorIndex,
}

impl WriteState {
    pub(crate) fn new(buffer: SectorBuffer, dest: SectorIndex) -> Self {
        Self { buffer, dest }
    }

    /// Sector the next commit erases and programs.
    pub const fn dest(&self) -> SectorIndex {
        self.dest
    }

    /// Bytes waiting for the next commit.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub(crate) fn parts(&mut self) -> (&mut SectorBuffer, &mut SectorIndex) {
        (&mut self.buffer, &mut self.dest)
    }
}

/// Progress of staging a firmware image.
#[derive(Debug)]
pub struct UpgradeState {
    buffer: SectorBuffer,
}

impl UpgradeState {
    pub(crate) fn new(buffer: SectorBuffer) -> Self {
        Self { buffer }
    }

    /// Bytes waiting for the next commit.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub(crate) fn buffer_mut(&mut self) -> &mut SectorBuffer {
        &mut self.buffer
    }
}

/// State carried across handler invocations for one request.
#[derive(Debug)]
pub enum TransferSession {
    /// `GET /` in progress.
    Read(ReadState),
    /// `POST /` in progress.
    Write(WriteState),
    /// `UPGRADE /firmware` in progress.
    Upgrade(UpgradeState),
}
