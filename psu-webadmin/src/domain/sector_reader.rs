//! SectorReader domain service - serves the stored page in network pieces.
//!
//! The region starts with a little-endian length prefix. The first
//! invocation reads it and starts a deflate-encoded response of that length;
//! each later send opportunity moves one piece of at most the transport's
//! chunk capacity from flash to the wire.

use aligned::{A4, Aligned};
use alloc::vec;

use crate::domain::entities::{ReadState, TransferSession};
use crate::domain::error::WebAdminError;
use crate::domain::ports::{ContentType, HandlerStatus, Header, HttpSession, Status, StorageDevice};
use crate::domain::value_objects::{FlashAddress, StorageLayout, LENGTH_PREFIX};

const DEFLATE: Header<'static> = Header {
    name: "Content-Encoding",
    value: "deflate",
};

/// Domain service streaming the stored page out of flash.
///
/// # Type Parameters
///
/// - `S`: The storage implementation (must implement [`StorageDevice`])
pub struct SectorReader<S> {
    storage: S,
    layout: StorageLayout,
}

impl<S: StorageDevice> SectorReader<S> {
    /// Create a reader over `storage` for the region described by `layout`.
    pub fn new(storage: S, layout: StorageLayout) -> Self {
        Self { storage, layout }
    }

    /// Handle the first invocation of `GET /`.
    ///
    /// Reads the length prefix and starts the response. An empty page is
    /// finalized immediately; otherwise the body follows through
    /// [`SectorReader::on_sent`].
    ///
    /// # Errors
    ///
    /// - [`WebAdminError::StorageRead`] if the prefix cannot be read.
    /// - [`WebAdminError::RegionOverflow`] if the prefix claims more bytes
    ///   than the region holds (erased flash reads as `0xFFFFFFFF`).
    /// - [`WebAdminError::Transport`] if the response cannot be started.
    pub fn start<H>(&mut self, session: &mut H) -> Result<HandlerStatus, WebAdminError>
    where
        H: HttpSession + ?Sized,
    {
        *session.transfer() = None;

        let address = self.layout.region_address();
        let mut prefix: Aligned<A4, [u8; LENGTH_PREFIX]> = Aligned([0; LENGTH_PREFIX]);
        self.storage.read(address, &mut prefix[..]).map_err(|_| {
            error!("Flash read of length prefix at {} failed", address);
            WebAdminError::StorageRead { address }
        })?;

        let length = u32::from_le_bytes(*prefix);
        if length as usize > self.layout.max_asset_len() {
            warn!("Stored length {} exceeds region", length);
            return Err(WebAdminError::RegionOverflow {
                requested: (length as usize).saturating_add(LENGTH_PREFIX),
                capacity: self.layout.region_capacity(),
            });
        }

        debug!("Serving {} bytes from {}", length, address);
        session.response_start(Status::OK, &[DEFLATE], ContentType::Html, length)?;

        if length == 0 {
            session.response_finalize()?;
            return Ok(HandlerStatus::Complete);
        }

        let state = ReadState::new(address.add(LENGTH_PREFIX as u32), length);
        *session.transfer() = Some(TransferSession::Read(state));
        Ok(HandlerStatus::More)
    }

    /// Handle a send opportunity.
    ///
    /// Does nothing while the outgoing buffer still holds data or when no
    /// read is in progress. Otherwise sends the next piece, finalizing the
    /// response once the last byte is handed over.
    ///
    /// # Errors
    ///
    /// Any flash or transport failure releases the read state and is
    /// returned as is.
    pub fn on_sent<H>(&mut self, session: &mut H) -> Result<HandlerStatus, WebAdminError>
    where
        H: HttpSession + ?Sized,
    {
        if session.response_pending() > 0 {
            return Ok(HandlerStatus::More);
        }

        let mut state = match session.transfer().take() {
            Some(TransferSession::Read(state)) => state,
            other => {
                *session.transfer() = other;
                return Ok(HandlerStatus::Complete);
            }
        };

        if state.remaining() > 0 {
            let piece = (session.chunk_capacity() as u32).min(state.remaining());
            self.send_piece(session, state.cursor(), piece as usize)?;
            state.advance(piece);
            trace!("Sent {} bytes, {} remain", piece, state.remaining());
        }

        if state.remaining() == 0 {
            session.response_finalize()?;
            debug!("Page served");
            return Ok(HandlerStatus::Complete);
        }

        *session.transfer() = Some(TransferSession::Read(state));
        Ok(HandlerStatus::More)
    }

    /// Read `len` bytes at `cursor` and hand them to the transport.
    ///
    /// Flash is read in whole words from a word-aligned address; only the
    /// requested bytes are sent.
    fn send_piece<H>(
        &mut self,
        session: &mut H,
        cursor: FlashAddress,
        len: usize,
    ) -> Result<(), WebAdminError>
    where
        H: HttpSession + ?Sized,
    {
        let word = self.layout.word_size() as u32;
        let skew = (cursor.value() % word) as usize;
        let start = FlashAddress::new(cursor.value() - skew as u32);

        let mut scratch = vec![0u8; self.layout.word_align(skew + len)];
        self.storage.read(start, &mut scratch).map_err(|_| {
            error!("Flash read of {} bytes at {} failed", scratch.len(), start);
            WebAdminError::StorageRead { address: start }
        })?;

        session.send(&scratch[skew..skew + len])?;
        Ok(())
    }
}
