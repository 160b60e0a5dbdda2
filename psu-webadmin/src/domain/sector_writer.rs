//! SectorWriter domain service - replaces the stored page sector by sector.
//!
//! Request body bytes are gathered into a sector-sized buffer. A full buffer,
//! or the tail of the body, is committed by erasing the destination sector
//! and programming the buffer rounded up to the flash word size. The first
//! four bytes of the first sector are the little-endian length prefix.
//!
//! The buffering loop is shared with the firmware upgrade path
//! ([`OtaWriter`](super::OtaWriter)); only the commit differs.

use crate::domain::entities::{SectorBuffer, TransferSession, WriteState};
use crate::domain::error::{WebAdminError, WriteTarget};
use crate::domain::flow_gate;
use crate::domain::ports::{ContentType, HandlerStatus, HttpSession, Status, StorageDevice};
use crate::domain::value_objects::{SectorIndex, StorageLayout, LENGTH_PREFIX};

/// Body of the success response.
pub const DONE: &[u8] = b"Done\r\n";

/// Move available body bytes into `buffer`, committing as it fills.
///
/// A commit happens when the buffer is full, or when it holds data, nothing
/// more is buffered by the transport and no body remains undelivered. The
/// buffer is cleared after each commit and the intake throttle released
/// through [`flow_gate::release`].
///
/// Returns `true` once the whole body has been committed.
pub(crate) fn pump<H, C>(
    session: &mut H,
    buffer: &mut SectorBuffer,
    mut commit: C,
) -> Result<bool, WebAdminError>
where
    H: HttpSession + ?Sized,
    C: FnMut(&mut SectorBuffer, u32) -> Result<(), WebAdminError>,
{
    let body_remaining = session.body_remaining();

    loop {
        let available = session.available();
        let taken = if available > 0 {
            buffer.fill_with(available, |tail| session.recv(tail))
        } else {
            0
        };

        let drained = session.available() == 0;
        if buffer.is_full() || (!buffer.is_empty() && drained && body_remaining == 0) {
            commit(buffer, body_remaining)?;
            buffer.clear();
            flow_gate::release(session, body_remaining)?;
            continue;
        }

        if drained || taken == 0 {
            break;
        }
    }

    Ok(body_remaining == 0 && buffer.is_empty())
}

/// Domain service replacing the stored page.
///
/// # Type Parameters
///
/// - `S`: The storage implementation (must implement [`StorageDevice`])
pub struct SectorWriter<S> {
    storage: S,
    layout: StorageLayout,
}

impl<S: StorageDevice> SectorWriter<S> {
    /// Create a writer over `storage` for the region described by `layout`.
    pub fn new(storage: S, layout: StorageLayout) -> Self {
        Self { storage, layout }
    }

    /// Handle one invocation of `POST /`.
    ///
    /// The first invocation checks the declared length against the region,
    /// lifts erase protection and seeds the buffer with the length prefix.
    /// Every invocation then drains the transport into the buffer. Once the
    /// body is committed, answers `200 Done`.
    ///
    /// # Errors
    ///
    /// - [`WebAdminError::RegionOverflow`] if the body cannot fit the region.
    /// - [`WebAdminError::EraseProtect`] if protection cannot be lifted.
    /// - [`WebAdminError::StorageWrite`] if an erase or write fails.
    /// - [`WebAdminError::FlowControlQueueFull`] if intake cannot resume.
    ///
    /// The write state is released on every error.
    pub fn handle<H>(&mut self, session: &mut H) -> Result<HandlerStatus, WebAdminError>
    where
        H: HttpSession + ?Sized,
    {
        let mut state = if session.handler_calls() == 1 {
            self.begin(session)?
        } else {
            match session.transfer().take() {
                Some(TransferSession::Write(state)) => state,
                other => {
                    warn!("Body chunk for a released upload dropped");
                    *session.transfer() = other;
                    return Ok(HandlerStatus::Complete);
                }
            }
        };

        let storage = &mut self.storage;
        let layout = &self.layout;
        let (buffer, dest) = state.parts();
        let finished = pump(session, buffer, |buffer, remaining| {
            commit(storage, layout, buffer, dest, remaining)
        })?;

        if finished {
            info!("Page replaced, next sector {}", state.dest());
            session.respond(Status::OK, ContentType::Text, DONE)?;
            return Ok(HandlerStatus::Complete);
        }

        *session.transfer() = Some(TransferSession::Write(state));
        Ok(HandlerStatus::More)
    }

    fn begin<H>(&mut self, session: &mut H) -> Result<WriteState, WebAdminError>
    where
        H: HttpSession + ?Sized,
    {
        *session.transfer() = None;

        let length = session.content_length();
        if length as usize > self.layout.max_asset_len() {
            warn!("Upload of {} bytes does not fit the region", length);
            return Err(WebAdminError::RegionOverflow {
                requested: (length as usize).saturating_add(LENGTH_PREFIX),
                capacity: self.layout.region_capacity(),
            });
        }

        self.storage.disable_erase_protect().map_err(|_| {
            error!("Cannot disable flash erase protect");
            WebAdminError::EraseProtect
        })?;

        let mut buffer = SectorBuffer::new(self.layout.sector_size());
        buffer.extend(&length.to_le_bytes());
        info!("Replacing page, {} bytes", length);
        Ok(WriteState::new(buffer, self.layout.region_start()))
    }
}

fn commit<S: StorageDevice>(
    storage: &mut S,
    layout: &StorageLayout,
    buffer: &mut SectorBuffer,
    dest: &mut SectorIndex,
    remaining: u32,
) -> Result<(), WebAdminError> {
    let target = WriteTarget::Sector(*dest);
    if !layout.contains(*dest) {
        return Err(WebAdminError::RegionOverflow {
            requested: (dest.offset_from(layout.region_start()) as usize + 1)
                * layout.sector_size(),
            capacity: layout.region_capacity(),
        });
    }

    storage.erase_sector(*dest).map_err(|_| {
        error!("Erase of {} failed", *dest);
        WebAdminError::StorageWrite { target }
    })?;

    debug!(
        "Write {}, more: {}, len: {}",
        *dest,
        remaining,
        buffer.len()
    );

    let address = layout.sector_address(*dest);
    storage
        .write(address, buffer.word_aligned(layout.word_size()))
        .map_err(|_| {
            error!("Write to {} failed", address);
            WebAdminError::StorageWrite { target }
        })?;

    *dest = dest.next();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::NorFlashStorage;
    use crate::infrastructure::{LoopbackConfig, LoopbackSession, MemFlash};

    const LAYOUT: StorageLayout = StorageLayout::MAP2;

    fn storage() -> NorFlashStorage<MemFlash> {
        NorFlashStorage::new(MemFlash::for_layout(&LAYOUT), LAYOUT.sector_size()).unwrap()
    }

    fn first_call(body: &[u8]) -> LoopbackSession {
        let mut session = LoopbackSession::new(LoopbackConfig::default(), "/", body);
        session.begin_call();
        session.deliver();
        session
    }

    #[test]
    fn test_maximum_declared_length_rejected() {
        let mut storage = storage();
        let mut session = first_call(b"page").with_content_length(u32::MAX);

        let err = SectorWriter::new(&mut storage, LAYOUT)
            .handle(&mut session)
            .unwrap_err();
        assert_eq!(
            err,
            WebAdminError::RegionOverflow {
                requested: (u32::MAX as usize).saturating_add(LENGTH_PREFIX),
                capacity: LAYOUT.region_capacity(),
            }
        );
        assert!(!session.has_transfer());
        assert!(storage.inner().ops().is_empty());
    }

    #[test]
    fn test_one_byte_past_region_rejected() {
        let mut storage = storage();
        let length = LAYOUT.max_asset_len() as u32 + 1;
        let mut session = first_call(b"page").with_content_length(length);

        let err = SectorWriter::new(&mut storage, LAYOUT)
            .handle(&mut session)
            .unwrap_err();
        assert_eq!(
            err,
            WebAdminError::RegionOverflow {
                requested: LAYOUT.region_capacity() + 1,
                capacity: LAYOUT.region_capacity(),
            }
        );
        assert!(storage.inner().ops().is_empty());
    }

    #[test]
    fn test_partial_sector_parked_in_slot() {
        let mut storage = storage();
        let mut session = first_call(&[0x5A; 6000]);

        let status = SectorWriter::new(&mut storage, LAYOUT)
            .handle(&mut session)
            .unwrap();
        assert_eq!(status, HandlerStatus::More);
        match session.transfer() {
            Some(TransferSession::Write(state)) => {
                assert_eq!(state.buffered(), LENGTH_PREFIX + 1024);
                assert_eq!(state.dest(), LAYOUT.region_start());
            }
            other => panic!("unexpected transfer state {:?}", other),
        }
        assert_eq!(storage.inner().erases().count(), 0);
    }
}
