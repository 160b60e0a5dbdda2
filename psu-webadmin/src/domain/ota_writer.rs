//! OtaWriter domain service - streams a firmware image to the upgrade
//! subsystem.
//!
//! Uses the same sector buffering as [`SectorWriter`](super::SectorWriter).
//! A commit erases one sector's worth ahead of the subsystem's write
//! position and then submits exactly the buffered bytes; the subsystem pads
//! on its own. Once the image is complete the activation is deferred behind
//! the status timer so the response can reach the client first.

use crate::domain::entities::{SectorBuffer, TransferSession, UpgradeState};
use crate::domain::error::{WebAdminError, WriteTarget};
use crate::domain::ports::{ContentType, HandlerStatus, HttpSession, Status, UpgradeSubsystem};
use crate::domain::sector_writer::pump;
use crate::domain::status_timer::{BlinkPattern, DeferredAction, StatusTimer};
use crate::domain::value_objects::StorageLayout;

/// Body of the success response.
pub const REBOOTING: &[u8] = b"Rebooting\r\n";

/// Domain service staging a firmware image.
///
/// # Type Parameters
///
/// - `U`: The upgrade subsystem (must implement [`UpgradeSubsystem`])
pub struct OtaWriter<U> {
    upgrade: U,
    layout: StorageLayout,
}

impl<U: UpgradeSubsystem> OtaWriter<U> {
    /// Create a writer feeding `upgrade` in blocks of one flash sector.
    pub fn new(upgrade: U, layout: StorageLayout) -> Self {
        Self { upgrade, layout }
    }

    /// Handle one invocation of `UPGRADE /firmware`.
    ///
    /// The first invocation resets the subsystem and flags the upgrade as
    /// started. When the last block is submitted, `timer` is armed with
    /// [`DeferredAction::ActivateUpgrade`] at `now_ms` and the client gets
    /// `200 Rebooting`.
    ///
    /// # Errors
    ///
    /// - [`WebAdminError::StorageWrite`] if the subsystem refuses a block.
    /// - [`WebAdminError::FlowControlQueueFull`] if intake cannot resume.
    ///
    /// The upgrade state is released on every error and the image is never
    /// flagged complete.
    pub fn handle<H>(
        &mut self,
        session: &mut H,
        timer: &mut StatusTimer,
        now_ms: u32,
    ) -> Result<HandlerStatus, WebAdminError>
    where
        H: HttpSession + ?Sized,
    {
        let mut state = if session.handler_calls() == 1 {
            *session.transfer() = None;
            info!("Initialize system upgrade, {} bytes", session.content_length());
            self.upgrade.init();
            self.upgrade.mark_start();
            UpgradeState::new(SectorBuffer::new(self.layout.sector_size()))
        } else {
            match session.transfer().take() {
                Some(TransferSession::Upgrade(state)) => state,
                other => {
                    warn!("Firmware chunk for a released upgrade dropped");
                    *session.transfer() = other;
                    return Ok(HandlerStatus::Complete);
                }
            }
        };

        let upgrade = &mut self.upgrade;
        let block = self.layout.sector_size();
        let finished = pump(session, state.buffer_mut(), |buffer, remaining| {
            upgrade.erase_block(block).map_err(|_| {
                error!("Upgrade erase failed");
                WebAdminError::StorageWrite {
                    target: WriteTarget::Upgrade,
                }
            })?;
            debug!("FW: more: {}, len: {}", remaining, buffer.len());
            upgrade.submit(buffer.filled()).map_err(|_| {
                error!("Upgrade submit of {} bytes failed", buffer.len());
                WebAdminError::StorageWrite {
                    target: WriteTarget::Upgrade,
                }
            })
        })?;

        if finished {
            info!("Firmware staged, rebooting after grace period");
            timer.arm(
                BlinkPattern::UPGRADE,
                Some(DeferredAction::ActivateUpgrade),
                now_ms,
            );
            session.respond(Status::OK, ContentType::Text, REBOOTING)?;
            return Ok(HandlerStatus::Complete);
        }

        *session.transfer() = Some(TransferSession::Upgrade(state));
        Ok(HandlerStatus::More)
    }
}
