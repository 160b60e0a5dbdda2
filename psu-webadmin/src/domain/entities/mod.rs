//! Domain entities.
//!
//! The sector buffer that stages uploads, the per-request transfer session
//! built around it, and the device parameter record.

mod params;
mod sector_buffer;
mod session;

pub use params::{Params, DEFAULT_NAME, DEFAULT_ZONE};
pub use sector_buffer::{SectorBuffer, ERASED_BYTE};
pub use session::{ReadState, TransferSession, UpgradeState, WriteState};
