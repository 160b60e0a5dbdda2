//! Domain layer - the transfer engine, free of hardware and server types.
//!
//! - **Value Objects**: `SectorIndex`, `FlashAddress`, `StorageLayout`
//! - **Entities**: `SectorBuffer`, `TransferSession`, `Params`
//! - **Domain Services**: `SectorReader`, `SectorWriter`, `OtaWriter`, the
//!   flow gate and the status timer
//! - **Ports**: `HttpSession` plus the storage, upgrade and board interfaces
//! - **Domain Errors**: `WebAdminError`
//!
//! ```text
//!   HttpSession ──► SectorWriter ─┐            ┌──► StorageDevice
//!        ▲          OtaWriter ────┼─ commits ──┤
//!        │                        │            └──► UpgradeSubsystem
//!        └── flow_gate::release ◄─┘
//!
//!   StorageDevice ──► SectorReader ──► HttpSession
//! ```
//!
//! Each service borrows its port for the duration of one invocation and keeps
//! nothing between calls; cross-call state lives in the session's transfer
//! slot.

pub mod entities;
pub mod error;
pub mod flow_gate;
pub mod ports;
pub mod value_objects;

mod ota_writer;
mod sector_reader;
mod sector_writer;
mod status_timer;

pub use entities::{Params, SectorBuffer, TransferSession};
pub use error::{WebAdminError, WriteTarget};
pub use ota_writer::{OtaWriter, REBOOTING};
pub use ports::{
    BootImage, ContentType, HandlerStatus, Header, HttpSession, ParamStore, RelayControl, Signal,
    Status, StorageDevice, SystemControl, TransportError, UpgradeSubsystem,
};
pub use sector_reader::SectorReader;
pub use sector_writer::{SectorWriter, DONE};
pub use status_timer::{BlinkPattern, DeferredAction, StatusTimer, Tick};
pub use value_objects::{
    FlashAddress, LayoutError, SectorIndex, StorageLayout, LENGTH_PREFIX, SECTOR_SIZE, WORD_SIZE,
};
