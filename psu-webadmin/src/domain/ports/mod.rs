//! Ports define the interfaces between the domain and the outside world.
//!
//! - **Driving port**: [`HttpSession`], through which the HTTP server hands
//!   requests to the handlers and takes responses back.
//! - **Driven ports**: [`StorageDevice`], [`UpgradeSubsystem`],
//!   [`RelayControl`], [`SystemControl`] and [`ParamStore`], supplied by the
//!   board so the handlers never touch hardware directly.

mod device;
mod storage;
mod transport;
mod upgrade;

pub use device::{ParamStore, RelayControl, SystemControl};
pub use storage::StorageDevice;
pub use transport::{
    ContentType, FieldVisitor, HandlerStatus, Header, HttpSession, Signal, Status, TransportError,
};
pub use upgrade::{BootImage, UpgradeSubsystem};
