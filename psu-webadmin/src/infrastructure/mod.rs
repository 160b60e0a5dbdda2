//! Infrastructure layer: in-memory stand-ins for the board and the HTTP
//! server.
//!
//! Everything here runs on the host. [`MemFlash`] plays the SPI flash,
//! [`RecordingUpgrade`] the bootloader's upgrade API, the `Sim*` types the
//! rest of the board, and [`LoopbackServer`] the chunked HTTP server that
//! calls the handlers.

mod board;
mod loopback;
mod mem_flash;
mod recording_upgrade;

pub use board::{MemParamStore, SimRelay, SimSystem, StoreLocked};
pub use loopback::{
    parse_urlencoded, Exchange, LoopbackConfig, LoopbackServer, LoopbackSession, Outcome, Response,
};
pub use mem_flash::{FlashFault, FlashOp, MemFlash};
pub use recording_upgrade::{RecordingUpgrade, UpgradeRefused};
