//! Web administration for a network-controlled power relay.
//!
//! The appliance serves a single compressed page from a reserved flash
//! region, accepts a replacement page and a firmware image over HTTP, and
//! exposes a handful of control endpoints (relay on/off, reboot, parameter
//! editing, status). Request bodies arrive in chunks far smaller than a
//! flash sector, so uploads are staged through a one-sector buffer and the
//! server's intake is throttled until each sector is committed.
//!
//! # Architecture
//!
//! The crate is organized into three layers:
//!
//! ## Domain Layer (`domain`)
//! Transfer logic with no hardware dependencies:
//! - **Value Objects**: `SectorIndex`, `FlashAddress`, `StorageLayout`
//! - **Entities**: `SectorBuffer`, `TransferSession`, `Params`
//! - **Services**: `SectorReader`, `SectorWriter`, `OtaWriter`, `StatusTimer`
//! - **Ports**: `HttpSession`, `StorageDevice`, `UpgradeSubsystem`,
//!   `RelayControl`, `SystemControl`, `ParamStore`
//!
//! ## Adapter Layer (`adapters`)
//! - **`NorFlashStorage`**: `StorageDevice` over any `embedded-storage` NOR flash
//! - **`GpioRelay`**: `RelayControl` over an `embedded-hal` output pin
//!
//! ## Infrastructure Layer (`infrastructure`)
//! Host-side stand-ins: an in-memory flash chip, a recording upgrade
//! subsystem, a simulated board, and a loopback HTTP server.
//!
//! # Quick Start
//!
//! ```
//! use psu_webadmin::adapters::NorFlashStorage;
//! use psu_webadmin::domain::{Params, StorageLayout};
//! use psu_webadmin::infrastructure::{
//!     LoopbackServer, MemFlash, MemParamStore, RecordingUpgrade, SimRelay, SimSystem,
//! };
//! use psu_webadmin::WebAdmin;
//!
//! let layout = StorageLayout::MAP2;
//! let flash = NorFlashStorage::new(MemFlash::for_layout(&layout), 4096).unwrap();
//! let mut admin = WebAdmin::new(
//!     flash,
//!     RecordingUpgrade::default(),
//!     SimRelay::new(),
//!     SimSystem::new(32 * 1024),
//!     MemParamStore::new(),
//!     Params::default(),
//! )
//! .with_layout(layout);
//!
//! let server = LoopbackServer::default();
//! assert!(server.request(&mut admin, "POST", "/", b"<h1>hi</h1>").is_completed());
//!
//! let page = server.request(&mut admin, "GET", "/", b"");
//! assert_eq!(page.text(), "<h1>hi</h1>");
//! ```
//!
//! # Features
//!
//! - `embedded-hal`: GPIO relay adapter (default)
//! - `log`: Enable logging support
//! - `defmt`: Enable defmt logging for embedded
//! - `flash-map2` / `flash-map4` / `flash-map6`: where the page region sits
//!   in [`StorageLayout::DEFAULT`](domain::StorageLayout::DEFAULT)

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

extern crate alloc;

// This mod MUST go first, so that the others see its macros.
#[macro_use]
mod fmt;

// Core layers
pub mod domain;
pub mod adapters;
pub mod infrastructure;

pub mod routes;
mod webadmin;

pub use domain::{
    BlinkPattern, DeferredAction, HandlerStatus, HttpSession, Params, StorageLayout, Tick,
    TransferSession, WebAdminError,
};
pub use routes::Endpoint;
pub use webadmin::{SystemInfo, WebAdmin, VERSION};
