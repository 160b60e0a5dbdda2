//! Adapter layer - concrete implementations of the domain's driven ports.
//!
//! ```text
//!     ┌──────────────────────────────────┐
//!     │      Domain Layer                │
//!     │  - StorageDevice (port)          │
//!     │  - RelayControl (port)           │
//!     └────────────┬─────────────────────┘
//!                  │ implements
//!                  ▼
//!     ┌──────────────────────────────────┐
//!     │      Adapter Layer               │  ◄── This module
//!     │  - NorFlashStorage               │
//!     │  - GpioRelay                     │
//!     └────────────┬─────────────────────┘
//!                  │ uses
//!                  ▼
//!     ┌──────────────────────────────────┐
//!     │  embedded-storage / embedded-hal │
//!     └──────────────────────────────────┘
//! ```

mod nor_flash_storage;

#[cfg(feature = "embedded-hal")]
mod gpio_relay;

pub use nor_flash_storage::{NorFlashStorage, NorFlashStorageError};

#[cfg(feature = "embedded-hal")]
pub use gpio_relay::GpioRelay;
