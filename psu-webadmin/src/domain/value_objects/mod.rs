//! Value objects for the domain layer.
//!
//! Immutable, validated types for flash geometry: sector indices, byte
//! addresses, and the layout of the region holding the served page.

mod sector_index;
mod flash_address;
mod storage_layout;

pub use sector_index::SectorIndex;
pub use flash_address::FlashAddress;
pub use storage_layout::{LayoutError, StorageLayout, LENGTH_PREFIX, SECTOR_SIZE, WORD_SIZE};
