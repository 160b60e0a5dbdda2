//! Shared fixtures for the scenario tests.

#![allow(dead_code)]

use psu_webadmin::adapters::NorFlashStorage;
use psu_webadmin::domain::{BootImage, Params, StorageLayout};
use psu_webadmin::infrastructure::{
    LoopbackConfig, LoopbackServer, MemFlash, MemParamStore, RecordingUpgrade, SimRelay,
    SimSystem,
};
use psu_webadmin::WebAdmin;

/// Free heap reported by the simulated chip.
pub const FREE_HEAP: u32 = 32 * 1024;

/// Handlers wired to the in-memory board.
pub type Admin =
    WebAdmin<NorFlashStorage<MemFlash>, RecordingUpgrade, SimRelay, SimSystem, MemParamStore>;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Handlers over a blank 16KB page region (MAP2).
pub fn admin() -> Admin {
    admin_with(StorageLayout::MAP2, RecordingUpgrade::new(BootImage::User1))
}

pub fn admin_with(layout: StorageLayout, upgrade: RecordingUpgrade) -> Admin {
    init_logger();
    WebAdmin::new(
        flash(&layout),
        upgrade,
        SimRelay::new(),
        SimSystem::new(FREE_HEAP),
        MemParamStore::new(),
        Params::default(),
    )
    .with_layout(layout)
}

/// Blank chip sized for `layout`.
pub fn flash(layout: &StorageLayout) -> NorFlashStorage<MemFlash> {
    NorFlashStorage::new(MemFlash::for_layout(layout), layout.sector_size())
        .expect("sector size matches the chip's erase size")
}

/// Server with 1KB chunks and a one-sector intake window.
pub fn server() -> LoopbackServer {
    LoopbackServer::new(LoopbackConfig::default())
}

/// `len` bytes that do not repeat with a period of a sector or a word.
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 + i / 251) as u8).collect()
}

/// The underlying chip.
pub fn chip(admin: &Admin) -> &MemFlash {
    admin.storage().inner()
}

/// `(offset, len)` of every program operation.
pub fn writes(admin: &Admin) -> Vec<(u32, usize)> {
    chip(admin).writes().collect()
}

/// Sector indices erased, in order.
pub fn erased_sectors(admin: &Admin) -> Vec<u32> {
    let sector = admin.layout().sector_size() as u32;
    chip(admin).erases().map(|(from, _)| from / sector).collect()
}
