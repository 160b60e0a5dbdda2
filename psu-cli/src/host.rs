//! Host implementations of the board ports.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use psu_webadmin::domain::{BootImage, ParamStore, Params, SystemControl, UpgradeSubsystem};

/// Chip services backed by the host clock.
///
/// The clock can be pushed forward with [`HostSystem::advance`] so deferred
/// actions run without waiting out their blink patterns.
pub struct HostSystem {
    boot: Instant,
    skipped_ms: u32,
    free_heap: u32,
    led: bool,
    restart_requested: bool,
}

impl HostSystem {
    pub fn new(free_heap: u32) -> Self {
        Self {
            boot: Instant::now(),
            skipped_ms: 0,
            free_heap,
            led: false,
            restart_requested: false,
        }
    }

    /// Milliseconds since start, including skipped time.
    pub fn now_ms(&self) -> u32 {
        (self.boot.elapsed().as_millis() as u32).wrapping_add(self.skipped_ms)
    }

    /// Skip `ms` of wall time.
    pub fn advance(&mut self, ms: u32) {
        self.skipped_ms = self.skipped_ms.wrapping_add(ms);
    }

    pub fn restart_requested(&self) -> bool {
        self.restart_requested
    }
}

impl SystemControl for HostSystem {
    fn restart(&mut self) {
        log::info!("Restart requested");
        self.restart_requested = true;
    }

    fn uptime_us(&self) -> u32 {
        let skipped = self.skipped_ms as u64 * 1000;
        (self.boot.elapsed().as_micros() as u64).wrapping_add(skipped) as u32
    }

    fn free_heap(&self) -> u32 {
        self.free_heap
    }

    fn rtc_time(&self) -> u32 {
        self.now_ms()
    }

    fn set_status_led(&mut self, on: bool) {
        if self.led != on {
            log::trace!("LED {}", if on { "on" } else { "off" });
        }
        self.led = on;
    }
}

/// Parameter record kept as a JSON file.
pub struct JsonParamStore {
    path: PathBuf,
}

impl JsonParamStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the saved record, or the defaults if nothing was saved yet.
    pub fn load(&self) -> Result<Params> {
        if !self.path.exists() {
            log::debug!("No params at {}, using defaults", self.path.display());
            return Ok(Params::default());
        }
        let raw = fs::read(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        serde_json::from_slice(&raw)
            .with_context(|| format!("Failed to parse {}", self.path.display()))
    }
}

impl ParamStore for JsonParamStore {
    type Error = io::Error;

    fn save(&mut self, params: &Params) -> Result<(), Self::Error> {
        let raw = serde_json::to_vec_pretty(params)?;
        fs::write(&self.path, raw)
    }
}

/// Upgrade subsystem staging the image into a file.
pub struct StagedUpgrade {
    path: PathBuf,
    file: Option<File>,
    running: BootImage,
    started: bool,
    finished: bool,
    erased: usize,
    staged: usize,
}

impl StagedUpgrade {
    pub fn new(path: impl Into<PathBuf>, running: BootImage) -> Self {
        Self {
            path: path.into(),
            file: None,
            running,
            started: false,
            finished: false,
            erased: 0,
            staged: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes staged so far.
    pub fn staged(&self) -> usize {
        self.staged
    }
}

impl UpgradeSubsystem for StagedUpgrade {
    type Error = io::Error;

    fn init(&mut self) {
        self.file = None;
        self.started = false;
        self.finished = false;
        self.erased = 0;
        self.staged = 0;
    }

    fn mark_start(&mut self) {
        self.started = true;
    }

    fn erase_block(&mut self, len: usize) -> Result<(), Self::Error> {
        self.erased += len;
        Ok(())
    }

    fn submit(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        if self.staged + data.len() > self.erased {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "submit past the erased area",
            ));
        }

        let file = match self.file.take() {
            Some(file) => file,
            None => OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&self.path)?,
        };
        self.file.insert(file).write_all(data)?;
        self.staged += data.len();
        Ok(())
    }

    fn mark_finished(&mut self) {
        if self.started {
            self.finished = true;
        }
    }

    fn reboot(&mut self) {
        if self.finished {
            self.running = self.running.other();
            self.finished = false;
        }
        log::info!("Rebooting into {}", self.running);
    }

    fn running_image(&self) -> BootImage {
        self.running
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonParamStore::new(dir.path().join("params.json"));
        assert_eq!(store.load().unwrap(), Params::default());

        let mut params = Params::default();
        params.apply("zone", Some("lab")).unwrap();
        store.save(&params).unwrap();
        assert_eq!(store.load().unwrap(), params);
    }

    #[test]
    fn test_upgrade_stages_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut upgrade = StagedUpgrade::new(dir.path().join("fw.bin"), BootImage::User1);

        upgrade.init();
        upgrade.mark_start();
        upgrade.erase_block(4096).unwrap();
        upgrade.submit(b"firmware").unwrap();
        assert!(upgrade.submit(&[0; 4096]).is_err());

        upgrade.mark_finished();
        upgrade.reboot();
        assert_eq!(upgrade.running_image(), BootImage::User2);
        assert_eq!(fs::read(upgrade.path()).unwrap(), b"firmware");
    }

    #[test]
    fn test_reboot_without_finish_keeps_image() {
        let mut upgrade = StagedUpgrade::new("unused.bin", BootImage::User2);
        upgrade.reboot();
        assert_eq!(upgrade.running_image(), BootImage::User2);
    }

    #[test]
    fn test_clock_skip() {
        let mut system = HostSystem::new(0);
        system.advance(5_000);
        assert!(system.now_ms() >= 5_000);
        assert!(system.uptime_us() >= 5_000_000);
    }
}
