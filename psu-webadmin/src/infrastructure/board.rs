//! Simulated board: relay latch, system services and parameter store.

use core::fmt;

use crate::domain::entities::Params;
use crate::domain::ports::{ParamStore, RelayControl, SystemControl};

/// Relay that only remembers its state.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SimRelay {
    on: bool,
    switches: u32,
}

impl SimRelay {
    /// Create a relay in the off position.
    pub const fn new() -> Self {
        Self {
            on: false,
            switches: 0,
        }
    }

    /// Number of on/off commands received.
    pub fn switches(&self) -> u32 {
        self.switches
    }
}

impl RelayControl for SimRelay {
    fn power_on(&mut self) {
        self.on = true;
        self.switches += 1;
    }

    fn power_off(&mut self) {
        self.on = false;
        self.switches += 1;
    }

    fn is_on(&mut self) -> bool {
        self.on
    }
}

/// System services with a hand-driven clock.
#[derive(Debug, Clone, Default)]
pub struct SimSystem {
    uptime_us: u32,
    free_heap: u32,
    rtc: u32,
    led: bool,
    led_changes: u32,
    restarts: u32,
}

impl SimSystem {
    /// Create a system that just booted with `free_heap` bytes free.
    pub fn new(free_heap: u32) -> Self {
        Self {
            free_heap,
            ..Self::default()
        }
    }

    /// Set the clock.
    pub fn set_uptime_ms(&mut self, ms: u32) {
        self.uptime_us = ms.wrapping_mul(1000);
        self.rtc = ms;
    }

    /// Whether the status LED is lit.
    pub fn led(&self) -> bool {
        self.led
    }

    /// Number of LED level changes.
    pub fn led_changes(&self) -> u32 {
        self.led_changes
    }

    /// Times `restart` was called.
    pub fn restarts(&self) -> u32 {
        self.restarts
    }
}

impl SystemControl for SimSystem {
    fn restart(&mut self) {
        self.restarts += 1;
    }

    fn uptime_us(&self) -> u32 {
        self.uptime_us
    }

    fn free_heap(&self) -> u32 {
        self.free_heap
    }

    fn rtc_time(&self) -> u32 {
        self.rtc
    }

    fn set_status_led(&mut self, on: bool) {
        if self.led != on {
            self.led_changes += 1;
        }
        self.led = on;
    }
}

/// The in-memory store refused to save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreLocked;

impl fmt::Display for StoreLocked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Parameter store is read-only")
    }
}

impl core::error::Error for StoreLocked {}

/// [`ParamStore`] keeping the last saved record in memory.
#[derive(Debug, Clone, Default)]
pub struct MemParamStore {
    saved: Option<Params>,
    saves: u32,
    locked: bool,
}

impl MemParamStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every save fail.
    pub fn locked(mut self) -> Self {
        self.locked = true;
        self
    }

    /// Last saved record.
    pub fn saved(&self) -> Option<&Params> {
        self.saved.as_ref()
    }

    /// Successful saves so far.
    pub fn saves(&self) -> u32 {
        self.saves
    }
}

impl ParamStore for MemParamStore {
    type Error = StoreLocked;

    fn save(&mut self, params: &Params) -> Result<(), Self::Error> {
        if self.locked {
            return Err(StoreLocked);
        }
        self.saved = Some(params.clone());
        self.saves += 1;
        Ok(())
    }
}
