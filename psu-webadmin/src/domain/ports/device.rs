//! Board-level ports: the relay, system services and the parameter store.

use crate::domain::entities::Params;

/// Port for the mains relay.
pub trait RelayControl {
    /// Close the relay (power the load).
    fn power_on(&mut self);

    /// Open the relay.
    fn power_off(&mut self);

    /// Whether the load is currently powered.
    fn is_on(&mut self) -> bool;
}

/// Port for chip-level services.
pub trait SystemControl {
    /// Restart the chip without touching upgrade flags.
    fn restart(&mut self);

    /// Microseconds since boot.
    fn uptime_us(&self) -> u32;

    /// Free heap in bytes.
    fn free_heap(&self) -> u32;

    /// Raw RTC counter.
    fn rtc_time(&self) -> u32;

    /// Drive the status LED.
    fn set_status_led(&mut self, on: bool);
}

/// Port for persisting the parameter record.
///
/// The on-flash format belongs to the implementation.
pub trait ParamStore {
    /// Store error type.
    type Error: core::fmt::Debug;

    /// Persist `params`, replacing the stored record.
    fn save(&mut self, params: &Params) -> Result<(), Self::Error>;
}
