//! Route table of the appliance.
//!
//! The server matches the request verb exactly and the path by prefix,
//! first entry wins, so more specific paths come before `/`.

/// What a route is served by.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Stream a firmware image into the upgrade subsystem.
    UpgradeFirmware,
    /// Switch the relay on.
    PowerOn,
    /// Switch the relay off.
    PowerOff,
    /// Apply and save submitted parameters.
    SaveParams,
    /// Current parameters as JSON.
    ParamsJson,
    /// Reboot into the other firmware image.
    ToggleBoot,
    /// System status as JSON.
    StatusJson,
    /// System status as text.
    SystemInfo,
    /// Serve the stored page.
    ServePage,
    /// Replace the stored page.
    ReplacePage,
    /// Restart the device.
    Reboot,
}

/// One entry of the route table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    /// Request verb, matched exactly.
    pub verb: &'static str,
    /// Path prefix.
    pub path: &'static str,
    /// Handler.
    pub endpoint: Endpoint,
}

const fn route(verb: &'static str, path: &'static str, endpoint: Endpoint) -> Route {
    Route {
        verb,
        path,
        endpoint,
    }
}

/// All routes, in match order.
pub static ROUTES: &[Route] = &[
    route("UPGRADE", "/firmware", Endpoint::UpgradeFirmware),
    route("ON", "/", Endpoint::PowerOn),
    route("OFF", "/", Endpoint::PowerOff),
    route("POST", "/params", Endpoint::SaveParams),
    route("GET", "/params.json", Endpoint::ParamsJson),
    route("TOGGLE", "/boots", Endpoint::ToggleBoot),
    route("GET", "/status.json", Endpoint::StatusJson),
    route("INFO", "/", Endpoint::SystemInfo),
    route("GET", "/", Endpoint::ServePage),
    route("POST", "/", Endpoint::ReplacePage),
    route("REBOOT", "/", Endpoint::Reboot),
];

/// Find the endpoint serving `verb path`.
///
/// ```
/// use psu_webadmin::routes::{find, Endpoint};
///
/// assert_eq!(find("GET", "/params.json"), Some(Endpoint::ParamsJson));
/// assert_eq!(find("GET", "/"), Some(Endpoint::ServePage));
/// assert_eq!(find("DELETE", "/"), None);
/// ```
pub fn find(verb: &str, path: &str) -> Option<Endpoint> {
    ROUTES
        .iter()
        .find(|r| r.verb == verb && path.starts_with(r.path))
        .map(|r| r.endpoint)
}
