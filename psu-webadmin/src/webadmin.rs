//! Web administration handlers.
//!
//! [`WebAdmin`] owns the board capabilities and the parameter record and
//! exposes one method per [`Endpoint`]. The server calls
//! [`WebAdmin::handle`] for each handler invocation, [`WebAdmin::on_sent`]
//! whenever a response buffer drains, and [`WebAdmin::on_close`] when a
//! connection goes away. The main loop calls [`WebAdmin::tick`] to drive the
//! status LED and deferred reboots.

use alloc::format;
use alloc::vec::Vec;

use serde::Serialize;

use crate::domain::entities::Params;
use crate::domain::error::WebAdminError;
use crate::domain::ports::{
    BootImage, ContentType, HandlerStatus, HttpSession, ParamStore, RelayControl, Status,
    StorageDevice, SystemControl, UpgradeSubsystem,
};
use crate::domain::{
    BlinkPattern, DeferredAction, OtaWriter, SectorReader, SectorWriter, StatusTimer, StorageLayout,
    Tick,
};
use crate::routes::Endpoint;

/// Firmware version reported by `INFO /` and `/status.json`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const PARAMS_SAVED: &[u8] = b"Params has been saved, Rebooting in 4 seconds.\r\n";
const REBOOTING: &[u8] = b"Rebooting...\r\n";

/// Body of `GET /status.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SystemInfo<'a> {
    /// Discovery zone.
    pub zone: &'a str,
    /// Device name.
    pub name: &'a str,
    /// Microseconds since boot.
    pub uptime: u32,
    /// Running firmware slot.
    pub boot: BootImage,
    /// Firmware version.
    pub version: &'static str,
    /// Free heap in bytes.
    pub free: u32,
    /// Raw RTC counter.
    pub rtc: u32,
}

/// The appliance's request handlers and the state they share.
///
/// # Type Parameters
///
/// - `S`: flash holding the served page ([`StorageDevice`])
/// - `U`: firmware upgrade subsystem ([`UpgradeSubsystem`])
/// - `R`: mains relay ([`RelayControl`])
/// - `Y`: chip services ([`SystemControl`])
/// - `P`: parameter persistence ([`ParamStore`])
pub struct WebAdmin<S, U, R, Y, P> {
    storage: S,
    upgrade: U,
    relay: R,
    system: Y,
    store: P,
    params: Params,
    layout: StorageLayout,
    timer: StatusTimer,
}

impl<S, U, R, Y, P> WebAdmin<S, U, R, Y, P>
where
    S: StorageDevice,
    U: UpgradeSubsystem,
    R: RelayControl,
    Y: SystemControl,
    P: ParamStore,
{
    /// Create the handlers over the board's capabilities.
    ///
    /// The page region follows [`StorageLayout::DEFAULT`]; see
    /// [`WebAdmin::with_layout`].
    pub fn new(storage: S, upgrade: U, relay: R, system: Y, store: P, params: Params) -> Self {
        Self {
            storage,
            upgrade,
            relay,
            system,
            store,
            params,
            layout: StorageLayout::DEFAULT,
            timer: StatusTimer::new(),
        }
    }

    /// Use `layout` for the page region.
    pub fn with_layout(mut self, layout: StorageLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Run one handler invocation for `endpoint`.
    ///
    /// # Errors
    ///
    /// Whatever the endpoint's handler returns. The request's transfer state
    /// is released before an error is returned.
    pub fn handle<H>(
        &mut self,
        endpoint: Endpoint,
        session: &mut H,
    ) -> Result<HandlerStatus, WebAdminError>
    where
        H: HttpSession + ?Sized,
    {
        match endpoint {
            Endpoint::UpgradeFirmware => self.upgrade_firmware(session),
            Endpoint::PowerOn => self.power_on(session),
            Endpoint::PowerOff => self.power_off(session),
            Endpoint::SaveParams => self.save_params(session),
            Endpoint::ParamsJson => self.params_json(session),
            Endpoint::ToggleBoot => self.toggle_boot(session),
            Endpoint::StatusJson => self.status_json(session),
            Endpoint::SystemInfo => self.system_info(session),
            Endpoint::ServePage => self.serve_page(session),
            Endpoint::ReplacePage => self.replace_page(session),
            Endpoint::Reboot => self.reboot(session),
        }
    }

    /// `GET /` - start serving the stored page.
    pub fn serve_page<H>(&mut self, session: &mut H) -> Result<HandlerStatus, WebAdminError>
    where
        H: HttpSession + ?Sized,
    {
        SectorReader::new(&mut self.storage, self.layout).start(session)
    }

    /// `POST /` - replace the stored page.
    pub fn replace_page<H>(&mut self, session: &mut H) -> Result<HandlerStatus, WebAdminError>
    where
        H: HttpSession + ?Sized,
    {
        SectorWriter::new(&mut self.storage, self.layout).handle(session)
    }

    /// `UPGRADE /firmware` - stage a firmware image and reboot into it.
    pub fn upgrade_firmware<H>(&mut self, session: &mut H) -> Result<HandlerStatus, WebAdminError>
    where
        H: HttpSession + ?Sized,
    {
        let now = self.now_ms();
        OtaWriter::new(&mut self.upgrade, self.layout).handle(session, &mut self.timer, now)
    }

    /// `POST /params` - apply the submitted fields, save, and restart.
    ///
    /// Fields are applied in submission order. An unknown field aborts the
    /// request, but fields applied before it stay in the in-memory record.
    pub fn save_params<H>(&mut self, session: &mut H) -> Result<HandlerStatus, WebAdminError>
    where
        H: HttpSession + ?Sized,
    {
        if session.body_remaining() > 0 {
            return Ok(HandlerStatus::More);
        }

        let params = &mut self.params;
        session.for_each_form_field(&mut |field: &str, value: Option<&str>| {
            params.apply(field, value)
        })?;

        self.store.save(&self.params).map_err(|_| {
            error!("Cannot save params");
            WebAdminError::SaveParams
        })?;

        session.respond(Status::OK, ContentType::Text, PARAMS_SAVED)?;
        info!("Rebooting...");
        self.defer(BlinkPattern::REBOOT, DeferredAction::Restart);
        Ok(HandlerStatus::Complete)
    }

    /// `GET /params.json`
    pub fn params_json<H>(&mut self, session: &mut H) -> Result<HandlerStatus, WebAdminError>
    where
        H: HttpSession + ?Sized,
    {
        let body = to_json(&self.params)?;
        session.respond(Status::OK, ContentType::Json, &body)?;
        Ok(HandlerStatus::Complete)
    }

    /// `GET /status.json`
    pub fn status_json<H>(&mut self, session: &mut H) -> Result<HandlerStatus, WebAdminError>
    where
        H: HttpSession + ?Sized,
    {
        let body = to_json(&self.system_summary())?;
        session.respond(Status::OK, ContentType::Json, &body)?;
        Ok(HandlerStatus::Complete)
    }

    /// `INFO /` - plain-text summary. Asking for a peer (`INFO /<name>`)
    /// answers `404`; peer lookup is not available here.
    pub fn system_info<H>(&mut self, session: &mut H) -> Result<HandlerStatus, WebAdminError>
    where
        H: HttpSession + ?Sized,
    {
        if session.path().len() > 1 {
            debug!("No peer lookup for {}", session.path());
            session.respond_head(Status::NOT_FOUND)?;
            return Ok(HandlerStatus::Complete);
        }

        let info = self.system_summary();
        let body = format!(
            "zone:       {},\r\n\
             name:       {},\r\n\
             Boot:       {}\r\n\
             Version:    {}\r\n\
             Uptime:     {}\r\n\
             Free mem:   {}\r\n\
             RTC:        {}\r\n",
            info.zone, info.name, info.boot, info.version, info.uptime, info.free, info.rtc
        );
        session.respond(Status::OK, ContentType::Text, body.as_bytes())?;
        Ok(HandlerStatus::Complete)
    }

    /// `ON /` - power the load.
    pub fn power_on<H>(&mut self, session: &mut H) -> Result<HandlerStatus, WebAdminError>
    where
        H: HttpSession + ?Sized,
    {
        let now = self.now_ms();
        self.timer.arm(BlinkPattern::POWER_ON, None, now);
        self.relay.power_on();
        session.respond_head(Status::POWER_ON)?;
        Ok(HandlerStatus::Complete)
    }

    /// `OFF /` - cut the load.
    pub fn power_off<H>(&mut self, session: &mut H) -> Result<HandlerStatus, WebAdminError>
    where
        H: HttpSession + ?Sized,
    {
        let now = self.now_ms();
        self.timer.arm(BlinkPattern::POWER_OFF, None, now);
        self.relay.power_off();
        session.respond_head(Status::POWER_OFF)?;
        Ok(HandlerStatus::Complete)
    }

    /// `TOGGLE /boots` - reboot into the other firmware slot.
    ///
    /// The reply names the slot booted next, not the one running now.
    pub fn toggle_boot<H>(&mut self, session: &mut H) -> Result<HandlerStatus, WebAdminError>
    where
        H: HttpSession + ?Sized,
    {
        let target = self.upgrade.running_image().other();
        let body = format!("Rebooting to {} mode...\r\n", target);
        session.respond(Status::OK, ContentType::Text, body.as_bytes())?;
        info!("Switching boot image to {}", target);
        self.defer(BlinkPattern::REBOOT, DeferredAction::ActivateUpgrade);
        Ok(HandlerStatus::Complete)
    }

    /// `REBOOT /`
    pub fn reboot<H>(&mut self, session: &mut H) -> Result<HandlerStatus, WebAdminError>
    where
        H: HttpSession + ?Sized,
    {
        session.respond(Status::OK, ContentType::Text, REBOOTING)?;
        info!("Rebooting...");
        self.defer(BlinkPattern::REBOOT, DeferredAction::Restart);
        Ok(HandlerStatus::Complete)
    }

    /// The server's outgoing buffer drained for this request.
    ///
    /// # Errors
    ///
    /// Flash or transport failures while serving the page.
    pub fn on_sent<H>(&mut self, session: &mut H) -> Result<HandlerStatus, WebAdminError>
    where
        H: HttpSession + ?Sized,
    {
        SectorReader::new(&mut self.storage, self.layout).on_sent(session)
    }

    /// The connection behind `session` is gone; drop its transfer state.
    ///
    /// An upgrade cut short this way is never flagged complete.
    pub fn on_close<H>(&mut self, session: &mut H)
    where
        H: HttpSession + ?Sized,
    {
        if session.transfer().take().is_some() {
            warn!("Connection closed mid-transfer");
        }
    }

    /// Advance the status timer to `now_ms`, driving the LED and running a
    /// deferred action whose grace period has passed.
    pub fn tick(&mut self, now_ms: u32) -> Tick {
        let tick = self.timer.tick(now_ms);
        match tick {
            Tick::Idle => {}
            Tick::Blink { led } => self.system.set_status_led(led),
            Tick::Done(action) => {
                self.system.set_status_led(false);
                match action {
                    Some(DeferredAction::Restart) => {
                        info!("Restarting");
                        self.system.restart();
                    }
                    Some(DeferredAction::ActivateUpgrade) => {
                        info!("Activating staged image");
                        self.upgrade.mark_finished();
                        self.upgrade.reboot();
                    }
                    None => {}
                }
            }
        }
        tick
    }

    /// Current parameter record.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Page region layout in use.
    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    /// Status timer state.
    pub fn timer(&self) -> &StatusTimer {
        &self.timer
    }

    /// The page flash.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// The page flash, mutably.
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// The upgrade subsystem.
    pub fn upgrade(&self) -> &U {
        &self.upgrade
    }

    /// The relay.
    pub fn relay(&self) -> &R {
        &self.relay
    }

    /// The chip services.
    pub fn system(&self) -> &Y {
        &self.system
    }

    /// The chip services, mutably.
    pub fn system_mut(&mut self) -> &mut Y {
        &mut self.system
    }

    /// The parameter store.
    pub fn store(&self) -> &P {
        &self.store
    }

    fn system_summary(&self) -> SystemInfo<'_> {
        SystemInfo {
            zone: &self.params.zone,
            name: &self.params.name,
            uptime: self.system.uptime_us(),
            boot: self.upgrade.running_image(),
            version: VERSION,
            free: self.system.free_heap(),
            rtc: self.system.rtc_time(),
        }
    }

    fn now_ms(&self) -> u32 {
        self.system.uptime_us() / 1000
    }

    fn defer(&mut self, pattern: BlinkPattern, action: DeferredAction) {
        let now = self.now_ms();
        self.timer.arm(pattern, Some(action), now);
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Vec<u8>, WebAdminError> {
    serde_json::to_vec(value).map_err(|_| WebAdminError::Encode)
}
