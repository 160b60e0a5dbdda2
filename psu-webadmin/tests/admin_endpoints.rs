//! Control and parameter endpoints.
//!
//! These tests cover:
//! - Parameter editing, persistence and the restart that follows
//! - JSON and plain-text status reports
//! - Relay switching, boot slot toggling and reboot
//! - Requests no route answers

mod common;

use common::{admin, server, FREE_HEAP};
use psu_webadmin::domain::{
    BootImage, ContentType, DeferredAction, Params, RelayControl, Status, StorageLayout, Tick,
    UpgradeSubsystem, WebAdminError,
};
use psu_webadmin::infrastructure::{
    LoopbackConfig, LoopbackServer, MemParamStore, Outcome, RecordingUpgrade, SimRelay, SimSystem,
};
use psu_webadmin::{WebAdmin, VERSION};

#[test]
fn test_save_params_then_restart() {
    let mut admin = admin();

    let exchange = server().request(
        &mut admin,
        "POST",
        "/params",
        b"zone=lab&name=bench+psu&ssid=home%20net&psk=hunter2",
    );
    assert_eq!(exchange.outcome, Outcome::Completed);
    assert_eq!(
        exchange.text(),
        "Params has been saved, Rebooting in 4 seconds.\r\n"
    );

    let saved = admin.store().saved().unwrap();
    assert_eq!(saved.zone, "lab");
    assert_eq!(saved.name, "bench psu");
    assert_eq!(saved.station_ssid, "home net");
    assert_eq!(saved.station_psk, "hunter2");
    assert_eq!(admin.params(), saved);

    assert_eq!(admin.timer().pending_action(), Some(DeferredAction::Restart));
    assert_eq!(admin.tick(500), Tick::Blink { led: false });
    assert_eq!(admin.system().restarts(), 0);
    assert_eq!(admin.tick(1000), Tick::Done(Some(DeferredAction::Restart)));
    assert_eq!(admin.system().restarts(), 1);
}

#[test]
fn test_params_body_spanning_chunks() {
    let mut admin = admin();
    let psk = "x".repeat(63);
    let body = format!("zone=a&name=b&ap_psk={psk}&ssid=c&psk={psk}");
    let server = LoopbackServer::new(LoopbackConfig::default().with_chunk(64));

    let exchange = server.request(&mut admin, "POST", "/params", body.as_bytes());
    assert!(exchange.is_completed());
    assert!(exchange.calls > 1);
    assert_eq!(admin.params().ap_psk, psk);
    assert_eq!(admin.params().station_psk, psk);
}

#[test]
fn test_unknown_field_keeps_earlier_fields() {
    let mut admin = admin();

    let exchange = server().request(&mut admin, "POST", "/params", b"zone=lab&foo=1&name=x");
    assert_eq!(
        exchange.outcome,
        Outcome::Failed(WebAdminError::UnknownField("foo".into()))
    );
    assert!(exchange.response.is_none());

    // Applied in order up to the bad field; nothing persisted.
    assert_eq!(admin.params().zone, "lab");
    assert_eq!(admin.params().name, "esp8266-psu");
    assert_eq!(admin.store().saves(), 0);
    assert!(!admin.timer().is_armed());
}

#[test]
fn test_overlong_value_rejected() {
    let mut admin = admin();
    let body = format!("name={}", "n".repeat(32));

    let exchange = server().request(&mut admin, "POST", "/params", body.as_bytes());
    assert_eq!(
        exchange.outcome,
        Outcome::Failed(WebAdminError::FieldTooLong {
            field: "name",
            max: 31,
        })
    );
    assert_eq!(admin.params().name, "esp8266-psu");
}

#[test]
fn test_store_failure() {
    let mut admin = WebAdmin::new(
        common::flash(&StorageLayout::MAP2),
        RecordingUpgrade::new(BootImage::User1),
        SimRelay::new(),
        SimSystem::new(FREE_HEAP),
        MemParamStore::new().locked(),
        Params::default(),
    )
    .with_layout(StorageLayout::MAP2);

    let exchange = server().request(&mut admin, "POST", "/params", b"zone=lab");
    assert_eq!(exchange.outcome, Outcome::Failed(WebAdminError::SaveParams));
    assert!(!admin.timer().is_armed());
}

#[test]
fn test_params_json() {
    let mut admin = admin();

    let exchange = server().request(&mut admin, "GET", "/params.json", b"");
    assert!(exchange.is_completed());
    let response = exchange.response.as_ref().unwrap();
    assert_eq!(response.content_type, ContentType::Json);
    assert_eq!(
        response.text(),
        r#"{"zone":"dev","name":"esp8266-psu","apPsk":"","ssid":"","psk":""}"#
    );
}

#[test]
fn test_status_json() {
    let mut admin = admin();
    admin.system_mut().set_uptime_ms(1234);

    let exchange = server().request(&mut admin, "GET", "/status.json", b"");
    assert!(exchange.is_completed());

    let expected = format!(
        r#"{{"zone":"dev","name":"esp8266-psu","uptime":1234000,"boot":"user1","version":"{VERSION}","free":{FREE_HEAP},"rtc":1234}}"#
    );
    assert_eq!(exchange.text(), expected);
}

#[test]
fn test_info_text() {
    let mut admin = admin();

    let exchange = server().request(&mut admin, "INFO", "/", b"");
    assert!(exchange.is_completed());
    let text = exchange.text();
    assert!(text.starts_with("zone:       dev,\r\n"));
    assert!(text.contains("name:       esp8266-psu,\r\n"));
    assert!(text.contains("Boot:       user1\r\n"));
    assert!(text.contains(&format!("Free mem:   {FREE_HEAP}\r\n")));
}

#[test]
fn test_info_for_peer_is_not_found() {
    let mut admin = admin();

    let exchange = server().request(&mut admin, "INFO", "/kitchen", b"");
    assert!(exchange.is_completed());
    assert_eq!(exchange.response.unwrap().status, Status::NOT_FOUND);
}

#[test]
fn test_power_on_off() {
    let mut admin = admin();

    let on = server().request(&mut admin, "ON", "/", b"");
    assert!(on.is_completed());
    let response = on.response.unwrap();
    assert_eq!(response.status.code, 700);
    assert!(response.body.is_empty());
    assert!(admin.relay().clone().is_on());
    assert!(admin.timer().is_armed());
    assert_eq!(admin.timer().pending_action(), None);

    let off = server().request(&mut admin, "OFF", "/", b"");
    assert_eq!(off.response.unwrap().status.code, 701);
    assert!(!admin.relay().clone().is_on());
    assert_eq!(admin.relay().switches(), 2);

    // 20ms on / 200ms off, nothing to run at the end.
    assert_eq!(admin.tick(10), Tick::Blink { led: true });
    assert_eq!(admin.tick(1100), Tick::Done(None));
    assert_eq!(admin.system().restarts(), 0);
}

#[test]
fn test_toggle_boot() {
    let mut admin = admin();

    let exchange = server().request(&mut admin, "TOGGLE", "/boots", b"");
    assert_eq!(exchange.text(), "Rebooting to user2 mode...\r\n");

    assert_eq!(
        admin.tick(1000),
        Tick::Done(Some(DeferredAction::ActivateUpgrade))
    );
    assert_eq!(admin.upgrade().reboots(), 1);
    assert_eq!(admin.upgrade().running_image(), BootImage::User2);
}

#[test]
fn test_reboot() {
    let mut admin = admin();

    let exchange = server().request(&mut admin, "REBOOT", "/", b"");
    assert_eq!(exchange.text(), "Rebooting...\r\n");

    assert!(matches!(admin.tick(999), Tick::Blink { .. }));
    assert_eq!(admin.system().restarts(), 0);
    admin.tick(1000);
    assert_eq!(admin.system().restarts(), 1);
    assert_eq!(admin.upgrade().reboots(), 0);
}

#[test]
fn test_unrouted_request() {
    let mut admin = admin();

    for (verb, path) in [("DELETE", "/"), ("UPGRADE", "/"), ("TOGGLE", "/")] {
        let exchange = server().request(&mut admin, verb, path, b"");
        assert_eq!(exchange.outcome, Outcome::NotFound, "{verb} {path}");
        assert_eq!(exchange.calls, 0);
        assert_eq!(exchange.response.unwrap().status, Status::NOT_FOUND);
    }
}
