//! The persisted configuration record and its form-field dispatch.

use alloc::string::{String, ToString};

use serde::{Deserialize, Serialize};

use crate::domain::error::WebAdminError;

/// Default zone of a fresh device.
pub const DEFAULT_ZONE: &str = "dev";
/// Default device name.
pub const DEFAULT_NAME: &str = "esp8266-psu";

const ZONE_MAX: usize = 31;
const NAME_MAX: usize = 31;
const AP_PSK_MAX: usize = 63;
const SSID_MAX: usize = 31;
const PSK_MAX: usize = 63;

/// Device parameters kept in flash.
///
/// Serializes to the `/params.json` shape (`apPsk`, `ssid`, `psk` keys).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    /// Discovery zone.
    pub zone: String,
    /// Device name within the zone.
    pub name: String,
    /// Passphrase of the device's own access point.
    #[serde(rename = "apPsk")]
    pub ap_psk: String,
    /// SSID of the network to join.
    #[serde(rename = "ssid")]
    pub station_ssid: String,
    /// Passphrase of the network to join.
    #[serde(rename = "psk")]
    pub station_psk: String,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            zone: DEFAULT_ZONE.to_string(),
            name: DEFAULT_NAME.to_string(),
            ap_psk: String::new(),
            station_ssid: String::new(),
            station_psk: String::new(),
        }
    }
}

impl Params {
    /// Set the field named by a form key.
    ///
    /// A missing value clears the field. Fields set by earlier calls are
    /// left alone when this one fails.
    ///
    /// # Errors
    ///
    /// - [`WebAdminError::UnknownField`] if `field` names no parameter.
    /// - [`WebAdminError::FieldTooLong`] if `value` exceeds the field size.
    ///
    /// # Examples
    ///
    /// ```
    /// use psu_webadmin::domain::Params;
    ///
    /// let mut params = Params::default();
    /// params.apply("ssid", Some("home")).unwrap();
    /// assert_eq!(params.station_ssid, "home");
    /// assert!(params.apply("foo", Some("bar")).is_err());
    /// ```
    pub fn apply(&mut self, field: &str, value: Option<&str>) -> Result<(), WebAdminError> {
        let (target, key, max) = match field {
            "zone" => (&mut self.zone, "zone", ZONE_MAX),
            "name" => (&mut self.name, "name", NAME_MAX),
            "ap_psk" => (&mut self.ap_psk, "ap_psk", AP_PSK_MAX),
            "ssid" => (&mut self.station_ssid, "ssid", SSID_MAX),
            "psk" => (&mut self.station_psk, "psk", PSK_MAX),
            _ => return Err(WebAdminError::UnknownField(field.to_string())),
        };

        let value = value.unwrap_or("");
        if value.len() > max {
            return Err(WebAdminError::FieldTooLong { field: key, max });
        }

        target.clear();
        target.push_str(value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = Params::default();
        assert_eq!(params.zone, "dev");
        assert_eq!(params.name, "esp8266-psu");
    }

    #[test]
    fn test_apply_known_fields() {
        let mut params = Params::default();
        params.apply("zone", Some("lab")).unwrap();
        params.apply("name", Some("bench")).unwrap();
        params.apply("ap_psk", Some("secret")).unwrap();
        params.apply("ssid", Some("home")).unwrap();
        params.apply("psk", Some("hunter22")).unwrap();

        assert_eq!(params.zone, "lab");
        assert_eq!(params.name, "bench");
        assert_eq!(params.ap_psk, "secret");
        assert_eq!(params.station_ssid, "home");
        assert_eq!(params.station_psk, "hunter22");
    }

    #[test]
    fn test_apply_missing_value_clears() {
        let mut params = Params::default();
        params.apply("zone", None).unwrap();
        assert_eq!(params.zone, "");
    }

    #[test]
    fn test_apply_unknown_field() {
        let mut params = Params::default();
        let err = params.apply("foo", Some("1")).unwrap_err();
        assert_eq!(err, WebAdminError::UnknownField("foo".into()));
        assert_eq!(params, Params::default());
    }

    #[test]
    fn test_apply_too_long() {
        let mut params = Params::default();
        let long = "x".repeat(32);
        let err = params.apply("zone", Some(&long)).unwrap_err();
        assert!(matches!(err, WebAdminError::FieldTooLong { field: "zone", max: 31 }));
        assert_eq!(params.zone, "dev");
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_string(&Params::default()).unwrap();
        assert_eq!(
            json,
            r#"{"zone":"dev","name":"esp8266-psu","apPsk":"","ssid":"","psk":""}"#
        );
    }
}
