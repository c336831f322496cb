//! Wire format of the Govee LAN API.
//!
//! Every datagram in either direction is a JSON object of the form
//! `{"msg": {"cmd": <name>, "data": <object>}}`.

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{Display, EnumString, IntoStaticStr};

use crate::errors::Error;
use crate::types::{Brightness, Color, PowerState};

type Result<T> = std::result::Result<T, Error>;

/// The `cmd` names understood by devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
pub enum CommandKind {
    #[strum(serialize = "scan")]
    Scan,
    #[strum(serialize = "devStatus")]
    DevStatus,
    #[strum(serialize = "turn")]
    Turn,
    #[strum(serialize = "brightness")]
    Brightness,
    #[strum(serialize = "colorwc")]
    ColorWc,
}

/// An outgoing command.
///
/// # Examples
///
/// ```
/// use govee_lan_rs::{Command, PowerState};
///
/// let bytes = Command::turn(PowerState::On).encode().unwrap();
/// assert_eq!(bytes, br#"{"msg":{"cmd":"turn","data":{"value":1}}}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "cmd", content = "data")]
pub enum Command {
    /// Multicast discovery request.
    #[serde(rename = "scan")]
    Scan { account_topic: &'static str },
    /// Ask a device to report its status.
    #[serde(rename = "devStatus")]
    DevStatus {},
    #[serde(rename = "turn")]
    Turn { value: u8 },
    #[serde(rename = "brightness")]
    Brightness { value: u8 },
    #[serde(rename = "colorwc")]
    ColorWc(ColorWc),
}

/// Payload of the `colorwc` command: either a white temperature or an RGB color.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ColorWc {
    Temperature {
        #[serde(rename = "colorTemInKelvin")]
        kelvin: u32,
    },
    Rgb {
        color: Color,
    },
}

#[derive(Serialize)]
struct Envelope<'a> {
    msg: &'a Command,
}

impl Command {
    pub fn scan() -> Self {
        Command::Scan {
            account_topic: "reserve",
        }
    }

    pub fn status_request() -> Self {
        Command::DevStatus {}
    }

    pub fn turn(power: PowerState) -> Self {
        Command::Turn {
            value: power.value(),
        }
    }

    pub fn brightness(brightness: Brightness) -> Self {
        Command::Brightness {
            value: brightness.value(),
        }
    }

    /// Set a color temperature. The value is sent as-is; clamping is the caller's choice.
    pub fn color_temperature(kelvin: u32) -> Self {
        Command::ColorWc(ColorWc::Temperature { kelvin })
    }

    pub fn color(color: Color) -> Self {
        Command::ColorWc(ColorWc::Rgb { color })
    }

    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Scan { .. } => CommandKind::Scan,
            Command::DevStatus {} => CommandKind::DevStatus,
            Command::Turn { .. } => CommandKind::Turn,
            Command::Brightness { .. } => CommandKind::Brightness,
            Command::ColorWc(_) => CommandKind::ColorWc,
        }
    }

    /// Serialize into the datagram body.
    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(&Envelope { msg: self }).map_err(Error::JsonDump)
    }
}

/// Device identity and firmware details carried by a scan reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanData {
    pub ip: Ipv4Addr,
    /// Identity assigned by the device; stable across address changes.
    pub device: String,
    /// Model designator, e.g. `"H619A"`.
    pub sku: String,
    #[serde(default)]
    pub ble_version_hard: String,
    #[serde(default)]
    pub ble_version_soft: String,
    #[serde(default)]
    pub wifi_version_hard: String,
    #[serde(default)]
    pub wifi_version_soft: String,
}

/// State reported by a status reply.
///
/// Status replies carry no identity; they are matched to a device by sender address.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub on_off: u8,
    pub brightness: u8,
    pub color: Color,
    #[serde(default)]
    pub color_tem_in_kelvin: Option<u32>,
}

impl StatusReport {
    pub fn power(&self) -> PowerState {
        PowerState::from_value(self.on_off)
    }

    /// The explicitly reported temperature. Devices send `0` when they are in RGB mode.
    pub fn reported_temperature(&self) -> Option<u32> {
        self.color_tem_in_kelvin.filter(|kelvin| *kelvin > 0)
    }
}

/// A decoded inbound datagram.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Scan(ScanData),
    Status(StatusReport),
    /// Valid JSON without a recognized `msg.cmd`; holds the raw text.
    Unknown(String),
}

#[derive(Deserialize)]
struct RawEnvelope {
    msg: Option<RawMessage>,
}

#[derive(Deserialize)]
struct RawMessage {
    cmd: String,
    #[serde(default)]
    data: Value,
}

impl Inbound {
    /// Decode a datagram body.
    ///
    /// Malformed JSON and recognized commands with malformed data are errors;
    /// well-formed messages with an unexpected shape are [`Inbound::Unknown`].
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let text = String::from_utf8(bytes.to_vec()).map_err(Error::Utf8Decode)?;
        let envelope: RawEnvelope = serde_json::from_str(&text).map_err(Error::JsonLoad)?;

        let Some(msg) = envelope.msg else {
            return Ok(Inbound::Unknown(text));
        };

        match msg.cmd.parse::<CommandKind>() {
            Ok(CommandKind::Scan) => serde_json::from_value(msg.data)
                .map(Inbound::Scan)
                .map_err(Error::JsonLoad),
            Ok(CommandKind::DevStatus) => serde_json::from_value(msg.data)
                .map(Inbound::Status)
                .map_err(Error::JsonLoad),
            _ => Ok(Inbound::Unknown(text)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn encoded(command: Command) -> Value {
        serde_json::from_slice(&command.encode().unwrap()).unwrap()
    }

    #[test]
    fn test_encode_commands() {
        assert_eq!(
            encoded(Command::scan()),
            json!({"msg": {"cmd": "scan", "data": {"account_topic": "reserve"}}})
        );
        assert_eq!(
            encoded(Command::status_request()),
            json!({"msg": {"cmd": "devStatus", "data": {}}})
        );
        assert_eq!(
            encoded(Command::turn(PowerState::Off)),
            json!({"msg": {"cmd": "turn", "data": {"value": 0}}})
        );
        assert_eq!(
            encoded(Command::brightness(Brightness::clamped(55))),
            json!({"msg": {"cmd": "brightness", "data": {"value": 55}}})
        );
        assert_eq!(
            encoded(Command::color_temperature(3200)),
            json!({"msg": {"cmd": "colorwc", "data": {"colorTemInKelvin": 3200}}})
        );
        assert_eq!(
            encoded(Command::color(Color::rgb(1, 2, 3))),
            json!({"msg": {"cmd": "colorwc", "data": {"color": {"r": 1, "g": 2, "b": 3}}}})
        );
    }

    #[test]
    fn test_command_kind_names() {
        assert_eq!(Command::status_request().kind().to_string(), "devStatus");
        assert_eq!("colorwc".parse::<CommandKind>().unwrap(), CommandKind::ColorWc);
        let name: &'static str = Command::scan().kind().into();
        assert_eq!(name, "scan");
    }

    #[test]
    fn test_decode_scan_reply() {
        let raw = json!({"msg": {"cmd": "scan", "data": {
            "ip": "192.168.1.23",
            "device": "1F:80:C5:32:32:36:72:4E",
            "sku": "H618E",
            "bleVersionHard": "3.01.01",
            "bleVersionSoft": "1.03.01",
            "wifiVersionHard": "1.00.10",
            "wifiVersionSoft": "1.02.03"
        }}});
        let Inbound::Scan(scan) = Inbound::decode(raw.to_string().as_bytes()).unwrap() else {
            panic!("expected a scan reply");
        };
        assert_eq!(scan.ip, Ipv4Addr::new(192, 168, 1, 23));
        assert_eq!(scan.device, "1F:80:C5:32:32:36:72:4E");
        assert_eq!(scan.sku, "H618E");
        assert_eq!(scan.wifi_version_soft, "1.02.03");
    }

    #[test]
    fn test_decode_status_reply() {
        let raw = json!({"msg": {"cmd": "devStatus", "data": {
            "onOff": 1,
            "brightness": 100,
            "color": {"r": 255, "g": 0, "b": 0},
            "colorTemInKelvin": 0
        }}});
        let Inbound::Status(status) = Inbound::decode(raw.to_string().as_bytes()).unwrap() else {
            panic!("expected a status reply");
        };
        assert_eq!(status.power(), PowerState::On);
        assert_eq!(status.brightness, 100);
        assert_eq!(status.color, Color::rgb(255, 0, 0));
        assert_eq!(status.reported_temperature(), None);
    }

    #[test]
    fn test_decode_status_without_temperature() {
        let raw = br#"{"msg":{"cmd":"devStatus","data":{"onOff":0,"brightness":5,"color":{"r":1,"g":2,"b":3}}}}"#;
        let Inbound::Status(status) = Inbound::decode(raw).unwrap() else {
            panic!("expected a status reply");
        };
        assert_eq!(status.color_tem_in_kelvin, None);
        assert_eq!(status.power(), PowerState::Off);
    }

    #[test]
    fn test_decode_unknown_shapes() {
        for raw in [
            r#"{"hello":"world"}"#,
            r#"{"msg":{"cmd":"turn","data":{"value":1}}}"#,
            r#"{"msg":{"cmd":"somethingNew","data":{}}}"#,
        ] {
            assert_eq!(
                Inbound::decode(raw.as_bytes()).unwrap(),
                Inbound::Unknown(raw.to_string())
            );
        }
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(Inbound::decode(b"not json"), Err(Error::JsonLoad(_))));
        assert!(matches!(Inbound::decode(&[0xff, 0xfe]), Err(Error::Utf8Decode(_))));
        assert!(matches!(
            Inbound::decode(br#"{"msg":{"cmd":"devStatus","data":{"onOff":1}}}"#),
            Err(Error::JsonLoad(_))
        ));
    }
}
