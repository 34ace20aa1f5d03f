//! Network configuration supplied by the caller.
//!
//! [`NetConfig`] mirrors the configuration document accepted by the command
//! line: a numeric `type` selecting the connectivity kind plus one section
//! per kind. Only the selected section has to be present.
//!
//! ```json
//! { "type": 1, "wifi": { "ssid": "home", "pwd": "secret" } }
//! ```

use std::net::{IpAddr, Ipv4Addr};

use serde::{Deserialize, Serialize};

use crate::constants::MAX_CATM1_BAND_WORDS;
use crate::error::{ProtocolError, ProtocolResult};
use crate::message::Message;

/// Connectivity kinds selectable through `NetConfig::kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkKind {
    Wifi,
    Ethernet,
    NbIot,
    Gsm,
    LoRa,
    CatM1,
    Cellular,
}

impl NetworkKind {
    pub fn code(self) -> u8 {
        match self {
            NetworkKind::Wifi => 1,
            NetworkKind::Ethernet => 2,
            NetworkKind::NbIot => 3,
            NetworkKind::Gsm => 4,
            NetworkKind::LoRa => 5,
            NetworkKind::CatM1 => 6,
            NetworkKind::Cellular => 7,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(NetworkKind::Wifi),
            2 => Some(NetworkKind::Ethernet),
            3 => Some(NetworkKind::NbIot),
            4 => Some(NetworkKind::Gsm),
            5 => Some(NetworkKind::LoRa),
            6 => Some(NetworkKind::CatM1),
            7 => Some(NetworkKind::Cellular),
            _ => None,
        }
    }

    /// Name of the document section holding this kind's settings.
    pub fn section(self) -> &'static str {
        match self {
            NetworkKind::Wifi => "wifi",
            NetworkKind::Ethernet => "eth",
            NetworkKind::NbIot => "nb",
            NetworkKind::Gsm => "gsm",
            NetworkKind::LoRa => "lora",
            NetworkKind::CatM1 => "catm1",
            NetworkKind::Cellular => "cellular",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiSettings {
    pub ssid: String,
    #[serde(rename = "pwd", default)]
    pub password: String,
}

/// Static addressing for a wired interface. Unspecified addresses request
/// DHCP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EthernetSettings {
    #[serde(default = "unspecified_ip")]
    pub ip: IpAddr,
    #[serde(default = "unspecified_ip")]
    pub dns: IpAddr,
    #[serde(default = "unspecified_ip")]
    pub gateway: IpAddr,
    #[serde(default = "unspecified_ip")]
    pub netmask: IpAddr,
    /// Link timeout in seconds.
    #[serde(default)]
    pub timeout: u32,
    /// Response timeout in milliseconds.
    #[serde(default)]
    pub response_timeout: u32,
}

impl Default for EthernetSettings {
    fn default() -> Self {
        EthernetSettings {
            ip: unspecified_ip(),
            dns: unspecified_ip(),
            gateway: unspecified_ip(),
            netmask: unspecified_ip(),
            timeout: 0,
            response_timeout: 0,
        }
    }
}

fn unspecified_ip() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

/// Credentials shared by GSM, NB-IoT and generic cellular modems.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CellularSettings {
    pub pin: String,
    pub apn: String,
    pub login: String,
    pub pass: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatM1Settings {
    pub pin: String,
    pub apn: String,
    pub login: String,
    pub pass: String,
    /// Band bitmap, at most four words.
    pub band: Vec<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoRaSettings {
    #[serde(rename = "appeui")]
    pub app_eui: String,
    #[serde(rename = "appkey")]
    pub app_key: String,
    pub band: u8,
    pub channel_mask: String,
    pub device_class: String,
}

/// Network configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetConfig {
    /// Connectivity kind, see [`NetworkKind`].
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wifi: Option<WifiSettings>,
    #[serde(rename = "eth", default, skip_serializing_if = "Option::is_none")]
    pub ethernet: Option<EthernetSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nb: Option<CellularSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gsm: Option<CellularSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lora: Option<LoRaSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catm1: Option<CatM1Settings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cellular: Option<CellularSettings>,
}

impl NetConfig {
    pub fn wifi(ssid: impl Into<String>, password: impl Into<String>) -> Self {
        NetConfig {
            kind: NetworkKind::Wifi.code(),
            wifi: Some(WifiSettings {
                ssid: ssid.into(),
                password: password.into(),
            }),
            ..Default::default()
        }
    }

    pub fn ethernet(settings: EthernetSettings) -> Self {
        NetConfig {
            kind: NetworkKind::Ethernet.code(),
            ethernet: Some(settings),
            ..Default::default()
        }
    }

    pub fn nb_iot(settings: CellularSettings) -> Self {
        NetConfig {
            kind: NetworkKind::NbIot.code(),
            nb: Some(settings),
            ..Default::default()
        }
    }

    pub fn gsm(settings: CellularSettings) -> Self {
        NetConfig {
            kind: NetworkKind::Gsm.code(),
            gsm: Some(settings),
            ..Default::default()
        }
    }

    pub fn lora(settings: LoRaSettings) -> Self {
        NetConfig {
            kind: NetworkKind::LoRa.code(),
            lora: Some(settings),
            ..Default::default()
        }
    }

    pub fn catm1(settings: CatM1Settings) -> Self {
        NetConfig {
            kind: NetworkKind::CatM1.code(),
            catm1: Some(settings),
            ..Default::default()
        }
    }

    pub fn cellular(settings: CellularSettings) -> Self {
        NetConfig {
            kind: NetworkKind::Cellular.code(),
            cellular: Some(settings),
            ..Default::default()
        }
    }

    /// Selected connectivity kind, if `kind` is a known code.
    pub fn network_kind(&self) -> Option<NetworkKind> {
        NetworkKind::from_code(self.kind)
    }

    /// The configuration message the board expects for this document.
    pub fn to_message(&self) -> ProtocolResult<Message> {
        let kind = self.network_kind().ok_or_else(|| {
            ProtocolError::UnsupportedConfig(format!("unknown network type {}", self.kind))
        })?;
        let missing = || {
            ProtocolError::UnsupportedConfig(format!(
                "network type {} requires a \"{}\" section",
                kind.code(),
                kind.section()
            ))
        };

        let message = match kind {
            NetworkKind::Wifi => Message::WifiConfig(self.wifi.clone().ok_or_else(missing)?),
            NetworkKind::Ethernet => {
                Message::EthernetConfig(self.ethernet.clone().ok_or_else(missing)?)
            }
            NetworkKind::NbIot => Message::NbConfig(self.nb.clone().ok_or_else(missing)?),
            NetworkKind::Gsm => Message::GsmConfig(self.gsm.clone().ok_or_else(missing)?),
            NetworkKind::LoRa => Message::LoRaConfig(self.lora.clone().ok_or_else(missing)?),
            NetworkKind::CatM1 => {
                let settings = self.catm1.clone().ok_or_else(missing)?;
                if settings.band.len() > MAX_CATM1_BAND_WORDS {
                    return Err(ProtocolError::InvalidField {
                        field: "band",
                        reason: format!(
                            "at most {} words, got {}",
                            MAX_CATM1_BAND_WORDS,
                            settings.band.len()
                        ),
                    });
                }
                Message::CatM1Config(settings)
            }
            NetworkKind::Cellular => {
                Message::CellularConfig(self.cellular.clone().ok_or_else(missing)?)
            }
        };
        Ok(message)
    }
}
