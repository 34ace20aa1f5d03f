//! CBOR message catalogue.
//!
//! Every data frame carries one message: a CBOR tag in the range
//! `0x012000..=0x012017` wrapping a definite-length array of the variant's
//! fields in declaration order.

use std::convert::Infallible;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use log::debug;
use minicbor::data::{Tag, Type};
use minicbor::{Decoder, Encoder};

use crate::constants::*;
use crate::error::{ProtocolError, ProtocolResult};
use crate::netconfig::{CatM1Settings, CellularSettings, EthernetSettings, LoRaSettings, WifiSettings};
use crate::status::{BoardCommand, StatusCode};
use crate::wifi::{decode_networks, encode_networks, write_network_pairs, WifiNetwork};

type EncodeResult = Result<(), minicbor::encode::Error<Infallible>>;

/// Message variants, one per catalogue tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    ProvisioningStatus,
    WifiNetworks,
    Timestamp,
    Command,
    WifiConfig,
    LoRaConfig,
    GsmConfig,
    NbConfig,
    CatM1Config,
    EthernetConfig,
    UniqueId,
    Signature,
    CellularConfig,
    BleMacAddress,
    WifiFwVersion,
    SketchVersion,
    NetConfigLibVersion,
    PublicKey,
}

impl MessageKind {
    pub fn tag(self) -> u64 {
        match self {
            MessageKind::ProvisioningStatus => TAG_PROVISIONING_STATUS,
            MessageKind::WifiNetworks => TAG_WIFI_NETWORKS,
            MessageKind::Timestamp => TAG_TIMESTAMP,
            MessageKind::Command => TAG_COMMAND,
            MessageKind::WifiConfig => TAG_WIFI_CONFIG,
            MessageKind::LoRaConfig => TAG_LORA_CONFIG,
            MessageKind::GsmConfig => TAG_GSM_CONFIG,
            MessageKind::NbConfig => TAG_NB_CONFIG,
            MessageKind::CatM1Config => TAG_CATM1_CONFIG,
            MessageKind::EthernetConfig => TAG_ETHERNET_CONFIG,
            MessageKind::UniqueId => TAG_UNIQUE_ID,
            MessageKind::Signature => TAG_SIGNATURE,
            MessageKind::CellularConfig => TAG_CELLULAR_CONFIG,
            MessageKind::BleMacAddress => TAG_BLE_MAC_ADDRESS,
            MessageKind::WifiFwVersion => TAG_WIFI_FW_VERSION,
            MessageKind::SketchVersion => TAG_SKETCH_VERSION,
            MessageKind::NetConfigLibVersion => TAG_NETCONFIG_LIB_VERSION,
            MessageKind::PublicKey => TAG_PUBLIC_KEY,
        }
    }

    pub fn from_tag(tag: u64) -> Option<Self> {
        match tag {
            TAG_PROVISIONING_STATUS => Some(MessageKind::ProvisioningStatus),
            TAG_WIFI_NETWORKS => Some(MessageKind::WifiNetworks),
            TAG_TIMESTAMP => Some(MessageKind::Timestamp),
            TAG_COMMAND => Some(MessageKind::Command),
            TAG_WIFI_CONFIG => Some(MessageKind::WifiConfig),
            TAG_LORA_CONFIG => Some(MessageKind::LoRaConfig),
            TAG_GSM_CONFIG => Some(MessageKind::GsmConfig),
            TAG_NB_CONFIG => Some(MessageKind::NbConfig),
            TAG_CATM1_CONFIG => Some(MessageKind::CatM1Config),
            TAG_ETHERNET_CONFIG => Some(MessageKind::EthernetConfig),
            TAG_UNIQUE_ID => Some(MessageKind::UniqueId),
            TAG_SIGNATURE => Some(MessageKind::Signature),
            TAG_CELLULAR_CONFIG => Some(MessageKind::CellularConfig),
            TAG_BLE_MAC_ADDRESS => Some(MessageKind::BleMacAddress),
            TAG_WIFI_FW_VERSION => Some(MessageKind::WifiFwVersion),
            TAG_SKETCH_VERSION => Some(MessageKind::SketchVersion),
            TAG_NETCONFIG_LIB_VERSION => Some(MessageKind::NetConfigLibVersion),
            TAG_PUBLIC_KEY => Some(MessageKind::PublicKey),
            _ => None,
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A message exchanged with the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Raw status code; see [`Message::status`].
    ProvisioningStatus(i16),
    WifiNetworks(Vec<WifiNetwork>),
    /// Seconds since the Unix epoch.
    Timestamp(u64),
    /// Raw command byte; see [`BoardCommand`].
    Command(u8),
    WifiConfig(WifiSettings),
    LoRaConfig(LoRaSettings),
    GsmConfig(CellularSettings),
    NbConfig(CellularSettings),
    CatM1Config(CatM1Settings),
    EthernetConfig(EthernetSettings),
    UniqueId([u8; UNIQUE_ID_LEN]),
    /// Exactly [`SIGNATURE_LEN`] bytes.
    Signature(Vec<u8>),
    CellularConfig(CellularSettings),
    BleMacAddress([u8; BLE_MAC_LEN]),
    WifiFwVersion(String),
    SketchVersion(String),
    NetConfigLibVersion(String),
    /// PEM text.
    PublicKey(String),
}

impl Message {
    pub fn command(command: BoardCommand) -> Self {
        Message::Command(command.code())
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            Message::ProvisioningStatus(_) => MessageKind::ProvisioningStatus,
            Message::WifiNetworks(_) => MessageKind::WifiNetworks,
            Message::Timestamp(_) => MessageKind::Timestamp,
            Message::Command(_) => MessageKind::Command,
            Message::WifiConfig(_) => MessageKind::WifiConfig,
            Message::LoRaConfig(_) => MessageKind::LoRaConfig,
            Message::GsmConfig(_) => MessageKind::GsmConfig,
            Message::NbConfig(_) => MessageKind::NbConfig,
            Message::CatM1Config(_) => MessageKind::CatM1Config,
            Message::EthernetConfig(_) => MessageKind::EthernetConfig,
            Message::UniqueId(_) => MessageKind::UniqueId,
            Message::Signature(_) => MessageKind::Signature,
            Message::CellularConfig(_) => MessageKind::CellularConfig,
            Message::BleMacAddress(_) => MessageKind::BleMacAddress,
            Message::WifiFwVersion(_) => MessageKind::WifiFwVersion,
            Message::SketchVersion(_) => MessageKind::SketchVersion,
            Message::NetConfigLibVersion(_) => MessageKind::NetConfigLibVersion,
            Message::PublicKey(_) => MessageKind::PublicKey,
        }
    }

    /// Status of a `ProvisioningStatus` message.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Message::ProvisioningStatus(code) => Some(StatusCode::from_code(*code)),
            _ => None,
        }
    }

    /// Encode into a data frame payload.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        match self {
            Message::WifiNetworks(networks) => encode_networks(networks),
            Message::Signature(signature) if signature.len() != SIGNATURE_LEN => {
                Err(ProtocolError::InvalidField {
                    field: "signature",
                    reason: format!("expected {} bytes, got {}", SIGNATURE_LEN, signature.len()),
                })
            }
            Message::CatM1Config(settings) if settings.band.len() > MAX_CATM1_BAND_WORDS => {
                Err(ProtocolError::InvalidField {
                    field: "band",
                    reason: format!("at most {} words, got {}", MAX_CATM1_BAND_WORDS, settings.band.len()),
                })
            }
            _ => {
                let mut e = Encoder::new(Vec::new());
                self.write_body(&mut e)
                    .map_err(|err| ProtocolError::Encode(err.to_string()))?;
                Ok(e.into_writer())
            }
        }
    }

    fn write_body(&self, e: &mut Encoder<Vec<u8>>) -> EncodeResult {
        e.tag(Tag::new(self.kind().tag()))?;
        match self {
            Message::ProvisioningStatus(status) => {
                e.array(1)?.i16(*status)?;
            }
            Message::WifiNetworks(networks) => write_network_pairs(e, networks)?,
            Message::Timestamp(ts) => {
                e.array(1)?.u64(*ts)?;
            }
            Message::Command(cmd) => {
                e.array(1)?.u8(*cmd)?;
            }
            Message::WifiConfig(wifi) => {
                e.array(2)?.str(&wifi.ssid)?.str(&wifi.password)?;
            }
            Message::LoRaConfig(lora) => {
                e.array(5)?
                    .str(&lora.app_eui)?
                    .str(&lora.app_key)?
                    .u8(lora.band)?
                    .str(&lora.channel_mask)?
                    .str(&lora.device_class)?;
            }
            Message::GsmConfig(cell) | Message::NbConfig(cell) | Message::CellularConfig(cell) => {
                write_cellular(e, cell)?;
            }
            Message::CatM1Config(catm1) => {
                e.array(5)?.str(&catm1.pin)?.array(catm1.band.len() as u64)?;
                for word in &catm1.band {
                    e.u32(*word)?;
                }
                e.str(&catm1.apn)?.str(&catm1.login)?.str(&catm1.pass)?;
            }
            Message::EthernetConfig(eth) => {
                e.array(6)?
                    .bytes(&ip_octets(&eth.ip))?
                    .bytes(&ip_octets(&eth.dns))?
                    .bytes(&ip_octets(&eth.gateway))?
                    .bytes(&ip_octets(&eth.netmask))?
                    .u32(eth.timeout)?
                    .u32(eth.response_timeout)?;
            }
            Message::UniqueId(id) => {
                e.array(1)?.bytes(id)?;
            }
            Message::Signature(signature) => {
                e.array(1)?.bytes(signature)?;
            }
            Message::BleMacAddress(mac) => {
                e.array(1)?.bytes(mac)?;
            }
            Message::WifiFwVersion(text)
            | Message::SketchVersion(text)
            | Message::NetConfigLibVersion(text)
            | Message::PublicKey(text) => {
                e.array(1)?.str(text)?;
            }
        }
        Ok(())
    }

    /// Decode a data frame payload.
    pub fn decode(payload: &[u8]) -> ProtocolResult<Self> {
        if let Some(body) = payload.strip_prefix(&WIFI_NETWORKS_PREFIX[..]) {
            return decode_networks(body).map(Message::WifiNetworks);
        }

        let mut d = Decoder::new(payload);
        let tag = d.tag()?.as_u64();
        let kind = MessageKind::from_tag(tag).ok_or(ProtocolError::UnknownTag(tag))?;

        let message = match kind {
            MessageKind::ProvisioningStatus => {
                expect_fields(&mut d, kind, 1)?;
                Message::ProvisioningStatus(d.i16()?)
            }
            MessageKind::WifiNetworks => {
                // Tag written in a longer form than the board uses.
                return Err(ProtocolError::MalformedMessage(
                    "network list without the canonical prefix".to_string(),
                ));
            }
            MessageKind::Timestamp => {
                expect_fields(&mut d, kind, 1)?;
                Message::Timestamp(d.u64()?)
            }
            MessageKind::Command => {
                expect_fields(&mut d, kind, 1)?;
                Message::Command(d.u8()?)
            }
            MessageKind::WifiConfig => {
                expect_fields(&mut d, kind, 2)?;
                Message::WifiConfig(WifiSettings {
                    ssid: d.str()?.to_string(),
                    password: d.str()?.to_string(),
                })
            }
            MessageKind::LoRaConfig => {
                expect_fields(&mut d, kind, 5)?;
                Message::LoRaConfig(LoRaSettings {
                    app_eui: d.str()?.to_string(),
                    app_key: d.str()?.to_string(),
                    band: d.u8()?,
                    channel_mask: d.str()?.to_string(),
                    device_class: d.str()?.to_string(),
                })
            }
            MessageKind::GsmConfig => Message::GsmConfig(read_cellular(&mut d, kind)?),
            MessageKind::NbConfig => Message::NbConfig(read_cellular(&mut d, kind)?),
            MessageKind::CellularConfig => Message::CellularConfig(read_cellular(&mut d, kind)?),
            MessageKind::CatM1Config => {
                expect_fields(&mut d, kind, 5)?;
                let pin = d.str()?.to_string();
                let band = read_band(&mut d)?;
                Message::CatM1Config(CatM1Settings {
                    pin,
                    band,
                    apn: d.str()?.to_string(),
                    login: d.str()?.to_string(),
                    pass: d.str()?.to_string(),
                })
            }
            MessageKind::EthernetConfig => {
                expect_fields(&mut d, kind, 6)?;
                Message::EthernetConfig(EthernetSettings {
                    ip: ip_from_octets("ip", d.bytes()?)?,
                    dns: ip_from_octets("dns", d.bytes()?)?,
                    gateway: ip_from_octets("gateway", d.bytes()?)?,
                    netmask: ip_from_octets("netmask", d.bytes()?)?,
                    timeout: d.u32()?,
                    response_timeout: d.u32()?,
                })
            }
            MessageKind::UniqueId => {
                expect_fields(&mut d, kind, 1)?;
                Message::UniqueId(fixed_bytes("unique id", d.bytes()?)?)
            }
            MessageKind::Signature => {
                expect_fields(&mut d, kind, 1)?;
                let bytes = d.bytes()?;
                if bytes.len() != SIGNATURE_LEN {
                    return Err(length_error("signature", SIGNATURE_LEN, bytes.len()));
                }
                Message::Signature(bytes.to_vec())
            }
            MessageKind::BleMacAddress => {
                expect_fields(&mut d, kind, 1)?;
                Message::BleMacAddress(fixed_bytes("mac address", d.bytes()?)?)
            }
            MessageKind::WifiFwVersion => Message::WifiFwVersion(read_text(&mut d, kind)?),
            MessageKind::SketchVersion => Message::SketchVersion(read_text(&mut d, kind)?),
            MessageKind::NetConfigLibVersion => {
                Message::NetConfigLibVersion(read_text(&mut d, kind)?)
            }
            MessageKind::PublicKey => Message::PublicKey(read_text(&mut d, kind)?),
        };

        if d.position() != payload.len() {
            return Err(ProtocolError::MalformedMessage(format!(
                "{} trailing bytes after {}",
                payload.len() - d.position(),
                kind
            )));
        }
        debug!("decoded {} message", kind);
        Ok(message)
    }
}

fn write_cellular(e: &mut Encoder<Vec<u8>>, cell: &CellularSettings) -> EncodeResult {
    e.array(4)?
        .str(&cell.pin)?
        .str(&cell.apn)?
        .str(&cell.login)?
        .str(&cell.pass)?;
    Ok(())
}

fn expect_fields(d: &mut Decoder<'_>, kind: MessageKind, fields: u64) -> ProtocolResult<()> {
    match d.array()? {
        Some(len) if len == fields => Ok(()),
        Some(len) => Err(ProtocolError::MalformedMessage(format!(
            "{} expects {} fields, got {}",
            kind, fields, len
        ))),
        None => Err(ProtocolError::MalformedMessage(format!(
            "{} uses an indefinite-length array",
            kind
        ))),
    }
}

fn read_cellular(d: &mut Decoder<'_>, kind: MessageKind) -> ProtocolResult<CellularSettings> {
    expect_fields(d, kind, 4)?;
    Ok(CellularSettings {
        pin: d.str()?.to_string(),
        apn: d.str()?.to_string(),
        login: d.str()?.to_string(),
        pass: d.str()?.to_string(),
    })
}

fn read_text(d: &mut Decoder<'_>, kind: MessageKind) -> ProtocolResult<String> {
    expect_fields(d, kind, 1)?;
    Ok(d.str()?.to_string())
}

/// Band words; a null stands for "no band restriction".
fn read_band(d: &mut Decoder<'_>) -> ProtocolResult<Vec<u32>> {
    if d.datatype()? == Type::Null {
        d.null()?;
        return Ok(Vec::new());
    }
    let len = d
        .array()?
        .ok_or_else(|| ProtocolError::MalformedMessage("indefinite band array".to_string()))?;
    if len as usize > MAX_CATM1_BAND_WORDS {
        return Err(ProtocolError::InvalidField {
            field: "band",
            reason: format!("at most {} words, got {}", MAX_CATM1_BAND_WORDS, len),
        });
    }
    (0..len).map(|_| Ok(d.u32()?)).collect()
}

fn fixed_bytes<const N: usize>(field: &'static str, bytes: &[u8]) -> ProtocolResult<[u8; N]> {
    bytes
        .try_into()
        .map_err(|_| length_error(field, N, bytes.len()))
}

fn length_error(field: &'static str, expected: usize, actual: usize) -> ProtocolError {
    ProtocolError::InvalidField {
        field,
        reason: format!("expected {} bytes, got {}", expected, actual),
    }
}

fn ip_octets(ip: &IpAddr) -> Vec<u8> {
    match ip {
        IpAddr::V4(v4) => v4.octets().to_vec(),
        IpAddr::V6(v6) => v6.octets().to_vec(),
    }
}

fn ip_from_octets(field: &'static str, bytes: &[u8]) -> ProtocolResult<IpAddr> {
    if let Ok(v4) = <[u8; 4]>::try_from(bytes) {
        return Ok(IpAddr::V4(Ipv4Addr::from(v4)));
    }
    if let Ok(v6) = <[u8; 16]>::try_from(bytes) {
        return Ok(IpAddr::V6(Ipv6Addr::from(v6)));
    }
    Err(ProtocolError::InvalidField {
        field,
        reason: format!("expected 4 or 16 address bytes, got {}", bytes.len()),
    })
}
