//! DHCP option TLVs (RFC 2132)
//!
//! Wire form is `[code:1][len:1][value:len]`. Code 0 (Pad) is a lone filler
//! byte and code 255 (End) terminates the list.

use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;

use bytes::{BufMut, BytesMut};
use tracing::{debug, warn};
use wirefmt_core::{Error, Result};

use crate::tlv::{decode_list, encode_list, HeaderStep, TlvIter, TlvRecord};

/// Largest value a single option can carry
pub const MAX_OPTION_LEN: usize = 255;

/// Most addresses that fit in one address-list option
pub const MAX_IPV4_LIST: usize = MAX_OPTION_LEN / 4;

/// DHCP Message Types (RFC 2132)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DhcpMessageType {
    Discover = 1,
    Offer = 2,
    Request = 3,
    Decline = 4,
    Ack = 5,
    Nak = 6,
    Release = 7,
    Inform = 8,
}

impl DhcpMessageType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(DhcpMessageType::Discover),
            2 => Some(DhcpMessageType::Offer),
            3 => Some(DhcpMessageType::Request),
            4 => Some(DhcpMessageType::Decline),
            5 => Some(DhcpMessageType::Ack),
            6 => Some(DhcpMessageType::Nak),
            7 => Some(DhcpMessageType::Release),
            8 => Some(DhcpMessageType::Inform),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DhcpMessageType::Discover => "DISCOVER",
            DhcpMessageType::Offer => "OFFER",
            DhcpMessageType::Request => "REQUEST",
            DhcpMessageType::Decline => "DECLINE",
            DhcpMessageType::Ack => "ACK",
            DhcpMessageType::Nak => "NAK",
            DhcpMessageType::Release => "RELEASE",
            DhcpMessageType::Inform => "INFORM",
        }
    }
}

impl fmt::Display for DhcpMessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// DHCP Option Codes (RFC 2132)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionCode {
    Pad = 0,
    SubnetMask = 1,
    Router = 3,
    DnsServer = 6,
    Hostname = 12,
    DomainName = 15,
    BroadcastAddress = 28,
    RequestedIpAddress = 50,
    LeaseTime = 51,
    MessageType = 53,
    ServerId = 54,
    ParameterRequestList = 55,
    Message = 56,
    MaxMessageSize = 57,
    RenewalTime = 58,
    RebindingTime = 59,
    ClientIdentifier = 61,
    End = 255,
}

impl OptionCode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(OptionCode::Pad),
            1 => Some(OptionCode::SubnetMask),
            3 => Some(OptionCode::Router),
            6 => Some(OptionCode::DnsServer),
            12 => Some(OptionCode::Hostname),
            15 => Some(OptionCode::DomainName),
            28 => Some(OptionCode::BroadcastAddress),
            50 => Some(OptionCode::RequestedIpAddress),
            51 => Some(OptionCode::LeaseTime),
            53 => Some(OptionCode::MessageType),
            54 => Some(OptionCode::ServerId),
            55 => Some(OptionCode::ParameterRequestList),
            56 => Some(OptionCode::Message),
            57 => Some(OptionCode::MaxMessageSize),
            58 => Some(OptionCode::RenewalTime),
            59 => Some(OptionCode::RebindingTime),
            61 => Some(OptionCode::ClientIdentifier),
            255 => Some(OptionCode::End),
            _ => None,
        }
    }
}

impl From<OptionCode> for u8 {
    fn from(code: OptionCode) -> u8 {
        code as u8
    }
}

/// One option as it appears on the wire
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DhcpOption {
    pub code: u8,
    pub value: Vec<u8>,
}

impl DhcpOption {
    /// Returned by the typed constructors when their arguments are out of
    /// range. Encoding it fails, so callers must check [`is_invalid`](Self::is_invalid)
    /// before transmission.
    pub const INVALID: DhcpOption = DhcpOption {
        code: 0,
        value: Vec::new(),
    };

    /// Raw option; encoding validates the code and length
    pub fn new(code: impl Into<u8>, value: impl Into<Vec<u8>>) -> Self {
        DhcpOption {
            code: code.into(),
            value: value.into(),
        }
    }

    pub fn is_invalid(&self) -> bool {
        self.code == 0 && self.value.is_empty()
    }

    /// Message type (option 53)
    pub fn message_type(kind: DhcpMessageType) -> Self {
        DhcpOption::new(OptionCode::MessageType, vec![kind as u8])
    }

    /// NUL-terminated string; the terminator counts toward the 255-byte limit
    pub fn string(code: impl Into<u8>, text: &str) -> Self {
        let code = code.into();
        if text.len() + 1 > MAX_OPTION_LEN {
            debug!(code, len = text.len(), "string option too long");
            return Self::INVALID;
        }
        let mut value = Vec::with_capacity(text.len() + 1);
        value.extend_from_slice(text.as_bytes());
        value.push(0);
        Self::checked(code, value)
    }

    /// One to 63 IPv4 addresses
    pub fn ipv4_list(code: impl Into<u8>, addrs: &[Ipv4Addr]) -> Self {
        let code = code.into();
        if addrs.is_empty() || addrs.len() > MAX_IPV4_LIST {
            debug!(code, count = addrs.len(), "address list option out of range");
            return Self::INVALID;
        }
        let value = addrs.iter().flat_map(|addr| addr.octets()).collect();
        Self::checked(code, value)
    }

    /// Single IPv4 address
    pub fn ipv4(code: impl Into<u8>, addr: Ipv4Addr) -> Self {
        Self::checked(code.into(), addr.octets().to_vec())
    }

    /// Big-endian 32-bit integer
    pub fn u32(code: impl Into<u8>, value: u32) -> Self {
        Self::checked(code.into(), value.to_be_bytes().to_vec())
    }

    /// Time value in whole seconds; sub-second parts are dropped
    pub fn duration(code: impl Into<u8>, duration: Duration) -> Self {
        let code = code.into();
        match u32::try_from(duration.as_secs()) {
            Ok(secs) => Self::u32(code, secs),
            Err(_) => {
                debug!(code, secs = duration.as_secs(), "duration option overflows u32");
                Self::INVALID
            }
        }
    }

    /// Parameter request list (option 55), 1 to 255 codes
    pub fn parameter_request_list(codes: &[u8]) -> Self {
        if codes.is_empty() || codes.len() > MAX_OPTION_LEN {
            debug!(count = codes.len(), "parameter request list out of range");
            return Self::INVALID;
        }
        DhcpOption::new(OptionCode::ParameterRequestList, codes.to_vec())
    }

    fn checked(code: u8, value: Vec<u8>) -> Self {
        if code == OptionCode::Pad as u8 || code == OptionCode::End as u8 {
            debug!(code, "typed constructor given a reserved option code");
            return Self::INVALID;
        }
        DhcpOption { code, value }
    }

    /// Typed view of the value. Values that do not match the code's expected
    /// shape fall back to [`DhcpOptionValue::Raw`].
    pub fn interpret(&self) -> DhcpOptionValue {
        match parse_value(self.code, &self.value) {
            Ok(value) => value,
            Err(err) => {
                warn!(code = self.code, error = %err, "failed to interpret DHCP option");
                DhcpOptionValue::Raw(self.value.clone())
            }
        }
    }
}

impl TlvRecord for DhcpOption {
    const HEADER_LEN: usize = 2;
    const ALIGN: usize = 1;
    const MAX_VALUE_LEN: usize = MAX_OPTION_LEN;

    fn kind(&self) -> u16 {
        self.code as u16
    }

    fn value(&self) -> &[u8] {
        &self.value
    }

    fn from_parts(kind: u16, value: &[u8]) -> Self {
        DhcpOption {
            code: kind as u8,
            value: value.to_vec(),
        }
    }

    fn read_header(rest: &[u8]) -> Result<HeaderStep> {
        let code = rest[0];
        if code == OptionCode::Pad as u8 {
            return Ok(HeaderStep::Skip(1));
        }
        if code == OptionCode::End as u8 {
            return Ok(HeaderStep::End);
        }

        let declared = match rest.get(1) {
            Some(&len) => len as usize,
            None => return Err(Error::truncated("DHCP option header", 2, rest.len())),
        };
        let remaining = rest.len() - 2;
        if declared > remaining {
            return Err(Error::TruncatedOption {
                code,
                declared,
                remaining,
            });
        }

        Ok(HeaderStep::Entry {
            kind: code as u16,
            value_len: declared,
            header_len: 2,
        })
    }

    fn write_header(&self, buf: &mut BytesMut) -> Result<()> {
        if self.code == OptionCode::Pad as u8 || self.code == OptionCode::End as u8 {
            return Err(Error::invalid_construction(format!(
                "option code {} is reserved for list framing",
                self.code
            )));
        }
        buf.put_u8(self.code);
        buf.put_u8(self.value.len() as u8);
        Ok(())
    }

    fn write_terminator(buf: &mut BytesMut) {
        buf.put_u8(OptionCode::End as u8);
    }
}

/// Lazily walk an option area
pub fn option_iter(buf: &[u8]) -> TlvIter<'_, DhcpOption> {
    TlvIter::new(buf)
}

/// Decode an option area up to End or exhaustion
pub fn decode_options(buf: &[u8]) -> Result<Vec<DhcpOption>> {
    decode_list(buf)
}

/// Encode options in order followed by End
pub fn encode_options(opts: &[DhcpOption]) -> Result<Vec<u8>> {
    encode_list(opts)
}

/// Typed interpretation of a decoded option
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DhcpOptionValue {
    MessageType(DhcpMessageType),
    Address(Ipv4Addr),
    Addresses(Vec<Ipv4Addr>),
    Duration(Duration),
    Text(String),
    ParameterList(Vec<u8>),
    U16(u16),
    Raw(Vec<u8>),
}

fn exact<const N: usize>(what: &'static str, data: &[u8]) -> Result<[u8; N]> {
    data.try_into()
        .map_err(|_| Error::invalid_field(what, format!("must be {} bytes, found {}", N, data.len())))
}

fn parse_value(code: u8, data: &[u8]) -> Result<DhcpOptionValue> {
    let value = match OptionCode::from_u8(code) {
        Some(OptionCode::MessageType) => {
            let [raw] = exact::<1>("message type", data)?;
            let kind = DhcpMessageType::from_u8(raw).ok_or_else(|| {
                Error::invalid_field("message type", format!("unknown value {}", raw))
            })?;
            DhcpOptionValue::MessageType(kind)
        }
        Some(
            OptionCode::SubnetMask
            | OptionCode::BroadcastAddress
            | OptionCode::RequestedIpAddress
            | OptionCode::ServerId,
        ) => DhcpOptionValue::Address(Ipv4Addr::from(exact::<4>("address", data)?)),
        Some(OptionCode::Router | OptionCode::DnsServer) => {
            if data.is_empty() || data.len() % 4 != 0 {
                return Err(Error::invalid_field(
                    "address list",
                    format!("{} bytes is not a positive multiple of 4", data.len()),
                ));
            }
            DhcpOptionValue::Addresses(
                data.chunks_exact(4)
                    .map(|chunk| Ipv4Addr::new(chunk[0], chunk[1], chunk[2], chunk[3]))
                    .collect(),
            )
        }
        Some(OptionCode::LeaseTime | OptionCode::RenewalTime | OptionCode::RebindingTime) => {
            let secs = u32::from_be_bytes(exact::<4>("time value", data)?);
            DhcpOptionValue::Duration(Duration::from_secs(secs as u64))
        }
        Some(OptionCode::Hostname | OptionCode::DomainName | OptionCode::Message) => {
            let trimmed = match data.iter().position(|&b| b == 0) {
                Some(nul) => &data[..nul],
                None => data,
            };
            let text = std::str::from_utf8(trimmed)
                .map_err(|e| Error::invalid_field("option text", e.to_string()))?;
            DhcpOptionValue::Text(text.to_string())
        }
        Some(OptionCode::ParameterRequestList) => DhcpOptionValue::ParameterList(data.to_vec()),
        Some(OptionCode::MaxMessageSize) => {
            DhcpOptionValue::U16(u16::from_be_bytes(exact::<2>("max message size", data)?))
        }
        _ => DhcpOptionValue::Raw(data.to_vec()),
    };
    Ok(value)
}
