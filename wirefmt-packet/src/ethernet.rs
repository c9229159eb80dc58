//! Ethernet II header encoding and decoding

use bytes::{BufMut, BytesMut};
use std::fmt;
use wirefmt_core::{array_at, ensure_len, MacAddr, Result};

/// Common EtherType values used in Ethernet II frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EtherType {
    /// IPv4 (0x0800)
    IPv4,
    /// ARP (0x0806)
    ARP,
    /// VLAN-tagged frame (0x8100)
    VLAN,
    /// RARP (0x8035)
    RARP,
    /// IPv6 (0x86DD)
    IPv6,
    /// Q-in-Q/802.1ad (0x88A8)
    QinQ,
    /// LLDP (0x88CC)
    LLDP,
    /// Anything else, including 802.3 length values
    Other(u16),
}

impl EtherType {
    /// Convert EtherType to u16 value
    pub fn to_u16(self) -> u16 {
        match self {
            EtherType::IPv4 => 0x0800,
            EtherType::ARP => 0x0806,
            EtherType::VLAN => 0x8100,
            EtherType::RARP => 0x8035,
            EtherType::IPv6 => 0x86DD,
            EtherType::QinQ => 0x88A8,
            EtherType::LLDP => 0x88CC,
            EtherType::Other(val) => val,
        }
    }

    /// Create EtherType from u16 value
    pub fn from_u16(value: u16) -> Self {
        match value {
            0x0800 => EtherType::IPv4,
            0x0806 => EtherType::ARP,
            0x8100 => EtherType::VLAN,
            0x8035 => EtherType::RARP,
            0x86DD => EtherType::IPv6,
            0x88A8 => EtherType::QinQ,
            0x88CC => EtherType::LLDP,
            val => EtherType::Other(val),
        }
    }
}

impl From<u16> for EtherType {
    fn from(value: u16) -> Self {
        EtherType::from_u16(value)
    }
}

impl fmt::Display for EtherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EtherType::IPv4 => write!(f, "IPv4"),
            EtherType::ARP => write!(f, "ARP"),
            EtherType::VLAN => write!(f, "VLAN"),
            EtherType::RARP => write!(f, "RARP"),
            EtherType::IPv6 => write!(f, "IPv6"),
            EtherType::QinQ => write!(f, "Q-in-Q"),
            EtherType::LLDP => write!(f, "LLDP"),
            EtherType::Other(val) => write!(f, "0x{:04x}", val),
        }
    }
}

/// Ethernet II header: destination, source, frame type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthernetHeader {
    /// Destination MAC address
    pub destination: MacAddr,
    /// Source MAC address
    pub source: MacAddr,
    /// EtherType
    pub ethertype: EtherType,
}

impl EthernetHeader {
    /// Ethernet header size (dst + src + type)
    pub const SIZE: usize = 14;

    pub fn new(destination: MacAddr, source: MacAddr, ethertype: EtherType) -> Self {
        EthernetHeader {
            destination,
            source,
            ethertype,
        }
    }

    /// Decode the first 14 bytes of `data`.
    pub fn decode(data: &[u8]) -> Result<Self> {
        ensure_len(data, Self::SIZE, "Ethernet header")?;

        Ok(EthernetHeader {
            destination: MacAddr(array_at(data, 0)?),
            source: MacAddr(array_at(data, 6)?),
            ethertype: EtherType::from_u16(u16::from_be_bytes(array_at(data, 12)?)),
        })
    }

    /// Encode to exactly 14 bytes
    pub fn encode(&self) -> Vec<u8> {
        let mut buffer = BytesMut::with_capacity(Self::SIZE);
        self.encode_into(&mut buffer);
        buffer.to_vec()
    }

    /// Append the encoded header to `buffer`
    pub fn encode_into(&self, buffer: &mut BytesMut) {
        buffer.put_slice(self.destination.as_bytes());
        buffer.put_slice(self.source.as_bytes());
        buffer.put_u16(self.ethertype.to_u16());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ethertype_conversion() {
        assert_eq!(EtherType::IPv4.to_u16(), 0x0800);
        assert_eq!(EtherType::from_u16(0x0806), EtherType::ARP);
        assert_eq!(EtherType::from_u16(0x1234), EtherType::Other(0x1234));
        assert_eq!(EtherType::Other(0x1234).to_string(), "0x1234");
    }

    #[test]
    fn test_header_encode() {
        let header = EthernetHeader::new(
            MacAddr::BROADCAST,
            MacAddr([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]),
            EtherType::ARP,
        );
        let bytes = header.encode();

        assert_eq!(bytes.len(), EthernetHeader::SIZE);
        assert_eq!(&bytes[0..6], &[0xFF; 6]);
        assert_eq!(&bytes[6..12], &[0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
        assert_eq!(&bytes[12..14], &[0x08, 0x06]);
    }

    #[test]
    fn test_header_roundtrip() {
        let bytes = [
            0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x86, 0xdd,
            0xde, 0xad,
        ];
        let header = EthernetHeader::decode(&bytes).unwrap();

        assert_eq!(header.destination.to_string(), "aa:bb:cc:dd:ee:ff");
        assert_eq!(header.ethertype, EtherType::IPv6);
        assert_eq!(header.encode(), &bytes[..14]);
    }

    #[test]
    fn test_header_too_short() {
        let err = EthernetHeader::decode(&[0u8; 13]).unwrap_err();
        assert!(err.is_truncated());
    }
}
