//! ARP packet structure and parsing (RFC 826)

use bytes::{BufMut, BytesMut};
use std::fmt;
use std::net::Ipv4Addr;
use wirefmt_core::{array_at, ensure_len, MacAddr, Result};

use crate::ethernet::{EtherType, EthernetHeader};

/// Hardware types
pub const HTYPE_ETHERNET: u16 = 1;

/// Protocol types
pub const PTYPE_IPV4: u16 = 0x0800;

/// ARP operation codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArpOperation {
    /// ARP Request
    Request = 1,
    /// ARP Reply
    Reply = 2,
}

impl ArpOperation {
    pub fn from_u16(val: u16) -> Option<Self> {
        match val {
            1 => Some(Self::Request),
            2 => Some(Self::Reply),
            _ => None,
        }
    }
}

/// ARP packet for Ethernet/IPv4 (28 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArpPacket {
    /// Hardware type (typically 1 for Ethernet)
    pub htype: u16,
    /// Protocol type (typically 0x0800 for IPv4)
    pub ptype: u16,
    /// Hardware address length (6 for MAC)
    pub hlen: u8,
    /// Protocol address length (4 for IPv4)
    pub plen: u8,
    /// Operation, kept raw so unknown opcodes survive a round trip
    pub operation: u16,
    /// Sender hardware address (MAC)
    pub sender_hw_addr: MacAddr,
    /// Sender protocol address (IP)
    pub sender_proto_addr: Ipv4Addr,
    /// Target hardware address (MAC)
    pub target_hw_addr: MacAddr,
    /// Target protocol address (IP)
    pub target_proto_addr: Ipv4Addr,
}

impl ArpPacket {
    /// Encoded size
    pub const SIZE: usize = 28;

    /// Create new ARP request
    pub fn new_request(sender_mac: MacAddr, sender_ip: Ipv4Addr, target_ip: Ipv4Addr) -> Self {
        Self {
            htype: HTYPE_ETHERNET,
            ptype: PTYPE_IPV4,
            hlen: 6,
            plen: 4,
            operation: ArpOperation::Request as u16,
            sender_hw_addr: sender_mac,
            sender_proto_addr: sender_ip,
            target_hw_addr: MacAddr::ZERO, // Unknown in request
            target_proto_addr: target_ip,
        }
    }

    /// Create new ARP reply
    pub fn new_reply(
        sender_mac: MacAddr,
        sender_ip: Ipv4Addr,
        target_mac: MacAddr,
        target_ip: Ipv4Addr,
    ) -> Self {
        Self {
            operation: ArpOperation::Reply as u16,
            target_hw_addr: target_mac,
            ..Self::new_request(sender_mac, sender_ip, target_ip)
        }
    }

    /// Decode the first 28 bytes of `data`
    pub fn decode(data: &[u8]) -> Result<Self> {
        ensure_len(data, Self::SIZE, "ARP packet")?;

        Ok(Self {
            htype: u16::from_be_bytes(array_at(data, 0)?),
            ptype: u16::from_be_bytes(array_at(data, 2)?),
            hlen: data[4],
            plen: data[5],
            operation: u16::from_be_bytes(array_at(data, 6)?),
            sender_hw_addr: MacAddr(array_at(data, 8)?),
            sender_proto_addr: Ipv4Addr::from(array_at::<4>(data, 14)?),
            target_hw_addr: MacAddr(array_at(data, 18)?),
            target_proto_addr: Ipv4Addr::from(array_at::<4>(data, 24)?),
        })
    }

    /// Encode to exactly 28 bytes
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(Self::SIZE);
        self.encode_into(&mut buf);
        buf.to_vec()
    }

    /// Append the encoded packet to `buf`
    pub fn encode_into(&self, buf: &mut BytesMut) {
        buf.put_u16(self.htype);
        buf.put_u16(self.ptype);
        buf.put_u8(self.hlen);
        buf.put_u8(self.plen);
        buf.put_u16(self.operation);
        buf.put_slice(self.sender_hw_addr.as_bytes());
        buf.put_slice(&self.sender_proto_addr.octets());
        buf.put_slice(self.target_hw_addr.as_bytes());
        buf.put_slice(&self.target_proto_addr.octets());
    }

    /// Typed view of the operation, if it is a known one
    pub fn op(&self) -> Option<ArpOperation> {
        ArpOperation::from_u16(self.operation)
    }

    /// Check if this is a request
    pub fn is_request(&self) -> bool {
        self.op() == Some(ArpOperation::Request)
    }

    /// Check if this is a reply
    pub fn is_reply(&self) -> bool {
        self.op() == Some(ArpOperation::Reply)
    }
}

impl fmt::Display for ArpPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.op() {
            Some(ArpOperation::Request) => "request",
            Some(ArpOperation::Reply) => "reply",
            None => "unknown",
        };
        write!(
            f,
            "OP: {} Src-MAC: {} Src-IP: {} Dst-MAC: {} Dst-IP: {}",
            op,
            self.sender_hw_addr,
            self.sender_proto_addr,
            self.target_hw_addr,
            self.target_proto_addr
        )
    }
}

/// ARP packet together with its Ethernet header (42 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArpFrame {
    pub ethernet: EthernetHeader,
    pub arp: ArpPacket,
}

impl ArpFrame {
    /// Encoded size
    pub const SIZE: usize = EthernetHeader::SIZE + ArpPacket::SIZE;

    /// Broadcast request frame for `target_ip`
    pub fn request(sender_mac: MacAddr, sender_ip: Ipv4Addr, target_ip: Ipv4Addr) -> Self {
        ArpFrame {
            ethernet: EthernetHeader::new(MacAddr::BROADCAST, sender_mac, EtherType::ARP),
            arp: ArpPacket::new_request(sender_mac, sender_ip, target_ip),
        }
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        ensure_len(data, Self::SIZE, "ARP frame")?;
        Ok(ArpFrame {
            ethernet: EthernetHeader::decode(data)?,
            arp: ArpPacket::decode(&data[EthernetHeader::SIZE..])?,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(Self::SIZE);
        self.ethernet.encode_into(&mut buf);
        self.arp.encode_into(&mut buf);
        buf.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arp_request_creation() {
        let sender_mac = MacAddr([0x11, 0x22, 0x33, 0x44, 0x55, 0x66]);
        let sender_ip = Ipv4Addr::new(192, 168, 1, 1);
        let target_ip = Ipv4Addr::new(192, 168, 1, 2);

        let packet = ArpPacket::new_request(sender_mac, sender_ip, target_ip);

        assert_eq!(packet.op(), Some(ArpOperation::Request));
        assert_eq!(packet.sender_hw_addr, sender_mac);
        assert_eq!(packet.target_hw_addr, MacAddr::ZERO);
        assert!(packet.is_request());
    }

    #[test]
    fn test_arp_reply_creation() {
        let sender_mac = MacAddr([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
        let target_mac = MacAddr([0x11, 0x22, 0x33, 0x44, 0x55, 0x66]);
        let packet = ArpPacket::new_reply(
            sender_mac,
            Ipv4Addr::new(192, 168, 1, 1),
            target_mac,
            Ipv4Addr::new(192, 168, 1, 2),
        );

        assert!(packet.is_reply());
        assert_eq!(packet.target_hw_addr, target_mac);
    }

    #[test]
    fn test_arp_encode_decode() {
        let packet = ArpPacket::new_request(
            MacAddr([0x11, 0x22, 0x33, 0x44, 0x55, 0x66]),
            Ipv4Addr::new(10, 0, 0, 1),
            Ipv4Addr::new(10, 0, 0, 2),
        );
        let bytes = packet.encode();

        assert_eq!(bytes.len(), ArpPacket::SIZE);
        assert_eq!(&bytes[6..8], &[0x00, 0x01]);
        assert_eq!(ArpPacket::decode(&bytes).unwrap(), packet);
    }

    #[test]
    fn test_unknown_opcode_survives() {
        let mut packet = ArpPacket::new_request(
            MacAddr::ZERO,
            Ipv4Addr::UNSPECIFIED,
            Ipv4Addr::UNSPECIFIED,
        );
        packet.operation = 9;
        let decoded = ArpPacket::decode(&packet.encode()).unwrap();
        assert_eq!(decoded.operation, 9);
        assert_eq!(decoded.op(), None);
    }

    #[test]
    fn test_display() {
        let packet = ArpPacket::new_request(
            MacAddr([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]),
            Ipv4Addr::new(10, 0, 0, 1),
            Ipv4Addr::new(10, 0, 0, 2),
        );
        assert_eq!(
            packet.to_string(),
            "OP: request Src-MAC: aa:bb:cc:dd:ee:ff Src-IP: 10.0.0.1 Dst-MAC: 00:00:00:00:00:00 Dst-IP: 10.0.0.2"
        );
    }

    #[test]
    fn test_frame_roundtrip() {
        let frame = ArpFrame::request(
            MacAddr([0x02, 0, 0, 0, 0, 1]),
            Ipv4Addr::new(192, 168, 0, 10),
            Ipv4Addr::new(192, 168, 0, 1),
        );
        let bytes = frame.encode();

        assert_eq!(bytes.len(), 42);
        assert_eq!(&bytes[12..14], &[0x08, 0x06]);
        assert_eq!(ArpFrame::decode(&bytes).unwrap(), frame);
        assert!(ArpFrame::decode(&bytes[..41]).unwrap_err().is_truncated());
    }
}
