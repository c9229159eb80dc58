//! IPv4 header encoding and decoding (RFC 791)
//!
//! `total_len` and the flags/fragment-offset word are read and written in the
//! order given by a [`ByteOrderPolicy`]. Every other multi-byte field is in
//! network order.

use crate::checksum::internet_checksum;
use bytes::{BufMut, BytesMut};
use std::net::Ipv4Addr;
use wirefmt_core::{align4, array_at, ensure_len, ByteOrderPolicy, CodecConfig, Error, Result};

/// IP Protocol numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpProtocol {
    /// ICMP (1)
    ICMP,
    /// IGMP (2)
    IGMP,
    /// TCP (6)
    TCP,
    /// UDP (17)
    UDP,
    /// GRE (47)
    GRE,
    /// OSPF (89)
    OSPF,
    /// Custom protocol number
    Custom(u8),
}

impl IpProtocol {
    pub fn to_u8(self) -> u8 {
        match self {
            IpProtocol::ICMP => 1,
            IpProtocol::IGMP => 2,
            IpProtocol::TCP => 6,
            IpProtocol::UDP => 17,
            IpProtocol::GRE => 47,
            IpProtocol::OSPF => 89,
            IpProtocol::Custom(val) => val,
        }
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => IpProtocol::ICMP,
            2 => IpProtocol::IGMP,
            6 => IpProtocol::TCP,
            17 => IpProtocol::UDP,
            47 => IpProtocol::GRE,
            89 => IpProtocol::OSPF,
            val => IpProtocol::Custom(val),
        }
    }
}

/// IP Flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IpFlags {
    /// Reserved bit (must be 0)
    pub reserved: bool,
    /// Don't Fragment flag
    pub dont_fragment: bool,
    /// More Fragments flag
    pub more_fragments: bool,
}

impl IpFlags {
    /// No flags set
    pub const NONE: IpFlags = IpFlags {
        reserved: false,
        dont_fragment: false,
        more_fragments: false,
    };

    /// Don't Fragment flag set
    pub const DONT_FRAGMENT: IpFlags = IpFlags {
        reserved: false,
        dont_fragment: true,
        more_fragments: false,
    };

    /// Convert to 3-bit value
    pub fn to_u8(self) -> u8 {
        let mut flags = 0u8;
        if self.reserved {
            flags |= 0b100;
        }
        if self.dont_fragment {
            flags |= 0b010;
        }
        if self.more_fragments {
            flags |= 0b001;
        }
        flags
    }

    /// Parse from 3-bit value
    pub fn from_u8(value: u8) -> Self {
        IpFlags {
            reserved: (value & 0b100) != 0,
            dont_fragment: (value & 0b010) != 0,
            more_fragments: (value & 0b001) != 0,
        }
    }
}

const FRAGMENT_OFFSET_MASK: u16 = 0x1FFF;

/// IPv4 header, fixed portion plus options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv4Header {
    /// Version (4 bits, always 4 once decoded)
    pub version: u8,
    /// Type of Service / DSCP+ECN
    pub tos: u8,
    /// Total length (header + data) in bytes
    pub total_len: u16,
    /// Identification
    pub identification: u16,
    /// Flags (3 bits)
    pub flags: IpFlags,
    /// Fragment offset in 8-byte blocks (13 bits)
    pub fragment_offset: u16,
    /// Time to Live
    pub ttl: u8,
    /// Protocol
    pub protocol: IpProtocol,
    /// Header checksum as found on / written to the wire
    pub checksum: u16,
    /// Source IP address
    pub source: Ipv4Addr,
    /// Destination IP address
    pub destination: Ipv4Addr,
    /// Options, zero-padded to a 4-byte boundary on encode
    pub options: Vec<u8>,
}

impl Ipv4Header {
    /// Minimum IPv4 header size (without options)
    pub const MIN_HEADER_SIZE: usize = 20;

    /// Maximum IPv4 header size (with maximum options)
    pub const MAX_HEADER_SIZE: usize = 60;

    /// Maximum size of the options area
    pub const MAX_OPTIONS_SIZE: usize = Self::MAX_HEADER_SIZE - Self::MIN_HEADER_SIZE;

    /// Header for a datagram carrying `payload_len` bytes, DF set, TTL 64
    pub fn new(
        source: Ipv4Addr,
        destination: Ipv4Addr,
        protocol: IpProtocol,
        payload_len: u16,
    ) -> Self {
        Ipv4Header {
            version: 4,
            tos: 0,
            total_len: (Self::MIN_HEADER_SIZE as u16).saturating_add(payload_len),
            identification: 0,
            flags: IpFlags::DONT_FRAGMENT,
            fragment_offset: 0,
            ttl: 64,
            protocol,
            checksum: 0,
            source,
            destination,
            options: Vec::new(),
        }
    }

    /// Header length in bytes (IHL * 4), i.e. the payload offset
    pub fn header_len(&self) -> usize {
        Self::MIN_HEADER_SIZE + align4(self.options.len())
    }

    /// Internet Header Length in 32-bit words
    pub fn ihl(&self) -> u8 {
        ((self.header_len() / 4) & 0x0F) as u8
    }

    /// Decode using the process-wide byte-order policy
    pub fn decode(data: &[u8]) -> Result<Self> {
        Self::decode_with(data, CodecConfig::global().ipv4_order)
    }

    /// Decode with an explicit order for `total_len` and the fragment word
    pub fn decode_with(data: &[u8], order: ByteOrderPolicy) -> Result<Self> {
        ensure_len(data, Self::MIN_HEADER_SIZE, "IPv4 header")?;

        let version = data[0] >> 4;
        if version != 4 {
            return Err(Error::invalid_field(
                "IPv4 version",
                format!("expected 4, found {}", version),
            ));
        }

        let ihl = data[0] & 0x0F;
        let header_len = (ihl as usize) * 4;
        if header_len < Self::MIN_HEADER_SIZE {
            return Err(Error::invalid_field(
                "IPv4 header length",
                format!("IHL {} is below the minimum of 5", ihl),
            ));
        }
        ensure_len(data, header_len, "IPv4 header with options")?;

        let flags_and_offset = order.read_u16(array_at(data, 6)?);

        Ok(Ipv4Header {
            version,
            tos: data[1],
            total_len: order.read_u16(array_at(data, 2)?),
            identification: u16::from_be_bytes(array_at(data, 4)?),
            flags: IpFlags::from_u8((flags_and_offset >> 13) as u8),
            fragment_offset: flags_and_offset & FRAGMENT_OFFSET_MASK,
            ttl: data[8],
            protocol: IpProtocol::from_u8(data[9]),
            checksum: u16::from_be_bytes(array_at(data, 10)?),
            source: Ipv4Addr::from(array_at::<4>(data, 12)?),
            destination: Ipv4Addr::from(array_at::<4>(data, 16)?),
            options: data[Self::MIN_HEADER_SIZE..header_len].to_vec(),
        })
    }

    /// Encode using the process-wide byte-order policy
    pub fn encode(&self) -> Result<Vec<u8>> {
        self.encode_with(CodecConfig::global().ipv4_order)
    }

    /// Encode with an explicit order for `total_len` and the fragment word.
    ///
    /// Fails if the options do not fit in 40 bytes.
    pub fn encode_with(&self, order: ByteOrderPolicy) -> Result<Vec<u8>> {
        if self.options.len() > Self::MAX_OPTIONS_SIZE {
            return Err(Error::invalid_construction(format!(
                "IPv4 options are {} bytes, at most {} fit",
                self.options.len(),
                Self::MAX_OPTIONS_SIZE
            )));
        }
        Ok(self.write_header(order, self.checksum))
    }

    /// Header checksum over the network-order header with the checksum field zeroed
    pub fn compute_checksum(&self) -> u16 {
        internet_checksum(&self.write_header(ByteOrderPolicy::Network, 0))
    }

    /// Copy of `self` carrying the computed checksum
    pub fn with_checksum(mut self) -> Self {
        self.checksum = self.compute_checksum();
        self
    }

    fn write_header(&self, order: ByteOrderPolicy, checksum: u16) -> Vec<u8> {
        let header_len = self.header_len();
        let mut buffer = BytesMut::with_capacity(header_len);

        // Version (4 bits) + IHL (4 bits)
        buffer.put_u8(((self.version & 0x0F) << 4) | self.ihl());
        buffer.put_u8(self.tos);
        buffer.put_slice(&order.write_u16(self.total_len));
        buffer.put_u16(self.identification);

        // Flags (3 bits) + Fragment Offset (13 bits)
        let flags_and_offset = (((self.flags.to_u8() & 0b111) as u16) << 13)
            | (self.fragment_offset & FRAGMENT_OFFSET_MASK);
        buffer.put_slice(&order.write_u16(flags_and_offset));

        buffer.put_u8(self.ttl);
        buffer.put_u8(self.protocol.to_u8());
        buffer.put_u16(checksum);
        buffer.put_slice(&self.source.octets());
        buffer.put_slice(&self.destination.octets());

        buffer.put_slice(&self.options);
        buffer.put_bytes(0, header_len - Self::MIN_HEADER_SIZE - self.options.len());

        buffer.to_vec()
    }
}
