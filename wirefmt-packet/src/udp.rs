//! UDP header encoding and decoding (RFC 768)

use bytes::{BufMut, BytesMut};
use wirefmt_core::{array_at, ensure_len, Result};

/// UDP header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UdpHeader {
    /// Source port
    pub source_port: u16,
    /// Destination port
    pub destination_port: u16,
    /// Length (header + data)
    pub length: u16,
    /// Checksum, 0 when unused
    pub checksum: u16,
}

impl UdpHeader {
    /// UDP header size in bytes
    pub const SIZE: usize = 8;

    /// Header for a datagram carrying `payload_len` bytes; checksum left at 0
    pub fn new(source_port: u16, destination_port: u16, payload_len: u16) -> Self {
        UdpHeader {
            source_port,
            destination_port,
            length: (Self::SIZE as u16).saturating_add(payload_len),
            checksum: 0,
        }
    }

    /// Decode the first 8 bytes of `data`
    ///
    /// The checksum is not validated; that needs the pseudo-header.
    pub fn decode(data: &[u8]) -> Result<Self> {
        ensure_len(data, Self::SIZE, "UDP header")?;

        Ok(UdpHeader {
            source_port: u16::from_be_bytes(array_at(data, 0)?),
            destination_port: u16::from_be_bytes(array_at(data, 2)?),
            length: u16::from_be_bytes(array_at(data, 4)?),
            checksum: u16::from_be_bytes(array_at(data, 6)?),
        })
    }

    /// Encode to exactly 8 bytes
    pub fn encode(&self) -> Vec<u8> {
        let mut buffer = BytesMut::with_capacity(Self::SIZE);
        buffer.put_u16(self.source_port);
        buffer.put_u16(self.destination_port);
        buffer.put_u16(self.length);
        buffer.put_u16(self.checksum);
        buffer.to_vec()
    }

    /// Number of payload bytes the length field announces
    pub fn payload_len(&self) -> usize {
        (self.length as usize).saturating_sub(Self::SIZE)
    }
}
