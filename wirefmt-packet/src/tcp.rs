//! TCP header encoding and decoding (RFC 793)
//!
//! The 16-bit word at offset 12 packs the data offset (4 bits), six reserved
//! bits and the six control flags URG/ACK/PSH/RST/SYN/FIN.

use bytes::{BufMut, BytesMut};
use wirefmt_core::{align4, array_at, ensure_len, Error, Result};

const FLAG_FIN: u16 = 0b00_0001;
const FLAG_SYN: u16 = 0b00_0010;
const FLAG_RST: u16 = 0b00_0100;
const FLAG_PSH: u16 = 0b00_1000;
const FLAG_ACK: u16 = 0b01_0000;
const FLAG_URG: u16 = 0b10_0000;
const FLAGS_MASK: u16 = 0b11_1111;
const RESERVED_MASK: u16 = 0b11_1111;

/// TCP control flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TcpFlags {
    /// URG - Urgent pointer field is significant
    pub urg: bool,
    /// ACK - Acknowledgment field is significant
    pub ack: bool,
    /// PSH - Push function
    pub psh: bool,
    /// RST - Reset the connection
    pub rst: bool,
    /// SYN - Synchronize sequence numbers
    pub syn: bool,
    /// FIN - No more data from sender
    pub fin: bool,
}

impl TcpFlags {
    /// No flags set
    pub const NONE: TcpFlags = TcpFlags {
        urg: false,
        ack: false,
        psh: false,
        rst: false,
        syn: false,
        fin: false,
    };

    /// SYN flag (connection initiation)
    pub const SYN: TcpFlags = TcpFlags {
        syn: true,
        ..TcpFlags::NONE
    };

    /// SYN+ACK flags (connection acknowledgment)
    pub const SYN_ACK: TcpFlags = TcpFlags {
        syn: true,
        ack: true,
        ..TcpFlags::NONE
    };

    /// ACK flag
    pub const ACK: TcpFlags = TcpFlags {
        ack: true,
        ..TcpFlags::NONE
    };

    /// FIN+ACK flags (connection termination)
    pub const FIN_ACK: TcpFlags = TcpFlags {
        fin: true,
        ack: true,
        ..TcpFlags::NONE
    };

    /// RST flag (connection reset)
    pub const RST: TcpFlags = TcpFlags {
        rst: true,
        ..TcpFlags::NONE
    };

    /// PSH+ACK flags (push data)
    pub const PSH_ACK: TcpFlags = TcpFlags {
        psh: true,
        ack: true,
        ..TcpFlags::NONE
    };

    /// Low six bits of the offset/flags word
    pub fn bits(self) -> u16 {
        let mut flags = 0u16;
        if self.urg {
            flags |= FLAG_URG;
        }
        if self.ack {
            flags |= FLAG_ACK;
        }
        if self.psh {
            flags |= FLAG_PSH;
        }
        if self.rst {
            flags |= FLAG_RST;
        }
        if self.syn {
            flags |= FLAG_SYN;
        }
        if self.fin {
            flags |= FLAG_FIN;
        }
        flags
    }

    /// Parse from the offset/flags word; bits above the flag range are ignored
    pub fn from_bits(word: u16) -> Self {
        TcpFlags {
            urg: (word & FLAG_URG) != 0,
            ack: (word & FLAG_ACK) != 0,
            psh: (word & FLAG_PSH) != 0,
            rst: (word & FLAG_RST) != 0,
            syn: (word & FLAG_SYN) != 0,
            fin: (word & FLAG_FIN) != 0,
        }
    }
}

/// TCP header, fixed portion plus options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpHeader {
    /// Source port
    pub source_port: u16,
    /// Destination port
    pub destination_port: u16,
    /// Sequence number
    pub sequence_number: u32,
    /// Acknowledgment number
    pub acknowledgment_number: u32,
    /// Reserved bits (6 bits, should be 0)
    pub reserved: u8,
    /// TCP flags
    pub flags: TcpFlags,
    /// Window size
    pub window_size: u16,
    /// Checksum
    pub checksum: u16,
    /// Urgent pointer
    pub urgent_pointer: u16,
    /// Options, zero-padded to a 4-byte boundary on encode
    pub options: Vec<u8>,
}

impl TcpHeader {
    /// Minimum TCP header size (without options)
    pub const MIN_HEADER_SIZE: usize = 20;

    /// Maximum TCP header size (with maximum options)
    pub const MAX_HEADER_SIZE: usize = 60;

    /// Maximum size of the options area
    pub const MAX_OPTIONS_SIZE: usize = Self::MAX_HEADER_SIZE - Self::MIN_HEADER_SIZE;

    /// Create a header without options
    pub fn new(
        source_port: u16,
        destination_port: u16,
        sequence_number: u32,
        acknowledgment_number: u32,
        flags: TcpFlags,
        window_size: u16,
    ) -> Self {
        TcpHeader {
            source_port,
            destination_port,
            sequence_number,
            acknowledgment_number,
            reserved: 0,
            flags,
            window_size,
            checksum: 0,
            urgent_pointer: 0,
            options: Vec::new(),
        }
    }

    /// Header length in bytes, i.e. the payload offset
    pub fn header_len(&self) -> usize {
        Self::MIN_HEADER_SIZE + align4(self.options.len())
    }

    /// Data offset in 32-bit words
    pub fn data_offset(&self) -> u8 {
        ((self.header_len() / 4) & 0x0F) as u8
    }

    /// Decode the header at the start of `data`
    pub fn decode(data: &[u8]) -> Result<Self> {
        ensure_len(data, Self::MIN_HEADER_SIZE, "TCP header")?;

        let offset_and_flags = u16::from_be_bytes(array_at(data, 12)?);
        let data_offset = (offset_and_flags >> 12) as usize;
        let header_len = data_offset * 4;
        if header_len < Self::MIN_HEADER_SIZE {
            return Err(Error::invalid_field(
                "TCP data offset",
                format!("{} words is below the minimum of 5", data_offset),
            ));
        }
        ensure_len(data, header_len, "TCP header with options")?;

        Ok(TcpHeader {
            source_port: u16::from_be_bytes(array_at(data, 0)?),
            destination_port: u16::from_be_bytes(array_at(data, 2)?),
            sequence_number: u32::from_be_bytes(array_at(data, 4)?),
            acknowledgment_number: u32::from_be_bytes(array_at(data, 8)?),
            reserved: ((offset_and_flags >> 6) & RESERVED_MASK) as u8,
            flags: TcpFlags::from_bits(offset_and_flags),
            window_size: u16::from_be_bytes(array_at(data, 14)?),
            checksum: u16::from_be_bytes(array_at(data, 16)?),
            urgent_pointer: u16::from_be_bytes(array_at(data, 18)?),
            options: data[Self::MIN_HEADER_SIZE..header_len].to_vec(),
        })
    }

    /// Encode the header. Fails if the options do not fit in 40 bytes.
    pub fn encode(&self) -> Result<Vec<u8>> {
        if self.options.len() > Self::MAX_OPTIONS_SIZE {
            return Err(Error::invalid_construction(format!(
                "TCP options are {} bytes, at most {} fit",
                self.options.len(),
                Self::MAX_OPTIONS_SIZE
            )));
        }

        let header_len = self.header_len();
        let mut buffer = BytesMut::with_capacity(header_len);

        buffer.put_u16(self.source_port);
        buffer.put_u16(self.destination_port);
        buffer.put_u32(self.sequence_number);
        buffer.put_u32(self.acknowledgment_number);

        // Data offset (4 bits) + Reserved (6 bits) + Flags (6 bits)
        let word = ((self.data_offset() as u16) << 12)
            | (((self.reserved as u16) & RESERVED_MASK) << 6)
            | (self.flags.bits() & FLAGS_MASK);
        buffer.put_u16(word);

        buffer.put_u16(self.window_size);
        buffer.put_u16(self.checksum);
        buffer.put_u16(self.urgent_pointer);

        buffer.put_slice(&self.options);
        buffer.put_bytes(0, header_len - Self::MIN_HEADER_SIZE - self.options.len());

        Ok(buffer.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tcp_flags_bits() {
        assert_eq!(TcpFlags::SYN.bits(), 0b000010);
        assert_eq!(TcpFlags::SYN_ACK.bits(), 0b010010);
        assert_eq!(TcpFlags::FIN_ACK.bits(), 0b010001);
        assert_eq!(TcpFlags::from_bits(0b100000), TcpFlags { urg: true, ..TcpFlags::NONE });
    }

    #[test]
    fn test_flags_ignore_reserved_bits() {
        // ECE/CWR live in the reserved field here
        let flags = TcpFlags::from_bits(0x50C2);
        assert_eq!(flags, TcpFlags::SYN);
    }

    #[test]
    fn test_encode_layout() {
        let header = TcpHeader::new(54321, 80, 1000, 0, TcpFlags::SYN, 65535);
        let bytes = header.encode().unwrap();

        assert_eq!(bytes.len(), 20);
        assert_eq!(&bytes[0..2], &54321u16.to_be_bytes());
        assert_eq!(&bytes[2..4], &80u16.to_be_bytes());
        assert_eq!(&bytes[4..8], &1000u32.to_be_bytes());
        assert_eq!(bytes[12], 0x50);
        assert_eq!(bytes[13], 0x02);
        assert_eq!(&bytes[14..16], &[0xFF, 0xFF]);
    }

    #[test]
    fn test_roundtrip_with_options() {
        let mut header = TcpHeader::new(1, 2, 3, 4, TcpFlags::PSH_ACK, 512);
        header.options = vec![0x02, 0x04, 0x05, 0xB4]; // MSS 1460
        header.reserved = 0b10_0001;
        header.urgent_pointer = 9;

        let bytes = header.encode().unwrap();
        assert_eq!(bytes[12] >> 4, 6);

        let decoded = TcpHeader::decode(&bytes).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(decoded.header_len(), 24);
    }

    #[test]
    fn test_options_padded() {
        let mut header = TcpHeader::new(1, 2, 3, 4, TcpFlags::ACK, 0);
        header.options = vec![0x01, 0x01, 0x01, 0x03, 0x03];
        let bytes = header.encode().unwrap();
        assert_eq!(bytes.len(), 28);
        assert_eq!(&bytes[25..28], &[0, 0, 0]);
        assert_eq!(bytes[12] >> 4, 7);
    }

    #[test]
    fn test_options_too_long() {
        let mut header = TcpHeader::new(1, 2, 3, 4, TcpFlags::ACK, 0);
        header.options = vec![0x01; 41];
        assert!(header.encode().is_err());
    }

    #[test]
    fn test_decode_errors() {
        let bytes = TcpHeader::new(1, 2, 3, 4, TcpFlags::ACK, 0).encode().unwrap();
        assert!(TcpHeader::decode(&bytes[..19]).unwrap_err().is_truncated());

        let mut bad_offset = bytes.clone();
        bad_offset[12] = 0x40;
        assert!(matches!(
            TcpHeader::decode(&bad_offset),
            Err(Error::InvalidField { .. })
        ));

        let mut long_offset = bytes;
        long_offset[12] = 0x60;
        assert!(TcpHeader::decode(&long_offset).unwrap_err().is_truncated());
    }
}
