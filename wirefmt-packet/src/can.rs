//! SocketCAN classic and FD frames
//!
//! Layouts follow `struct can_frame` / `struct canfd_frame` from
//! `linux/can.h`. The identifier word is in host byte order, as the kernel
//! hands it to a raw CAN socket.

use std::fmt;

use bytes::{BufMut, BytesMut};
use wirefmt_core::{array_at, ensure_len, Error, Result};

/// Payload capacity of a classic frame
pub const CAN_MAX_DLEN: usize = 8;
/// Payload capacity of an FD frame
pub const CANFD_MAX_DLEN: usize = 64;

/// CAN identifier word: 29/11-bit id plus EFF/RTR/ERR flags in the top bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CanId(u32);

impl CanId {
    /// Extended frame format (29-bit id)
    pub const EFF_FLAG: u32 = 0x8000_0000;
    /// Remote transmission request
    pub const RTR_FLAG: u32 = 0x4000_0000;
    /// Error message frame
    pub const ERR_FLAG: u32 = 0x2000_0000;

    /// Largest standard (11-bit) identifier
    pub const MAX_STANDARD: u32 = 0x7FF;
    /// Largest extended (29-bit) identifier
    pub const MAX_EXTENDED: u32 = 0x1FFF_FFFF;

    /// Wrap a raw identifier word as found on the wire
    pub const fn from_raw(raw: u32) -> Self {
        CanId(raw)
    }

    /// Standard 11-bit identifier
    pub fn standard(id: u32) -> Result<Self> {
        if id > Self::MAX_STANDARD {
            return Err(Error::invalid_construction(format!(
                "standard CAN id 0x{:x} does not fit in 11 bits",
                id
            )));
        }
        Ok(CanId(id))
    }

    /// Extended 29-bit identifier, EFF flag set
    pub fn extended(id: u32) -> Result<Self> {
        if id > Self::MAX_EXTENDED {
            return Err(Error::invalid_construction(format!(
                "extended CAN id 0x{:x} does not fit in 29 bits",
                id
            )));
        }
        Ok(CanId(id | Self::EFF_FLAG))
    }

    /// Same id with the RTR flag set
    pub fn remote(self) -> Self {
        CanId(self.0 | Self::RTR_FLAG)
    }

    /// Raw identifier word including flags
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Identifier without flags, masked according to the frame format
    pub fn id(self) -> u32 {
        if self.is_extended() {
            self.0 & Self::MAX_EXTENDED
        } else {
            self.0 & Self::MAX_STANDARD
        }
    }

    pub fn is_extended(self) -> bool {
        self.0 & Self::EFF_FLAG != 0
    }

    pub fn is_remote(self) -> bool {
        self.0 & Self::RTR_FLAG != 0
    }

    pub fn is_error(self) -> bool {
        self.0 & Self::ERR_FLAG != 0
    }
}

impl fmt::Display for CanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_extended() {
            write!(f, "{:08X}", self.id())
        } else {
            write!(f, "{:03X}", self.id())
        }
    }
}

fn check_payload(data: &[u8], capacity: usize) -> Result<()> {
    if data.len() > capacity {
        return Err(Error::invalid_construction(format!(
            "CAN payload of {} bytes exceeds {}",
            data.len(),
            capacity
        )));
    }
    Ok(())
}

fn fmt_payload(f: &mut fmt::Formatter<'_>, data: &[u8]) -> fmt::Result {
    for byte in data {
        write!(f, "{:02X}", byte)?;
    }
    Ok(())
}

/// Classic CAN frame (16 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CanFrame {
    pub id: CanId,
    /// Payload length in bytes (0..=8)
    pub len: u8,
    pub pad: u8,
    pub res0: u8,
    pub res1: u8,
    pub data: [u8; CAN_MAX_DLEN],
}

impl CanFrame {
    /// Encoded size
    pub const SIZE: usize = 16;
    /// Payload capacity
    pub const DATA_LEN: usize = CAN_MAX_DLEN;

    /// Data frame carrying `data` (at most 8 bytes)
    pub fn new(id: CanId, data: &[u8]) -> Result<Self> {
        check_payload(data, Self::DATA_LEN)?;
        let mut frame = CanFrame {
            id,
            len: data.len() as u8,
            ..Default::default()
        };
        frame.data[..data.len()].copy_from_slice(data);
        Ok(frame)
    }

    /// Decode the first 16 bytes of `data`
    pub fn decode(data: &[u8]) -> Result<Self> {
        ensure_len(data, Self::SIZE, "CAN frame")?;

        Ok(CanFrame {
            id: CanId::from_raw(u32::from_ne_bytes(array_at(data, 0)?)),
            len: data[4],
            pad: data[5],
            res0: data[6],
            res1: data[7],
            data: array_at(data, 8)?,
        })
    }

    /// Encode to exactly 16 bytes
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(Self::SIZE);
        buf.put_slice(&self.id.raw().to_ne_bytes());
        buf.put_u8(self.len);
        buf.put_u8(self.pad);
        buf.put_u8(self.res0);
        buf.put_u8(self.res1);
        buf.put_slice(&self.data);
        buf.to_vec()
    }

    /// Payload bytes, clamped to the capacity when `len` is out of range
    pub fn data(&self) -> &[u8] {
        &self.data[..(self.len as usize).min(Self::DATA_LEN)]
    }
}

impl fmt::Display for CanFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#", self.id)?;
        if self.id.is_remote() {
            return write!(f, "R");
        }
        fmt_payload(f, self.data())
    }
}

/// CAN FD frame (72 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanFdFrame {
    pub id: CanId,
    /// Payload length in bytes (0..=64)
    pub len: u8,
    /// `BRS` / `ESI` / `FDF` bits
    pub flags: u8,
    pub res0: u8,
    pub res1: u8,
    pub data: [u8; CANFD_MAX_DLEN],
}

impl CanFdFrame {
    /// Encoded size
    pub const SIZE: usize = 72;
    /// Payload capacity
    pub const DATA_LEN: usize = CANFD_MAX_DLEN;

    /// Bit rate switch
    pub const FLAG_BRS: u8 = 0x01;
    /// Error state indicator of the transmitting node
    pub const FLAG_ESI: u8 = 0x02;
    /// Marks a CAN FD frame
    pub const FLAG_FDF: u8 = 0x04;

    /// FD frame carrying `data` (at most 64 bytes)
    pub fn new(id: CanId, data: &[u8], flags: u8) -> Result<Self> {
        check_payload(data, Self::DATA_LEN)?;
        let mut frame = CanFdFrame {
            id,
            len: data.len() as u8,
            flags,
            res0: 0,
            res1: 0,
            data: [0; Self::DATA_LEN],
        };
        frame.data[..data.len()].copy_from_slice(data);
        Ok(frame)
    }

    /// Decode the first 72 bytes of `data`
    pub fn decode(data: &[u8]) -> Result<Self> {
        ensure_len(data, Self::SIZE, "CAN FD frame")?;

        Ok(CanFdFrame {
            id: CanId::from_raw(u32::from_ne_bytes(array_at(data, 0)?)),
            len: data[4],
            flags: data[5],
            res0: data[6],
            res1: data[7],
            data: array_at(data, 8)?,
        })
    }

    /// Encode to exactly 72 bytes
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(Self::SIZE);
        buf.put_slice(&self.id.raw().to_ne_bytes());
        buf.put_u8(self.len);
        buf.put_u8(self.flags);
        buf.put_u8(self.res0);
        buf.put_u8(self.res1);
        buf.put_slice(&self.data);
        buf.to_vec()
    }

    pub fn data(&self) -> &[u8] {
        &self.data[..(self.len as usize).min(Self::DATA_LEN)]
    }

    pub fn bit_rate_switch(&self) -> bool {
        self.flags & Self::FLAG_BRS != 0
    }

    pub fn error_state(&self) -> bool {
        self.flags & Self::FLAG_ESI != 0
    }
}

impl fmt::Display for CanFdFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}##{:X}", self.id, self.flags & 0x0F)?;
        fmt_payload(f, self.data())
    }
}
