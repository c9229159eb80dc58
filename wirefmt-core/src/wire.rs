//! Byte-order and bounds primitives shared by every codec
//!
//! Decoders in this workspace never index into a caller buffer before one of
//! the checks here has confirmed the bytes exist.

use crate::error::{Error, Result};

/// Byte order used for a multi-byte field on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ByteOrderPolicy {
    /// Big-endian ("network byte order")
    #[default]
    Network,
    /// Whatever the host CPU uses
    Native,
}

impl ByteOrderPolicy {
    /// Read a 16-bit value
    pub fn read_u16(self, bytes: [u8; 2]) -> u16 {
        match self {
            ByteOrderPolicy::Network => u16::from_be_bytes(bytes),
            ByteOrderPolicy::Native => u16::from_ne_bytes(bytes),
        }
    }

    /// Write a 16-bit value
    pub fn write_u16(self, value: u16) -> [u8; 2] {
        match self {
            ByteOrderPolicy::Network => value.to_be_bytes(),
            ByteOrderPolicy::Native => value.to_ne_bytes(),
        }
    }
}

/// Netlink alignment unit
pub const ALIGNTO: usize = 4;

/// Round `len` up to the next multiple of 4.
pub const fn align4(len: usize) -> usize {
    align_to(len, ALIGNTO)
}

/// Round `len` up to the next multiple of `align` (a power of two).
pub const fn align_to(len: usize, align: usize) -> usize {
    (len + align - 1) & !(align - 1)
}

/// Fail with `TruncatedInput` unless `buf` holds at least `needed` bytes.
pub fn ensure_len(buf: &[u8], needed: usize, what: &'static str) -> Result<()> {
    if buf.len() < needed {
        return Err(Error::truncated(what, needed, buf.len()));
    }
    Ok(())
}

/// Copy `N` bytes starting at `offset` into an array.
pub fn array_at<const N: usize>(buf: &[u8], offset: usize) -> Result<[u8; N]> {
    let end = offset
        .checked_add(N)
        .ok_or_else(|| Error::truncated("field", usize::MAX, buf.len()))?;
    let slice = buf
        .get(offset..end)
        .ok_or_else(|| Error::truncated("field", end, buf.len()))?;
    let mut out = [0u8; N];
    out.copy_from_slice(slice);
    Ok(out)
}
