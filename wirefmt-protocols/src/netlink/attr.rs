//! Netlink attributes: `[len:2][type:2][value]`, 4-byte aligned
//!
//! `len` counts the 4-byte header but not the trailing padding. A list has no
//! count or terminator; it ends when the enclosing buffer does.

use std::net::Ipv4Addr;

use bytes::{BufMut, BytesMut};
use wirefmt_core::{array_at, Error, Result};

use super::{NLA_F_NESTED, NLA_TYPE_MASK};
use crate::tlv::{decode_list, encode_list, HeaderStep, TlvIter, TlvRecord};

/// One attribute. `kind` keeps the nested / byte-order flag bits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Attribute {
    pub kind: u16,
    pub value: Vec<u8>,
}

impl Attribute {
    /// Attribute header size
    pub const HEADER_LEN: usize = 4;

    pub fn new(kind: u16, value: impl Into<Vec<u8>>) -> Self {
        Attribute {
            kind,
            value: value.into(),
        }
    }

    pub fn u8(kind: u16, value: u8) -> Self {
        Attribute::new(kind, vec![value])
    }

    pub fn u16(kind: u16, value: u16) -> Self {
        Attribute::new(kind, value.to_ne_bytes().to_vec())
    }

    pub fn u32(kind: u16, value: u32) -> Self {
        Attribute::new(kind, value.to_ne_bytes().to_vec())
    }

    /// NUL-terminated string, as the kernel expects for names and labels
    pub fn string(kind: u16, value: &str) -> Self {
        let mut bytes = Vec::with_capacity(value.len() + 1);
        bytes.extend_from_slice(value.as_bytes());
        bytes.push(0);
        Attribute::new(kind, bytes)
    }

    /// Attribute whose value is an encoded attribute list; sets `NLA_F_NESTED`
    pub fn nested(kind: u16, children: &[Attribute]) -> Result<Self> {
        Ok(Attribute::new(kind | NLA_F_NESTED, encode_attributes(children)?))
    }

    /// Type without the flag bits
    pub fn attr_type(&self) -> u16 {
        self.kind & NLA_TYPE_MASK
    }

    pub fn is_nested(&self) -> bool {
        self.kind & NLA_F_NESTED != 0
    }

    /// Encoded length including the header, excluding padding
    pub fn encoded_len(&self) -> usize {
        Self::HEADER_LEN + self.value.len()
    }

    fn exact<const N: usize>(&self) -> Result<[u8; N]> {
        if self.value.len() != N {
            return Err(Error::invalid_field(
                "netlink attribute value",
                format!(
                    "type {} holds {} bytes, expected {}",
                    self.attr_type(),
                    self.value.len(),
                    N
                ),
            ));
        }
        array_at(&self.value, 0)
    }

    pub fn as_u8(&self) -> Result<u8> {
        let [value] = self.exact::<1>()?;
        Ok(value)
    }

    pub fn as_u16(&self) -> Result<u16> {
        Ok(u16::from_ne_bytes(self.exact()?))
    }

    pub fn as_u32(&self) -> Result<u32> {
        Ok(u32::from_ne_bytes(self.exact()?))
    }

    /// Address attributes carry the four octets in network order
    pub fn as_ipv4(&self) -> Result<Ipv4Addr> {
        Ok(Ipv4Addr::from(self.exact::<4>()?))
    }

    /// String value with the trailing NUL (if any) removed
    pub fn as_str(&self) -> Result<&str> {
        let bytes = match self.value.iter().position(|&b| b == 0) {
            Some(nul) => &self.value[..nul],
            None => &self.value[..],
        };
        std::str::from_utf8(bytes)
            .map_err(|e| Error::invalid_field("netlink string attribute", e.to_string()))
    }

    /// Decode the value as a nested attribute list
    pub fn nested_attributes(&self) -> Result<Vec<Attribute>> {
        decode_attributes(&self.value)
    }
}

impl TlvRecord for Attribute {
    const HEADER_LEN: usize = 4;
    const ALIGN: usize = 4;
    const MAX_VALUE_LEN: usize = u16::MAX as usize - 4;

    fn kind(&self) -> u16 {
        self.kind
    }

    fn value(&self) -> &[u8] {
        &self.value
    }

    fn from_parts(kind: u16, value: &[u8]) -> Self {
        Attribute::new(kind, value)
    }

    fn read_header(rest: &[u8]) -> Result<HeaderStep> {
        let remaining = rest.len();
        if remaining < Self::HEADER_LEN {
            return Err(Error::InvalidAttribute {
                len: remaining,
                remaining,
            });
        }

        let len = u16::from_ne_bytes(array_at(rest, 0)?) as usize;
        if len < Self::HEADER_LEN || len > remaining {
            return Err(Error::InvalidAttribute { len, remaining });
        }

        Ok(HeaderStep::Entry {
            kind: u16::from_ne_bytes(array_at(rest, 2)?),
            value_len: len - Self::HEADER_LEN,
            header_len: Self::HEADER_LEN,
        })
    }

    fn write_header(&self, buf: &mut BytesMut) -> Result<()> {
        buf.put_slice(&(self.encoded_len() as u16).to_ne_bytes());
        buf.put_slice(&self.kind.to_ne_bytes());
        Ok(())
    }
}

/// Lazily walk an attribute list
pub fn attributes(buf: &[u8]) -> TlvIter<'_, Attribute> {
    TlvIter::new(buf)
}

/// Decode every attribute in `buf`
pub fn decode_attributes(buf: &[u8]) -> Result<Vec<Attribute>> {
    decode_list(buf)
}

/// Encode attributes in order, each padded to 4 bytes
pub fn encode_attributes(attrs: &[Attribute]) -> Result<Vec<u8>> {
    encode_list(attrs)
}

/// First attribute whose type (flags masked) is `kind`
pub fn find(attrs: &[Attribute], kind: u16) -> Option<&Attribute> {
    attrs.iter().find(|attr| attr.attr_type() == kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlink::{IFLA_IFNAME, IFLA_INFO_KIND, IFLA_LINKINFO, IFLA_MTU, NLA_F_NET_BYTEORDER};

    #[cfg(target_endian = "little")]
    #[test]
    fn test_decode_literal_attribute() {
        let bytes = [8, 0, 3, 0, 1, 2, 3, 4];
        let mut iter = attributes(&bytes);
        let attr = iter.next().unwrap().unwrap();
        assert_eq!(attr.kind, 3);
        assert_eq!(attr.value, &[1, 2, 3, 4]);
        assert!(iter.next().is_none());
        assert!(iter.remaining().is_empty());
    }

    #[test]
    fn test_padding_skipped() {
        let attrs = vec![
            Attribute::new(1, vec![0xAA]),
            Attribute::new(2, vec![0xBB, 0xCC]),
            Attribute::new(3, vec![1, 2, 3]),
            Attribute::new(4, vec![]),
        ];
        let bytes = encode_attributes(&attrs).unwrap();
        assert_eq!(bytes.len(), 8 + 8 + 8 + 4);
        assert_eq!(&bytes[0..2], &5u16.to_ne_bytes());
        assert_eq!(&bytes[5..8], &[0, 0, 0]);

        let mut iter = attributes(&bytes);
        let mut offsets = Vec::new();
        while let Some(attr) = iter.next() {
            attr.unwrap();
            offsets.push(iter.offset());
        }
        assert_eq!(offsets, vec![8, 16, 24, 28]);
        assert_eq!(decode_attributes(&bytes).unwrap(), attrs);
    }

    #[test]
    fn test_unpadded_last_attribute() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&5u16.to_ne_bytes());
        bytes.extend_from_slice(&7u16.to_ne_bytes());
        bytes.push(0x42);

        let attrs = decode_attributes(&bytes).unwrap();
        assert_eq!(attrs, vec![Attribute::new(7, vec![0x42])]);
    }

    #[test]
    fn test_invalid_lengths() {
        let mut short = Vec::new();
        short.extend_from_slice(&3u16.to_ne_bytes());
        short.extend_from_slice(&1u16.to_ne_bytes());
        assert_eq!(
            decode_attributes(&short).unwrap_err(),
            Error::InvalidAttribute {
                len: 3,
                remaining: 4
            }
        );

        let mut long = Vec::new();
        long.extend_from_slice(&12u16.to_ne_bytes());
        long.extend_from_slice(&1u16.to_ne_bytes());
        long.extend_from_slice(&[0; 4]);
        assert_eq!(
            decode_attributes(&long).unwrap_err(),
            Error::InvalidAttribute {
                len: 12,
                remaining: 8
            }
        );

        assert!(decode_attributes(&[0, 0]).unwrap_err().is_truncated());
    }

    #[test]
    fn test_typed_accessors() {
        assert_eq!(Attribute::u8(1, 7).as_u8().unwrap(), 7);
        assert_eq!(Attribute::u16(1, 0x1234).as_u16().unwrap(), 0x1234);
        assert_eq!(Attribute::u32(IFLA_MTU, 1500).as_u32().unwrap(), 1500);
        assert_eq!(Attribute::string(IFLA_IFNAME, "eth0").as_str().unwrap(), "eth0");
        assert_eq!(
            Attribute::new(1, vec![10, 0, 0, 1]).as_ipv4().unwrap(),
            Ipv4Addr::new(10, 0, 0, 1)
        );

        let err = Attribute::new(IFLA_MTU, vec![1, 2]).as_u32().unwrap_err();
        assert!(matches!(err, Error::InvalidField { .. }));
    }

    #[test]
    fn test_nested_and_find() {
        let inner = [Attribute::string(IFLA_INFO_KIND, "can")];
        let outer = Attribute::nested(IFLA_LINKINFO, &inner).unwrap();
        assert!(outer.is_nested());
        assert_eq!(outer.attr_type(), IFLA_LINKINFO);

        let attrs = vec![Attribute::u32(IFLA_MTU, 16), outer];
        let found = find(&attrs, IFLA_LINKINFO).unwrap();
        assert_eq!(found.nested_attributes().unwrap(), inner.to_vec());
        assert!(find(&attrs, IFLA_IFNAME).is_none());

        let flagged = Attribute::new(IFLA_MTU | NLA_F_NET_BYTEORDER, vec![]);
        assert_eq!(flagged.attr_type(), IFLA_MTU);
        assert!(!flagged.is_nested());
    }
}
