//! rtnetlink sub-headers that precede the attribute list
//!
//! `struct ifinfomsg`, `struct ifaddrmsg` and `struct rtmsg` from
//! `linux/rtnetlink.h` / `linux/if_addr.h`, host byte order.

use bytes::{BufMut, BytesMut};
use wirefmt_core::{array_at, ensure_len, Error, Result};

use super::{
    RTM_DELADDR, RTM_DELLINK, RTM_DELROUTE, RTM_NEWADDR, RTM_NEWLINK, RTM_NEWROUTE,
};

/// Link sub-header (`struct ifinfomsg`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IfInfoMsg {
    pub family: u8,
    pub pad: u8,
    /// ARPHRD_* device type
    pub kind: u16,
    pub index: i32,
    /// IFF_* device flags
    pub flags: u32,
    /// Change mask for `flags`
    pub change: u32,
}

impl IfInfoMsg {
    pub const SIZE: usize = 16;

    pub fn decode(data: &[u8]) -> Result<Self> {
        ensure_len(data, Self::SIZE, "ifinfomsg")?;
        Ok(IfInfoMsg {
            family: data[0],
            pad: data[1],
            kind: u16::from_ne_bytes(array_at(data, 2)?),
            index: i32::from_ne_bytes(array_at(data, 4)?),
            flags: u32::from_ne_bytes(array_at(data, 8)?),
            change: u32::from_ne_bytes(array_at(data, 12)?),
        })
    }

    pub fn encode_into(&self, buf: &mut BytesMut) {
        buf.put_u8(self.family);
        buf.put_u8(self.pad);
        buf.put_slice(&self.kind.to_ne_bytes());
        buf.put_slice(&self.index.to_ne_bytes());
        buf.put_slice(&self.flags.to_ne_bytes());
        buf.put_slice(&self.change.to_ne_bytes());
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(Self::SIZE);
        self.encode_into(&mut buf);
        buf.to_vec()
    }
}

/// Address sub-header (`struct ifaddrmsg`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IfAddrMsg {
    pub family: u8,
    pub prefix_len: u8,
    pub flags: u8,
    pub scope: u8,
    pub index: u32,
}

impl IfAddrMsg {
    pub const SIZE: usize = 8;

    pub fn decode(data: &[u8]) -> Result<Self> {
        ensure_len(data, Self::SIZE, "ifaddrmsg")?;
        Ok(IfAddrMsg {
            family: data[0],
            prefix_len: data[1],
            flags: data[2],
            scope: data[3],
            index: u32::from_ne_bytes(array_at(data, 4)?),
        })
    }

    pub fn encode_into(&self, buf: &mut BytesMut) {
        buf.put_u8(self.family);
        buf.put_u8(self.prefix_len);
        buf.put_u8(self.flags);
        buf.put_u8(self.scope);
        buf.put_slice(&self.index.to_ne_bytes());
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(Self::SIZE);
        self.encode_into(&mut buf);
        buf.to_vec()
    }
}

/// Route sub-header (`struct rtmsg`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RtMsg {
    pub family: u8,
    pub dst_len: u8,
    pub src_len: u8,
    pub tos: u8,
    pub table: u8,
    pub protocol: u8,
    pub scope: u8,
    /// RTN_* route type
    pub kind: u8,
    pub flags: u32,
}

impl RtMsg {
    pub const SIZE: usize = 12;

    pub fn decode(data: &[u8]) -> Result<Self> {
        ensure_len(data, Self::SIZE, "rtmsg")?;
        Ok(RtMsg {
            family: data[0],
            dst_len: data[1],
            src_len: data[2],
            tos: data[3],
            table: data[4],
            protocol: data[5],
            scope: data[6],
            kind: data[7],
            flags: u32::from_ne_bytes(array_at(data, 8)?),
        })
    }

    pub fn encode_into(&self, buf: &mut BytesMut) {
        buf.put_slice(&[
            self.family,
            self.dst_len,
            self.src_len,
            self.tos,
            self.table,
            self.protocol,
            self.scope,
            self.kind,
        ]);
        buf.put_slice(&self.flags.to_ne_bytes());
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(Self::SIZE);
        self.encode_into(&mut buf);
        buf.to_vec()
    }
}

/// The sub-header a route message type carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteHeader {
    Link(IfInfoMsg),
    Address(IfAddrMsg),
    Route(RtMsg),
}

impl RouteHeader {
    /// Size of the sub-header for message type `kind`, i.e. where its
    /// attributes begin
    pub fn size_for(kind: u16) -> Result<usize> {
        match kind {
            RTM_NEWLINK | RTM_DELLINK => Ok(IfInfoMsg::SIZE),
            RTM_NEWADDR | RTM_DELADDR => Ok(IfAddrMsg::SIZE),
            RTM_NEWROUTE | RTM_DELROUTE => Ok(RtMsg::SIZE),
            other => Err(Error::UnsupportedMessageType(other)),
        }
    }

    /// Decode the sub-header at the start of a message payload
    pub fn decode(kind: u16, payload: &[u8]) -> Result<Self> {
        match kind {
            RTM_NEWLINK | RTM_DELLINK => Ok(RouteHeader::Link(IfInfoMsg::decode(payload)?)),
            RTM_NEWADDR | RTM_DELADDR => Ok(RouteHeader::Address(IfAddrMsg::decode(payload)?)),
            RTM_NEWROUTE | RTM_DELROUTE => Ok(RouteHeader::Route(RtMsg::decode(payload)?)),
            other => Err(Error::UnsupportedMessageType(other)),
        }
    }

    pub fn size(&self) -> usize {
        match self {
            RouteHeader::Link(_) => IfInfoMsg::SIZE,
            RouteHeader::Address(_) => IfAddrMsg::SIZE,
            RouteHeader::Route(_) => RtMsg::SIZE,
        }
    }

    pub fn encode_into(&self, buf: &mut BytesMut) {
        match self {
            RouteHeader::Link(info) => info.encode_into(buf),
            RouteHeader::Address(addr) => addr.encode_into(buf),
            RouteHeader::Route(route) => route.encode_into(buf),
        }
    }
}
