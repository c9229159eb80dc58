//! Netlink message framing
//!
//! A stream is a run of `[nlmsghdr][payload]` records, each starting on a
//! 4-byte boundary. [`NetlinkMessages`] walks a stream and reports how it
//! ended through [`StreamState`].

use bytes::{BufMut, BytesMut};
use tracing::{debug, trace};
use wirefmt_core::{align4, array_at, ensure_len, Error, Result};

use super::attr::{decode_attributes, encode_attributes, Attribute};
use super::route::RouteHeader;
use super::{NLMSG_DONE, NLMSG_ERROR};

/// Netlink message header (`struct nlmsghdr`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NlMsgHeader {
    /// Length including this header, excluding trailing padding
    pub len: u32,
    pub kind: u16,
    pub flags: u16,
    pub seq: u32,
    pub pid: u32,
}

impl NlMsgHeader {
    pub const SIZE: usize = 16;

    pub fn decode(data: &[u8]) -> Result<Self> {
        ensure_len(data, Self::SIZE, "netlink message header")?;
        Ok(NlMsgHeader {
            len: u32::from_ne_bytes(array_at(data, 0)?),
            kind: u16::from_ne_bytes(array_at(data, 4)?),
            flags: u16::from_ne_bytes(array_at(data, 6)?),
            seq: u32::from_ne_bytes(array_at(data, 8)?),
            pid: u32::from_ne_bytes(array_at(data, 12)?),
        })
    }

    pub fn encode_into(&self, buf: &mut BytesMut) {
        buf.put_slice(&self.len.to_ne_bytes());
        buf.put_slice(&self.kind.to_ne_bytes());
        buf.put_slice(&self.flags.to_ne_bytes());
        buf.put_slice(&self.seq.to_ne_bytes());
        buf.put_slice(&self.pid.to_ne_bytes());
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(Self::SIZE);
        self.encode_into(&mut buf);
        buf.to_vec()
    }
}

/// Payload of an `NLMSG_ERROR` message (`struct nlmsgerr`).
///
/// `error` is a negative errno, or 0 for an acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NlMsgErr {
    pub error: i32,
    /// Header of the request that caused the error
    pub msg: NlMsgHeader,
}

impl NlMsgErr {
    pub const SIZE: usize = 4 + NlMsgHeader::SIZE;

    pub fn decode(data: &[u8]) -> Result<Self> {
        ensure_len(data, Self::SIZE, "netlink error message")?;
        Ok(NlMsgErr {
            error: i32::from_ne_bytes(array_at(data, 0)?),
            msg: NlMsgHeader::decode(&data[4..])?,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(Self::SIZE);
        buf.put_slice(&self.error.to_ne_bytes());
        self.msg.encode_into(&mut buf);
        buf.to_vec()
    }

    pub fn is_ack(&self) -> bool {
        self.error == 0
    }
}

/// One framed message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetlinkMessage {
    pub header: NlMsgHeader,
    pub payload: Vec<u8>,
}

impl NetlinkMessage {
    /// Message with `len` computed from the payload
    pub fn new(kind: u16, flags: u16, seq: u32, pid: u32, payload: Vec<u8>) -> Self {
        NetlinkMessage {
            header: NlMsgHeader {
                len: frame_len(payload.len()),
                kind,
                flags,
                seq,
                pid,
            },
            payload,
        }
    }

    /// Route message built from a sub-header and its attributes
    pub fn with_route_attributes(
        kind: u16,
        flags: u16,
        seq: u32,
        pid: u32,
        sub_header: &RouteHeader,
        attrs: &[Attribute],
    ) -> Result<Self> {
        // rejects kinds with no sub-header, and mismatched pairs
        if RouteHeader::size_for(kind)? != sub_header.size() {
            return Err(Error::invalid_construction(format!(
                "sub-header {:?} does not belong to message type {}",
                sub_header, kind
            )));
        }

        let attrs = encode_attributes(attrs)?;
        let mut payload = BytesMut::with_capacity(sub_header.size() + attrs.len());
        sub_header.encode_into(&mut payload);
        payload.put_slice(&attrs);
        Ok(Self::new(kind, flags, seq, pid, payload.to_vec()))
    }

    /// Header followed by the payload; `len` is recomputed and no trailing
    /// padding is written
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(NlMsgHeader::SIZE + self.payload.len());
        NlMsgHeader {
            len: frame_len(self.payload.len()),
            ..self.header
        }
        .encode_into(&mut buf);
        buf.put_slice(&self.payload);
        buf.to_vec()
    }

    pub fn is_done(&self) -> bool {
        self.header.kind == NLMSG_DONE
    }

    pub fn is_error(&self) -> bool {
        self.header.kind == NLMSG_ERROR
    }

    /// Decoded `nlmsgerr` for `NLMSG_ERROR` messages, `None` otherwise
    pub fn error(&self) -> Result<Option<NlMsgErr>> {
        if !self.is_error() {
            return Ok(None);
        }
        NlMsgErr::decode(&self.payload).map(Some)
    }

    /// Sub-header and attribute list of a link, address or route message.
    ///
    /// Fails with `UnsupportedMessageType` for any other message type.
    pub fn route_attributes(&self) -> Result<(RouteHeader, Vec<Attribute>)> {
        let sub_header = RouteHeader::decode(self.header.kind, &self.payload)?;
        let attrs = self.payload.get(sub_header.size()..).unwrap_or(&[]);
        Ok((sub_header, decode_attributes(attrs)?))
    }
}

fn frame_len(payload_len: usize) -> u32 {
    u32::try_from(NlMsgHeader::SIZE + payload_len).unwrap_or(u32::MAX)
}

/// Where a stream walk stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// More messages may follow
    HasMessage,
    /// A header declared an impossible length; the rest was dropped
    Truncated,
    /// Fewer bytes than a header remain
    Done,
}

/// Iterator over the messages in a stream
#[derive(Debug, Clone)]
pub struct NetlinkMessages<'a> {
    buf: &'a [u8],
    offset: usize,
    state: StreamState,
}

impl<'a> NetlinkMessages<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        NetlinkMessages {
            buf,
            offset: 0,
            state: StreamState::HasMessage,
        }
    }

    /// `Done` or `Truncated` once the iterator has returned `None`
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Offset of the next message
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl<'a> Iterator for NetlinkMessages<'a> {
    type Item = NetlinkMessage;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state != StreamState::HasMessage {
            return None;
        }

        let rest = self.buf.get(self.offset..).unwrap_or(&[]);
        if rest.len() < NlMsgHeader::SIZE {
            self.state = StreamState::Done;
            return None;
        }

        let header = match NlMsgHeader::decode(rest) {
            Ok(header) => header,
            Err(_) => {
                self.state = StreamState::Done;
                return None;
            }
        };

        // `len <= rest.len()` first, so aligning it cannot overflow
        let len = header.len as usize;
        if len < NlMsgHeader::SIZE || len > rest.len() || align4(len) > rest.len() {
            debug!(
                offset = self.offset,
                len,
                remaining = rest.len(),
                "netlink stream truncated"
            );
            self.state = StreamState::Truncated;
            return None;
        }

        let payload = rest[NlMsgHeader::SIZE..len.min(rest.len())].to_vec();
        trace!(
            kind = header.kind,
            len,
            seq = header.seq,
            offset = self.offset,
            "decoded netlink message"
        );
        self.offset += align4(len);

        Some(NetlinkMessage { header, payload })
    }
}

/// Decode every message in `buf` and report how the stream ended
pub fn parse_stream(buf: &[u8]) -> (Vec<NetlinkMessage>, StreamState) {
    let mut messages = NetlinkMessages::new(buf);
    let decoded = messages.by_ref().collect();
    (decoded, messages.state())
}

/// Concatenate messages, padding each to a 4-byte boundary
pub fn encode_stream(messages: &[NetlinkMessage]) -> Vec<u8> {
    let mut buf = BytesMut::new();
    for message in messages {
        let encoded = message.encode();
        let padded = align4(encoded.len());
        buf.put_slice(&encoded);
        buf.put_bytes(0, padded - encoded.len());
    }
    buf.to_vec()
}
