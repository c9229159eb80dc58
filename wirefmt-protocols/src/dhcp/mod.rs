//! DHCPv4 (RFC 2131 / RFC 2132)
//!
//! - Option TLV list decoding and encoding, with typed constructors
//! - Typed interpretation of well-known options
//! - BOOTP fixed portion with magic cookie

pub mod options;
pub mod packet;

pub use options::{
    decode_options, encode_options, option_iter, DhcpMessageType, DhcpOption, DhcpOptionValue,
    OptionCode,
};
pub use packet::DhcpPacket;
