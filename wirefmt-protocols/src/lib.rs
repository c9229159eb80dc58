//! Variable-length record codecs and netlink message framing
//!
//! This crate sits on top of the fixed headers in `wirefmt-packet`:
//!
//! - [`tlv`] - one bounds-checked type-length-value walker shared by every
//!   record format below
//! - [`dhcp`] - DHCP/BOOTP packets and their option list
//! - [`netlink`] - netlink message streams, rtnetlink sub-headers, attributes
//!   and CAN link configuration
//!
//! ## Example
//!
//! ```
//! use wirefmt_protocols::dhcp::{decode_options, DhcpMessageType, DhcpOptionValue};
//!
//! let opts = decode_options(&[53, 1, 1, 255]).unwrap();
//! assert_eq!(opts.len(), 1);
//! assert_eq!(
//!     opts[0].interpret(),
//!     DhcpOptionValue::MessageType(DhcpMessageType::Discover)
//! );
//! ```

pub mod dhcp;
pub mod netlink;
pub mod tlv;

pub use dhcp::{DhcpOption, DhcpPacket};
pub use netlink::{Attribute, NetlinkMessage, NlMsgHeader};
pub use tlv::{HeaderStep, TlvIter, TlvRecord, TlvRef};
pub use wirefmt_core::{Error, Result};
