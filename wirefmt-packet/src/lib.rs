//! Fixed-width header codecs
//!
//! This crate converts between structured headers and their exact wire
//! layout for the link, network and transport layers:
//!
//! - **Ethernet II** headers with common EtherTypes
//! - **ARP** packets for Ethernet/IPv4, alone or inside an Ethernet frame
//! - **IPv4** headers with options, flag packing and header checksum
//! - **TCP** headers with options and control flags
//! - **UDP** headers
//! - **CAN / CAN FD** frames in the SocketCAN layout
//!
//! # Architecture
//!
//! - [`ethernet`] - Ethernet II header
//! - [`arp`] - ARP packet and ARP-over-Ethernet frame
//! - [`ip`] - IPv4 header
//! - [`tcp`] - TCP header
//! - [`udp`] - UDP header
//! - [`can`] - SocketCAN frames
//! - [`checksum`] - Internet checksum utilities
//!
//! Every header exposes `decode(&[u8])`, which reads from the start of the
//! buffer and ignores trailing bytes, and `encode()`, which produces exactly
//! the header's wire size. Decoders check the buffer length before touching
//! any field, so truncated input yields an error instead of a panic.
//!
//! # Example
//!
//! ```rust
//! use std::net::Ipv4Addr;
//! use wirefmt_core::{ByteOrderPolicy, MacAddr};
//! use wirefmt_packet::{EtherType, EthernetHeader, IpProtocol, Ipv4Header, UdpHeader};
//!
//! let eth = EthernetHeader::new(
//!     MacAddr::BROADCAST,
//!     MacAddr([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]),
//!     EtherType::IPv4,
//! );
//! let udp = UdpHeader::new(68, 67, 0);
//! let ip = Ipv4Header::new(
//!     Ipv4Addr::UNSPECIFIED,
//!     Ipv4Addr::BROADCAST,
//!     IpProtocol::UDP,
//!     UdpHeader::SIZE as u16,
//! )
//! .with_checksum();
//!
//! let mut frame = eth.encode();
//! frame.extend(ip.encode_with(ByteOrderPolicy::Network).unwrap());
//! frame.extend(udp.encode());
//! assert_eq!(frame.len(), 14 + 20 + 8);
//! ```

pub mod arp;
pub mod can;
pub mod checksum;
pub mod ethernet;
pub mod ip;
pub mod tcp;
pub mod udp;

// Re-export commonly used types for convenience
pub use arp::{ArpFrame, ArpOperation, ArpPacket};
pub use can::{CanFdFrame, CanFrame, CanId};
pub use checksum::{checksum_accumulate, combine_checksums, internet_checksum, validate_checksum};
pub use ethernet::{EtherType, EthernetHeader};
pub use ip::{IpFlags, IpProtocol, Ipv4Header};
pub use tcp::{TcpFlags, TcpHeader};
pub use udp::UdpHeader;
