//! DHCP packet parsing and building
//!
//! BOOTP fixed portion (RFC 951 / RFC 2131) followed by the magic cookie and
//! the option list.

use std::net::Ipv4Addr;
use std::time::Duration;

use bytes::{BufMut, BytesMut};
use wirefmt_core::{array_at, ensure_len, Error, MacAddr, Result};

use super::options::{decode_options, encode_options, DhcpMessageType, DhcpOption, OptionCode};

/// DHCP magic cookie (99.130.83.99)
pub const DHCP_MAGIC_COOKIE: [u8; 4] = [99, 130, 83, 99];

/// DHCP server port
pub const DHCP_SERVER_PORT: u16 = 67;

/// DHCP client port
pub const DHCP_CLIENT_PORT: u16 = 68;

/// Broadcast flag value
pub const DHCP_BROADCAST_FLAG: u16 = 0x8000;

/// BOOTREQUEST opcode
pub const BOOTREQUEST: u8 = 1;

/// BOOTREPLY opcode
pub const BOOTREPLY: u8 = 2;

/// Ethernet hardware type
pub const HTYPE_ETHERNET: u8 = 1;

/// Ethernet hardware address length
pub const HLEN_ETHERNET: u8 = 6;

/// BOOTP fixed portion, cookie excluded
pub const BOOTP_HEADER_SIZE: usize = 236;

/// Fixed portion plus magic cookie; options start here
pub const DHCP_FIXED_SIZE: usize = BOOTP_HEADER_SIZE + 4;

/// DHCP Packet structure (RFC 2131)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DhcpPacket {
    /// Message op code / message type (1 = BOOTREQUEST, 2 = BOOTREPLY)
    pub op: u8,
    /// Hardware address type (1 = Ethernet)
    pub htype: u8,
    /// Hardware address length (6 for Ethernet)
    pub hlen: u8,
    /// Hops
    pub hops: u8,
    /// Transaction ID
    pub xid: u32,
    /// Seconds elapsed since client began address acquisition
    pub secs: u16,
    /// Flags (broadcast bit)
    pub flags: u16,
    /// Client IP address (if known)
    pub ciaddr: Ipv4Addr,
    /// Your (client) IP address
    pub yiaddr: Ipv4Addr,
    /// Server IP address
    pub siaddr: Ipv4Addr,
    /// Gateway IP address
    pub giaddr: Ipv4Addr,
    /// Client hardware address (16 bytes, but only first hlen bytes used)
    pub chaddr: [u8; 16],
    /// Server host name, NUL padded
    pub sname: [u8; 64],
    /// Boot file name, NUL padded
    pub file: [u8; 128],
    /// Options in wire order, Pad and End excluded
    pub options: Vec<DhcpOption>,
}

impl DhcpPacket {
    /// Create a new DHCP packet with default values
    pub fn new() -> Self {
        Self {
            op: BOOTREQUEST,
            htype: HTYPE_ETHERNET,
            hlen: HLEN_ETHERNET,
            hops: 0,
            xid: 0,
            secs: 0,
            flags: 0,
            ciaddr: Ipv4Addr::UNSPECIFIED,
            yiaddr: Ipv4Addr::UNSPECIFIED,
            siaddr: Ipv4Addr::UNSPECIFIED,
            giaddr: Ipv4Addr::UNSPECIFIED,
            chaddr: [0; 16],
            sname: [0; 64],
            file: [0; 128],
            options: Vec::new(),
        }
    }

    fn request_from(xid: u32, chaddr: MacAddr) -> Self {
        let mut packet = Self::new();
        packet.xid = xid;
        packet.chaddr[..6].copy_from_slice(chaddr.as_bytes());
        packet
    }

    /// Create a DHCP DISCOVER packet
    pub fn new_discover(xid: u32, chaddr: MacAddr) -> Self {
        let mut packet = Self::request_from(xid, chaddr);
        packet.flags = DHCP_BROADCAST_FLAG;
        packet.options = vec![
            DhcpOption::message_type(DhcpMessageType::Discover),
            DhcpOption::parameter_request_list(&[
                OptionCode::SubnetMask as u8,
                OptionCode::Router as u8,
                OptionCode::DnsServer as u8,
                OptionCode::DomainName as u8,
            ]),
        ];
        packet
    }

    /// Create a DHCP REQUEST packet
    pub fn new_request(
        xid: u32,
        chaddr: MacAddr,
        requested_ip: Ipv4Addr,
        server_id: Ipv4Addr,
    ) -> Self {
        let mut packet = Self::request_from(xid, chaddr);
        packet.flags = DHCP_BROADCAST_FLAG;
        packet.options = vec![
            DhcpOption::message_type(DhcpMessageType::Request),
            DhcpOption::ipv4(OptionCode::RequestedIpAddress, requested_ip),
            DhcpOption::ipv4(OptionCode::ServerId, server_id),
        ];
        packet
    }

    /// Create a DHCP RELEASE packet
    pub fn new_release(
        xid: u32,
        chaddr: MacAddr,
        client_ip: Ipv4Addr,
        server_id: Ipv4Addr,
    ) -> Self {
        let mut packet = Self::request_from(xid, chaddr);
        packet.ciaddr = client_ip;
        packet.options = vec![
            DhcpOption::message_type(DhcpMessageType::Release),
            DhcpOption::ipv4(OptionCode::ServerId, server_id),
        ];
        packet
    }

    /// Create a DHCP INFORM packet
    pub fn new_inform(xid: u32, chaddr: MacAddr, client_ip: Ipv4Addr) -> Self {
        let mut packet = Self::request_from(xid, chaddr);
        packet.ciaddr = client_ip;
        packet.options = vec![DhcpOption::message_type(DhcpMessageType::Inform)];
        packet
    }

    /// Decode a packet; the option area runs to End or the end of `data`
    pub fn decode(data: &[u8]) -> Result<Self> {
        ensure_len(data, DHCP_FIXED_SIZE, "DHCP packet")?;

        let cookie: [u8; 4] = array_at(data, BOOTP_HEADER_SIZE)?;
        if cookie != DHCP_MAGIC_COOKIE {
            return Err(Error::invalid_field(
                "DHCP magic cookie",
                format!("found {:?}", cookie),
            ));
        }

        Ok(Self {
            op: data[0],
            htype: data[1],
            hlen: data[2],
            hops: data[3],
            xid: u32::from_be_bytes(array_at(data, 4)?),
            secs: u16::from_be_bytes(array_at(data, 8)?),
            flags: u16::from_be_bytes(array_at(data, 10)?),
            ciaddr: Ipv4Addr::from(array_at::<4>(data, 12)?),
            yiaddr: Ipv4Addr::from(array_at::<4>(data, 16)?),
            siaddr: Ipv4Addr::from(array_at::<4>(data, 20)?),
            giaddr: Ipv4Addr::from(array_at::<4>(data, 24)?),
            chaddr: array_at(data, 28)?,
            sname: array_at(data, 44)?,
            file: array_at(data, 108)?,
            options: decode_options(&data[DHCP_FIXED_SIZE..])?,
        })
    }

    /// Encode the packet with its options and a trailing End
    pub fn encode(&self) -> Result<Vec<u8>> {
        let options = encode_options(&self.options)?;
        let mut bytes = BytesMut::with_capacity(DHCP_FIXED_SIZE + options.len());

        bytes.put_u8(self.op);
        bytes.put_u8(self.htype);
        bytes.put_u8(self.hlen);
        bytes.put_u8(self.hops);

        bytes.put_u32(self.xid);
        bytes.put_u16(self.secs);
        bytes.put_u16(self.flags);

        bytes.put_slice(&self.ciaddr.octets());
        bytes.put_slice(&self.yiaddr.octets());
        bytes.put_slice(&self.siaddr.octets());
        bytes.put_slice(&self.giaddr.octets());

        bytes.put_slice(&self.chaddr);
        bytes.put_slice(&self.sname);
        bytes.put_slice(&self.file);

        bytes.put_slice(&DHCP_MAGIC_COOKIE);
        bytes.put_slice(&options);

        Ok(bytes.to_vec())
    }

    /// First option carrying `code`
    pub fn option(&self, code: impl Into<u8>) -> Option<&DhcpOption> {
        let code = code.into();
        self.options.iter().find(|opt| opt.code == code)
    }

    /// Get the message type from options
    pub fn message_type(&self) -> Option<DhcpMessageType> {
        match self.option(OptionCode::MessageType)?.value.as_slice() {
            [raw] => DhcpMessageType::from_u8(*raw),
            _ => None,
        }
    }

    /// Get server ID from options
    pub fn server_id(&self) -> Option<Ipv4Addr> {
        self.address_option(OptionCode::ServerId)
    }

    /// Get requested IP from options
    pub fn requested_ip(&self) -> Option<Ipv4Addr> {
        self.address_option(OptionCode::RequestedIpAddress)
    }

    /// Get lease time from options
    pub fn lease_time(&self) -> Option<Duration> {
        let raw: [u8; 4] = self
            .option(OptionCode::LeaseTime)?
            .value
            .as_slice()
            .try_into()
            .ok()?;
        Some(Duration::from_secs(u32::from_be_bytes(raw) as u64))
    }

    fn address_option(&self, code: OptionCode) -> Option<Ipv4Addr> {
        let raw: [u8; 4] = self.option(code)?.value.as_slice().try_into().ok()?;
        Some(Ipv4Addr::from(raw))
    }

    /// Get client MAC address
    pub fn client_mac(&self) -> MacAddr {
        let mut mac = [0u8; 6];
        mac.copy_from_slice(&self.chaddr[..6]);
        MacAddr(mac)
    }

    /// Server host name up to the first NUL
    pub fn server_name(&self) -> String {
        nul_trimmed(&self.sname)
    }

    /// Boot file name up to the first NUL
    pub fn boot_file(&self) -> String {
        nul_trimmed(&self.file)
    }
}

impl Default for DhcpPacket {
    fn default() -> Self {
        Self::new()
    }
}

fn nul_trimmed(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAC: MacAddr = MacAddr([0x11, 0x22, 0x33, 0x44, 0x55, 0x66]);

    #[test]
    fn test_dhcp_packet_new() {
        let packet = DhcpPacket::new();
        assert_eq!(packet.op, BOOTREQUEST);
        assert_eq!(packet.htype, HTYPE_ETHERNET);
        assert_eq!(packet.hlen, HLEN_ETHERNET);
        assert!(packet.options.is_empty());
    }

    #[test]
    fn test_dhcp_packet_new_discover() {
        let packet = DhcpPacket::new_discover(0x12345678, MAC);

        assert_eq!(packet.xid, 0x12345678);
        assert_eq!(packet.flags, DHCP_BROADCAST_FLAG);
        assert_eq!(packet.client_mac(), MAC);
        assert_eq!(packet.message_type(), Some(DhcpMessageType::Discover));
        assert!(packet.option(OptionCode::ParameterRequestList).is_some());
    }

    #[test]
    fn test_dhcp_packet_new_request() {
        let requested = Ipv4Addr::new(192, 168, 1, 100);
        let server = Ipv4Addr::new(192, 168, 1, 1);
        let packet = DhcpPacket::new_request(0x12345678, MAC, requested, server);

        assert_eq!(packet.message_type(), Some(DhcpMessageType::Request));
        assert_eq!(packet.requested_ip(), Some(requested));
        assert_eq!(packet.server_id(), Some(server));
    }

    #[test]
    fn test_dhcp_packet_new_release_and_inform() {
        let client_ip = Ipv4Addr::new(192, 168, 1, 100);
        let server = Ipv4Addr::new(192, 168, 1, 1);

        let release = DhcpPacket::new_release(1, MAC, client_ip, server);
        assert_eq!(release.ciaddr, client_ip);
        assert_eq!(release.message_type(), Some(DhcpMessageType::Release));
        assert_eq!(release.flags, 0);

        let inform = DhcpPacket::new_inform(2, MAC, client_ip);
        assert_eq!(inform.message_type(), Some(DhcpMessageType::Inform));
    }

    #[test]
    fn test_encode_layout() {
        let bytes = DhcpPacket::new_inform(0xAABBCCDD, MAC, Ipv4Addr::new(10, 0, 0, 5))
            .encode()
            .unwrap();

        assert_eq!(&bytes[0..4], &[BOOTREQUEST, 1, 6, 0]);
        assert_eq!(&bytes[4..8], &[0xAA, 0xBB, 0xCC, 0xDD]);
        assert_eq!(&bytes[12..16], &[10, 0, 0, 5]);
        assert_eq!(&bytes[28..34], MAC.as_bytes());
        assert_eq!(&bytes[236..240], &DHCP_MAGIC_COOKIE);
        assert_eq!(&bytes[240..], &[53, 1, 8, 255]);
    }

    #[test]
    fn test_dhcp_packet_roundtrip() {
        let mut packet = DhcpPacket::new_request(
            0x12345678,
            MAC,
            Ipv4Addr::new(192, 168, 1, 100),
            Ipv4Addr::new(192, 168, 1, 1),
        );
        packet.options.push(DhcpOption::string(OptionCode::Hostname, "testhost"));
        packet.options.push(DhcpOption::duration(
            OptionCode::LeaseTime,
            Duration::from_secs(3600),
        ));
        packet.sname[..4].copy_from_slice(b"boot");

        let parsed = DhcpPacket::decode(&packet.encode().unwrap()).unwrap();
        assert_eq!(parsed, packet);
        assert_eq!(parsed.lease_time(), Some(Duration::from_secs(3600)));
        assert_eq!(parsed.server_name(), "boot");
        assert_eq!(parsed.boot_file(), "");
    }

    #[test]
    fn test_decode_errors() {
        assert!(DhcpPacket::decode(&[0u8; 100]).unwrap_err().is_truncated());

        let mut bytes = DhcpPacket::new().encode().unwrap();
        bytes[236] = 0;
        assert!(matches!(
            DhcpPacket::decode(&bytes),
            Err(Error::InvalidField { .. })
        ));

        let mut bytes = DhcpPacket::new().encode().unwrap();
        bytes.truncate(DHCP_FIXED_SIZE);
        bytes.extend_from_slice(&[54, 4, 10, 0]);
        assert!(DhcpPacket::decode(&bytes).unwrap_err().is_truncated());
    }

    #[test]
    fn test_invalid_option_blocks_encode() {
        let mut packet = DhcpPacket::new();
        packet.options.push(DhcpOption::ipv4_list(OptionCode::Router, &[]));
        assert!(packet.encode().is_err());
    }

    #[test]
    fn test_dhcp_constants() {
        assert_eq!(DHCP_SERVER_PORT, 67);
        assert_eq!(DHCP_CLIENT_PORT, 68);
        assert_eq!(DHCP_FIXED_SIZE, 240);
        assert_eq!(BOOTREPLY, 2);
    }
}
