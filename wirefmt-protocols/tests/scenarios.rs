//! End-to-end decoding of captured-style buffers across both codec crates

use std::net::Ipv4Addr;

use wirefmt_core::{MacAddr, Result};
use wirefmt_packet::{
    ArpFrame, ArpOperation, ArpPacket, EtherType, EthernetHeader, IpProtocol, Ipv4Header,
    TcpFlags, TcpHeader, UdpHeader,
};
use wirefmt_protocols::dhcp::{
    decode_options, option_iter, DhcpMessageType, DhcpOption, DhcpOptionValue, DhcpPacket,
    OptionCode,
};
use wirefmt_protocols::netlink::can::{can_link_data, CanBitTiming, CanLinkAttribute};
use wirefmt_protocols::netlink::{
    attributes, encode_stream, parse_stream, Attribute, IfInfoMsg, NetlinkMessage, NlMsgHeader,
    RouteHeader, StreamState, IFLA_IFNAME, IFLA_INFO_DATA, IFLA_INFO_KIND, IFLA_LINKINFO,
    NLMSG_DONE, NLM_F_MULTI, RTM_NEWLINK,
};

#[test]
fn arp_request_roundtrip() {
    let sender = MacAddr::new([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);
    let mut bytes = vec![0x00, 0x01, 0x08, 0x00, 6, 4, 0x00, 0x01];
    bytes.extend_from_slice(&sender.octets());
    bytes.extend_from_slice(&[10, 0, 0, 1]);
    bytes.extend_from_slice(&[0; 6]);
    bytes.extend_from_slice(&[10, 0, 0, 2]);

    let arp = ArpPacket::decode(&bytes).unwrap();
    assert_eq!(arp.op(), Some(ArpOperation::Request));
    assert_eq!(arp.sender_hw_addr, sender);
    assert_eq!(arp.sender_proto_addr, Ipv4Addr::new(10, 0, 0, 1));
    assert_eq!(arp.target_proto_addr, Ipv4Addr::new(10, 0, 0, 2));
    assert_eq!(arp.encode(), bytes);

    let frame = ArpFrame::request(sender, arp.sender_proto_addr, arp.target_proto_addr);
    let decoded = ArpFrame::decode(&frame.encode()).unwrap();
    assert_eq!(decoded.ethernet.ethertype, EtherType::ARP);
    assert_eq!(decoded.arp, arp);
}

#[test]
fn dhcp_message_type_then_end() {
    let bytes = [53, 1, 1, 255];
    let mut iter = option_iter(&bytes);
    let entry = iter.next().unwrap().unwrap();
    assert_eq!(entry.kind, 53);
    assert_eq!(entry.value, &[1]);
    assert!(iter.next().is_none());
    assert!(iter.terminated());

    let opts = decode_options(&bytes).unwrap();
    assert_eq!(
        opts[0].interpret(),
        DhcpOptionValue::MessageType(DhcpMessageType::Discover)
    );
}

#[test]
fn netlink_two_bare_headers() {
    let header = NlMsgHeader {
        len: 16,
        kind: NLMSG_DONE,
        flags: NLM_F_MULTI,
        seq: 1,
        pid: 0,
    };
    let mut bytes = header.encode();
    bytes.extend_from_slice(&header.encode());

    let (messages, state) = parse_stream(&bytes);
    assert_eq!(messages.len(), 2);
    assert!(messages.iter().all(|m| m.payload.is_empty() && m.is_done()));
    assert_eq!(state, StreamState::Done);
}

#[cfg(target_endian = "little")]
#[test]
fn netlink_attribute_literal() {
    let bytes = [8, 0, 3, 0, 1, 2, 3, 4];
    let mut iter = attributes(&bytes);
    let attr = iter.next().unwrap().unwrap();
    assert_eq!(attr.kind, 3);
    assert_eq!(attr.value, &[1, 2, 3, 4]);
    assert!(iter.next().is_none());
    assert_eq!(iter.remaining().len(), 0);
}

#[test]
fn tcp_syn_ack_word() {
    let mut bytes = vec![0u8; 20];
    bytes[12] = 0x50;
    bytes[13] = 0x12;

    let tcp = TcpHeader::decode(&bytes).unwrap();
    assert_eq!(tcp.flags, TcpFlags::SYN_ACK);
    assert!(tcp.flags.syn && tcp.flags.ack);
    assert!(!(tcp.flags.urg || tcp.flags.psh || tcp.flags.rst || tcp.flags.fin));
    assert_eq!(tcp.data_offset(), 5);

    let encoded = tcp.encode().unwrap();
    assert_eq!(encoded[12] >> 4, 5);
    assert_eq!(encoded, bytes);
}

#[test]
fn dhcp_discover_in_udp_in_ipv4() -> Result<()> {
    let client = MacAddr::new([0x02, 0, 0, 0, 0, 0x01]);
    let mut discover = DhcpPacket::new_discover(0xdead_beef, client);
    discover
        .options
        .push(DhcpOption::string(OptionCode::Hostname, "client1"));
    let dhcp = discover.encode()?;

    let udp = UdpHeader::new(68, 67, dhcp.len() as u16);
    let ip = Ipv4Header::new(
        Ipv4Addr::UNSPECIFIED,
        Ipv4Addr::BROADCAST,
        IpProtocol::UDP,
        (UdpHeader::SIZE + dhcp.len()) as u16,
    )
    .with_checksum();
    let eth = EthernetHeader::new(MacAddr::BROADCAST, client, EtherType::IPv4);

    let mut frame = eth.encode();
    frame.extend_from_slice(&ip.encode()?);
    frame.extend_from_slice(&udp.encode());
    frame.extend_from_slice(&dhcp);

    let eth = EthernetHeader::decode(&frame)?;
    assert_eq!(eth.ethertype, EtherType::IPv4);
    let rest = &frame[EthernetHeader::SIZE..];
    let ip = Ipv4Header::decode(rest)?;
    assert_eq!(ip.protocol, IpProtocol::UDP);
    let rest = &rest[ip.header_len()..];
    let udp = UdpHeader::decode(rest)?;
    assert_eq!(udp.destination_port, 67);
    let packet = DhcpPacket::decode(&rest[UdpHeader::SIZE..][..udp.payload_len()])?;

    assert_eq!(packet.xid, 0xdead_beef);
    assert_eq!(packet.client_mac(), client);
    assert_eq!(packet.message_type(), Some(DhcpMessageType::Discover));
    assert_eq!(
        packet.option(OptionCode::Hostname).map(DhcpOption::interpret),
        Some(DhcpOptionValue::Text("client1".to_string()))
    );
    Ok(())
}

#[test]
fn can_link_dump() -> Result<()> {
    let timing = CanBitTiming {
        bitrate: 250_000,
        sample_point: 875,
        ..Default::default()
    };
    let linkinfo = Attribute::nested(
        IFLA_LINKINFO,
        &[
            Attribute::string(IFLA_INFO_KIND, "can"),
            Attribute::nested(
                IFLA_INFO_DATA,
                &[CanLinkAttribute::BitTiming(timing).to_attribute()],
            )?,
        ],
    )?;
    let link = NetlinkMessage::with_route_attributes(
        RTM_NEWLINK,
        NLM_F_MULTI,
        7,
        0,
        &RouteHeader::Link(IfInfoMsg {
            kind: 280,
            index: 4,
            ..Default::default()
        }),
        &[Attribute::string(IFLA_IFNAME, "can0"), linkinfo],
    )?;
    let done = NetlinkMessage::new(NLMSG_DONE, NLM_F_MULTI, 7, 0, Vec::new());
    let stream = encode_stream(&[link, done]);

    let (messages, state) = parse_stream(&stream);
    assert_eq!(state, StreamState::Done);
    assert_eq!(messages.len(), 2);

    let (sub_header, attrs) = messages[0].route_attributes()?;
    assert!(matches!(sub_header, RouteHeader::Link(info) if info.index == 4));
    assert_eq!(attrs[0].as_str()?, "can0");
    let settings = can_link_data(&attrs)?.unwrap_or_default();
    assert_eq!(settings, vec![CanLinkAttribute::BitTiming(timing)]);
    assert!(messages[1].is_done());
    Ok(())
}
