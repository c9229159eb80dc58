//! Example: Building a TCP SYN frame
//!
//! Encodes Ethernet, IPv4 and TCP headers one after another, fills in the
//! TCP checksum over the pseudo-header, then decodes the frame again.

use std::net::Ipv4Addr;
use wirefmt_core::{ByteOrderPolicy, MacAddr};
use wirefmt_packet::{
    checksum_accumulate, combine_checksums, validate_checksum, EtherType, EthernetHeader,
    IpProtocol, Ipv4Header, TcpFlags, TcpHeader,
};

fn main() -> wirefmt_core::Result<()> {
    let src_mac = MacAddr([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
    let dst_mac = MacAddr([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
    let src_ip = Ipv4Addr::new(192, 168, 1, 100);
    let dst_ip = Ipv4Addr::new(192, 168, 1, 1);

    let mut tcp = TcpHeader::new(54321, 80, 1000, 0, TcpFlags::SYN, 65535);
    tcp.options = vec![0x02, 0x04, 0x05, 0xB4]; // MSS 1460
    let tcp_len = tcp.header_len() as u16;

    // Pseudo-header: src, dst, zero, protocol, TCP length
    let mut pseudo = Vec::with_capacity(12);
    pseudo.extend_from_slice(&src_ip.octets());
    pseudo.extend_from_slice(&dst_ip.octets());
    pseudo.push(0);
    pseudo.push(IpProtocol::TCP.to_u8());
    pseudo.extend_from_slice(&tcp_len.to_be_bytes());

    tcp.checksum = combine_checksums(&[
        checksum_accumulate(&pseudo),
        checksum_accumulate(&tcp.encode()?),
    ]);

    let ip = Ipv4Header::new(src_ip, dst_ip, IpProtocol::TCP, tcp_len).with_checksum();
    let eth = EthernetHeader::new(dst_mac, src_mac, EtherType::IPv4);

    let mut frame = eth.encode();
    frame.extend(ip.encode_with(ByteOrderPolicy::Network)?);
    frame.extend(tcp.encode()?);

    println!("TCP SYN frame: {} bytes", frame.len());

    let ip_start = EthernetHeader::SIZE;
    let decoded_ip = Ipv4Header::decode_with(&frame[ip_start..], ByteOrderPolicy::Network)?;
    let tcp_start = ip_start + decoded_ip.header_len();
    let decoded_tcp = TcpHeader::decode(&frame[tcp_start..])?;

    println!("  {} -> {}", decoded_ip.source, decoded_ip.destination);
    println!(
        "  IP header checksum valid: {}",
        validate_checksum(&frame[ip_start..tcp_start])
    );
    println!(
        "  ports {} -> {}, SYN set: {}, data offset {}",
        decoded_tcp.source_port,
        decoded_tcp.destination_port,
        decoded_tcp.flags.syn,
        decoded_tcp.data_offset()
    );

    Ok(())
}
