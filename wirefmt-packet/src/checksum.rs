//! Internet checksum (RFC 1071)
//!
//! The same one's-complement sum covers the IPv4 header and the TCP/UDP
//! segment. Assembling a transport pseudo-header is left to the caller: either
//! concatenate it in front of the segment, or accumulate both parts with
//! [`checksum_accumulate`] and join them with [`combine_checksums`].

/// Calculates the Internet Checksum as defined in RFC 1071.
///
/// The data is treated as a sequence of big-endian 16-bit words; a trailing
/// odd byte is padded with a zero low byte.
///
/// # Examples
///
/// ```
/// use wirefmt_packet::checksum::internet_checksum;
///
/// let data = [0x45, 0x00, 0x00, 0x3c];
/// let checksum = internet_checksum(&data);
/// assert_eq!(checksum, !0x453cu16);
/// ```
pub fn internet_checksum(data: &[u8]) -> u16 {
    !(checksum_accumulate(data) as u16)
}

/// Folded 16-bit one's-complement sum of `data`, not yet complemented.
pub fn checksum_accumulate(data: &[u8]) -> u32 {
    let mut sum: u32 = 0;

    let mut chunks = data.chunks_exact(2);
    for chunk in &mut chunks {
        sum += u16::from_be_bytes([chunk[0], chunk[1]]) as u32;
        // Keep the accumulator from overflowing on very large buffers
        if sum > 0xFFFF_0000 {
            sum = (sum & 0xFFFF) + (sum >> 16);
        }
    }

    if let Some(&byte) = chunks.remainder().first() {
        sum += (byte as u32) << 8;
    }

    fold(sum)
}

/// Join partial sums from [`checksum_accumulate`] and complement the result.
///
/// Every part except the last must cover an even number of bytes.
pub fn combine_checksums(parts: &[u32]) -> u16 {
    let sum = parts.iter().fold(0u32, |acc, part| fold(acc + fold(*part)));
    !(fold(sum) as u16)
}

/// Validates an Internet checksum.
///
/// A buffer that carries its own checksum sums to 0xFFFF, so the complement
/// is 0. An all-zero buffer sums to 0 and is rejected.
pub fn validate_checksum(data: &[u8]) -> bool {
    internet_checksum(data) == 0
}

fn fold(mut sum: u32) -> u32 {
    while (sum >> 16) != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    sum
}
