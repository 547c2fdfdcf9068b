use std::net::Ipv4Addr;
use std::time::{SystemTime, UNIX_EPOCH};

use bincode::Options;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::checksum;

/// Protocol number of ICMP in the IPv4 header
pub const ICMP_PROTOCOL: u8 = 1;

pub const ECHO_REQUEST_V4: u8 = 8;
pub const ECHO_REPLY_V4: u8 = 0;

pub const IP_HEADER_SIZE: usize = 20;
pub const ICMP_HEADER_SIZE: usize = 8;
pub const TIMESTAMP_SIZE: usize = 8;

/// Anything shorter cannot carry the send timestamp, so no RTT can be derived from it
pub const MIN_ICMP_SIZE: usize = ICMP_HEADER_SIZE + TIMESTAMP_SIZE;

/// 56 data bytes + 8 byte header = 64 byte probes
pub const DEFAULT_PAYLOAD_SIZE: usize = 56;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("malformed packet: {0}")]
    MalformedPacket(&'static str),
    #[error("icmp message too short ({0} bytes)")]
    TooShort(usize),
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ICMPEchoPacket {
    pub message_type: u8,
    pub message_code: u8,
    pub checksum: u16,
    pub identifier: u16,
    pub sequence_num: u16,
}

#[derive(Deserialize)]
pub struct IPv4Header {
    pub version_and_header_len: u8,
    pub type_of_service: u8,
    pub datagram_length: u16,
    pub ip_identifier: u16,
    pub flags_and_5frag_offset: u8, // flags are u3
    pub rest_of_frag_offset: u8,
    pub ttl: u8,
    pub protocol: u8,
    pub checksum: u16,
    pub source_ip: u32,
    pub destination_ip: u32,
}

/// Wall clock time of transmission, carried in the first bytes of the echo payload
/// as seconds + microseconds since the epoch.
/// On the wire this is the 32-bit `timeval` layout in network byte order, not the host's native `timeval`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp {
    pub secs: u32,
    pub micros: u32,
}

impl Timestamp {
    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    pub fn from_system_time(time: SystemTime) -> Self {
        let since_epoch = time.duration_since(UNIX_EPOCH).unwrap_or_default();
        Timestamp {
            secs: since_epoch.as_secs() as u32,
            micros: since_epoch.subsec_micros(),
        }
    }

    fn as_micros(self) -> i64 {
        self.secs as i64 * 1_000_000 + self.micros as i64
    }

    /// Milliseconds (with sub-millisecond fraction) from `self` until `later`.
    /// Clock steps backwards yield 0 instead of a negative time.
    pub fn millis_until(self, later: Timestamp) -> f64 {
        let elapsed = later.as_micros() - self.as_micros();
        if elapsed < 0 {
            0.0
        } else {
            elapsed as f64 / 1000.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IcmpType {
    EchoReply,
    EchoRequest,
    Other(u8),
}

impl From<u8> for IcmpType {
    fn from(value: u8) -> Self {
        match value {
            ECHO_REPLY_V4 => IcmpType::EchoReply,
            ECHO_REQUEST_V4 => IcmpType::EchoRequest,
            other => IcmpType::Other(other),
        }
    }
}

/// Decoded view of a received IPv4 datagram. `payload` borrows everything
/// following the (possibly option-extended) header.
#[derive(Debug)]
pub struct IpDatagram<'a> {
    pub protocol: u8,
    pub header_len: usize,
    pub total_len: u16,
    pub ttl: u8,
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
    pub payload: &'a [u8],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IcmpView {
    pub icmp_type: IcmpType,
    pub code: u8,
    pub checksum: u16,
    pub identifier: u16,
    pub sequence: u16,
    pub sent: Timestamp,
    pub len: usize,
}

// Network byte order, fixed width integers, headers are read from the front of longer buffers
fn coder() -> impl Options {
    bincode::DefaultOptions::new()
        .with_big_endian()
        .with_fixint_encoding()
        .allow_trailing_bytes()
}

/// Build an echo request stamped with the current time.
pub fn encode_echo_request(identifier: u16, sequence: u16, payload_size: usize) -> bincode::Result<Vec<u8>> {
    encode_echo_request_at(identifier, sequence, payload_size, Timestamp::now())
}

/// Build an echo request of `ICMP_HEADER_SIZE + payload_size` bytes whose payload starts
/// with `sent` and is zero filled after it. Payloads too small for the timestamp are left all zero.
pub fn encode_echo_request_at(identifier: u16, sequence: u16, payload_size: usize, sent: Timestamp) -> bincode::Result<Vec<u8>> {
    let mut packet = vec![0; ICMP_HEADER_SIZE + payload_size];

    let header = ICMPEchoPacket {
        message_type: ECHO_REQUEST_V4,
        message_code: 0,
        checksum: 0,
        identifier,
        sequence_num: sequence,
    };
    coder().serialize_into(&mut packet[..], &header)?;

    if payload_size >= TIMESTAMP_SIZE {
        coder().serialize_into(&mut packet[ICMP_HEADER_SIZE..], &sent)?;
    }

    checksum::set_checksum(&mut packet, 1);
    Ok(packet)
}

pub fn decode_ip_datagram(bytes: &[u8]) -> Result<IpDatagram<'_>, DecodeError> {
    if bytes.len() < IP_HEADER_SIZE {
        return Err(DecodeError::MalformedPacket("shorter than an ipv4 header"));
    }

    let header: IPv4Header = coder()
        .deserialize(bytes)
        .map_err(|_| DecodeError::MalformedPacket("unreadable ipv4 header"))?;

    // Get the 'header length' portion of the u8, which is encoded as u8/4 (bits/32)
    let header_len = 4 * (header.version_and_header_len & 0x0F) as usize;
    if header_len < IP_HEADER_SIZE || header_len > bytes.len() {
        return Err(DecodeError::MalformedPacket("bad ipv4 header length"));
    }

    Ok(IpDatagram {
        protocol: header.protocol,
        header_len,
        total_len: header.datagram_length,
        ttl: header.ttl,
        source: Ipv4Addr::from(header.source_ip),
        destination: Ipv4Addr::from(header.destination_ip),
        payload: &bytes[header_len..],
    })
}

pub fn decode_icmp_message(bytes: &[u8]) -> Result<IcmpView, DecodeError> {
    if bytes.len() < MIN_ICMP_SIZE {
        return Err(DecodeError::TooShort(bytes.len()));
    }

    let header: ICMPEchoPacket = coder()
        .deserialize(bytes)
        .map_err(|_| DecodeError::TooShort(bytes.len()))?;
    let sent: Timestamp = coder()
        .deserialize(&bytes[ICMP_HEADER_SIZE..])
        .map_err(|_| DecodeError::TooShort(bytes.len()))?;

    Ok(IcmpView {
        icmp_type: IcmpType::from(header.message_type),
        code: header.message_code,
        checksum: header.checksum,
        identifier: header.identifier,
        sequence: header.sequence_num,
        sent,
        len: bytes.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::checksum;

    const T0: Timestamp = Timestamp { secs: 1_600_000_000, micros: 250_000 };

    fn ip_header(protocol: u8, ihl: u8, ttl: u8) -> Vec<u8> {
        let mut header = vec![0; (ihl as usize * 4).max(IP_HEADER_SIZE)];
        header[0] = 0x40 | ihl;
        header[8] = ttl;
        header[9] = protocol;
        header[12..16].copy_from_slice(&[10, 0, 0, 1]);
        header[16..20].copy_from_slice(&[10, 0, 0, 2]);
        header
    }

    #[test]
    fn echo_request_layout() {
        let packet = encode_echo_request_at(1234, 0, DEFAULT_PAYLOAD_SIZE, T0).unwrap();

        assert_eq!(packet.len(), 64);
        assert_eq!(packet[0], ECHO_REQUEST_V4);
        assert_eq!(packet[1], 0);
        assert_ne!(u16::from_be_bytes([packet[2], packet[3]]), 0);
        assert_eq!(u16::from_be_bytes([packet[4], packet[5]]), 1234);
        assert_eq!(u16::from_be_bytes([packet[6], packet[7]]), 0);
        assert_eq!(&packet[8..16], &coder().serialize(&T0).unwrap()[..]);
        assert!(packet[16..].iter().all(|&b| b == 0));
        assert_eq!(checksum(&packet), 0);
    }

    #[test]
    fn checksum_holds_for_odd_payloads() {
        for size in [0usize, 1, 7, 8, 9, 55, 57, 1000].iter() {
            let packet = encode_echo_request_at(0xBEEF, 0xFFFF, *size, T0).unwrap();
            assert_eq!(packet.len(), ICMP_HEADER_SIZE + size);
            assert_eq!(checksum(&packet), 0, "payload size {}", size);
        }
    }

    #[test]
    fn timestamp_is_network_order_secs_then_micros() {
        let packet = encode_echo_request_at(1, 2, 8, Timestamp { secs: 0x0102_0304, micros: 0x0005_0607 }).unwrap();
        assert_eq!(&packet[8..16], &[0x01, 0x02, 0x03, 0x04, 0x00, 0x05, 0x06, 0x07]);
    }

    #[test]
    fn tiny_payload_has_no_timestamp() {
        let packet = encode_echo_request_at(1, 2, 4, T0).unwrap();
        assert!(packet[ICMP_HEADER_SIZE..].iter().all(|&b| b == 0));
    }

    #[test]
    fn request_decodes_to_same_ids() {
        for &(ident, seq) in [(0u16, 0u16), (1234, 7), (0xFFFF, 0xFFFF), (42, 0x8000)].iter() {
            let packet = encode_echo_request_at(ident, seq, DEFAULT_PAYLOAD_SIZE, T0).unwrap();
            let view = decode_icmp_message(&packet).unwrap();

            assert_eq!(view.icmp_type, IcmpType::EchoRequest);
            assert_eq!(view.identifier, ident);
            assert_eq!(view.sequence, seq);
            assert_eq!(view.sent, T0);
            assert_eq!(view.len, 64);
        }
    }

    #[test]
    fn short_icmp_is_rejected() {
        let packet = encode_echo_request_at(1, 1, DEFAULT_PAYLOAD_SIZE, T0).unwrap();
        assert_eq!(decode_icmp_message(&packet[..15]), Err(DecodeError::TooShort(15)));
        assert!(decode_icmp_message(&packet[..16]).is_ok());
        assert_eq!(decode_icmp_message(&[]), Err(DecodeError::TooShort(0)));
    }

    #[test]
    fn ip_datagram_fields() {
        let mut bytes = ip_header(ICMP_PROTOCOL, 5, 57);
        bytes[2..4].copy_from_slice(&84u16.to_be_bytes());
        bytes.extend_from_slice(&encode_echo_request_at(9, 9, DEFAULT_PAYLOAD_SIZE, T0).unwrap());

        let datagram = decode_ip_datagram(&bytes).unwrap();
        assert_eq!(datagram.protocol, ICMP_PROTOCOL);
        assert_eq!(datagram.header_len, 20);
        assert_eq!(datagram.total_len, 84);
        assert_eq!(datagram.ttl, 57);
        assert_eq!(datagram.source, Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(datagram.destination, Ipv4Addr::new(10, 0, 0, 2));
        assert_eq!(datagram.payload.len(), 64);
    }

    #[test]
    fn ip_options_are_skipped() {
        let mut bytes = ip_header(ICMP_PROTOCOL, 6, 64);
        bytes.extend_from_slice(&[0xAA; 16]);

        let datagram = decode_ip_datagram(&bytes).unwrap();
        assert_eq!(datagram.header_len, 24);
        assert_eq!(datagram.payload, &[0xAA; 16][..]);
    }

    #[test]
    fn short_ip_datagram_is_rejected() {
        let bytes = ip_header(ICMP_PROTOCOL, 5, 64);
        assert!(matches!(decode_ip_datagram(&bytes[..19]), Err(DecodeError::MalformedPacket(_))));
        assert!(matches!(decode_ip_datagram(&[]), Err(DecodeError::MalformedPacket(_))));
    }

    #[test]
    fn bad_header_length_is_rejected() {
        let short_ihl = ip_header(ICMP_PROTOCOL, 4, 64);
        assert!(decode_ip_datagram(&short_ihl).is_err());

        let mut long = ip_header(ICMP_PROTOCOL, 5, 64);
        long[0] = 0x4F; // claims 60 bytes of header
        assert!(decode_ip_datagram(&long).is_err());
    }

    #[test]
    fn rtt_in_fractional_millis() {
        let later = Timestamp { secs: T0.secs + 1, micros: 1_500 };
        assert!((T0.millis_until(later) - 751.5).abs() < 1e-9);
        assert_eq!(later.millis_until(T0), 0.0);
        assert_eq!(T0.millis_until(T0), 0.0);
    }

    #[test]
    fn icmp_types() {
        assert_eq!(IcmpType::from(0), IcmpType::EchoReply);
        assert_eq!(IcmpType::from(8), IcmpType::EchoRequest);
        assert_eq!(IcmpType::from(11), IcmpType::Other(11));
    }
}
