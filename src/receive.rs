use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use log::{trace, warn};
use thiserror::Error;

use crate::channel::{is_timeout, RawChannel};
use crate::packet::{self, DecodeError, IcmpType, Timestamp};

/// Largest possible IPv4 datagram
const RECV_BUFFER_SIZE: usize = 65535;

/// An echo reply addressed to this process, with its round trip time.
#[derive(Debug, Clone, PartialEq)]
pub struct EchoReply {
    pub size: usize, // ICMP bytes, IP header excluded
    pub source: Ipv4Addr,
    pub identifier: u16,
    pub sequence: u16,
    pub ttl: u8,
    pub rtt_ms: f64,
}

/// Why an inbound datagram was not reported.
#[derive(Debug, Error, PartialEq)]
pub enum Rejection {
    #[error("{0}")]
    Malformed(DecodeError),
    #[error("ip protocol {0} is not icmp")]
    NotIcmp(u8),
    #[error("{0}")]
    TooShort(DecodeError),
    #[error("icmp type {0:?} is not an echo reply")]
    NotEchoReply(IcmpType),
    #[error("identifier {0} belongs to someone else")]
    ForeignIdentifier(u16),
}

/// Run one received datagram through the reply filter. Replies are matched on
/// `identifier` alone; sequence number and source are reported, never checked.
pub fn process_datagram(datagram: &[u8], identifier: u16, now: Timestamp) -> Result<EchoReply, Rejection> {
    let ip = packet::decode_ip_datagram(datagram).map_err(Rejection::Malformed)?;
    if ip.protocol != packet::ICMP_PROTOCOL {
        return Err(Rejection::NotIcmp(ip.protocol));
    }

    let icmp = packet::decode_icmp_message(ip.payload).map_err(Rejection::TooShort)?;
    if icmp.icmp_type != IcmpType::EchoReply {
        return Err(Rejection::NotEchoReply(icmp.icmp_type));
    }
    if icmp.identifier != identifier {
        return Err(Rejection::ForeignIdentifier(icmp.identifier));
    }

    Ok(EchoReply {
        size: icmp.len,
        source: ip.source,
        identifier: icmp.identifier,
        sequence: icmp.sequence,
        ttl: ip.ttl,
        rtt_ms: icmp.sent.millis_until(now),
    })
}

/// Read datagrams until `running` is cleared, handing every reply that belongs
/// to `identifier` to `on_reply`. Everything else is dropped without fuss.
/// A failed read is retried only after `retry_pause`.
pub fn receive_loop<C, F>(channel: &C, identifier: u16, running: &AtomicBool, retry_pause: Duration, mut on_reply: F)
where
    C: RawChannel + ?Sized,
    F: FnMut(EchoReply),
{
    let mut buf = vec![0u8; RECV_BUFFER_SIZE];

    while running.load(Ordering::SeqCst) {
        let len = match channel.recv(&mut buf) {
            Ok(len) => len,
            Err(ref e) if is_timeout(e) => continue,
            Err(e) => {
                warn!("Error receiving pong: {}", e);
                thread::sleep(retry_pause);
                continue;
            }
        };

        match process_datagram(&buf[..len], identifier, Timestamp::now()) {
            Ok(reply) => on_reply(reply),
            Err(reason) => trace!("dropped {} byte datagram: {}", len, reason),
        }
    }
}
