use std::io::{Error, ErrorKind, Result};
use std::net::Ipv4Addr;
use std::sync::Arc;

use crate::channel::RawChannel;
use crate::packet;

/// Process lifetime probe state: who we ping, how we tag our requests and
/// the next sequence number. Only the transmit side ever mutates it.
pub struct ProbeSession<C> {
    channel: Arc<C>,
    destination: Ipv4Addr,
    payload_size: usize,

    identifier: u16, // Used as 'identifier' word to match echo requests/replies
    sequence: u16,   // Next 'sequence number', starts at 0 and wraps
}

/// Low 16 bits of the process id, the traditional ping identifier.
pub fn process_identifier() -> u16 {
    std::process::id() as u16
}

impl<C: RawChannel> ProbeSession<C> {
    pub fn new(channel: Arc<C>, destination: Ipv4Addr, payload_size: usize) -> Self {
        Self::with_identifier(channel, destination, payload_size, process_identifier())
    }

    pub fn with_identifier(channel: Arc<C>, destination: Ipv4Addr, payload_size: usize, identifier: u16) -> Self {
        ProbeSession {
            channel,
            destination,
            payload_size,
            identifier,
            sequence: 0,
        }
    }

    pub fn identifier(&self) -> u16 {
        self.identifier
    }

    pub fn destination(&self) -> Ipv4Addr {
        self.destination
    }

    /// Sequence number the next `ping` will use.
    pub fn next_sequence(&self) -> u16 {
        self.sequence
    }

    // Sends out a ping, returns the icmp_seq (sequence num) used.
    // The sequence advances even when the send fails.
    pub fn ping(&mut self) -> Result<u16> {
        let sequence = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);

        let packet = packet::encode_echo_request(self.identifier, sequence, self.payload_size)
            .map_err(|e| Error::new(ErrorKind::InvalidData, e))?;
        self.channel.send_to(&packet, self.destination).map(|_| sequence)
    }
}
