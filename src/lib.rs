//! ICMP echo probing over a raw IPv4 socket.
//!
//! A [`session::ProbeSession`] stamps each echo request with its send time and
//! writes it to a [`channel::RawChannel`] once per timer tick
//! ([`transmit::transmit_loop`]). [`receive::receive_loop`] reads everything the
//! raw socket sees, keeps the echo replies carrying our identifier and turns the
//! embedded timestamp into a round trip time.

pub mod channel;
pub mod checksum;
pub mod config;
pub mod logging;
pub mod output;
pub mod packet;
pub mod receive;
pub mod resolve;
pub mod session;
pub mod transmit;
