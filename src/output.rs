use std::fmt;

use colored::*;

use crate::receive::EchoReply;
use crate::resolve::Target;

/// First line printed once the target is resolved and the socket is open.
pub fn banner(target: &Target, payload_size: usize) -> String {
    format!("{} {} ({}): {} data bytes",
        "PING".cyan(), target.canonical_name.bold(), target.addr, payload_size)
}

impl fmt::Display for EchoReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} bytes from {}: icmp_seq={} ttl={} time={:.3} ms",
            self.size, self.source, self.sequence, self.ttl, self.rtt_ms)
    }
}
