use std::io::{Error, ErrorKind, Result};
use std::net::{Ipv4Addr, SocketAddr};

use dns_lookup::{getaddrinfo, AddrInfoHints};

/// Where the probes go, and the name the resolver gave it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub addr: Ipv4Addr,
    pub canonical_name: String,
}

/// IPv4-only lookup of `dest`, asking the resolver for the canonical name.
/// Literal addresses come back as themselves.
pub fn resolve_dest(dest: &str) -> Result<Target> {
    let hints = AddrInfoHints {
        socktype: 0,
        protocol: 0,
        address: libc::AF_INET,
        flags: libc::AI_CANONNAME,
    };

    let mut canonical_name = None;
    for info in getaddrinfo(Some(dest), None, Some(hints)).map_err(Error::from)? {
        let info = info?;
        // Only the first entry carries the canonical name
        if canonical_name.is_none() {
            canonical_name = info.canonname.clone();
        }

        if let SocketAddr::V4(addr) = info.sockaddr {
            return Ok(Target {
                addr: *addr.ip(),
                canonical_name: canonical_name.unwrap_or_else(|| dest.to_string()),
            });
        }
    }

    Err(Error::new(ErrorKind::NotFound, format!("no IPv4 address for {}", dest)))
}
