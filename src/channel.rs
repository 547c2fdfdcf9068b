use std::io::{self, Read};
use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Duration;

use socket2::{Domain, Protocol, SockAddr, Socket, Type};

/// Raw IP level handle used for both directions. Both operations take `&self`
/// so one handle can be shared between the transmit thread and the receive loop.
pub trait RawChannel {
    /// Write one ICMP message (no IP header) towards `dest`.
    fn send_to(&self, packet: &[u8], dest: Ipv4Addr) -> io::Result<usize>;

    /// Read one inbound datagram, IP header included, into `buf`.
    fn recv(&self, buf: &mut [u8]) -> io::Result<usize>;
}

/// `SOCK_RAW` / `IPPROTO_ICMP` socket. Opening one needs root or CAP_NET_RAW.
pub struct IcmpSocket {
    socket: Socket,
}

impl IcmpSocket {
    pub fn open(ttl: Option<u32>) -> io::Result<Self> {
        let socket = Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4))?;
        if let Some(ttl) = ttl {
            socket.set_ttl(ttl)?;
        }

        Ok(IcmpSocket { socket })
    }

    /// Bounds how long `recv` blocks; an expired wait surfaces as `WouldBlock`/`TimedOut`.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.socket.set_read_timeout(timeout)
    }
}

impl RawChannel for IcmpSocket {
    fn send_to(&self, packet: &[u8], dest: Ipv4Addr) -> io::Result<usize> {
        let addr = SockAddr::from(SocketAddrV4::new(dest, 0));
        self.socket.send_to(packet, &addr)
    }

    fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        (&self.socket).read(buf)
    }
}

/// Reads that ran into the socket timeout rather than failing.
pub fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}
