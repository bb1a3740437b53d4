//! Multicast socket construction for mDNS.
//!
//! A socket per address family: IPv4 binds `0.0.0.0:5353` and joins
//! 224.0.0.251; IPv6 binds `[::]:5353` v6-only and joins ff02::fb. Both set
//! SO_REUSEADDR and (where available) SO_REUSEPORT so the process can
//! coexist with other mDNS stacks on the host, and come out non-blocking for
//! async use.

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6, UdpSocket};

use socket2::{Domain, Protocol, Socket, Type};

use crate::transport::{MDNS_MULTICAST_IPV4, MDNS_MULTICAST_IPV6, MDNS_PORT};

/// A builder for multicast UDP sockets suitable for mDNS.
///
/// ```rust,ignore
/// let std_socket = MulticastSocket::ipv4().into_std()?;
/// let socket = tokio::net::UdpSocket::from_std(std_socket)?;
/// ```
#[derive(Debug, Clone)]
pub struct MulticastSocket {
    ipv6: bool,
    ipv4_interface: Option<Ipv4Addr>,
    ipv6_interface: Option<u32>,
    port: u16,
}

impl MulticastSocket {
    /// An IPv4 socket builder joining 224.0.0.251.
    pub fn ipv4() -> Self {
        MulticastSocket {
            ipv6: false,
            ipv4_interface: None,
            ipv6_interface: None,
            port: MDNS_PORT,
        }
    }

    /// An IPv6 socket builder joining ff02::fb.
    pub fn ipv6() -> Self {
        MulticastSocket {
            ipv6: true,
            ipv4_interface: None,
            ipv6_interface: None,
            port: MDNS_PORT,
        }
    }

    /// Joins the group on this interface only instead of all interfaces
    /// (IPv4 sockets).
    pub fn with_ipv4_interface(mut self, interface: Ipv4Addr) -> Self {
        self.ipv4_interface = Some(interface);
        self
    }

    /// Joins the group on the interface with this scope index only (IPv6
    /// sockets). Index 0 lets the OS choose.
    pub fn with_ipv6_interface(mut self, index: u32) -> Self {
        self.ipv6_interface = Some(index);
        self
    }

    /// Binds to a non-standard port. Useful for tests that must not collide
    /// with a system mDNS responder.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Builds the configured `std::net::UdpSocket`.
    pub fn into_std(self) -> io::Result<UdpSocket> {
        if self.ipv6 {
            self.into_std_v6()
        } else {
            self.into_std_v4()
        }
    }

    fn into_std_v4(self) -> io::Result<UdpSocket> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        #[cfg(all(unix, not(target_os = "solaris"), not(target_os = "illumos")))]
        socket.set_reuse_port(true)?;
        socket.set_nonblocking(true)?;

        let bind_addr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, self.port));
        socket.bind(&bind_addr.into())?;

        let iface = self.ipv4_interface.unwrap_or(Ipv4Addr::UNSPECIFIED);
        socket.join_multicast_v4(&MDNS_MULTICAST_IPV4, &iface)?;
        socket.set_multicast_loop_v4(true)?;
        socket.set_multicast_ttl_v4(255)?;

        Ok(socket.into())
    }

    fn into_std_v6(self) -> io::Result<UdpSocket> {
        let socket = Socket::new(Domain::IPV6, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_only_v6(true)?;
        socket.set_reuse_address(true)?;
        #[cfg(all(unix, not(target_os = "solaris"), not(target_os = "illumos")))]
        socket.set_reuse_port(true)?;
        socket.set_nonblocking(true)?;

        let bind_addr = SocketAddr::V6(SocketAddrV6::new(Ipv6Addr::UNSPECIFIED, self.port, 0, 0));
        socket.bind(&bind_addr.into())?;

        let iface = self.ipv6_interface.unwrap_or(0);
        socket.join_multicast_v6(&MDNS_MULTICAST_IPV6, iface)?;
        socket.set_multicast_loop_v6(true)?;

        Ok(socket.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let v4 = MulticastSocket::ipv4();
        assert!(!v4.ipv6);
        assert_eq!(v4.port, MDNS_PORT);

        let v6 = MulticastSocket::ipv6().with_ipv6_interface(2);
        assert!(v6.ipv6);
        assert_eq!(v6.ipv6_interface, Some(2));
    }

    #[test]
    fn test_multicast_constants() {
        assert_eq!(MDNS_MULTICAST_IPV4, Ipv4Addr::new(224, 0, 0, 251));
        assert_eq!(
            MDNS_MULTICAST_IPV6,
            Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 0xfb)
        );
        assert_eq!(MDNS_PORT, 5353);
    }

    // Socket creation needs real network access and may collide with a
    // system mDNS responder, so it is left to the integration environment.
}
