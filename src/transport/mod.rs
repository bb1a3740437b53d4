//! The mDNS transport contract and its UDP implementation.

#[cfg(test)]
pub(crate) mod mock;
pub(crate) mod udp;

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::error::Result;
use crate::message::Message;

/// The standard mDNS port.
pub const MDNS_PORT: u16 = 5353;

/// The IPv4 mDNS multicast group (224.0.0.251).
pub const MDNS_MULTICAST_IPV4: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 251);

/// The IPv6 mDNS multicast group (ff02::fb).
pub const MDNS_MULTICAST_IPV6: Ipv6Addr = Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 0xfb);

/// IPv4 mDNS destination address (224.0.0.251:5353).
pub const MDNS_DEST_ADDR_V4: SocketAddr =
    SocketAddr::new(IpAddr::V4(MDNS_MULTICAST_IPV4), MDNS_PORT);

/// IPv6 mDNS destination address ([ff02::fb]:5353).
pub const MDNS_DEST_ADDR_V6: SocketAddr =
    SocketAddr::new(IpAddr::V6(MDNS_MULTICAST_IPV6), MDNS_PORT);

/// Abstract mDNS transport.
///
/// Implementations own the multicast sockets (or an in-memory stand-in) and
/// expose decoded traffic as a single stream. The browser and advertiser are
/// written against this trait only.
///
/// Malformed datagrams are the transport's problem: they are dropped before
/// they reach the stream, because garbage mDNS traffic is normal on open
/// networks.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Binds sockets, joins the multicast groups and begins receiving.
    /// Idempotent.
    async fn start(&self) -> Result<()>;

    /// Leaves the groups, closes the sockets and completes the incoming
    /// stream. Idempotent.
    async fn stop(&self) -> Result<()>;

    /// Encodes `message` once and transmits it to every enabled multicast
    /// group on the mDNS port.
    async fn send(&self, message: &Message) -> Result<()>;

    /// Encodes `message` and unicasts it to `target` using the socket of the
    /// matching address family.
    async fn send_to(&self, message: &Message, target: SocketAddr) -> Result<()>;

    /// Hands over the stream of decoded incoming messages with their source
    /// addresses. Yields `Some` exactly once; the consuming actor takes it
    /// when it starts.
    fn take_incoming(&self) -> Option<UnboundedReceiver<(Message, SocketAddr)>>;
}
