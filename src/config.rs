//! Configuration for the transport, browser and advertiser.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

/// Default record time-to-live (RFC 6762 §10), in seconds.
pub const DEFAULT_TTL: u32 = 120;

/// TTL carried by goodbye records.
pub const GOODBYE_TTL: u32 = 0;

/// Default interval between periodic browse queries.
pub const DEFAULT_QUERY_INTERVAL: Duration = Duration::from_secs(120);

/// Default interval between periodic re-announcements.
pub const DEFAULT_ANNOUNCEMENT_INTERVAL: Duration = Duration::from_secs(20);

/// Default number of initial announcements per registration.
pub const DEFAULT_ANNOUNCEMENT_COUNT: u32 = 3;

/// The DNS-SD service-enumeration meta-query name (RFC 6763 §9).
pub const META_QUERY_SERVICE: &str = "_services._dns-sd._udp.local.";

/// The libp2p peer-discovery service type.
pub const SERVICE_TYPE_P2P: &str = "_p2p._udp.local.";

/// Socket and interface selection shared by browser and advertiser
/// transports.
///
/// Interface selection is by address (IPv4) and scope index (IPv6); `None`
/// joins the multicast group on all interfaces.
#[derive(Clone, Debug)]
pub struct TransportConfig {
    pub use_ipv4: bool,
    pub use_ipv6: bool,
    pub ipv4_interface: Option<Ipv4Addr>,
    pub ipv6_interface: Option<u32>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            use_ipv4: true,
            use_ipv6: true,
            ipv4_interface: None,
            ipv6_interface: None,
        }
    }
}

impl TransportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ipv4(mut self, use_ipv4: bool) -> Self {
        self.use_ipv4 = use_ipv4;
        self
    }

    pub fn with_ipv6(mut self, use_ipv6: bool) -> Self {
        self.use_ipv6 = use_ipv6;
        self
    }

    /// Join IPv4 multicast on the interface with this address only.
    pub fn with_ipv4_interface(mut self, interface: Ipv4Addr) -> Self {
        self.ipv4_interface = Some(interface);
        self
    }

    /// Join IPv6 multicast on the interface with this scope index only.
    pub fn with_ipv6_interface(mut self, index: u32) -> Self {
        self.ipv6_interface = Some(index);
        self
    }
}

/// Configuration for [`ServiceBrowser`](crate::browser::ServiceBrowser).
#[derive(Clone, Debug)]
pub struct BrowserConfig {
    /// How often every browsed type is re-queried.
    pub query_interval: Duration,
    /// Whether a discovered instance is resolved (SRV + TXT queried)
    /// immediately.
    pub auto_resolve: bool,
    pub transport: TransportConfig,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        BrowserConfig {
            query_interval: DEFAULT_QUERY_INTERVAL,
            auto_resolve: true,
            transport: TransportConfig::default(),
        }
    }
}

impl BrowserConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query_interval(mut self, interval: Duration) -> Self {
        self.query_interval = interval;
        self
    }

    pub fn with_auto_resolve(mut self, auto_resolve: bool) -> Self {
        self.auto_resolve = auto_resolve;
        self
    }

    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }
}

/// Configuration for [`ServiceAdvertiser`](crate::advertiser::ServiceAdvertiser).
#[derive(Clone, Debug)]
pub struct AdvertiserConfig {
    /// TTL stamped on advertised records, in seconds.
    pub ttl: u32,
    /// How often every registered service is re-announced.
    pub announcement_interval: Duration,
    /// How many times a registration is initially announced; the gaps grow
    /// exponentially (1 s, 2 s, 4 s, ...).
    pub announcement_count: u32,
    /// Host name advertised in SRV targets, without the `.local` suffix.
    /// Defaults to the machine's host name.
    pub host_name: Option<String>,
    /// Local addresses advertised for services registered without any.
    /// Address enumeration is the caller's concern; an empty list means such
    /// services carry no address records.
    pub local_addresses: Vec<IpAddr>,
    pub transport: TransportConfig,
}

impl Default for AdvertiserConfig {
    fn default() -> Self {
        AdvertiserConfig {
            ttl: DEFAULT_TTL,
            announcement_interval: DEFAULT_ANNOUNCEMENT_INTERVAL,
            announcement_count: DEFAULT_ANNOUNCEMENT_COUNT,
            host_name: None,
            local_addresses: Vec::new(),
            transport: TransportConfig::default(),
        }
    }
}

impl AdvertiserConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_announcement_interval(mut self, interval: Duration) -> Self {
        self.announcement_interval = interval;
        self
    }

    pub fn with_announcement_count(mut self, count: u32) -> Self {
        self.announcement_count = count;
        self
    }

    pub fn with_host_name(mut self, host_name: &str) -> Self {
        self.host_name = Some(host_name.to_owned());
        self
    }

    pub fn with_local_address(mut self, addr: IpAddr) -> Self {
        self.local_addresses.push(addr);
        self
    }

    pub fn with_local_addresses(mut self, addrs: Vec<IpAddr>) -> Self {
        self.local_addresses = addrs;
        self
    }

    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    pub(crate) fn local_ipv4_addresses(&self) -> Vec<Ipv4Addr> {
        self.local_addresses
            .iter()
            .filter_map(|a| match a {
                IpAddr::V4(v4) => Some(*v4),
                IpAddr::V6(_) => None,
            })
            .collect()
    }

    pub(crate) fn local_ipv6_addresses(&self) -> Vec<Ipv6Addr> {
        self.local_addresses
            .iter()
            .filter_map(|a| match a {
                IpAddr::V6(v6) => Some(*v6),
                IpAddr::V4(_) => None,
            })
            .collect()
    }
}
