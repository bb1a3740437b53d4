//! The DNS-SD service instance model.

#[cfg(test)]
mod service_test;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Instant;

use crate::config::DEFAULT_TTL;
use crate::txt::TxtRecord;

/// The default domain of mDNS service discovery.
pub const DEFAULT_DOMAIN: &str = "local";

/// A service instance, as discovered by the browser or registered with the
/// advertiser.
///
/// Identity (equality and hashing) is the derived [`full_name`], compared
/// case-insensitively through the name codec's folding rules at the places
/// that index services; two `Service` values with the same full name are the
/// same instance regardless of their resolution state.
///
/// [`full_name`]: Service::full_name
#[derive(Clone, Debug)]
pub struct Service {
    /// Instance name, e.g. `"My Printer"`.
    pub name: String,
    /// Service type, e.g. `"_http._tcp"`.
    pub service_type: String,
    /// Domain, practically always `"local"`.
    pub domain: String,
    /// Host name without trailing dot, e.g. `"myhost.local"`. Set once an
    /// SRV record has been seen (browser) or filled at registration
    /// (advertiser).
    pub host: Option<String>,
    pub port: Option<u16>,
    pub priority: u16,
    pub weight: u16,
    pub ipv4_addresses: Vec<Ipv4Addr>,
    pub ipv6_addresses: Vec<Ipv6Addr>,
    pub txt: TxtRecord,
    /// Record time-to-live in seconds.
    pub ttl: u32,
    /// When a record for this instance was last seen or changed.
    pub last_seen: Instant,
}

impl Service {
    /// A new unresolved instance in the default domain with default TTL.
    pub fn new(name: &str, service_type: &str) -> Self {
        Service {
            name: name.to_owned(),
            service_type: service_type.to_owned(),
            domain: DEFAULT_DOMAIN.to_owned(),
            host: None,
            port: None,
            priority: 0,
            weight: 0,
            ipv4_addresses: Vec::new(),
            ipv6_addresses: Vec::new(),
            txt: TxtRecord::new(),
            ttl: DEFAULT_TTL,
            last_seen: Instant::now(),
        }
    }

    pub fn with_domain(mut self, domain: &str) -> Self {
        self.domain = domain.to_owned();
        self
    }

    pub fn with_host(mut self, host: &str) -> Self {
        self.host = Some(host.trim_end_matches('.').to_owned());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_priority(mut self, priority: u16) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_weight(mut self, weight: u16) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_ip(mut self, ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(ip) => self.ipv4_addresses.push(ip),
            IpAddr::V6(ip) => self.ipv6_addresses.push(ip),
        }
        self
    }

    pub fn with_txt(mut self, txt: TxtRecord) -> Self {
        self.txt = txt;
        self
    }

    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    /// The fully-qualified instance name, `name.type.domain.`.
    pub fn full_name(&self) -> String {
        format!("{}.{}.{}.", self.name, self.service_type, self.domain)
    }

    /// The fully-qualified service type, `type.domain.`.
    pub fn full_type(&self) -> String {
        format!("{}.{}.", self.service_type, self.domain)
    }

    /// Whether host and port are both known.
    pub fn is_resolved(&self) -> bool {
        self.host.is_some() && self.port.is_some()
    }

    /// Whether at least one address of either family is known.
    pub fn has_addresses(&self) -> bool {
        !self.ipv4_addresses.is_empty() || !self.ipv6_addresses.is_empty()
    }

    /// All known addresses, IPv4 first.
    pub fn addresses(&self) -> Vec<IpAddr> {
        self.ipv4_addresses
            .iter()
            .copied()
            .map(IpAddr::V4)
            .chain(self.ipv6_addresses.iter().copied().map(IpAddr::V6))
            .collect()
    }
}

impl PartialEq for Service {
    fn eq(&self, other: &Self) -> bool {
        self.full_name() == other.full_name()
    }
}

impl Eq for Service {}

impl Hash for Service {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.full_name().hash(state);
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_name())
    }
}
