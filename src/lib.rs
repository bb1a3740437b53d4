//! # mdns-discovery
//!
//! Multicast DNS / DNS-based Service Discovery for Rust: an RFC 1035 message
//! codec with name compression, RFC 6762 mDNS semantics, RFC 6763 DNS-SD
//! browsing and advertising, and the libp2p extension of multi-valued TXT
//! keys.
//!
//! ## What is in the box
//!
//! - **Wire codec**: [`Message`], [`Name`], [`Question`], [`Record`] and
//!   the typed [`RData`] variants (A, AAAA, PTR, SRV, TXT, HINFO, NSEC, plus
//!   opaque passthrough of unknown types). Names compress on encode and
//!   follow compression pointers on decode, with loop detection.
//! - **Browsing**: [`ServiceBrowser`] sends periodic PTR queries for the
//!   types you browse and assembles [`Service`] instances from the incoming
//!   PTR, SRV/TXT and A/AAAA records, reporting [`BrowserEvent`]s.
//! - **Advertising**: [`ServiceAdvertiser`] announces registered
//!   [`Service`]s (with exponential backoff and periodic refresh), answers
//!   matching queries, and withdraws services with a goodbye.
//! - **Transport**: both actors speak to an abstract [`Transport`];
//!   [`UdpTransport`] is the standard dual-stack multicast implementation
//!   (224.0.0.251 / ff02::fb on port 5353).
//!
//! ## Browsing
//!
//! ```rust,no_run
//! use mdns_discovery::{BrowserConfig, BrowserEvent, ServiceBrowser};
//!
//! # async fn run() -> mdns_discovery::Result<()> {
//! let browser = ServiceBrowser::new(BrowserConfig::default());
//! let mut events = browser.take_events().expect("events taken once");
//!
//! browser.start().await?;
//! browser.browse("_http._tcp").await?;
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         BrowserEvent::Found(service) => println!("found {service}"),
//!         BrowserEvent::Updated(service) => println!("updated {service}"),
//!         BrowserEvent::Removed(service) => println!("removed {service}"),
//!         BrowserEvent::Error(err) => eprintln!("browse error: {err}"),
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Advertising
//!
//! ```rust,no_run
//! use mdns_discovery::{AdvertiserConfig, Service, ServiceAdvertiser};
//!
//! # async fn run() -> mdns_discovery::Result<()> {
//! let advertiser = ServiceAdvertiser::new(
//!     AdvertiserConfig::default().with_local_address("192.168.1.5".parse().unwrap()),
//! );
//! advertiser.start().await?;
//!
//! let service = Service::new("My Web Server", "_http._tcp").with_port(8080);
//! advertiser.register(service).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## TXT records
//!
//! TXT attributes keep DNS-SD single-value semantics and libp2p multi-value
//! semantics side by side:
//!
//! ```rust
//! use mdns_discovery::TxtRecord;
//!
//! let mut txt = TxtRecord::new();
//! txt.append("dnsaddr", "/ip4/1.2.3.4/tcp/4001");
//! txt.append("dnsaddr", "/ip6/::1/tcp/4001");
//!
//! assert_eq!(txt.get("dnsaddr"), Some("/ip4/1.2.3.4/tcp/4001"));
//! assert_eq!(txt.values("DNSADDR").len(), 2);
//! ```

#![warn(rust_2018_idioms)]

pub mod advertiser;
pub mod browser;
pub mod config;
pub mod error;
pub mod message;
pub mod service;
pub mod socket;
pub mod transport;
pub mod txt;

pub use advertiser::{AdvertiserEvent, ServiceAdvertiser};
pub use browser::{BrowserEvent, ServiceBrowser};
pub use config::{
    AdvertiserConfig, BrowserConfig, TransportConfig, DEFAULT_ANNOUNCEMENT_COUNT,
    DEFAULT_ANNOUNCEMENT_INTERVAL, DEFAULT_QUERY_INTERVAL, DEFAULT_TTL, GOODBYE_TTL,
    META_QUERY_SERVICE, SERVICE_TYPE_P2P,
};
pub use error::{Error, Result};
pub use message::header::Header;
pub use message::name::Name;
pub use message::question::Question;
pub use message::record::{RData, Record};
pub use message::{
    DnsClass, DnsType, Message, OpCode, RCode, DNSCLASS_ANY, DNSCLASS_INET,
    MAX_MDNS_MESSAGE_SIZE, MAX_STANDARD_MESSAGE_SIZE, OPCODE_QUERY,
};
pub use service::Service;
pub use txt::TxtRecord;
pub use socket::MulticastSocket;
pub use transport::udp::UdpTransport;
pub use transport::{
    Transport, MDNS_DEST_ADDR_V4, MDNS_DEST_ADDR_V6, MDNS_MULTICAST_IPV4, MDNS_MULTICAST_IPV6,
    MDNS_PORT,
};
