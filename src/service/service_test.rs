use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};

use super::Service;
use crate::config::DEFAULT_TTL;
use crate::txt::TxtRecord;

#[test]
fn test_defaults() {
    let service = Service::new("My Printer", "_ipp._tcp");
    assert_eq!(service.domain, "local");
    assert_eq!(service.ttl, DEFAULT_TTL);
    assert_eq!(service.priority, 0);
    assert_eq!(service.weight, 0);
    assert!(service.host.is_none());
    assert!(service.port.is_none());
    assert!(service.txt.is_empty());
    assert!(!service.is_resolved());
    assert!(!service.has_addresses());
}

#[test]
fn test_derived_names() {
    let service = Service::new("My Printer", "_ipp._tcp");
    assert_eq!(service.full_name(), "My Printer._ipp._tcp.local.");
    assert_eq!(service.full_type(), "_ipp._tcp.local.");

    let custom = Service::new("db", "_postgres._tcp").with_domain("example");
    assert_eq!(custom.full_name(), "db._postgres._tcp.example.");
    assert_eq!(custom.full_type(), "_postgres._tcp.example.");
}

#[test]
fn test_resolution_predicates() {
    let mut service = Service::new("web", "_http._tcp").with_port(8080);
    assert!(!service.is_resolved());

    service = service.with_host("myhost.local.");
    assert!(service.is_resolved());
    // The trailing dot is normalized away.
    assert_eq!(service.host.as_deref(), Some("myhost.local"));

    assert!(!service.has_addresses());
    service = service.with_ip(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 9)));
    assert!(service.has_addresses());
    assert_eq!(service.addresses(), [IpAddr::V4(Ipv4Addr::new(10, 0, 0, 9))]);
}

#[test]
fn test_identity_is_full_name() {
    let a = Service::new("web", "_http._tcp");
    let b = Service::new("web", "_http._tcp")
        .with_port(80)
        .with_host("elsewhere.local")
        .with_txt(TxtRecord::from_strings(["k=v"]));
    let c = Service::new("other", "_http._tcp");

    // Resolution state does not change identity.
    assert_eq!(a, b);
    assert_ne!(a, c);

    let mut set = HashSet::new();
    set.insert(a);
    assert!(set.contains(&b));
    assert!(!set.contains(&c));
}

#[test]
fn test_display_is_full_name() {
    let service = Service::new("cam", "_rtsp._tcp");
    assert_eq!(service.to_string(), "cam._rtsp._tcp.local.");
}
