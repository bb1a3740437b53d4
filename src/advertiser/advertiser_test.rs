use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::config::AdvertiserConfig;
use crate::message::question::Question;
use crate::message::DNSCLASS_INET;
use crate::transport::mock::MockTransport;
use crate::txt::TxtRecord;

fn src() -> SocketAddr {
    "192.168.1.20:5353".parse().unwrap()
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

fn test_config() -> AdvertiserConfig {
    AdvertiserConfig::default()
        .with_host_name("testhost")
        .with_local_address("192.168.1.5".parse().unwrap())
        .with_local_address("fe80::7".parse().unwrap())
}

async fn started_advertiser(
    config: AdvertiserConfig,
) -> (
    Arc<MockTransport>,
    ServiceAdvertiser,
    tokio::sync::mpsc::UnboundedReceiver<AdvertiserEvent>,
) {
    let transport = Arc::new(MockTransport::new());
    let advertiser = ServiceAdvertiser::with_transport(transport.clone(), config);
    let events = advertiser.take_events().expect("events taken once");
    advertiser.start().await.unwrap();
    (transport, advertiser, events)
}

#[tokio::test(start_paused = true)]
async fn test_register_requires_port() {
    let (_transport, advertiser, _events) = started_advertiser(test_config()).await;
    let service = Service::new("Test", "_http._tcp");
    assert_eq!(
        advertiser.register(service).await,
        Err(Error::ErrMissingPort)
    );
}

#[tokio::test(start_paused = true)]
async fn test_register_requires_start() {
    let transport = Arc::new(MockTransport::new());
    let advertiser = ServiceAdvertiser::with_transport(transport, test_config());
    let service = Service::new("Test", "_http._tcp").with_port(8080);
    assert_eq!(advertiser.register(service).await, Err(Error::ErrNotStarted));
}

#[tokio::test(start_paused = true)]
async fn test_register_fills_host_and_addresses() {
    let (_transport, advertiser, mut events) = started_advertiser(test_config()).await;
    let service = Service::new("Test", "_http._tcp").with_port(8080);
    advertiser.register(service).await.unwrap();

    match events.try_recv().unwrap() {
        AdvertiserEvent::Registered(service) => {
            assert_eq!(service.host.as_deref(), Some("testhost.local"));
            assert_eq!(service.port, Some(8080));
            assert_eq!(
                service.ipv4_addresses,
                ["192.168.1.5".parse::<std::net::Ipv4Addr>().unwrap()]
            );
            assert_eq!(
                service.ipv6_addresses,
                ["fe80::7".parse::<std::net::Ipv6Addr>().unwrap()]
            );
        }
        other => panic!("expected Registered, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_initial_announcement_count_and_backoff() {
    let (transport, advertiser, _events) = started_advertiser(test_config()).await;
    let service = Service::new("Test", "_http._tcp").with_port(8080);
    advertiser.register(service).await.unwrap();

    // Past the 1 s and 2 s gaps, before the 20 s refresh.
    tokio::time::sleep(Duration::from_secs(10)).await;
    let sent = transport.sent();
    assert_eq!(sent.len(), 3, "exactly three initial announcements");

    for (message, target, _) in &sent {
        assert!(target.is_none(), "announcements are multicast");
        assert!(message.header.response);
        assert!(message.header.authoritative);
        assert!(message.is_mdns());

        // One PTR answer.
        assert_eq!(message.answers.len(), 1);
        assert_eq!(
            message.answers[0].name,
            Name::new("_http._tcp.local.").unwrap()
        );
        match &message.answers[0].rdata {
            RData::Ptr(target) => {
                assert_eq!(target, &Name::new("Test._http._tcp.local.").unwrap());
            }
            other => panic!("expected PTR answer, got {other:?}"),
        }

        // SRV + TXT + one record per local address as additionals.
        assert_eq!(message.additionals.len(), 4);
        match &message.additionals[0].rdata {
            RData::Srv { port, target, .. } => {
                assert_eq!(*port, 8080);
                assert_eq!(target, &Name::new("testhost.local.").unwrap());
            }
            other => panic!("expected SRV additional, got {other:?}"),
        }
        assert!(message.additionals[0].cache_flush);
        assert!(matches!(message.additionals[1].rdata, RData::Txt(_)));
        assert!(matches!(message.additionals[2].rdata, RData::A(_)));
        assert!(matches!(message.additionals[3].rdata, RData::Aaaa(_)));
    }

    // Inter-send gaps: 1 s then 2 s.
    assert_eq!(sent[1].2 - sent[0].2, Duration::from_secs(1));
    assert_eq!(sent[2].2 - sent[1].2, Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn test_periodic_refresh() {
    let (transport, advertiser, _events) = started_advertiser(test_config()).await;
    let service = Service::new("Test", "_http._tcp").with_port(8080);
    advertiser.register(service).await.unwrap();

    // Initial burst done by 3 s.
    tokio::time::sleep(Duration::from_secs(5)).await;
    transport.clear_sent();

    // Two refresh intervals (20 s each) pass.
    tokio::time::sleep(Duration::from_secs(41)).await;
    assert_eq!(transport.sent_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_responder_answers_ptr_query() {
    let (transport, advertiser, _events) = started_advertiser(test_config()).await;
    let service = Service::new("Test", "_http._tcp")
        .with_port(8080)
        .with_txt(TxtRecord::from_strings(["path=/v1"]));
    advertiser.register(service).await.unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;
    transport.clear_sent();

    let query = Message::mdns_ptr_query(Name::new("_http._tcp.local.").unwrap());
    transport.push_incoming(query, src());
    settle().await;

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    let (response, target, _) = &sent[0];
    assert!(target.is_none());
    assert!(response.header.response);
    assert!(response.header.authoritative);

    assert_eq!(response.answers.len(), 1);
    match &response.answers[0].rdata {
        RData::Ptr(name) => assert_eq!(name, &Name::new("Test._http._tcp.local.").unwrap()),
        other => panic!("expected PTR, got {other:?}"),
    }

    let additional_types: Vec<DnsType> = response
        .additionals
        .iter()
        .map(|r| r.dns_type())
        .collect();
    assert_eq!(
        additional_types,
        [DnsType::Srv, DnsType::Txt, DnsType::A, DnsType::Aaaa]
    );
}

#[tokio::test(start_paused = true)]
async fn test_responder_answers_srv_question_with_additionals() {
    let (transport, advertiser, _events) = started_advertiser(test_config()).await;
    advertiser
        .register(Service::new("Test", "_http._tcp").with_port(8080))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;
    transport.clear_sent();

    let query = Message::mdns_query(
        Name::new("Test._http._tcp.local.").unwrap(),
        &[DnsType::Srv],
        false,
    );
    transport.push_incoming(query, src());
    settle().await;

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    let (response, _, _) = &sent[0];
    assert!(response.answers.is_empty());
    assert_eq!(response.additionals.len(), 4);
    assert!(matches!(response.additionals[0].rdata, RData::Srv { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_responder_answers_address_question() {
    let (transport, advertiser, _events) = started_advertiser(test_config()).await;
    advertiser
        .register(Service::new("Test", "_http._tcp").with_port(8080))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;
    transport.clear_sent();

    let query = Message::mdns_query(
        Name::new("testhost.local.").unwrap(),
        &[DnsType::A],
        false,
    );
    transport.push_incoming(query, src());
    settle().await;

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    let (response, _, _) = &sent[0];
    assert!(response.answers.is_empty());
    let types: Vec<DnsType> = response.additionals.iter().map(|r| r.dns_type()).collect();
    assert_eq!(types, [DnsType::A, DnsType::Aaaa]);
}

#[tokio::test(start_paused = true)]
async fn test_responder_ignores_unmatched_and_responses() {
    let (transport, advertiser, _events) = started_advertiser(test_config()).await;
    advertiser
        .register(Service::new("Test", "_http._tcp").with_port(8080))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;
    transport.clear_sent();

    // Query for a type nobody registered.
    let query = Message::mdns_ptr_query(Name::new("_ipp._tcp.local.").unwrap());
    transport.push_incoming(query, src());

    // A response message is not a query, even if its name matches.
    let response = Message::mdns_response(Vec::new(), Vec::new());
    transport.push_incoming(response, src());

    settle().await;
    assert_eq!(transport.sent_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_responder_answers_meta_query() {
    let (transport, advertiser, _events) = started_advertiser(test_config()).await;
    advertiser
        .register(Service::new("Web", "_http._tcp").with_port(80))
        .await
        .unwrap();
    advertiser
        .register(Service::new("Files", "_smb._tcp").with_port(445))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;
    transport.clear_sent();

    let query = Message::mdns_ptr_query(Name::new(META_QUERY_SERVICE).unwrap());
    transport.push_incoming(query, src());
    settle().await;

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    let (response, _, _) = &sent[0];
    assert_eq!(response.answers.len(), 2);
    let mut types: Vec<String> = response
        .answers
        .iter()
        .map(|r| match &r.rdata {
            RData::Ptr(name) => name.to_string(),
            other => panic!("expected PTR, got {other:?}"),
        })
        .collect();
    types.sort();
    assert_eq!(types, ["_http._tcp.local.", "_smb._tcp.local."]);
    for answer in &response.answers {
        assert_eq!(answer.name, Name::new(META_QUERY_SERVICE).unwrap());
    }
}

#[tokio::test(start_paused = true)]
async fn test_unregister_sends_goodbye() {
    let (transport, advertiser, mut events) = started_advertiser(test_config()).await;
    let service = Service::new("Test", "_http._tcp").with_port(8080);
    advertiser.register(service.clone()).await.unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;
    transport.clear_sent();
    while events.try_recv().is_ok() {}

    advertiser.unregister(&service).await.unwrap();
    settle().await;

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    let (goodbye, _, _) = &sent[0];
    assert!(goodbye.header.response);
    // PTR, SRV, TXT, one A and one AAAA.
    assert_eq!(goodbye.answers.len(), 5);
    assert!(goodbye.answers.iter().all(|r| r.ttl == 0));

    match events.try_recv().unwrap() {
        AdvertiserEvent::Unregistered(unregistered) => {
            assert_eq!(unregistered.full_name(), service.full_name());
        }
        other => panic!("expected Unregistered, got {other:?}"),
    }
    assert!(advertiser.services().await.is_empty());

    // Unregistering again is a quiet no-op.
    advertiser.unregister(&service).await.unwrap();
    assert!(events.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_update_requires_registration() {
    let (_transport, advertiser, _events) = started_advertiser(test_config()).await;
    let service = Service::new("Ghost", "_http._tcp").with_port(80);
    assert_eq!(
        advertiser.update(service).await,
        Err(Error::ErrServiceNotFound)
    );
}

#[tokio::test(start_paused = true)]
async fn test_update_replaces_and_reannounces() {
    let (transport, advertiser, mut events) = started_advertiser(test_config()).await;
    let service = Service::new("Test", "_http._tcp").with_port(8080);
    advertiser.register(service.clone()).await.unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;
    transport.clear_sent();
    while events.try_recv().is_ok() {}

    let updated = service
        .clone()
        .with_txt(TxtRecord::from_strings(["version=2"]));
    advertiser.update(updated).await.unwrap();
    // Past the update's 1 s + 2 s burst but still before the first 20 s
    // refresh tick.
    tokio::time::sleep(Duration::from_secs(8)).await;

    match events.try_recv().unwrap() {
        AdvertiserEvent::Updated(service) => {
            assert_eq!(service.txt.get("version"), Some("2"));
        }
        other => panic!("expected Updated, got {other:?}"),
    }

    // A fresh 3-send announcement burst went out.
    assert_eq!(transport.sent_count(), 3);
    let (message, _, _) = &transport.sent()[0];
    match &message.additionals[1].rdata {
        RData::Txt(strings) => assert_eq!(strings, &["version=2".to_owned()]),
        other => panic!("expected TXT, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_stop_sends_goodbyes_and_closes_events() {
    let (transport, advertiser, mut events) = started_advertiser(test_config()).await;
    advertiser
        .register(Service::new("One", "_http._tcp").with_port(1))
        .await
        .unwrap();
    advertiser
        .register(Service::new("Two", "_smb._tcp").with_port(2))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;
    transport.clear_sent();

    advertiser.stop().await.unwrap();
    advertiser.stop().await.unwrap();

    let sent = transport.sent();
    assert_eq!(sent.len(), 2);
    for (goodbye, _, _) in &sent {
        assert!(goodbye.answers.iter().all(|r| r.ttl == 0));
    }

    while let Ok(event) = events.try_recv() {
        assert!(matches!(event, AdvertiserEvent::Registered(_)));
    }
    assert!(events.recv().await.is_none());
    assert!(advertiser.services().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_refresh_stops_after_stop() {
    let (transport, advertiser, _events) = started_advertiser(test_config()).await;
    advertiser
        .register(Service::new("Test", "_http._tcp").with_port(8080))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;
    advertiser.stop().await.unwrap();
    transport.clear_sent();

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(transport.sent_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_any_question_matches_all_roles() {
    let (transport, advertiser, _events) = started_advertiser(test_config()).await;
    advertiser
        .register(Service::new("Test", "_http._tcp").with_port(8080))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;
    transport.clear_sent();

    let mut query = Message::default();
    query.questions.push(Question::new(
        Name::new("Test._http._tcp.local.").unwrap(),
        DnsType::Any,
        DNSCLASS_INET,
        false,
    ));
    transport.push_incoming(query, src());
    settle().await;

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0.additionals.len(), 4);
}
