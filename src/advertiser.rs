//! DNS-SD service advertising: announcements, periodic refresh, the query
//! responder and goodbye on withdrawal.

#[cfg(test)]
mod advertiser_test;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::config::{AdvertiserConfig, META_QUERY_SERVICE};
use crate::error::{Error, Result};
use crate::message::name::Name;
use crate::message::record::{RData, Record};
use crate::message::{DnsType, Message, DNSCLASS_INET};
use crate::service::Service;
use crate::transport::udp::UdpTransport;
use crate::transport::Transport;

/// Events observed while advertising.
#[derive(Debug)]
pub enum AdvertiserEvent {
    Registered(Service),
    Updated(Service),
    Unregistered(Service),
    /// Reserved for name-conflict resolution, which this library does not
    /// perform; never emitted.
    Conflict {
        original: Service,
        replacement: Service,
    },
    /// A transport-level failure.
    Error(Error),
}

/// Advertises DNS-SD services on the local network.
///
/// Registered services are announced immediately (with exponential backoff
/// between the initial repeats), re-announced periodically, served to
/// matching queries, and withdrawn with a goodbye. All state sits behind a
/// single lock; the event stream is FIFO.
pub struct ServiceAdvertiser {
    config: AdvertiserConfig,
    transport: Arc<dyn Transport>,
    inner: Arc<Mutex<Inner>>,
    events_rx: std::sync::Mutex<Option<UnboundedReceiver<AdvertiserEvent>>>,
}

struct Inner {
    started: bool,
    /// Registered services, keyed by lowercased full name.
    services: HashMap<String, Service>,
    /// Advertised host name, e.g. `"myhost.local"`.
    host_name: String,
    event_tx: Option<UnboundedSender<AdvertiserEvent>>,
    recv_task: Option<JoinHandle<()>>,
    refresh_task: Option<JoinHandle<()>>,
    announce_tasks: Vec<JoinHandle<()>>,
}

impl Inner {
    fn emit(&self, event: AdvertiserEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event);
        }
    }
}

impl ServiceAdvertiser {
    /// An advertiser over the standard UDP multicast transport.
    pub fn new(config: AdvertiserConfig) -> Self {
        let transport = Arc::new(UdpTransport::new(config.transport.clone()));
        Self::with_transport(transport, config)
    }

    /// An advertiser over a caller-supplied transport.
    pub fn with_transport(transport: Arc<dyn Transport>, config: AdvertiserConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        ServiceAdvertiser {
            config,
            transport,
            inner: Arc::new(Mutex::new(Inner {
                started: false,
                services: HashMap::new(),
                host_name: String::new(),
                event_tx: Some(tx),
                recv_task: None,
                refresh_task: None,
                announce_tasks: Vec::new(),
            })),
            events_rx: std::sync::Mutex::new(Some(rx)),
        }
    }

    /// Hands over the event stream. Yields `Some` exactly once.
    pub fn take_events(&self) -> Option<UnboundedReceiver<AdvertiserEvent>> {
        self.events_rx.lock().unwrap().take()
    }

    /// Caches the local host name, starts the transport and the query
    /// responder. Idempotent.
    pub async fn start(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.started {
            return Ok(());
        }
        inner.host_name = local_host_name(self.config.host_name.as_deref());

        self.transport.start().await?;
        let incoming = self
            .transport
            .take_incoming()
            .ok_or(Error::ErrTransportClosed)?;

        let inner_arc = self.inner.clone();
        let transport = self.transport.clone();
        let ttl = self.config.ttl;
        inner.recv_task = Some(tokio::spawn(async move {
            let mut incoming = incoming;
            while let Some((message, _src)) = incoming.recv().await {
                if message.header.response {
                    continue;
                }
                let response = {
                    let inner = inner_arc.lock().await;
                    build_response(&inner, &message, ttl)
                };
                if let Some(response) = response {
                    if let Err(err) = transport.send(&response).await {
                        log::warn!("query response failed: {err}");
                    }
                }
            }
        }));
        inner.started = true;
        Ok(())
    }

    /// Says goodbye for every registered service (best-effort), cancels the
    /// tasks, stops the transport and closes the event stream. Idempotent.
    pub async fn stop(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if !inner.started {
            return Ok(());
        }

        for service in inner.services.values() {
            match goodbye_message(service) {
                Ok(message) => {
                    if let Err(err) = self.transport.send(&message).await {
                        log::debug!("goodbye for {} not sent: {err}", service.full_name());
                    }
                }
                Err(err) => log::warn!("goodbye for {} not built: {err}", service.full_name()),
            }
        }

        for task in inner.announce_tasks.drain(..) {
            task.abort();
        }
        if let Some(task) = inner.refresh_task.take() {
            task.abort();
        }
        if let Some(task) = inner.recv_task.take() {
            task.abort();
        }
        if let Err(err) = self.transport.stop().await {
            log::warn!("transport stop failed: {err}");
        }
        inner.event_tx = None;
        inner.services.clear();
        inner.started = false;
        Ok(())
    }

    /// Registers `service` and announces it. The port must be set; an empty
    /// host or address list is filled from the advertiser's locals.
    pub async fn register(&self, service: Service) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if !inner.started {
            return Err(Error::ErrNotStarted);
        }
        if service.port.is_none() {
            return Err(Error::ErrMissingPort);
        }
        let service = self.fill_locals(&inner, service);
        inner
            .services
            .insert(service.full_name().to_lowercase(), service.clone());
        inner.emit(AdvertiserEvent::Registered(service.clone()));
        self.spawn_announce(&mut inner, service);
        self.ensure_refresh_task(&mut inner);
        Ok(())
    }

    /// Withdraws `service`: removes it, sends a goodbye (best-effort) and
    /// emits `Unregistered`. Unknown services are a no-op.
    pub async fn unregister(&self, service: &Service) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if !inner.started {
            return Err(Error::ErrNotStarted);
        }
        let key = service.full_name().to_lowercase();
        if let Some(service) = inner.services.remove(&key) {
            match goodbye_message(&service) {
                Ok(message) => {
                    if let Err(err) = self.transport.send(&message).await {
                        log::debug!("goodbye for {} not sent: {err}", service.full_name());
                    }
                }
                Err(err) => log::warn!("goodbye for {} not built: {err}", service.full_name()),
            }
            inner.emit(AdvertiserEvent::Unregistered(service));
        }
        Ok(())
    }

    /// Replaces an already-registered service and re-announces it.
    pub async fn update(&self, service: Service) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if !inner.started {
            return Err(Error::ErrNotStarted);
        }
        let key = service.full_name().to_lowercase();
        if !inner.services.contains_key(&key) {
            return Err(Error::ErrServiceNotFound);
        }
        let service = self.fill_locals(&inner, service);
        inner.services.insert(key, service.clone());
        inner.emit(AdvertiserEvent::Updated(service.clone()));
        self.spawn_announce(&mut inner, service);
        Ok(())
    }

    /// Snapshot of all registered services.
    pub async fn services(&self) -> Vec<Service> {
        self.inner.lock().await.services.values().cloned().collect()
    }

    fn fill_locals(&self, inner: &Inner, mut service: Service) -> Service {
        if service.host.is_none() {
            service.host = Some(inner.host_name.clone());
        }
        if !service.has_addresses() {
            service.ipv4_addresses = self.config.local_ipv4_addresses();
            service.ipv6_addresses = self.config.local_ipv6_addresses();
        }
        service.ttl = self.config.ttl;
        service
    }

    // Initial announcement: `announcement_count` sends with exponentially
    // growing gaps (1 s, 2 s, 4 s, ...).
    fn spawn_announce(&self, inner: &mut Inner, service: Service) {
        inner.announce_tasks.retain(|task| !task.is_finished());

        let transport = self.transport.clone();
        let count = self.config.announcement_count;
        inner.announce_tasks.push(tokio::spawn(async move {
            let message = match announcement_message(&service) {
                Ok(message) => message,
                Err(err) => {
                    log::warn!("cannot announce {}: {err}", service.full_name());
                    return;
                }
            };
            for i in 0..count {
                if let Err(err) = transport.send(&message).await {
                    log::warn!("announcement of {} failed: {err}", service.full_name());
                }
                if i + 1 < count {
                    tokio::time::sleep(Duration::from_secs(1u64 << i.min(16))).await;
                }
            }
        }));
    }

    fn ensure_refresh_task(&self, inner: &mut Inner) {
        if inner.refresh_task.is_some() {
            return;
        }
        let inner_arc = self.inner.clone();
        let transport = self.transport.clone();
        let interval = self.config.announcement_interval;
        inner.refresh_task = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let services: Vec<Service> = {
                    let inner = inner_arc.lock().await;
                    inner.services.values().cloned().collect()
                };
                for service in services {
                    match announcement_message(&service) {
                        Ok(message) => {
                            if let Err(err) = transport.send(&message).await {
                                log::warn!("re-announcement of {} failed: {err}", service.full_name());
                                inner_arc.lock().await.emit(AdvertiserEvent::Error(err));
                            }
                        }
                        Err(err) => {
                            log::warn!("re-announcement of {} not built: {err}", service.full_name())
                        }
                    }
                }
            }
        }));
    }
}

// The advertised host name: the configured override or the machine host
// name, qualified with ".local".
fn local_host_name(configured: Option<&str>) -> String {
    let base = match configured {
        Some(name) => name.trim_end_matches('.').to_owned(),
        None => hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "localhost".to_owned()),
    };
    if base.to_ascii_lowercase().ends_with(".local") {
        base
    } else {
        format!("{base}.local")
    }
}

fn host_name_of(service: &Service) -> Result<Name> {
    let host = service
        .host
        .as_deref()
        .ok_or_else(|| Error::Other("service host not set".to_owned()))?;
    Name::new(host)
}

fn ptr_record(service: &Service) -> Result<Record> {
    Ok(Record::new(
        Name::new(&service.full_type())?,
        DNSCLASS_INET,
        false,
        service.ttl,
        RData::Ptr(Name::new(&service.full_name())?),
    ))
}

fn srv_record(service: &Service) -> Result<Record> {
    Ok(Record::new(
        Name::new(&service.full_name())?,
        DNSCLASS_INET,
        true,
        service.ttl,
        RData::Srv {
            priority: service.priority,
            weight: service.weight,
            port: service.port.unwrap_or(0),
            target: host_name_of(service)?,
        },
    ))
}

fn txt_record(service: &Service) -> Result<Record> {
    Ok(Record::new(
        Name::new(&service.full_name())?,
        DNSCLASS_INET,
        true,
        service.ttl,
        RData::Txt(service.txt.to_strings().to_vec()),
    ))
}

fn address_records(service: &Service) -> Result<Vec<Record>> {
    let host = host_name_of(service)?;
    let mut records = Vec::new();
    for addr in &service.ipv4_addresses {
        records.push(Record::new(
            host.clone(),
            DNSCLASS_INET,
            true,
            service.ttl,
            RData::A(*addr),
        ));
    }
    for addr in &service.ipv6_addresses {
        records.push(Record::new(
            host.clone(),
            DNSCLASS_INET,
            true,
            service.ttl,
            RData::Aaaa(*addr),
        ));
    }
    Ok(records)
}

// One announcement: the PTR as the answer, the SRV/TXT/address records as
// additionals, mirroring the responder's section placement.
fn announcement_message(service: &Service) -> Result<Message> {
    let mut additionals = vec![srv_record(service)?, txt_record(service)?];
    additionals.extend(address_records(service)?);
    Ok(Message::mdns_response(vec![ptr_record(service)?], additionals))
}

// A goodbye carries the whole record set with TTL 0.
fn goodbye_message(service: &Service) -> Result<Message> {
    let mut records = vec![
        ptr_record(service)?,
        srv_record(service)?,
        txt_record(service)?,
    ];
    records.extend(address_records(service)?);
    Ok(Message::mdns_goodbye(records))
}

// The query responder: matches every question against the registered
// services and assembles at most one response. None when nothing matched.
fn build_response(inner: &Inner, message: &Message, ttl: u32) -> Option<Message> {
    let meta_name = Name::new(META_QUERY_SERVICE).ok()?;
    let mut answers = Vec::new();
    let mut additionals = Vec::new();

    for question in &message.questions {
        // DNS-SD service enumeration: one PTR per distinct registered type.
        if matches!(question.typ, DnsType::Ptr | DnsType::Any) && question.name == meta_name {
            let mut seen = Vec::new();
            for service in inner.services.values() {
                let full_type = service.full_type().to_lowercase();
                if seen.contains(&full_type) {
                    continue;
                }
                seen.push(full_type);
                if let Ok(type_name) = Name::new(&service.full_type()) {
                    answers.push(Record::new(
                        meta_name.clone(),
                        DNSCLASS_INET,
                        false,
                        ttl,
                        RData::Ptr(type_name),
                    ));
                }
            }
            continue;
        }

        for service in inner.services.values() {
            let records = match service_answers(service, question) {
                Ok(records) => records,
                Err(err) => {
                    log::warn!("skipping {} in response: {err}", service.full_name());
                    continue;
                }
            };
            if let Some((answer, extra)) = records {
                if let Some(answer) = answer {
                    answers.push(answer);
                }
                additionals.extend(extra);
            }
        }
    }

    if answers.is_empty() && additionals.is_empty() {
        None
    } else {
        Some(Message::mdns_response(answers, additionals))
    }
}

// The records one service contributes for one question: an optional answer
// plus additionals.
#[allow(clippy::type_complexity)]
fn service_answers(
    service: &Service,
    question: &crate::message::question::Question,
) -> Result<Option<(Option<Record>, Vec<Record>)>> {
    let full_type = Name::new(&service.full_type())?;
    let full_name = Name::new(&service.full_name())?;
    let host = host_name_of(service)?;

    match question.typ {
        DnsType::Ptr | DnsType::Any if question.name == full_type => {
            let mut extra = vec![srv_record(service)?, txt_record(service)?];
            extra.extend(address_records(service)?);
            Ok(Some((Some(ptr_record(service)?), extra)))
        }
        DnsType::Srv | DnsType::Txt | DnsType::Any if question.name == full_name => {
            let mut extra = vec![srv_record(service)?, txt_record(service)?];
            extra.extend(address_records(service)?);
            Ok(Some((None, extra)))
        }
        DnsType::A | DnsType::Aaaa | DnsType::Any if question.name == host => {
            Ok(Some((None, address_records(service)?)))
        }
        _ => Ok(None),
    }
}
