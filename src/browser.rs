//! DNS-SD service browsing: periodic PTR queries and the record pipeline
//! that turns PTR, SRV/TXT and A/AAAA answers into resolved services.


use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::config::BrowserConfig;
use crate::error::{Error, Result};
use crate::message::name::Name;
use crate::message::record::RData;
use crate::message::{DnsType, Message};
use crate::service::Service;
use crate::transport::udp::UdpTransport;
use crate::transport::Transport;
use crate::txt::TxtRecord;

/// Events observed while browsing.
#[derive(Debug)]
pub enum BrowserEvent {
    /// A new instance appeared (first PTR sighting).
    Found(Service),
    /// An instance gained or changed resolution data (SRV, TXT or an
    /// address).
    Updated(Service),
    /// An instance said goodbye, or browsing for its type stopped.
    Removed(Service),
    /// A transport-level failure. Decoder faults never show up here.
    Error(Error),
}

/// Browses the local network for DNS-SD services.
///
/// One receive task consumes the transport's incoming stream and applies
/// each response to the service table; one periodic task re-queries every
/// browsed type. All state sits behind a single lock, so state transitions
/// are serialized and the event stream is FIFO.
pub struct ServiceBrowser {
    config: BrowserConfig,
    transport: Arc<dyn Transport>,
    inner: Arc<Mutex<Inner>>,
    events_rx: std::sync::Mutex<Option<UnboundedReceiver<BrowserEvent>>>,
}

struct Inner {
    started: bool,
    /// Browsed service types, keyed by lowercased fully-qualified type.
    browsing: HashSet<String>,
    /// Known services, keyed by lowercased full name.
    services: HashMap<String, Service>,
    event_tx: Option<UnboundedSender<BrowserEvent>>,
    recv_task: Option<JoinHandle<()>>,
    query_task: Option<JoinHandle<()>>,
}

impl Inner {
    fn emit(&self, event: BrowserEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event);
        }
    }
}

impl ServiceBrowser {
    /// A browser over the standard UDP multicast transport.
    pub fn new(config: BrowserConfig) -> Self {
        let transport = Arc::new(UdpTransport::new(config.transport.clone()));
        Self::with_transport(transport, config)
    }

    /// A browser over a caller-supplied transport.
    pub fn with_transport(transport: Arc<dyn Transport>, config: BrowserConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        ServiceBrowser {
            config,
            transport,
            inner: Arc::new(Mutex::new(Inner {
                started: false,
                browsing: HashSet::new(),
                services: HashMap::new(),
                event_tx: Some(tx),
                recv_task: None,
                query_task: None,
            })),
            events_rx: std::sync::Mutex::new(Some(rx)),
        }
    }

    /// Hands over the event stream. Yields `Some` exactly once.
    pub fn take_events(&self) -> Option<UnboundedReceiver<BrowserEvent>> {
        self.events_rx.lock().unwrap().take()
    }

    /// Starts the transport and the receive task. Idempotent.
    pub async fn start(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.started {
            return Ok(());
        }
        self.transport.start().await?;
        let incoming = self
            .transport
            .take_incoming()
            .ok_or(Error::ErrTransportClosed)?;

        let inner_arc = self.inner.clone();
        let transport = self.transport.clone();
        let auto_resolve = self.config.auto_resolve;
        inner.recv_task = Some(tokio::spawn(async move {
            let mut incoming = incoming;
            while let Some((message, _src)) = incoming.recv().await {
                let to_resolve = {
                    let mut inner = inner_arc.lock().await;
                    handle_response(&mut inner, &message, auto_resolve)
                };
                for service in to_resolve {
                    if let Err(err) = send_resolve_query(transport.as_ref(), &service).await {
                        log::warn!("auto-resolve of {} failed: {err}", service.full_name());
                    }
                }
            }
        }));
        inner.started = true;
        Ok(())
    }

    /// Cancels the tasks, stops the transport, closes the event stream and
    /// clears all state. Idempotent.
    pub async fn stop(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if !inner.started {
            return Ok(());
        }
        if let Some(task) = inner.recv_task.take() {
            task.abort();
        }
        if let Some(task) = inner.query_task.take() {
            task.abort();
        }
        if let Err(err) = self.transport.stop().await {
            log::warn!("transport stop failed: {err}");
        }
        inner.event_tx = None;
        inner.browsing.clear();
        inner.services.clear();
        inner.started = false;
        Ok(())
    }

    /// Begins browsing for `service_type` (e.g. `"_http._tcp"`): sends one
    /// immediate PTR query and keeps re-querying every
    /// [`query_interval`](crate::config::BrowserConfig::query_interval).
    pub async fn browse(&self, service_type: &str) -> Result<()> {
        let full_type = normalize_service_type(service_type);
        let name = Name::new(&full_type)?;

        let mut inner = self.inner.lock().await;
        if !inner.started {
            return Err(Error::ErrNotStarted);
        }
        inner.browsing.insert(full_type.to_lowercase());
        self.transport.send(&Message::mdns_ptr_query(name)).await?;

        if inner.query_task.is_none() {
            let inner_arc = self.inner.clone();
            let transport = self.transport.clone();
            let interval = self.config.query_interval;
            inner.query_task = Some(tokio::spawn(async move {
                loop {
                    tokio::time::sleep(interval).await;
                    let types: Vec<String> = {
                        let inner = inner_arc.lock().await;
                        inner.browsing.iter().cloned().collect()
                    };
                    for full_type in types {
                        let message = match Name::new(&full_type) {
                            Ok(name) => Message::mdns_ptr_query(name),
                            Err(err) => {
                                log::warn!("browsed type {full_type} became invalid: {err}");
                                continue;
                            }
                        };
                        if let Err(err) = transport.send(&message).await {
                            log::warn!("periodic query for {full_type} failed: {err}");
                            inner_arc.lock().await.emit(BrowserEvent::Error(err));
                        }
                    }
                }
            }));
        }
        Ok(())
    }

    /// Stops browsing for `service_type` and removes (with `Removed` events)
    /// every known instance of it.
    pub async fn stop_browsing(&self, service_type: &str) {
        let full_type = normalize_service_type(service_type).to_lowercase();
        let mut inner = self.inner.lock().await;
        inner.browsing.remove(&full_type);

        let keys: Vec<String> = inner
            .services
            .iter()
            .filter(|(_, s)| s.full_type().to_lowercase() == full_type)
            .map(|(k, _)| k.clone())
            .collect();
        for key in keys {
            if let Some(service) = inner.services.remove(&key) {
                inner.emit(BrowserEvent::Removed(service));
            }
        }
    }

    /// Requests resolution of `service` with a QU query for its SRV and TXT
    /// records; the answer flows through the normal receive path. Returns
    /// the instance's current state.
    pub async fn resolve(&self, service: &Service) -> Result<Option<Service>> {
        let inner = self.inner.lock().await;
        if !inner.started {
            return Err(Error::ErrNotStarted);
        }
        send_resolve_query(self.transport.as_ref(), service).await?;
        Ok(inner
            .services
            .get(&service.full_name().to_lowercase())
            .cloned())
    }

    /// Snapshot of all currently known services.
    pub async fn services(&self) -> Vec<Service> {
        self.inner.lock().await.services.values().cloned().collect()
    }
}

// Fully qualifies a service type: "_http._tcp" -> "_http._tcp.local.".
fn normalize_service_type(service_type: &str) -> String {
    let t = service_type.trim_end_matches('.');
    if t.to_ascii_lowercase().ends_with(".local") {
        format!("{t}.")
    } else {
        format!("{t}.local.")
    }
}

async fn send_resolve_query(transport: &dyn Transport, service: &Service) -> Result<()> {
    let name = Name::new(&service.full_name())?;
    let message = Message::mdns_query(name, &[DnsType::Srv, DnsType::Txt], true);
    transport.send(&message).await
}

// Builds a fresh Service from a PTR target and the type name it was
// announced under. None if the target is not under the type.
fn service_from_ptr(target: &Name, type_name: &Name) -> Option<Service> {
    if !target.ends_with(type_name) || target.labels().len() <= type_name.labels().len() {
        return None;
    }
    let split = target.labels().len() - type_name.labels().len();
    let instance = target.labels()[..split].join(".");

    let type_labels = type_name.labels();
    let domain = type_labels.last()?.clone();
    let service_type = type_labels[..type_labels.len() - 1].join(".");
    Some(Service::new(&instance, &service_type).with_domain(&domain))
}

// The response demultiplexer: applies one received message to the service
// table, emitting events in record order. Returns the instances to
// auto-resolve. Queries are ignored.
fn handle_response(inner: &mut Inner, message: &Message, auto_resolve: bool) -> Vec<Service> {
    if !message.header.response {
        return Vec::new();
    }

    let mut to_resolve = Vec::new();
    for record in message.answers.iter().chain(&message.additionals) {
        match &record.rdata {
            RData::Ptr(target) => {
                if record.ttl > 0 {
                    let type_key = record.name.to_string().to_lowercase();
                    if !inner.browsing.contains(&type_key) {
                        continue;
                    }
                    let key = target.to_string().to_lowercase();
                    if inner.services.contains_key(&key) {
                        if let Some(existing) = inner.services.get_mut(&key) {
                            existing.last_seen = Instant::now();
                        }
                    } else if let Some(service) = service_from_ptr(target, &record.name) {
                        inner.services.insert(key, service.clone());
                        inner.emit(BrowserEvent::Found(service.clone()));
                        if auto_resolve {
                            to_resolve.push(service);
                        }
                    }
                } else {
                    // Goodbye.
                    let key = target.to_string().to_lowercase();
                    if let Some(service) = inner.services.remove(&key) {
                        inner.emit(BrowserEvent::Removed(service));
                    }
                }
            }
            RData::Srv {
                priority,
                weight,
                port,
                target,
            } => {
                let key = record.name.to_string().to_lowercase();
                if let Some(service) = inner.services.get_mut(&key) {
                    service.host = Some(target.to_string().trim_end_matches('.').to_owned());
                    service.port = Some(*port);
                    service.priority = *priority;
                    service.weight = *weight;
                    service.last_seen = Instant::now();
                    let updated = service.clone();
                    inner.emit(BrowserEvent::Updated(updated));
                }
            }
            RData::Txt(strings) => {
                let key = record.name.to_string().to_lowercase();
                if let Some(service) = inner.services.get_mut(&key) {
                    service.txt = TxtRecord::from_strings(strings.iter().cloned());
                    service.last_seen = Instant::now();
                    let updated = service.clone();
                    inner.emit(BrowserEvent::Updated(updated));
                }
            }
            RData::A(_) | RData::Aaaa(_) => {
                let host_key = record
                    .name
                    .to_string()
                    .trim_end_matches('.')
                    .to_lowercase();
                let mut updated = Vec::new();
                for service in inner.services.values_mut() {
                    let matches = service
                        .host
                        .as_deref()
                        .is_some_and(|h| h.eq_ignore_ascii_case(&host_key));
                    if !matches {
                        continue;
                    }
                    let appended = match &record.rdata {
                        RData::A(addr) if !service.ipv4_addresses.contains(addr) => {
                            service.ipv4_addresses.push(*addr);
                            true
                        }
                        RData::Aaaa(addr) if !service.ipv6_addresses.contains(addr) => {
                            service.ipv6_addresses.push(*addr);
                            true
                        }
                        _ => false,
                    };
                    if appended {
                        service.last_seen = Instant::now();
                        updated.push(service.clone());
                    }
                }
                for service in updated {
                    inner.emit(BrowserEvent::Updated(service));
                }
            }
            _ => {}
        }
    }
    to_resolve
}
