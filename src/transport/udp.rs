//! UDP multicast transport: one socket per enabled address family, merged
//! into a single incoming stream.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use crate::config::TransportConfig;
use crate::error::{Error, Result};
use crate::message::{Message, MAX_MDNS_MESSAGE_SIZE};
use crate::socket::MulticastSocket;
use crate::transport::{Transport, MDNS_DEST_ADDR_V4, MDNS_DEST_ADDR_V6};

/// The standard transport: IPv4 and/or IPv6 multicast sockets on port 5353.
///
/// Receiving runs on one task per socket; both feed the same unbounded
/// stream. Datagrams that fail to decode are dropped silently (trace-logged)
/// per RFC 6762's tolerance for junk on the multicast group.
pub struct UdpTransport {
    config: TransportConfig,
    state: Mutex<State>,
    incoming_rx: Mutex<Option<UnboundedReceiver<(Message, SocketAddr)>>>,
}

#[derive(Default)]
struct State {
    started: bool,
    v4: Option<Arc<UdpSocket>>,
    v6: Option<Arc<UdpSocket>>,
    tasks: Vec<JoinHandle<()>>,
    incoming_tx: Option<UnboundedSender<(Message, SocketAddr)>>,
}

impl UdpTransport {
    pub fn new(config: TransportConfig) -> Self {
        UdpTransport {
            config,
            state: Mutex::new(State::default()),
            incoming_rx: Mutex::new(None),
        }
    }

    fn spawn_recv_task(
        socket: Arc<UdpSocket>,
        tx: UnboundedSender<(Message, SocketAddr)>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut buf = vec![0u8; MAX_MDNS_MESSAGE_SIZE];
            loop {
                match socket.recv_from(&mut buf).await {
                    Ok((len, src)) => match Message::unpack(&buf[..len]) {
                        Ok(message) => {
                            if tx.send((message, src)).is_err() {
                                break;
                            }
                        }
                        Err(err) => {
                            log::trace!("dropping malformed datagram from {src}: {err}");
                        }
                    },
                    Err(err) => {
                        log::warn!("mdns receive failed: {err}");
                        break;
                    }
                }
            }
        })
    }

    fn sockets(&self) -> Result<(Option<Arc<UdpSocket>>, Option<Arc<UdpSocket>>)> {
        let state = self.state.lock().unwrap();
        if !state.started {
            return Err(Error::ErrTransportClosed);
        }
        Ok((state.v4.clone(), state.v6.clone()))
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn start(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.started {
            return Ok(());
        }

        let (tx, rx) = mpsc::unbounded_channel();

        if self.config.use_ipv4 {
            let mut builder = MulticastSocket::ipv4();
            if let Some(iface) = self.config.ipv4_interface {
                builder = builder.with_ipv4_interface(iface);
            }
            let socket = Arc::new(UdpSocket::from_std(builder.into_std()?)?);
            state
                .tasks
                .push(Self::spawn_recv_task(socket.clone(), tx.clone()));
            state.v4 = Some(socket);
        }

        if self.config.use_ipv6 {
            let mut builder = MulticastSocket::ipv6();
            if let Some(index) = self.config.ipv6_interface {
                builder = builder.with_ipv6_interface(index);
            }
            match builder.into_std() {
                Ok(std_socket) => {
                    let socket = Arc::new(UdpSocket::from_std(std_socket)?);
                    state
                        .tasks
                        .push(Self::spawn_recv_task(socket.clone(), tx.clone()));
                    state.v6 = Some(socket);
                }
                // Hosts without IPv6 connectivity are common; fall back to
                // IPv4-only rather than failing start when IPv4 is there.
                Err(err) if state.v4.is_some() => {
                    log::warn!("ipv6 mdns socket unavailable: {err}");
                }
                Err(err) => return Err(err.into()),
            }
        }

        state.incoming_tx = Some(tx);
        state.started = true;
        *self.incoming_rx.lock().unwrap() = Some(rx);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.started {
            return Ok(());
        }
        for task in state.tasks.drain(..) {
            task.abort();
        }
        state.v4 = None;
        state.v6 = None;
        // Dropping the sender completes the incoming stream.
        state.incoming_tx = None;
        state.started = false;
        Ok(())
    }

    async fn send(&self, message: &Message) -> Result<()> {
        let buf = message.pack()?;
        let (v4, v6) = self.sockets()?;
        if let Some(socket) = v4 {
            socket.send_to(&buf, MDNS_DEST_ADDR_V4).await?;
        }
        if let Some(socket) = v6 {
            socket.send_to(&buf, MDNS_DEST_ADDR_V6).await?;
        }
        Ok(())
    }

    async fn send_to(&self, message: &Message, target: SocketAddr) -> Result<()> {
        let buf = message.pack()?;
        let (v4, v6) = self.sockets()?;
        let socket = match target {
            SocketAddr::V4(_) => v4,
            SocketAddr::V6(_) => v6,
        }
        .ok_or(Error::ErrTransportClosed)?;
        socket.send_to(&buf, target).await?;
        Ok(())
    }

    fn take_incoming(&self) -> Option<UnboundedReceiver<(Message, SocketAddr)>> {
        self.incoming_rx.lock().unwrap().take()
    }
}
