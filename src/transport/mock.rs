//! In-memory transport for actor tests: incoming traffic is fed by the test,
//! outgoing traffic is captured with virtual-time stamps.

use std::net::SocketAddr;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;

use crate::error::Result;
use crate::message::Message;
use crate::transport::Transport;

pub(crate) struct SentMessage {
    pub(crate) message: Message,
    pub(crate) target: Option<SocketAddr>,
    pub(crate) at: Instant,
}

pub(crate) struct MockTransport {
    incoming_tx: UnboundedSender<(Message, SocketAddr)>,
    incoming_rx: Mutex<Option<UnboundedReceiver<(Message, SocketAddr)>>>,
    sent: Mutex<Vec<SentMessage>>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        MockTransport {
            incoming_tx: tx,
            incoming_rx: Mutex::new(Some(rx)),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Feeds a message into the incoming stream, as if it had arrived on the
    /// multicast group from `src`.
    pub(crate) fn push_incoming(&self, message: Message, src: SocketAddr) {
        let _ = self.incoming_tx.send((message, src));
    }

    /// Snapshot of every message sent so far, in send order.
    pub(crate) fn sent(&self) -> Vec<(Message, Option<SocketAddr>, Instant)> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|s| (s.message.clone(), s.target, s.at))
            .collect()
    }

    pub(crate) fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub(crate) fn clear_sent(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn start(&self) -> Result<()> {
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        Ok(())
    }

    async fn send(&self, message: &Message) -> Result<()> {
        self.sent.lock().unwrap().push(SentMessage {
            message: message.clone(),
            target: None,
            at: Instant::now(),
        });
        Ok(())
    }

    async fn send_to(&self, message: &Message, target: SocketAddr) -> Result<()> {
        self.sent.lock().unwrap().push(SentMessage {
            message: message.clone(),
            target: Some(target),
            at: Instant::now(),
        });
        Ok(())
    }

    fn take_incoming(&self) -> Option<UnboundedReceiver<(Message, SocketAddr)>> {
        self.incoming_rx.lock().unwrap().take()
    }
}
