//! Scripted in-memory transport for channel tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chatline_channel::{DiagnosticSink, ObserverKind};
use chatline_protocol::{DomainMessage, EnvelopeCodec, ProtocolError, RoomId, SenderId, WireEnvelope};
use chatline_transport::{Connection, ConnectionId, Connector, TransportError};
use tokio::sync::{mpsc, Notify};

/// What the next `open` does.
#[derive(Clone)]
pub enum OpenPlan {
    Succeed,
    Fail,
    /// Waits for the notify, then succeeds.
    Gated(Arc<Notify>),
    /// Waits for the notify, then fails.
    GatedFail(Arc<Notify>),
}

enum Inbound {
    Frame(Vec<u8>),
    Close,
}

#[derive(Default)]
struct Shared {
    opens: AtomicUsize,
    closes: AtomicUsize,
    plans: Mutex<VecDeque<OpenPlan>>,
    fail_by_default: Mutex<bool>,
    peers: Mutex<Vec<MockPeer>>,
    written: Mutex<Vec<Vec<u8>>>,
}

/// A connector whose open attempts follow a script. Plans are consumed
/// in order; once exhausted, every open succeeds (or fails, after
/// [`MockConnector::fail_by_default`]).
#[derive(Clone, Default)]
pub struct MockConnector {
    shared: Arc<Shared>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_plan(&self, plan: OpenPlan) -> &Self {
        self.shared.plans.lock().unwrap().push_back(plan);
        self
    }

    pub fn fail_by_default(&self) -> &Self {
        *self.shared.fail_by_default.lock().unwrap() = true;
        self
    }

    /// Open attempts made so far, successful or not.
    pub fn opens(&self) -> usize {
        self.shared.opens.load(Ordering::SeqCst)
    }

    /// `close()` calls across every connection.
    pub fn closes(&self) -> usize {
        self.shared.closes.load(Ordering::SeqCst)
    }

    /// The remote side of the n-th successfully opened connection.
    pub fn peer(&self, n: usize) -> MockPeer {
        self.shared.peers.lock().unwrap()[n].clone()
    }

    /// Every frame written by the channel, in order.
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.shared.written.lock().unwrap().clone()
    }

    pub fn written_envelopes(&self) -> Vec<WireEnvelope> {
        self.written()
            .iter()
            .map(|bytes| serde_json::from_slice(bytes).unwrap())
            .collect()
    }

    fn next_plan(&self) -> OpenPlan {
        let scripted = self.shared.plans.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            if *self.shared.fail_by_default.lock().unwrap() {
                OpenPlan::Fail
            } else {
                OpenPlan::Succeed
            }
        })
    }
}

impl Connector for MockConnector {
    type Connection = MockConnection;
    type Error = TransportError;

    async fn open(&self, url: &str) -> Result<MockConnection, TransportError> {
        self.shared.opens.fetch_add(1, Ordering::SeqCst);
        match self.next_plan() {
            OpenPlan::Fail => return Err(refused(url)),
            OpenPlan::GatedFail(gate) => {
                gate.notified().await;
                return Err(refused(url));
            }
            OpenPlan::Gated(gate) => gate.notified().await,
            OpenPlan::Succeed => {}
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let peer = MockPeer { tx: tx.clone() };
        self.shared.peers.lock().unwrap().push(peer);
        Ok(MockConnection {
            id: ConnectionId::next(),
            inbound: tokio::sync::Mutex::new(rx),
            loopback: tx,
            shared: Arc::clone(&self.shared),
        })
    }
}

fn refused(url: &str) -> TransportError {
    TransportError::open_failed(
        url,
        std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
    )
}

pub struct MockConnection {
    id: ConnectionId,
    inbound: tokio::sync::Mutex<mpsc::UnboundedReceiver<Inbound>>,
    loopback: mpsc::UnboundedSender<Inbound>,
    shared: Arc<Shared>,
}

impl Connection for MockConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        self.shared.written.lock().unwrap().push(data.to_vec());
        Ok(())
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        match self.inbound.lock().await.recv().await {
            Some(Inbound::Frame(data)) => Ok(Some(data)),
            Some(Inbound::Close) | None => Ok(None),
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.shared.closes.fetch_add(1, Ordering::SeqCst);
        let _ = self.loopback.send(Inbound::Close);
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

/// The server end of a mock connection.
#[derive(Clone)]
pub struct MockPeer {
    tx: mpsc::UnboundedSender<Inbound>,
}

impl MockPeer {
    pub fn push_frame(&self, data: impl Into<Vec<u8>>) {
        let _ = self.tx.send(Inbound::Frame(data.into()));
    }

    pub fn push_message(&self, message: &DomainMessage) {
        let bytes = EnvelopeCodec::json().encode(message, 1_000).unwrap();
        self.push_frame(bytes);
    }

    /// Simulates the server dropping the connection.
    pub fn close(&self) {
        let _ = self.tx.send(Inbound::Close);
    }
}

/// Diagnostic sink that records what it is told.
#[derive(Default)]
pub struct RecordingSink {
    pub panics: Mutex<Vec<(ObserverKind, String)>>,
    pub rejected: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn panic_count(&self) -> usize {
        self.panics.lock().unwrap().len()
    }

    pub fn rejected_count(&self) -> usize {
        self.rejected.lock().unwrap().len()
    }
}

impl DiagnosticSink for RecordingSink {
    fn observer_panicked(&self, kind: ObserverKind, message: &str) {
        self.panics.lock().unwrap().push((kind, message.to_string()));
    }

    fn frame_rejected(&self, error: &ProtocolError) {
        self.rejected.lock().unwrap().push(error.to_string());
    }
}

pub fn chat(content: &str) -> DomainMessage {
    DomainMessage::chat(
        SenderId::from("user-1"),
        "alice",
        RoomId::from("general"),
        content,
    )
}

/// Lets every spawned task run until idle. Time is paused in these
/// tests, so this does not wait in real time.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
