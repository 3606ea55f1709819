//! The caller-facing channel handle and its builder.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use chatline_protocol::{now_epoch_millis, Codec, DomainMessage, EnvelopeCodec, JsonCodec};
use chatline_transport::Connector;
use tokio::sync::{mpsc, oneshot};

use crate::actor::{ChannelActor, Command};
use crate::status::StatusCell;
use crate::{
    ChannelConfig, ChannelError, ConnectionStatus, DiagnosticSink, RetryPolicy,
    SubscriberRegistry, Subscription, TracingDiagnostics,
};

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// A handle to a resilient messaging channel.
///
/// Cheap to clone; every clone talks to the same channel. The channel's
/// actor task stops once the last handle is dropped, closing the
/// transport.
///
/// ```rust,no_run
/// # async fn demo() -> Result<(), chatline_channel::ChannelError> {
/// use chatline_channel::Channel;
/// use chatline_transport::WebSocketConnector;
///
/// let channel = Channel::builder()
///     .url("ws://127.0.0.1:8080")
///     .build(WebSocketConnector::new());
///
/// let _sub = channel.on_message(|msg| println!("{}: {}", msg.sender_display_name, msg.content));
/// channel.connect().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Channel {
    commands: mpsc::UnboundedSender<Command>,
    status: Arc<StatusCell>,
    attempts: Arc<AtomicU32>,
    registry: Arc<SubscriberRegistry>,
}

impl Channel {
    /// Starts building a channel.
    pub fn builder() -> ChannelBuilder {
        ChannelBuilder::default()
    }

    /// Opens the transport.
    ///
    /// Resolves once the transport is open. If the channel is already
    /// connected this resolves immediately; if an open is in flight the
    /// call waits on that open instead of starting a second one.
    ///
    /// # Errors
    /// - `ChannelError::TransportOpen` if the open failed. No automatic
    ///   retry follows a failed open that a caller was waiting on.
    /// - `ChannelError::Superseded` if `disconnect()` ran first.
    /// - `ChannelError::Shutdown` if the actor has stopped.
    pub async fn connect(&self) -> Result<(), ChannelError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Connect { reply })
            .map_err(|_| ChannelError::Shutdown)?;
        rx.await.map_err(|_| ChannelError::Shutdown)?
    }

    /// Closes the transport and cancels any scheduled reconnection.
    /// Safe to call in any state, any number of times.
    ///
    /// The status reads `Idle` as soon as this returns. Messages sent
    /// before the call are still written; the transport closes in the
    /// background. Use [`Channel::close`] to wait for that.
    pub fn disconnect(&self) {
        self.request_disconnect(None);
    }

    /// Like [`Channel::disconnect`], then waits until messages sent
    /// before the call have been written and the transport is closed.
    pub async fn close(&self) {
        let (flushed, rx) = oneshot::channel();
        if self.request_disconnect(Some(flushed)) {
            let _ = rx.await;
        }
    }

    fn request_disconnect(&self, flushed: Option<oneshot::Sender<()>>) -> bool {
        self.status.request_disconnect();
        let queued = self.commands.send(Command::Disconnect { flushed }).is_ok();
        if !queued {
            tracing::trace!("disconnect on a stopped channel");
        }
        queued
    }

    /// `true` only while the transport is open.
    pub fn is_connected(&self) -> bool {
        self.status().is_connected()
    }

    /// The channel's current internal status.
    pub fn status(&self) -> ConnectionStatus {
        self.status.get()
    }

    /// Automatic reconnection attempts made in the current episode.
    pub fn retry_attempts(&self) -> u32 {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Sends a message if the transport is open.
    ///
    /// Fire-and-forget: when not connected the message is dropped and
    /// nothing is queued for later. The send time is stamped here.
    pub fn send_message(&self, message: DomainMessage) {
        if !self.is_connected() {
            tracing::debug!(kind = %message.kind, room = %message.room_id, "not connected, message dropped");
            return;
        }
        let sent_at = now_epoch_millis();
        if self
            .commands
            .send(Command::Send { message, sent_at })
            .is_err()
        {
            tracing::debug!("channel stopped, message dropped");
        }
    }

    /// Registers a message observer. It receives every successfully
    /// decoded inbound message until removed.
    pub fn on_message<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&DomainMessage) + Send + Sync + 'static,
    {
        self.registry.add_message_observer(observer)
    }

    /// Registers a status observer. It receives `Connected`,
    /// `Disconnected` and `Error` transitions.
    pub fn on_connection_change<F>(&self, observer: F) -> Subscription
    where
        F: Fn(ConnectionStatus) + Send + Sync + 'static,
    {
        self.registry.add_status_observer(observer)
    }

    /// Waits until the status satisfies `predicate`, returning the
    /// matching status. Returns `None` if the actor stopped first.
    pub async fn wait_for_status(
        &self,
        predicate: impl FnMut(&ConnectionStatus) -> bool,
    ) -> Option<ConnectionStatus> {
        let mut rx = self.status.subscribe();
        tokio::select! {
            status = rx.wait_for(predicate) => status.ok().map(|s| *s),
            () = self.commands.closed() => None,
        }
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("status", &self.status())
            .field("retry_attempts", &self.retry_attempts())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// ChannelBuilder
// ---------------------------------------------------------------------------

/// Configures and starts a [`Channel`].
pub struct ChannelBuilder {
    config: ChannelConfig,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl Default for ChannelBuilder {
    fn default() -> Self {
        Self {
            config: ChannelConfig::default(),
            diagnostics: Arc::new(TracingDiagnostics),
        }
    }
}

impl ChannelBuilder {
    /// Sets the endpoint.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.config.url = url.into();
        self
    }

    /// Sets the reconnection policy.
    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    /// Sets where absorbed failures are reported. Defaults to
    /// [`TracingDiagnostics`].
    pub fn diagnostics(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = sink;
        self
    }

    /// Starts the channel with the JSON wire format.
    ///
    /// Must be called from within a Tokio runtime. The channel starts
    /// `Idle`; nothing is opened until `connect()`.
    pub fn build<T: Connector>(self, connector: T) -> Channel {
        self.build_with_codec(connector, JsonCodec)
    }

    /// Starts the channel with a custom format codec.
    pub fn build_with_codec<T: Connector, C: Codec>(
        self,
        connector: T,
        codec: C,
    ) -> Channel {
        let registry = SubscriberRegistry::new(self.diagnostics);
        let status = Arc::new(StatusCell::new());
        let attempts = Arc::new(AtomicU32::new(0));
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();

        let actor = ChannelActor::new(
            self.config,
            connector,
            EnvelopeCodec::new(codec),
            Arc::clone(&registry),
            Arc::clone(&status),
            Arc::clone(&attempts),
            commands_rx,
        );
        tokio::spawn(actor.run());

        Channel {
            commands: commands_tx,
            status,
            attempts,
            registry,
        }
    }
}
