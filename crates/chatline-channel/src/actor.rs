//! Channel actor: the single task that owns a channel's connection state.
//!
//! Everything that mutates the status, the retry counter, or the live
//! connection happens here, one message at a time. Handles talk to the
//! actor through a command queue; the background tasks the actor spawns
//! (open attempts, readers, retry timers) report back through an event
//! queue.
//!
//! # Staleness
//!
//! The actor keeps a `generation` counter, bumped on every caller
//! `connect()`, every `disconnect()` and every transport open. Each event
//! carries the generation it was issued under; an event whose generation
//! no longer matches is discarded. That is how a retry timer that was
//! already sleeping when `disconnect()` arrived knows to do nothing.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use chatline_protocol::{Codec, DomainMessage, EnvelopeCodec};
use chatline_transport::{Connection, Connector};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::status::StatusCell;
use crate::{ChannelConfig, ChannelError, ConnectionStatus, SubscriberRegistry};

/// Reply channel for a pending `connect()`.
pub(crate) type ConnectReply = oneshot::Sender<Result<(), ChannelError>>;

/// Requests from channel handles.
pub(crate) enum Command {
    /// Open the transport, or join the open already in flight.
    Connect { reply: ConnectReply },
    /// Tear down the transport and cancel any pending reconnection.
    /// `flushed` fires once the old writer has drained and closed.
    Disconnect {
        flushed: Option<oneshot::Sender<()>>,
    },
    /// Encode and write a message, if still connected.
    Send {
        message: DomainMessage,
        sent_at: u64,
    },
}

/// Completions from tasks the actor spawned.
enum Event<T: Connector> {
    /// An open attempt finished.
    Opened {
        generation: u64,
        result: Result<Arc<T::Connection>, T::Error>,
    },
    /// The reader received a frame.
    Frame { generation: u64, data: Vec<u8> },
    /// The reader observed closure (clean or not).
    Closed {
        generation: u64,
        reason: Option<String>,
    },
    /// A reconnection delay elapsed.
    RetryDue { generation: u64 },
}

/// The tasks and queue belonging to one open transport.
struct ActiveConnection {
    outbound: mpsc::UnboundedSender<Vec<u8>>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

/// The internal channel state. Runs inside a Tokio task.
pub(crate) struct ChannelActor<T: Connector, C: Codec> {
    config: ChannelConfig,
    connector: Arc<T>,
    codec: EnvelopeCodec<C>,
    registry: Arc<SubscriberRegistry>,
    state: ConnectionStatus,
    status: Arc<StatusCell>,
    attempts: Arc<AtomicU32>,
    generation: u64,
    active: Option<ActiveConnection>,
    retry_timer: Option<JoinHandle<()>>,
    /// Callers waiting on the open in flight.
    waiters: Vec<ConnectReply>,
    commands: mpsc::UnboundedReceiver<Command>,
    events_tx: mpsc::UnboundedSender<Event<T>>,
    events: mpsc::UnboundedReceiver<Event<T>>,
}

impl<T: Connector, C: Codec> ChannelActor<T, C> {
    pub(crate) fn new(
        config: ChannelConfig,
        connector: T,
        codec: EnvelopeCodec<C>,
        registry: Arc<SubscriberRegistry>,
        status: Arc<StatusCell>,
        attempts: Arc<AtomicU32>,
        commands: mpsc::UnboundedReceiver<Command>,
    ) -> Self {
        let (events_tx, events) = mpsc::unbounded_channel();
        Self {
            config,
            connector: Arc::new(connector),
            codec,
            registry,
            state: ConnectionStatus::Idle,
            status,
            attempts,
            generation: 0,
            active: None,
            retry_timer: None,
            waiters: Vec::new(),
            commands,
            events_tx,
            events,
        }
    }

    /// Runs the actor loop until every channel handle has been dropped.
    pub(crate) async fn run(mut self) {
        tracing::debug!(url = %self.config.url, "channel actor started");

        loop {
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => break,
                },
                Some(event) = self.events.recv() => self.handle_event(event),
            }
        }

        self.teardown();
        tracing::debug!(url = %self.config.url, "channel actor stopped");
    }

    // -- Commands ---------------------------------------------------------

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Connect { reply } => self.handle_connect(reply),
            Command::Disconnect { flushed } => self.handle_disconnect(flushed),
            Command::Send { message, sent_at } => {
                self.handle_send(&message, sent_at)
            }
        }
    }

    fn handle_connect(&mut self, reply: ConnectReply) {
        match self.state {
            ConnectionStatus::Connected => {
                tracing::debug!("connect ignored, already connected");
                let _ = reply.send(Ok(()));
            }
            ConnectionStatus::Connecting => {
                tracing::debug!(waiting = self.waiters.len() + 1, "joining open in progress");
                self.waiters.push(reply);
            }
            _ => {
                self.waiters.push(reply);
                self.begin_open();
            }
        }
    }

    fn handle_disconnect(&mut self, flushed: Option<oneshot::Sender<()>>) {
        self.status.disconnect_handled();
        self.generation += 1;
        self.cancel_retry_timer();
        let writer = self.drop_connection();

        for reply in self.waiters.drain(..) {
            let _ = reply.send(Err(ChannelError::Superseded));
        }

        if let Some(flushed) = flushed {
            match writer {
                Some(writer) => {
                    tokio::spawn(async move {
                        let _ = writer.await;
                        let _ = flushed.send(());
                    });
                }
                None => {
                    let _ = flushed.send(());
                }
            }
        }

        let previous = self.set_status(ConnectionStatus::Idle);
        if previous == ConnectionStatus::Connected {
            self.notify(ConnectionStatus::Disconnected);
        }
        if previous != ConnectionStatus::Idle {
            tracing::info!(url = %self.config.url, from = %previous, "channel disconnected by caller");
        }
    }

    fn handle_send(&mut self, message: &DomainMessage, sent_at: u64) {
        let Some(active) = self
            .active
            .as_ref()
            .filter(|_| self.state.is_connected())
        else {
            tracing::debug!(kind = %message.kind, "transport not open, dropping message");
            return;
        };

        match self.codec.encode(message, sent_at) {
            Ok(bytes) => {
                if active.outbound.send(bytes).is_err() {
                    tracing::debug!("writer already gone, dropping message");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to encode outbound message");
            }
        }
    }

    // -- Events -----------------------------------------------------------

    fn handle_event(&mut self, event: Event<T>) {
        match event {
            Event::Opened { generation, result } => {
                self.handle_opened(generation, result)
            }
            Event::Frame { generation, data } => {
                self.handle_frame(generation, &data)
            }
            Event::Closed { generation, reason } => {
                self.handle_closed(generation, reason)
            }
            Event::RetryDue { generation } => self.handle_retry_due(generation),
        }
    }

    fn handle_opened(
        &mut self,
        generation: u64,
        result: Result<Arc<T::Connection>, T::Error>,
    ) {
        if generation != self.generation {
            tracing::debug!(generation, current = self.generation, "discarding stale open result");
            if let Ok(conn) = result {
                tokio::spawn(async move {
                    let _ = conn.close().await;
                });
            }
            return;
        }

        match result {
            Ok(conn) => {
                let conn_id = conn.id();
                self.attempts.store(0, Ordering::Relaxed);
                self.active = Some(self.spawn_io(conn, generation));
                self.set_status(ConnectionStatus::Connected);
                tracing::info!(url = %self.config.url, %conn_id, "channel connected");
                self.notify(ConnectionStatus::Connected);
                for reply in self.waiters.drain(..) {
                    let _ = reply.send(Ok(()));
                }
            }
            Err(e) => {
                tracing::warn!(url = %self.config.url, error = %e, "transport open failed");
                self.set_status(ConnectionStatus::Error);
                self.notify(ConnectionStatus::Error);
                if self.waiters.is_empty() {
                    self.schedule_retry_or_give_up();
                    return;
                }
                // An open someone is waiting on surfaces the failure to
                // every waiter and does not retry by itself.
                let error = Arc::new(e);
                for reply in self.waiters.drain(..) {
                    let error = Box::new(Arc::clone(&error));
                    let _ = reply.send(Err(ChannelError::TransportOpen(error)));
                }
            }
        }
    }

    fn handle_frame(&mut self, generation: u64, data: &[u8]) {
        if generation != self.generation {
            tracing::trace!(generation, "discarding frame from superseded connection");
            return;
        }
        match self.codec.decode(data) {
            Ok(envelope) => {
                self.registry.dispatch_message(&envelope.payload);
            }
            Err(e) => self.registry.diagnostics().frame_rejected(&e),
        }
    }

    fn handle_closed(&mut self, generation: u64, reason: Option<String>) {
        if generation != self.generation || !self.state.is_connected() {
            return;
        }
        self.drop_connection();
        self.set_status(ConnectionStatus::Disconnected);
        tracing::info!(
            url = %self.config.url,
            reason = reason.as_deref().unwrap_or("closed"),
            "transport closed"
        );
        self.notify(ConnectionStatus::Disconnected);
        self.schedule_retry_or_give_up();
    }

    fn handle_retry_due(&mut self, generation: u64) {
        if generation != self.generation {
            tracing::debug!(generation, current = self.generation, "stale reconnection timer ignored");
            return;
        }
        self.retry_timer = None;
        tracing::info!(
            url = %self.config.url,
            attempt = self.attempts.load(Ordering::Relaxed),
            max = self.config.retry.max_attempts,
            "attempting reconnection"
        );
        self.begin_open();
    }

    // -- Helpers ----------------------------------------------------------

    /// Starts an open attempt under a fresh generation.
    fn begin_open(&mut self) {
        self.cancel_retry_timer();
        self.generation += 1;
        let generation = self.generation;
        self.set_status(ConnectionStatus::Connecting);

        let connector = Arc::clone(&self.connector);
        let url = self.config.url.clone();
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let result = connector.open(&url).await.map(Arc::new);
            let _ = events.send(Event::Opened { generation, result });
        });
    }

    /// After a closure or a failed automatic attempt: schedule the next
    /// attempt if budget remains, otherwise settle in `Disconnected`.
    fn schedule_retry_or_give_up(&mut self) {
        let policy = self.config.retry;
        let attempts = self.attempts.load(Ordering::Relaxed);

        if policy.allows(attempts) {
            let attempt = attempts + 1;
            self.attempts.store(attempt, Ordering::Relaxed);
            let generation = self.generation;
            let events = self.events_tx.clone();
            tracing::debug!(
                attempt,
                max = policy.max_attempts,
                delay_ms = policy.delay.as_millis() as u64,
                "reconnection scheduled"
            );
            self.retry_timer = Some(tokio::spawn(async move {
                tokio::time::sleep(policy.delay).await;
                let _ = events.send(Event::RetryDue { generation });
            }));
        } else {
            tracing::warn!(
                url = %self.config.url,
                attempts,
                "reconnection attempts exhausted, giving up"
            );
            let previous = self.set_status(ConnectionStatus::Disconnected);
            if previous != ConnectionStatus::Disconnected {
                self.notify(ConnectionStatus::Disconnected);
            }
        }
    }

    /// Spawns the reader and writer tasks for a freshly opened connection.
    fn spawn_io(
        &self,
        conn: Arc<T::Connection>,
        generation: u64,
    ) -> ActiveConnection {
        let events = self.events_tx.clone();
        let reader_conn = Arc::clone(&conn);
        let reader = tokio::spawn(async move {
            let reason = loop {
                match reader_conn.recv().await {
                    Ok(Some(data)) => {
                        if events.send(Event::Frame { generation, data }).is_err() {
                            return;
                        }
                    }
                    Ok(None) => break None,
                    Err(e) => break Some(e.to_string()),
                }
            };
            let _ = events.send(Event::Closed { generation, reason });
        });

        // The writer drains queued frames in order and closes the
        // connection once the queue's sender is dropped.
        let (outbound, mut queue) = mpsc::unbounded_channel::<Vec<u8>>();
        let writer = tokio::spawn(async move {
            while let Some(bytes) = queue.recv().await {
                if let Err(e) = conn.send(&bytes).await {
                    tracing::warn!(conn_id = %conn.id(), error = %e, "write failed");
                }
            }
            if let Err(e) = conn.close().await {
                tracing::trace!(conn_id = %conn.id(), error = %e, "close after teardown");
            }
        });

        ActiveConnection {
            outbound,
            reader,
            writer,
        }
    }

    /// Stops reading and returns the writer, which flushes what is
    /// already queued and then closes the transport.
    fn drop_connection(&mut self) -> Option<JoinHandle<()>> {
        let active = self.active.take()?;
        active.reader.abort();
        // `outbound` drops here, ending the writer's queue.
        Some(active.writer)
    }

    fn cancel_retry_timer(&mut self) {
        if let Some(timer) = self.retry_timer.take() {
            timer.abort();
        }
    }

    /// Stores and publishes `next`, returning the previous status.
    fn set_status(&mut self, next: ConnectionStatus) -> ConnectionStatus {
        let previous = std::mem::replace(&mut self.state, next);
        self.status.publish(next);
        if previous != next {
            tracing::trace!(from = %previous, to = %next, "status changed");
        }
        previous
    }

    /// Hands `status` to status observers if it is one they receive.
    fn notify(&self, status: ConnectionStatus) {
        if status.is_observable() {
            self.registry.dispatch_status(status);
        }
    }

    fn teardown(&mut self) {
        self.generation += 1;
        self.cancel_retry_timer();
        self.drop_connection();
        self.set_status(ConnectionStatus::Idle);
    }
}
