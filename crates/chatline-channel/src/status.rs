//! Connection status: the single source of truth for "can I send?".

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use tokio::sync::watch;

/// The lifecycle state of a channel.
///
/// Exactly one value holds at any time:
///
/// ```text
///            connect()                 open ok
///   Idle ─────────────→ Connecting ─────────────→ Connected
///    ↑                   │      ↑                    │
///    │        open failed│      │ retry timer        │ closed
///    │                   ▼      │                    ▼
///    │                  Error ──┴───────────── Disconnected
///    │                                               │
///    └───────────────────── disconnect() ────────────┘
/// ```
///
/// Only `Connected`, `Disconnected` and `Error` are ever delivered to
/// status observers; `Idle` and `Connecting` are readable through
/// [`Channel::status`](crate::Channel::status) but never notified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionStatus {
    /// Not connected and not trying to be.
    #[default]
    Idle,
    /// A transport open is in flight.
    Connecting,
    /// The transport is open and writable.
    Connected,
    /// The transport closed; a reconnection may be pending.
    Disconnected,
    /// The most recent open attempt failed.
    Error,
}

impl ConnectionStatus {
    /// Returns `true` only for [`ConnectionStatus::Connected`].
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Returns `true` if transitions into this status are delivered to
    /// status observers.
    pub fn is_observable(self) -> bool {
        matches!(self, Self::Connected | Self::Disconnected | Self::Error)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// StatusCell
// ---------------------------------------------------------------------------

/// The published status, shared by the actor and every handle.
///
/// The actor owns every transition except one: a handle may force `Idle`
/// through [`StatusCell::request_disconnect`] so that `disconnect()` is
/// visible before it returns. Until the actor has handled each such
/// request, anything else it publishes is held back.
pub(crate) struct StatusCell {
    tx: watch::Sender<ConnectionStatus>,
    pending_disconnects: AtomicU32,
}

impl StatusCell {
    pub(crate) fn new() -> Self {
        // `send_modify` and `send_if_modified` work without receivers.
        let (tx, _) = watch::channel(ConnectionStatus::Idle);
        Self {
            tx,
            pending_disconnects: AtomicU32::new(0),
        }
    }

    pub(crate) fn get(&self) -> ConnectionStatus {
        *self.tx.borrow()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.tx.subscribe()
    }

    /// Called by a handle before it queues a disconnect for the actor.
    pub(crate) fn request_disconnect(&self) {
        // Counter and value change under the watch lock, so `publish`
        // never interleaves between them.
        self.tx.send_modify(|status| {
            self.pending_disconnects.fetch_add(1, Ordering::SeqCst);
            *status = ConnectionStatus::Idle;
        });
    }

    /// Called by the actor as it handles one queued disconnect.
    pub(crate) fn disconnect_handled(&self) {
        let _ = self
            .pending_disconnects
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }

    /// Publishes `next` unless a disconnect is still queued.
    pub(crate) fn publish(&self, next: ConnectionStatus) {
        self.tx.send_if_modified(|status| {
            if next != ConnectionStatus::Idle
                && self.pending_disconnects.load(Ordering::SeqCst) > 0
            {
                return false;
            }
            let changed = *status != next;
            *status = next;
            changed
        });
    }
}
