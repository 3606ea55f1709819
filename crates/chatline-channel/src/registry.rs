//! Subscriber registry: the live sets of message and status observers.
//!
//! Two independent collections, one per event kind. Every registration
//! gets its own id, so registering the same closure twice yields two
//! independent, separately removable entries.
//!
//! # Dispatch
//!
//! `dispatch_*` copies the current set of observers out of the lock and
//! then invokes each one outside it. That gives two guarantees:
//! - an observer may call [`Subscription::remove`] (on itself or anyone
//!   else) from inside its callback without deadlocking or corrupting the
//!   iteration in progress;
//! - each observer registered when dispatch starts is invoked exactly
//!   once for that event.
//!
//! Every invocation runs inside `catch_unwind`. A panicking observer is
//! reported to the [`DiagnosticSink`] and dispatch moves on to the next.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use chatline_protocol::DomainMessage;

use crate::{ConnectionStatus, DiagnosticSink, ObserverKind};

type Observer<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// One observer collection.
///
/// The lock is only ever held to insert, remove, or clone the entries,
/// never while an observer runs, so poisoning can't leave it in a
/// half-updated state and we recover the guard instead of failing.
struct ObserverSet<E> {
    entries: Mutex<HashMap<u64, Observer<E>>>,
}

impl<E> ObserverSet<E> {
    fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn insert(&self, id: u64, observer: Observer<E>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, observer);
    }

    fn remove(&self, id: u64) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some()
    }

    fn contains(&self, id: u64) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&id)
    }

    fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn snapshot(&self) -> Vec<Observer<E>> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    /// Invokes every observer in the snapshot. Returns how many ran to
    /// completion without panicking.
    fn dispatch(
        &self,
        event: &E,
        kind: ObserverKind,
        diagnostics: &dyn DiagnosticSink,
    ) -> usize {
        let mut delivered = 0;
        for observer in self.snapshot() {
            match panic::catch_unwind(AssertUnwindSafe(|| observer(event))) {
                Ok(()) => delivered += 1,
                Err(payload) => {
                    diagnostics.observer_panicked(kind, &panic_message(&*payload));
                }
            }
        }
        delivered
    }
}

/// Holds the message and status observers of one channel.
pub struct SubscriberRegistry {
    next_id: AtomicU64,
    messages: ObserverSet<DomainMessage>,
    statuses: ObserverSet<ConnectionStatus>,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl SubscriberRegistry {
    /// Creates an empty registry reporting failures to `diagnostics`.
    pub fn new(diagnostics: Arc<dyn DiagnosticSink>) -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicU64::new(1),
            messages: ObserverSet::new(),
            statuses: ObserverSet::new(),
            diagnostics,
        })
    }

    /// Registers a message observer.
    pub fn add_message_observer<F>(self: &Arc<Self>, observer: F) -> Subscription
    where
        F: Fn(&DomainMessage) + Send + Sync + 'static,
    {
        let id = self.allocate_id();
        self.messages.insert(id, Arc::new(observer));
        self.subscription(ObserverKind::Message, id)
    }

    /// Registers a status observer.
    pub fn add_status_observer<F>(self: &Arc<Self>, observer: F) -> Subscription
    where
        F: Fn(ConnectionStatus) + Send + Sync + 'static,
    {
        let id = self.allocate_id();
        self.statuses
            .insert(id, Arc::new(move |status: &ConnectionStatus| observer(*status)));
        self.subscription(ObserverKind::Status, id)
    }

    /// Delivers `message` to every registered message observer.
    ///
    /// Returns the number of observers that completed without panicking.
    pub fn dispatch_message(&self, message: &DomainMessage) -> usize {
        self.messages
            .dispatch(message, ObserverKind::Message, self.diagnostics.as_ref())
    }

    /// Delivers `status` to every registered status observer.
    pub fn dispatch_status(&self, status: ConnectionStatus) -> usize {
        self.statuses
            .dispatch(&status, ObserverKind::Status, self.diagnostics.as_ref())
    }

    /// Number of live message observers.
    pub fn message_observer_count(&self) -> usize {
        self.messages.len()
    }

    /// Number of live status observers.
    pub fn status_observer_count(&self) -> usize {
        self.statuses.len()
    }

    /// The sink this registry reports to.
    pub fn diagnostics(&self) -> &Arc<dyn DiagnosticSink> {
        &self.diagnostics
    }

    fn allocate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn subscription(self: &Arc<Self>, kind: ObserverKind, id: u64) -> Subscription {
        Subscription {
            registry: Arc::downgrade(self),
            kind,
            id,
        }
    }

    fn remove(&self, kind: ObserverKind, id: u64) -> bool {
        match kind {
            ObserverKind::Message => self.messages.remove(id),
            ObserverKind::Status => self.statuses.remove(id),
        }
    }

    fn contains(&self, kind: ObserverKind, id: u64) -> bool {
        match kind {
            ObserverKind::Message => self.messages.contains(id),
            ObserverKind::Status => self.statuses.contains(id),
        }
    }
}

impl fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("message_observers", &self.message_observer_count())
            .field("status_observers", &self.status_observer_count())
            .finish()
    }
}

/// Handle to one registration. Its only capability is removing it.
///
/// Dropping a `Subscription` does **not** unregister the observer; call
/// [`remove`](Self::remove). The handle holds only a weak reference, so it
/// never keeps a torn-down channel alive.
#[derive(Clone)]
pub struct Subscription {
    registry: Weak<SubscriberRegistry>,
    kind: ObserverKind,
    id: u64,
}

impl Subscription {
    /// Removes the observer. Idempotent, and a no-op once the owning
    /// channel is gone.
    pub fn remove(&self) {
        if let Some(registry) = self.registry.upgrade() {
            if registry.remove(self.kind, self.id) {
                tracing::trace!(kind = %self.kind, id = self.id, "observer removed");
            }
        }
    }

    /// Whether the observer is still registered.
    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.contains(self.kind, self.id))
    }

    /// Which collection this subscription belongs to.
    pub fn kind(&self) -> ObserverKind {
        self.kind
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .finish()
    }
}

/// Extracts a readable message from a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
