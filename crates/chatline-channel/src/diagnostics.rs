//! Diagnostic sink: where absorbed failures are reported.
//!
//! The channel never lets a bad frame or a panicking observer escape into
//! caller code. Those failures are handed to a [`DiagnosticSink`] so they
//! can still be observed (logged, counted, asserted on in tests).

use std::fmt;

use chatline_protocol::ProtocolError;

/// Which observer collection an observer belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObserverKind {
    /// Registered through `on_message`.
    Message,
    /// Registered through `on_connection_change`.
    Status,
}

impl fmt::Display for ObserverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message => f.write_str("message"),
            Self::Status => f.write_str("status"),
        }
    }
}

/// Receives failures the channel absorbs.
///
/// Implementations are called from the channel's actor task and must not
/// block.
pub trait DiagnosticSink: Send + Sync + 'static {
    /// An observer panicked during dispatch. Dispatch to the remaining
    /// observers continued.
    fn observer_panicked(&self, kind: ObserverKind, message: &str);

    /// An inbound frame failed to decode and was dropped.
    fn frame_rejected(&self, error: &ProtocolError);
}

/// The default sink: reports through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl DiagnosticSink for TracingDiagnostics {
    fn observer_panicked(&self, kind: ObserverKind, message: &str) {
        tracing::warn!(%kind, panic = message, "observer panicked during dispatch");
    }

    fn frame_rejected(&self, error: &ProtocolError) {
        tracing::debug!(error = %error, "dropping malformed frame");
    }
}
