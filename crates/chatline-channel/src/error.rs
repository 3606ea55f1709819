//! Error types for the channel layer.

/// Errors surfaced to callers of [`Channel::connect`](crate::Channel::connect).
///
/// Steady-state failures (bad frames, panicking observers, mid-session
/// disconnects) never appear here; they go to the diagnostic sink and the
/// status observers instead.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The transport could not be opened. No retry is scheduled for a
    /// caller-initiated open; call `connect()` again.
    #[error("transport open failed: {0}")]
    TransportOpen(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// `disconnect()` was called before the pending open completed.
    #[error("connect superseded by disconnect")]
    Superseded,

    /// The channel's actor task is no longer running.
    #[error("channel is shut down")]
    Shutdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_open_keeps_source() {
        use std::error::Error;
        let inner = std::io::Error::new(std::io::ErrorKind::Other, "refused");
        let err = ChannelError::TransportOpen(Box::new(inner));
        assert!(err.to_string().contains("refused"));
        assert!(err.source().is_some());
    }
}
