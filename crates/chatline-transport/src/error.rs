/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Opening a connection to the endpoint failed.
    #[error("open failed for {url}: {source}")]
    OpenFailed {
        /// The endpoint that was being dialed.
        url: String,
        #[source]
        source: std::io::Error,
    },

    /// The connection was already closed when a frame was written.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),
}

impl TransportError {
    /// Builds an [`TransportError::OpenFailed`] from any error type.
    pub fn open_failed<E>(url: &str, err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::OpenFailed {
            url: url.to_string(),
            source: std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                err,
            ),
        }
    }
}
