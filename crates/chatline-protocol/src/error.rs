//! Error types for the protocol layer.
//!
//! Each crate in Chatline defines its own error enum. When you see a
//! `ProtocolError`, you know the problem is in serialization or envelope
//! validation, not in networking or connection management.

/// Errors that can occur in the protocol layer.
///
/// Both `Decode` and `InvalidMessage` describe an inbound frame the
/// channel must drop; the channel never forwards them to observers.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, a missing `kind` or `payload`
    /// field, an unknown message kind, or truncated frames.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame parsed but violates envelope rules, e.g. the envelope
    /// `kind` disagrees with `payload.kind`.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

impl ProtocolError {
    /// Returns `true` if this error describes a rejected inbound frame.
    pub fn is_decode(&self) -> bool {
        match self {
            #[cfg(feature = "json")]
            Self::Decode(_) => true,
            Self::InvalidMessage(_) => true,
            #[cfg(feature = "json")]
            Self::Encode(_) => false,
        }
    }
}
