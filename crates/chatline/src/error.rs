//! Unified error type for Chatline.

use chatline_channel::ChannelError;
use chatline_identity::{ContentError, IdentityError};
use chatline_protocol::ProtocolError;
use chatline_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `chatline` crate you deal with this single error type
/// instead of importing errors from each sub-crate. The `#[from]`
/// attributes let `?` convert sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ChatlineError {
    /// A transport-level error (open, send, receive).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid envelope).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A channel-level error (open failed, superseded, shut down).
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// An identity-level error (storage, display name rules).
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// Chat content was rejected before sending.
    #[error("invalid message: {0}")]
    InvalidMessage(#[from] ContentError),
}
