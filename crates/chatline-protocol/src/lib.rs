//! Wire protocol for Chatline.
//!
//! This crate defines the "language" that chat clients speak:
//!
//! - **Types** ([`DomainMessage`], [`WireEnvelope`], [`MessageKind`], …):
//!   the message structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`], [`EnvelopeCodec`]): how
//!   those messages are converted to/from bytes and validated.
//! - **Errors** ([`ProtocolError`]): what can go wrong during
//!   encoding/decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw frames) and the channel
//! (connection lifecycle and fan-out). It doesn't know about connections;
//! it only knows how to serialize, deserialize and validate messages.
//!
//! ```text
//! Transport (bytes) → Protocol (WireEnvelope) → Channel (observers)
//! ```

mod codec;
mod error;
mod types;

pub use codec::{now_epoch_millis, Codec, EnvelopeCodec};
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{DomainMessage, MessageKind, RoomId, SenderId, WireEnvelope};
