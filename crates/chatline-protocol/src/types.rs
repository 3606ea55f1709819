//! Core protocol types for Chatline's wire format.
//!
//! This module defines every type that travels "on the wire": the
//! structures that get serialized, written to the transport, and
//! deserialized by every other participant in the room.
//!
//! Field names are camelCase on the wire so that browser peers can
//! consume the same frames without a translation layer.

use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// An opaque, stable identifier for the participant that sent a message.
///
/// This is a newtype wrapper around `String` so a `SenderId` can never be
/// passed where a `RoomId` is expected. `#[serde(transparent)]` keeps the
/// JSON representation a plain string: `"3f2a..."`, not `{"0":"3f2a..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SenderId(pub String);

impl SenderId {
    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SenderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SenderId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// The room a message belongs to.
///
/// Same newtype pattern as [`SenderId`]. A single connection only ever
/// talks to one room; the id travels with each message so receivers can
/// ignore traffic that isn't theirs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<&str> for RoomId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

// ---------------------------------------------------------------------------
// MessageKind
// ---------------------------------------------------------------------------

/// What a message means to the room.
///
/// `#[serde(rename_all = "SCREAMING_SNAKE_CASE")]` produces `"CHAT"`,
/// `"SYSTEM"`, `"JOIN"` and `"LEAVE"` on the wire.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    /// A line of text typed by a participant.
    Chat,
    /// An informational notice (server announcements and the like).
    System,
    /// A participant entered the room.
    Join,
    /// A participant left the room.
    Leave,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Chat => "CHAT",
            Self::System => "SYSTEM",
            Self::Join => "JOIN",
            Self::Leave => "LEAVE",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// DomainMessage
// ---------------------------------------------------------------------------

/// The application-level unit exchanged over the channel.
///
/// `sent_at_epoch_millis` is assigned by the sender's local clock
/// immediately before transmission; whatever value a caller puts there
/// is overwritten by [`EnvelopeCodec::encode`](crate::EnvelopeCodec::encode).
///
/// A `Chat` message is expected to carry non-empty content after
/// trimming. That is the caller's obligation; nothing in the protocol
/// layer enforces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainMessage {
    /// Stable identifier of the sending participant.
    pub sender_id: SenderId,
    /// Name shown next to the message.
    pub sender_display_name: String,
    /// Room the message belongs to.
    pub room_id: RoomId,
    /// What the message means.
    pub kind: MessageKind,
    /// Message text (may be empty for `Join`/`Leave`).
    pub content: String,
    /// Milliseconds since the Unix epoch, stamped at send time.
    pub sent_at_epoch_millis: u64,
}

impl DomainMessage {
    /// Creates an unstamped message (`sent_at_epoch_millis == 0`).
    pub fn new(
        sender_id: SenderId,
        sender_display_name: impl Into<String>,
        room_id: RoomId,
        kind: MessageKind,
        content: impl Into<String>,
    ) -> Self {
        Self {
            sender_id,
            sender_display_name: sender_display_name.into(),
            room_id,
            kind,
            content: content.into(),
            sent_at_epoch_millis: 0,
        }
    }

    /// Shorthand for a [`MessageKind::Chat`] message.
    pub fn chat(
        sender_id: SenderId,
        sender_display_name: impl Into<String>,
        room_id: RoomId,
        content: impl Into<String>,
    ) -> Self {
        Self::new(
            sender_id,
            sender_display_name,
            room_id,
            MessageKind::Chat,
            content,
        )
    }

    /// Shorthand for a [`MessageKind::Join`] announcement.
    pub fn join(
        sender_id: SenderId,
        sender_display_name: impl Into<String>,
        room_id: RoomId,
    ) -> Self {
        Self::new(sender_id, sender_display_name, room_id, MessageKind::Join, "")
    }

    /// Shorthand for a [`MessageKind::Leave`] announcement.
    pub fn leave(
        sender_id: SenderId,
        sender_display_name: impl Into<String>,
        room_id: RoomId,
    ) -> Self {
        Self::new(
            sender_id,
            sender_display_name,
            room_id,
            MessageKind::Leave,
            "",
        )
    }

    /// Shorthand for a [`MessageKind::System`] notice.
    pub fn system(
        sender_id: SenderId,
        room_id: RoomId,
        content: impl Into<String>,
    ) -> Self {
        Self::new(sender_id, "system", room_id, MessageKind::System, content)
    }

    /// Returns a copy of this message stamped with `sent_at`.
    pub fn stamped(&self, sent_at: u64) -> Self {
        Self {
            sent_at_epoch_millis: sent_at,
            ..self.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// WireEnvelope: the top-level wire format
// ---------------------------------------------------------------------------

/// The transmitted representation of a [`DomainMessage`].
///
/// ```text
/// ┌──────────────────────────────────┐
/// │ kind: "CHAT"                     │  ← dispatch key, read first
/// │ ┌──────────────────────────────┐ │
/// │ │ payload: DomainMessage       │ │  ← the actual content
/// │ └──────────────────────────────┘ │
/// └──────────────────────────────────┘
/// ```
///
/// The outer `kind` duplicates `payload.kind`. It exists so a receiver
/// can route on the kind before looking at the payload; the two must
/// agree, which the codec checks on decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireEnvelope {
    /// Copy of `payload.kind`.
    pub kind: MessageKind,
    /// The wrapped message.
    pub payload: DomainMessage,
}

impl WireEnvelope {
    /// Wraps a message, keying the envelope by the message's kind.
    pub fn wrap(payload: DomainMessage) -> Self {
        Self {
            kind: payload.kind,
            payload,
        }
    }

    /// Unwraps the envelope into its message.
    pub fn into_message(self) -> DomainMessage {
        self.payload
    }
}

// =========================================================================
// Tests
// =========================================================================
