//! Codec trait, JSON implementation, and the envelope codec.
//!
//! A "codec" (coder/decoder) converts between Rust types and raw bytes.
//! [`Codec`] is the format-level strategy (how values become bytes);
//! [`EnvelopeCodec`] sits on top of it and knows the chat envelope rules:
//! stamp the send time, wrap keyed by kind, and validate inbound frames.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{de::DeserializeOwned, Serialize};

use crate::{DomainMessage, ProtocolError, WireEnvelope};

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because the codec is shared between the
/// caller-facing channel handle and the channel's actor task.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// JSON is what browser chat clients speak natively, so it's the default.
/// This is behind the `json` feature flag (enabled by default).
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

// ---------------------------------------------------------------------------
// EnvelopeCodec
// ---------------------------------------------------------------------------

/// Converts [`DomainMessage`]s to wire bytes and wire bytes back to
/// validated [`WireEnvelope`]s.
///
/// Stateless: the only input besides the message is the send timestamp,
/// which the caller supplies so that encoding stays deterministic.
///
/// ## Example
///
/// ```rust
/// use chatline_protocol::{DomainMessage, EnvelopeCodec, RoomId, SenderId};
///
/// let codec = EnvelopeCodec::json();
/// let msg = DomainMessage::chat(
///     SenderId::from("u-1"),
///     "alice",
///     RoomId::from("general"),
///     "hello",
/// );
///
/// let bytes = codec.encode(&msg, 1_000).unwrap();
/// let envelope = codec.decode(&bytes).unwrap();
/// assert_eq!(envelope.payload.content, "hello");
/// assert_eq!(envelope.payload.sent_at_epoch_millis, 1_000);
/// ```
#[derive(Debug, Clone, Default)]
pub struct EnvelopeCodec<C: Codec> {
    codec: C,
}

#[cfg(feature = "json")]
impl EnvelopeCodec<JsonCodec> {
    /// Creates an envelope codec over [`JsonCodec`].
    pub fn json() -> Self {
        Self { codec: JsonCodec }
    }
}

impl<C: Codec> EnvelopeCodec<C> {
    /// Creates an envelope codec over the given format codec.
    pub fn new(codec: C) -> Self {
        Self { codec }
    }

    /// Stamps `message` with `sent_at`, wraps it and serializes it.
    ///
    /// The caller's message is left untouched; any timestamp it carried
    /// is ignored.
    pub fn encode(
        &self,
        message: &DomainMessage,
        sent_at: u64,
    ) -> Result<Vec<u8>, ProtocolError> {
        let envelope = WireEnvelope::wrap(message.stamped(sent_at));
        self.codec.encode(&envelope)
    }

    /// Parses and validates one inbound frame.
    ///
    /// # Errors
    /// - `ProtocolError::Decode`: not well-formed, or missing `kind` /
    ///   `payload`
    /// - `ProtocolError::InvalidMessage`: envelope `kind` disagrees with
    ///   the payload's kind
    pub fn decode(&self, data: &[u8]) -> Result<WireEnvelope, ProtocolError> {
        let envelope: WireEnvelope = self.codec.decode(data)?;
        if envelope.kind != envelope.payload.kind {
            return Err(ProtocolError::InvalidMessage(format!(
                "envelope kind {} does not match payload kind {}",
                envelope.kind, envelope.payload.kind
            )));
        }
        Ok(envelope)
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch.
///
/// A clock set before 1970 yields 0 rather than an error.
pub fn now_epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{MessageKind, RoomId, SenderId};

    fn sample() -> DomainMessage {
        DomainMessage::chat(
            SenderId::from("u-1"),
            "alice",
            RoomId::from("general"),
            "hello",
        )
    }

    #[test]
    fn test_encode_decode_preserves_fields_and_uses_encode_stamp() {
        let codec = EnvelopeCodec::json();
        let mut msg = sample();
        // A caller-supplied timestamp must not survive encoding.
        msg.sent_at_epoch_millis = 42;

        let bytes = codec.encode(&msg, 1_700_000_000_123).unwrap();
        let decoded = codec.decode(&bytes).unwrap().into_message();

        assert_eq!(decoded, msg.stamped(1_700_000_000_123));
    }

    #[test]
    fn test_encode_is_deterministic() {
        let codec = EnvelopeCodec::json();
        let a = codec.encode(&sample(), 5).unwrap();
        let b = codec.encode(&sample(), 5).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_encode_does_not_mutate_input() {
        let codec = EnvelopeCodec::json();
        let msg = sample();
        codec.encode(&msg, 77).unwrap();
        assert_eq!(msg.sent_at_epoch_millis, 0);
    }

    #[test]
    fn test_encode_envelope_kind_matches_message_kind() {
        let codec = EnvelopeCodec::json();
        let msg = DomainMessage::join(
            SenderId::from("u"),
            "bob",
            RoomId::from("r"),
        );
        let bytes = codec.encode(&msg, 1).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["kind"], "JOIN");
        assert_eq!(json["payload"]["kind"], "JOIN");
    }

    #[test]
    fn test_decode_garbage_returns_decode_error() {
        let codec = EnvelopeCodec::json();
        let err = codec.decode(b"not json at all").unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
        assert!(err.is_decode());
    }

    #[test]
    fn test_decode_missing_kind_returns_decode_error() {
        let codec = EnvelopeCodec::json();
        let bytes = serde_json::to_vec(&serde_json::json!({
            "payload": serde_json::to_value(sample()).unwrap(),
        }))
        .unwrap();
        assert!(matches!(
            codec.decode(&bytes),
            Err(ProtocolError::Decode(_))
        ));
    }

    #[test]
    fn test_decode_wrong_shape_returns_decode_error() {
        let codec = EnvelopeCodec::json();
        let err = codec.decode(br#"{"name":"hello"}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
    }

    #[test]
    fn test_decode_kind_mismatch_returns_invalid_message() {
        let codec = EnvelopeCodec::json();
        let mut payload = serde_json::to_value(sample()).unwrap();
        payload["kind"] = serde_json::json!("SYSTEM");
        let bytes = serde_json::to_vec(&serde_json::json!({
            "kind": "CHAT",
            "payload": payload,
        }))
        .unwrap();

        let err = codec.decode(&bytes).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidMessage(_)));
        assert!(err.is_decode());
    }

    #[test]
    fn test_decode_accepts_frames_from_browser_peers() {
        // Hand-written frame in the shape a browser client produces.
        let frame = br#"{
            "kind": "SYSTEM",
            "payload": {
                "senderId": "server",
                "senderDisplayName": "system",
                "roomId": "general",
                "kind": "SYSTEM",
                "content": "welcome",
                "sentAtEpochMillis": 1700000000000
            }
        }"#;
        let env = EnvelopeCodec::json().decode(frame).unwrap();
        assert_eq!(env.kind, MessageKind::System);
        assert_eq!(env.payload.content, "welcome");
    }

    #[test]
    fn test_now_epoch_millis_is_after_2020() {
        assert!(now_epoch_millis() > 1_577_836_800_000);
    }
}
