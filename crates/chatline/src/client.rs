//! `ChatClient`: one participant in one room over one channel.

use std::sync::Arc;

use chatline_channel::{
    Channel, ChannelBuilder, ConnectionStatus, DiagnosticSink, RetryPolicy, Subscription,
};
use chatline_identity::{ContentError, Identity, sanitize_input, validate_message};
use chatline_protocol::{DomainMessage, RoomId};
use chatline_transport::Connector;

use crate::ChatlineError;

/// Room joined when none is configured.
pub const DEFAULT_ROOM: &str = "general";

/// Builder for a [`ChatClient`].
pub struct ChatClientBuilder {
    identity: Identity,
    room: RoomId,
    channel: ChannelBuilder,
}

impl ChatClientBuilder {
    /// Creates a builder for `identity` in the default room.
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            room: RoomId::from(DEFAULT_ROOM),
            channel: Channel::builder(),
        }
    }

    /// Sets the room messages are addressed to.
    pub fn room(mut self, room: impl Into<RoomId>) -> Self {
        self.room = room.into();
        self
    }

    /// Sets the server endpoint.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.channel = self.channel.url(url);
        self
    }

    /// Sets the reconnection policy.
    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.channel = self.channel.retry_policy(retry);
        self
    }

    /// Sets where absorbed channel failures are reported.
    pub fn diagnostics(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.channel = self.channel.diagnostics(sink);
        self
    }

    /// Starts the underlying channel. Must be called inside a Tokio
    /// runtime; nothing is opened until [`ChatClient::connect`].
    pub fn build<T: Connector>(self, connector: T) -> ChatClient {
        ChatClient {
            identity: self.identity,
            room: self.room,
            channel: self.channel.build(connector),
        }
    }
}

/// A chat participant bound to a room.
///
/// Wraps a [`Channel`] and fills in sender and room on every outgoing
/// message. Like the channel, sends are fire-and-forget: while
/// disconnected they are dropped, not queued.
#[derive(Debug, Clone)]
pub struct ChatClient {
    identity: Identity,
    room: RoomId,
    channel: Channel,
}

impl ChatClient {
    pub fn builder(identity: Identity) -> ChatClientBuilder {
        ChatClientBuilder::new(identity)
    }

    /// Wraps an existing channel.
    pub fn new(identity: Identity, room: RoomId, channel: Channel) -> Self {
        Self {
            identity,
            room,
            channel,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn room(&self) -> &RoomId {
        &self.room
    }

    /// The underlying channel.
    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Opens the connection. See [`Channel::connect`].
    pub async fn connect(&self) -> Result<(), ChatlineError> {
        self.channel.connect().await?;
        Ok(())
    }

    /// Closes the connection and stops reconnecting.
    pub fn disconnect(&self) {
        self.channel.disconnect();
    }

    /// Closes the connection, waiting until everything sent before the
    /// call (a final `leave()`, say) has been written.
    pub async fn close(&self) {
        self.channel.close().await;
    }

    pub fn is_connected(&self) -> bool {
        self.channel.is_connected()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.channel.status()
    }

    /// Announces this participant in the room.
    pub fn join(&self) {
        tracing::debug!(room = %self.room, "joining");
        self.channel.send_message(DomainMessage::join(
            self.identity.sender_id.clone(),
            self.identity.display_name.clone(),
            self.room.clone(),
        ));
    }

    /// Announces that this participant is leaving the room.
    pub fn leave(&self) {
        tracing::debug!(room = %self.room, "leaving");
        self.channel.send_message(DomainMessage::leave(
            self.identity.sender_id.clone(),
            self.identity.display_name.clone(),
            self.room.clone(),
        ));
    }

    /// Validates, sanitizes and sends a chat line.
    ///
    /// # Errors
    /// `ChatlineError::InvalidMessage` if `text` is blank, too long, or
    /// nothing but angle brackets. Being disconnected is not an error;
    /// the message is dropped.
    pub fn send_chat(&self, text: &str) -> Result<(), ChatlineError> {
        validate_message(text)?;
        let content = sanitize_input(text);
        if content.is_empty() {
            return Err(ContentError::Empty.into());
        }
        self.channel.send_message(DomainMessage::chat(
            self.identity.sender_id.clone(),
            self.identity.display_name.clone(),
            self.room.clone(),
            content,
        ));
        Ok(())
    }

    /// Registers a message observer. See [`Channel::on_message`].
    pub fn on_message<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&DomainMessage) + Send + Sync + 'static,
    {
        self.channel.on_message(observer)
    }

    /// Registers a message observer that only sees this client's room.
    pub fn on_room_message<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&DomainMessage) + Send + Sync + 'static,
    {
        let room = self.room.clone();
        self.channel.on_message(move |msg| {
            if msg.room_id == room {
                observer(msg);
            }
        })
    }

    /// Registers a status observer. See [`Channel::on_connection_change`].
    pub fn on_connection_change<F>(&self, observer: F) -> Subscription
    where
        F: Fn(ConnectionStatus) + Send + Sync + 'static,
    {
        self.channel.on_connection_change(observer)
    }
}
