//! # Chatline
//!
//! Resilient real-time chat client.
//!
//! Chatline keeps a single connection to a chat server alive: it opens a
//! WebSocket, reconnects after the server drops it (fixed delay, capped
//! attempts), and delivers every decoded message to your observers. On
//! top of that it remembers who you are between runs and checks what you
//! type before sending it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chatline::prelude::*;
//!
//! # async fn run() -> Result<(), ChatlineError> {
//! let ids = IdentityStore::new(FileStore::in_dir(".chatline")?);
//! let sender_id = ids.load_or_create_sender_id()?;
//! let display_name = match ids.display_name()? {
//!     Some(name) => name,
//!     None => ids.set_display_name("alice")?,
//! };
//!
//! let client = ChatClient::builder(Identity { sender_id, display_name })
//!     .url("ws://127.0.0.1:8080")
//!     .room("general")
//!     .build(WebSocketConnector::new());
//!
//! client.on_message(|msg| println!("{}: {}", msg.sender_display_name, msg.content));
//! client.connect().await?;
//! client.join();
//! client.send_chat("hello")?;
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod format;

pub use client::{ChatClient, ChatClientBuilder, DEFAULT_ROOM};
pub use error::ChatlineError;
pub use format::{DEFAULT_PREVIEW_CHARS, format_timestamp, truncate_message};

/// Re-exports everything a chat application needs.
pub mod prelude {
    pub use crate::{
        ChatClient, ChatClientBuilder, ChatlineError, DEFAULT_PREVIEW_CHARS, DEFAULT_ROOM,
        format_timestamp, truncate_message,
    };
    pub use chatline_channel::{
        Channel, ChannelBuilder, ChannelConfig, ConnectionStatus, DiagnosticSink,
        ObserverKind, RetryPolicy, Subscription, TracingDiagnostics,
    };
    pub use chatline_identity::{
        ContentError, FileStore, Identity, IdentityError, IdentityStore, KeyValueStore,
        MemoryStore, sanitize_input, validate_display_name, validate_message,
    };
    pub use chatline_protocol::{DomainMessage, MessageKind, RoomId, SenderId};
    pub use chatline_transport::{Connection, Connector, TransportError, WebSocketConnector};
}
