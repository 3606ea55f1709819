//! Resilient messaging channel for Chatline.
//!
//! A channel owns one transport to one endpoint. It tracks the connection
//! lifecycle, reconnects automatically after an unexpected closure (fixed
//! delay, capped attempts), decodes inbound frames and fans them out to
//! observers.
//!
//! # Key types
//!
//! - [`Channel`]: the handle callers hold; cloneable
//! - [`ChannelBuilder`]: endpoint, retry policy, diagnostic sink
//! - [`ConnectionStatus`]: lifecycle state machine
//! - [`RetryPolicy`]: reconnection cap and delay
//! - [`Subscription`]: returned by `on_message` / `on_connection_change`
//! - [`DiagnosticSink`]: where absorbed failures go
//!
//! # Lifecycle
//!
//! ```text
//! Idle ──connect()──► Connecting ──open ok──► Connected
//!                         │                      │
//!                     open failed          peer closed
//!                         ▼                      ▼
//!                       Error ◄──retry failed── Disconnected
//!                         │                      │
//!                         └──── retry timer ─────┘
//! ```
//!
//! `disconnect()` returns any state to `Idle` and cancels pending retries.

mod actor;
mod channel;
mod config;
mod diagnostics;
mod error;
mod registry;
mod status;

pub use channel::{Channel, ChannelBuilder};
pub use config::{ChannelConfig, RetryPolicy};
pub use diagnostics::{DiagnosticSink, ObserverKind, TracingDiagnostics};
pub use error::ChannelError;
pub use registry::{SubscriberRegistry, Subscription};
pub use status::ConnectionStatus;
