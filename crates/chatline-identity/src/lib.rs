//! Participant identity and input validation for Chatline.
//!
//! This crate answers "who is speaking, and is what they typed
//! acceptable?":
//!
//! 1. **Persistence**: a [`KeyValueStore`] ([`MemoryStore`] or
//!    [`FileStore`]) holding the participant's data between runs
//! 2. **Identity**: [`IdentityStore`] hands out a stable [`SenderId`]
//!    and a one-time display name
//! 3. **Validation**: length rules for display names and messages, and
//!    [`sanitize_input`] for outgoing text
//!
//! # How it fits in the stack
//!
//! ```text
//! Client facade (above)  ← builds messages from an Identity
//!     ↕
//! Identity layer (this crate)  ← stores who we are, checks input
//!     ↕
//! Protocol layer (below)  ← provides SenderId
//! ```
//!
//! [`SenderId`]: chatline_protocol::SenderId

mod error;
mod identity;
mod store;
mod validation;

pub use error::{ContentError, IdentityError};
pub use identity::{DISPLAY_NAME_KEY, Identity, IdentityStore, SENDER_ID_KEY};
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use validation::{
    DISPLAY_NAME_MAX_CHARS, DISPLAY_NAME_MIN_CHARS, MESSAGE_MAX_CHARS, sanitize_input,
    validate_display_name, validate_message,
};
