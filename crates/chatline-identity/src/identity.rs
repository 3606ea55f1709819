//! The participant's persistent identity.
//!
//! Two pieces of state live in the store:
//!
//! - a **sender id**, generated once and then reused forever so the server
//!   can recognise the same participant across restarts;
//! - a **display name**, chosen by the participant on first run.
//!
//! ```text
//! first run                          later runs
//! ─────────                          ──────────
//! load_or_create_sender_id()  ──→    same id returned
//! set_display_name("alice")   ──→    display_name() == Some("alice")
//!                                    set_display_name(..) fails
//!                                    until clear_display_name()
//! ```

use chatline_protocol::SenderId;
use rand::Rng;

use crate::validation::validate_display_name;
use crate::{IdentityError, KeyValueStore};

/// Store key for the sender id.
pub const SENDER_ID_KEY: &str = "chat_room_userId";
/// Store key for the display name.
pub const DISPLAY_NAME_KEY: &str = "chatroom_username";

/// Everything needed to author a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub sender_id: SenderId,
    pub display_name: String,
}

/// Identity operations over any [`KeyValueStore`].
#[derive(Debug)]
pub struct IdentityStore<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> IdentityStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the stored sender id, generating and persisting a fresh
    /// one if none exists (or the stored one is blank).
    pub fn load_or_create_sender_id(&self) -> Result<SenderId, IdentityError> {
        if let Some(existing) = self.store.get(SENDER_ID_KEY)? {
            if !existing.trim().is_empty() {
                return Ok(SenderId(existing));
            }
        }
        let fresh = generate_sender_id();
        self.store.set(SENDER_ID_KEY, &fresh)?;
        tracing::info!(sender_id = %fresh, "generated new sender id");
        Ok(SenderId(fresh))
    }

    /// The stored display name, if one has been chosen.
    pub fn display_name(&self) -> Result<Option<String>, IdentityError> {
        self.store.get(DISPLAY_NAME_KEY)
    }

    /// Validates and stores the display name. Returns the trimmed name.
    ///
    /// # Errors
    /// - `IdentityError::InvalidDisplayName` if the name fails validation
    /// - `IdentityError::DisplayNameAlreadySet` if a name is already stored
    pub fn set_display_name(&self, name: &str) -> Result<String, IdentityError> {
        let name = validate_display_name(name)?;
        if let Some(existing) = self.display_name()? {
            return Err(IdentityError::DisplayNameAlreadySet(existing));
        }
        self.store.set(DISPLAY_NAME_KEY, name)?;
        tracing::debug!(display_name = name, "display name saved");
        Ok(name.to_string())
    }

    /// Forgets the display name so a new one can be set.
    pub fn clear_display_name(&self) -> Result<(), IdentityError> {
        self.store.remove(DISPLAY_NAME_KEY)
    }

    /// The full identity, or `None` if no display name has been chosen.
    pub fn identity(&self) -> Result<Option<Identity>, IdentityError> {
        let sender_id = self.load_or_create_sender_id()?;
        Ok(self.display_name()?.map(|display_name| Identity {
            sender_id,
            display_name,
        }))
    }
}

/// 128 random bits as 32 lowercase hex characters.
fn generate_sender_id() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
