//! Input rules for display names and chat content.
//!
//! Lengths are counted in `char`s, not bytes, so a name made of
//! multi-byte characters is measured the way a user would count it.

use crate::{ContentError, IdentityError};

/// Shortest accepted display name.
pub const DISPLAY_NAME_MIN_CHARS: usize = 2;
/// Longest accepted display name.
pub const DISPLAY_NAME_MAX_CHARS: usize = 20;
/// Longest accepted chat message.
pub const MESSAGE_MAX_CHARS: usize = 500;

/// Trims `name` and checks its length. Returns the trimmed name.
///
/// # Errors
/// `IdentityError::InvalidDisplayName` when the trimmed name is shorter
/// than [`DISPLAY_NAME_MIN_CHARS`] or longer than
/// [`DISPLAY_NAME_MAX_CHARS`].
pub fn validate_display_name(name: &str) -> Result<&str, IdentityError> {
    let trimmed = name.trim();
    let len = trimmed.chars().count();
    if (DISPLAY_NAME_MIN_CHARS..=DISPLAY_NAME_MAX_CHARS).contains(&len) {
        Ok(trimmed)
    } else {
        Err(IdentityError::InvalidDisplayName {
            len,
            min: DISPLAY_NAME_MIN_CHARS,
            max: DISPLAY_NAME_MAX_CHARS,
        })
    }
}

/// Checks that `content` is worth sending: something other than
/// whitespace, and no longer than [`MESSAGE_MAX_CHARS`] as typed.
pub fn validate_message(content: &str) -> Result<(), ContentError> {
    if content.trim().is_empty() {
        return Err(ContentError::Empty);
    }
    let len = content.chars().count();
    if len > MESSAGE_MAX_CHARS {
        return Err(ContentError::TooLong {
            len,
            max: MESSAGE_MAX_CHARS,
        });
    }
    Ok(())
}

/// Trims surrounding whitespace and strips `<` and `>`.
pub fn sanitize_input(input: &str) -> String {
    input.trim().chars().filter(|c| !matches!(c, '<' | '>')).collect()
}
