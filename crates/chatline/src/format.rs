//! Display helpers for rendering messages in a terminal or log.

/// Default length used by [`truncate_message`] callers that have no
/// better idea.
pub const DEFAULT_PREVIEW_CHARS: usize = 100;

const MILLIS_PER_DAY: u64 = 24 * 60 * 60 * 1000;

/// Renders an epoch-millisecond timestamp as `HH:MM:SS` (UTC, 24-hour).
pub fn format_timestamp(epoch_millis: u64) -> String {
    let secs_of_day = (epoch_millis % MILLIS_PER_DAY) / 1000;
    let (h, m, s) = (secs_of_day / 3600, (secs_of_day / 60) % 60, secs_of_day % 60);
    format!("{h:02}:{m:02}:{s:02}")
}

/// Cuts `text` to `max_chars` characters and appends `...` when
/// anything was removed.
pub fn truncate_message(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
