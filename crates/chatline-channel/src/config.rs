//! Channel configuration and reconnection policy.

use std::time::Duration;

// ---------------------------------------------------------------------------
// RetryPolicy
// ---------------------------------------------------------------------------

/// How the channel recovers from a closed transport.
///
/// Fixed delay between attempts with a hard cap, counted per
/// disconnection episode. The counter resets only when an open succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Automatic reconnection attempts allowed per episode.
    /// 0 disables automatic reconnection.
    pub max_attempts: u32,

    /// Delay before each attempt.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Default attempt cap.
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
    /// Default delay between attempts.
    pub const DEFAULT_DELAY: Duration = Duration::from_millis(3000);

    /// A policy that never reconnects automatically.
    pub fn disabled() -> Self {
        Self {
            max_attempts: 0,
            ..Self::default()
        }
    }

    /// Whether another attempt may be scheduled after `attempts_so_far`.
    pub fn allows(&self, attempts_so_far: u32) -> bool {
        attempts_so_far < self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            delay: Self::DEFAULT_DELAY,
        }
    }
}

// ---------------------------------------------------------------------------
// ChannelConfig
// ---------------------------------------------------------------------------

/// Everything a channel needs to know before it is started.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// The single endpoint this channel talks to.
    pub url: String,

    /// Reconnection behavior.
    pub retry: RetryPolicy,
}

impl ChannelConfig {
    /// Endpoint used when none is configured.
    pub const DEFAULT_URL: &'static str = "ws://127.0.0.1:8080";
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            url: Self::DEFAULT_URL.to_string(),
            retry: RetryPolicy::default(),
        }
    }
}
