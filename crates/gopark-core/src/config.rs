// ── Runtime live-feed configuration ──
//
// These types describe *how* the live feed connects and reconnects.
// They never touch disk; the CLI builds a `FeedConfig` (usually through
// `gopark-config`) and hands it to `LiveFeed::spawn`.

use std::time::Duration;

use url::Url;

/// Fixed-delay reconnection policy.
///
/// Attempts are counted from the last successful open; after
/// `max_attempts` consecutive failures the feed stays idle until the next
/// explicit `connect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(2000),
        }
    }
}

/// Configuration for one [`LiveFeed`](crate::LiveFeed).
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// WebSocket endpoint (e.g. `ws://localhost:3000/api/v1/ws`).
    pub ws_url: Url,
    pub reconnect: ReconnectPolicy,
}

impl FeedConfig {
    pub fn new(ws_url: Url) -> Self {
        Self {
            ws_url,
            reconnect: ReconnectPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }
}
