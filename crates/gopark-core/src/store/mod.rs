// ── Local read model ──
//
// Zone lists per gate and the admin audit log, reconciled from live
// messages. The REST API stays the source of truth; this is a cache.

mod admin_log;
mod zone_cache;

use std::sync::Arc;

use gopark_api::websocket::ServerMessage;
use tracing::trace;

pub use admin_log::{ADMIN_LOG_CAPACITY, AdminLog};
pub use zone_cache::{ZoneCache, reconcile};

use crate::live::{LiveFeed, Subscription};

/// Reactive store shared by every view.
///
/// Reads are lock-free snapshots; changes are pushed through `watch`
/// channels (`zones.subscribe()`, `admin_log.subscribe()`).
#[derive(Default)]
pub struct DataStore {
    pub zones: ZoneCache,
    pub admin_log: AdminLog,
}

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile `zone-update` messages from `feed` into the cached list for
    /// `gate_id`. Live updates stop when the returned handle is dropped.
    pub fn bind_gate(self: &Arc<Self>, feed: &LiveFeed, gate_id: &str) -> Subscription {
        let store = Arc::clone(self);
        let gate_id = gate_id.to_owned();
        feed.on_message(move |message| {
            if let ServerMessage::ZoneUpdate(zone) = message {
                let changed = store.zones.apply_zone_update(&gate_id, zone);
                trace!(gate_id = %gate_id, zone_id = %zone.id, changed, "zone update");
            }
        })
    }

    /// Append `admin-update` messages from `feed` to the admin log.
    pub fn bind_admin_log(self: &Arc<Self>, feed: &LiveFeed) -> Subscription {
        let store = Arc::clone(self);
        feed.on_message(move |message| {
            if let ServerMessage::AdminUpdate(record) = message {
                store.admin_log.push(record.clone());
            }
        })
    }
}
