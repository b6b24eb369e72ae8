// ── Per-gate zone cache ──
//
// Zone lists keyed by gate id. Lists are immutable `Arc<Vec<Zone>>`
// snapshots replaced wholesale, so readers never observe a half-applied
// update. A version counter on a `watch` channel signals changes.

use std::sync::Arc;

use dashmap::DashMap;
use gopark_api::types::Zone;
use tokio::sync::watch;

/// Apply a zone snapshot to a cached list.
///
/// Replaces the entry with the same id; fields are not merged. When no entry
/// matches, the input `Arc` itself is returned so callers can detect the
/// no-op with [`Arc::ptr_eq`].
pub fn reconcile(update: &Zone, current: &Arc<Vec<Zone>>) -> Arc<Vec<Zone>> {
    if !current.iter().any(|zone| zone.id == update.id) {
        return Arc::clone(current);
    }

    Arc::new(
        current
            .iter()
            .map(|zone| {
                if zone.id == update.id {
                    update.clone()
                } else {
                    zone.clone()
                }
            })
            .collect(),
    )
}

pub struct ZoneCache {
    lists: DashMap<String, Arc<Vec<Zone>>>,
    version: watch::Sender<u64>,
}

impl ZoneCache {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        Self {
            lists: DashMap::new(),
            version,
        }
    }

    /// Cached list for `gate_id`, if one has been loaded.
    pub fn get(&self, gate_id: &str) -> Option<Arc<Vec<Zone>>> {
        self.lists.get(gate_id).map(|r| Arc::clone(r.value()))
    }

    /// Replace the list for `gate_id`.
    pub fn set(&self, gate_id: &str, zones: Vec<Zone>) -> Arc<Vec<Zone>> {
        let zones = Arc::new(zones);
        self.lists.insert(gate_id.to_owned(), Arc::clone(&zones));
        self.bump_version();
        zones
    }

    /// Rewrite the cached list for `gate_id` with `f`.
    ///
    /// Returns `false` when nothing is cached for the gate or when `f` hands
    /// back the same `Arc`; the version is only bumped on a real change.
    pub fn update<F>(&self, gate_id: &str, f: F) -> bool
    where
        F: FnOnce(&Arc<Vec<Zone>>) -> Arc<Vec<Zone>>,
    {
        let changed = match self.lists.get_mut(gate_id) {
            Some(mut entry) => {
                let next = f(entry.value());
                if Arc::ptr_eq(&next, entry.value()) {
                    false
                } else {
                    *entry.value_mut() = next;
                    true
                }
            }
            None => false,
        };

        if changed {
            self.bump_version();
        }
        changed
    }

    /// Reconcile a live zone snapshot into the list for `gate_id`.
    pub fn apply_zone_update(&self, gate_id: &str, zone: &Zone) -> bool {
        self.update(gate_id, |current| reconcile(zone, current))
    }

    /// Drop the cached list for one gate so the next read refetches it.
    pub fn invalidate(&self, gate_id: &str) {
        if self.lists.remove(gate_id).is_some() {
            self.bump_version();
        }
    }

    /// Drop every cached list.
    pub fn invalidate_all(&self) {
        if !self.lists.is_empty() {
            self.lists.clear();
            self.bump_version();
        }
    }

    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    /// Subscribe to the change counter.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    fn bump_version(&self) {
        // `send_modify` updates unconditionally, even with zero receivers.
        self.version.send_modify(|v| *v += 1);
    }
}

impl Default for ZoneCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn zone(id: &str, occupied: u32) -> Zone {
        Zone {
            id: id.into(),
            name: format!("Zone {id}"),
            category_id: "cat_regular".into(),
            gate_ids: vec!["gate_1".into()],
            total_slots: 10,
            occupied,
            free: 10 - occupied,
            reserved: 0,
            available_for_visitors: 10 - occupied,
            available_for_subscribers: 0,
            rate_normal: 3.0,
            rate_special: 5.0,
            open: true,
        }
    }

    #[test]
    fn reconcile_replaces_matching_entry_only() {
        let current = Arc::new(vec![zone("z1", 2), zone("z2", 5)]);
        let next = reconcile(&zone("z2", 6), &current);

        assert_eq!(*next, vec![zone("z1", 2), zone("z2", 6)]);
        assert!(!Arc::ptr_eq(&next, &current));
    }

    #[test]
    fn reconcile_absent_zone_returns_same_list() {
        let current = Arc::new(vec![zone("z1", 2), zone("z2", 5)]);
        let next = reconcile(&zone("z3", 1), &current);
        assert!(Arc::ptr_eq(&next, &current));
    }

    #[test]
    fn reconcile_replaces_wholesale() {
        let current = Arc::new(vec![zone("z1", 2)]);
        let mut update = zone("z1", 3);
        update.name = String::new();
        update.open = false;

        let next = reconcile(&update, &current);
        assert_eq!(next[0].name, "");
        assert!(!next[0].open);
    }

    #[test]
    fn update_without_cached_list_is_noop() {
        let cache = ZoneCache::new();
        assert!(!cache.apply_zone_update("gate_1", &zone("z1", 1)));
        assert!(cache.get("gate_1").is_none());
        assert_eq!(cache.version(), 0);
    }

    #[test]
    fn version_bumps_only_on_change() {
        let cache = ZoneCache::new();
        cache.set("gate_1", vec![zone("z1", 1)]);
        assert_eq!(cache.version(), 1);

        assert!(!cache.apply_zone_update("gate_1", &zone("z9", 1)));
        assert_eq!(cache.version(), 1);

        assert!(cache.apply_zone_update("gate_1", &zone("z1", 4)));
        assert_eq!(cache.version(), 2);
        assert_eq!(cache.get("gate_1").unwrap()[0].occupied, 4);
    }

    #[test]
    fn invalidate_drops_lists() {
        let cache = ZoneCache::new();
        cache.set("gate_1", vec![zone("z1", 1)]);
        cache.set("gate_2", vec![zone("z2", 1)]);

        cache.invalidate("gate_1");
        assert!(cache.get("gate_1").is_none());
        assert!(cache.get("gate_2").is_some());

        cache.invalidate_all();
        assert!(cache.get("gate_2").is_none());
    }

    #[tokio::test]
    async fn subscribers_see_changes() {
        let cache = ZoneCache::new();
        let mut rx = cache.subscribe();
        cache.set("gate_1", vec![zone("z1", 1)]);

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), 1);
    }
}
