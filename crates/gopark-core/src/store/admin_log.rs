// ── Rolling admin audit log ──

use std::sync::Arc;

use gopark_api::websocket::AdminAudit;
use tokio::sync::watch;

/// Maximum number of audit records kept.
pub const ADMIN_LOG_CAPACITY: usize = 50;

/// Newest-first list of admin audit records, capped at
/// [`ADMIN_LOG_CAPACITY`]. Appends are unconditional: duplicates are kept.
pub struct AdminLog {
    entries: watch::Sender<Arc<Vec<AdminAudit>>>,
}

impl AdminLog {
    pub fn new() -> Self {
        let (entries, _) = watch::channel(Arc::new(Vec::new()));
        Self { entries }
    }

    /// Prepend `record`, evicting the oldest entry past capacity.
    pub fn push(&self, record: AdminAudit) {
        self.entries.send_modify(|entries| {
            let mut next = Vec::with_capacity(ADMIN_LOG_CAPACITY);
            next.push(record);
            next.extend(entries.iter().take(ADMIN_LOG_CAPACITY - 1).cloned());
            *entries = Arc::new(next);
        });
    }

    pub fn snapshot(&self) -> Arc<Vec<AdminAudit>> {
        self.entries.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<AdminAudit>>> {
        self.entries.subscribe()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.send_modify(|entries| *entries = Arc::new(Vec::new()));
    }
}

impl Default for AdminLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn audit(n: usize) -> AdminAudit {
        AdminAudit {
            admin_id: "admin_1".into(),
            action: format!("action-{n}"),
            target_type: "zone".into(),
            target_id: "zone_a".into(),
            details: None,
            timestamp: format!("2026-03-01T09:{:02}:00Z", n % 60),
        }
    }

    #[test]
    fn keeps_newest_fifty() {
        let log = AdminLog::new();
        for n in 0..60 {
            log.push(audit(n));
        }

        let entries = log.snapshot();
        assert_eq!(entries.len(), ADMIN_LOG_CAPACITY);
        assert_eq!(entries[0].action, "action-59");
        assert_eq!(entries[49].action, "action-10");
        assert!(entries.iter().all(|e| e.action != "action-9"));
    }

    #[test]
    fn duplicates_are_kept() {
        let log = AdminLog::new();
        log.push(audit(1));
        log.push(audit(1));
        assert_eq!(log.len(), 2);

        log.clear();
        assert!(log.is_empty());
    }
}
