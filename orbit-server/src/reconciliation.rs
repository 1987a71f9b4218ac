use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, PoisonError},
    time::SystemTime,
};

/// Entries kept in memory. Older ones are only in the error log.
pub const RECONCILIATION_CAPACITY: usize = 256;

/// An organization that was created but could neither be completed nor rolled
/// back. It has no admin member and needs manual cleanup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrphanedOrganization {
    pub org_code: String,
    pub workspace_name: String,
    pub user_id: String,
    pub recorded_at: SystemTime,
}

/// Orphaned organizations waiting for manual cleanup. Every entry is logged
/// at error level when recorded; the server reports what is still held when
/// it stops.
#[derive(Debug, Clone, Default)]
pub struct ReconciliationLog {
    entries: Arc<Mutex<VecDeque<OrphanedOrganization>>>,
}

impl ReconciliationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: OrphanedOrganization) {
        log::error!(
            "organization {} ({}) left without admin {}; needs reconciliation",
            entry.org_code,
            entry.workspace_name,
            entry.user_id
        );
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.len() == RECONCILIATION_CAPACITY {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    pub fn entries(&self) -> Vec<OrphanedOrganization> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Logs every held entry once more and empties the log.
    pub fn report_pending(&self) -> usize {
        let pending: Vec<OrphanedOrganization> = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for entry in &pending {
            log::warn!(
                "unreconciled organization {} ({}) created for {}",
                entry.org_code,
                entry.workspace_name,
                entry.user_id
            );
        }
        pending.len()
    }
}
