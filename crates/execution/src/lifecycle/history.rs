//! Bounded transaction history.

use aurum_domain::entities::{HolderId, TransactionRecord};
use std::collections::VecDeque;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Newest-first window of recent transaction records.
///
/// Updates replace a record in place; a record that reached a terminal
/// status never changes again.
#[derive(Debug)]
pub struct TransactionHistory {
    capacity: usize,
    records: RwLock<VecDeque<TransactionRecord>>,
}

impl TransactionHistory {
    /// Creates a new history keeping at most `capacity` records.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            records: RwLock::new(VecDeque::new()),
        }
    }

    /// Inserts a record, or updates it if already present.
    pub async fn record(&self, record: TransactionRecord) {
        let mut records = self.records.write().await;
        if let Some(existing) = records.iter_mut().find(|r| r.id == record.id) {
            if existing.status.is_terminal() {
                debug!(tx = %record.id, status = ?existing.status, "Ignoring update to finished record");
                return;
            }
            *existing = record;
            return;
        }
        records.push_front(record);
        records.truncate(self.capacity);
    }

    pub async fn get(&self, id: Uuid) -> Option<TransactionRecord> {
        self.records.read().await.iter().find(|r| r.id == id).cloned()
    }

    /// All retained records, newest first.
    pub async fn recent(&self) -> Vec<TransactionRecord> {
        self.records.read().await.iter().cloned().collect()
    }

    /// Retained records of one holder, newest first.
    pub async fn for_holder(&self, holder: &HolderId) -> Vec<TransactionRecord> {
        self.records
            .read()
            .await
            .iter()
            .filter(|r| &r.holder == holder)
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}
