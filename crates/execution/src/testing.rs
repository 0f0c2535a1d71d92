//! Test doubles and a wired-up harness.

use crate::lifecycle::{TransactionExecutor, TransactionHistory};
use crate::notify::{Notification, NotificationSink};
use crate::wallet::WalletSession;
use aurum_data::{AccountBook, MemoryAccountStore};
use aurum_domain::clock::ManualClock;
use aurum_domain::entities::HolderId;
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Sink that keeps every notification.
#[derive(Debug, Default)]
pub struct RecordingSink {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingSink {
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications
            .lock()
            .map(|n| n.clone())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut n) = self.notifications.lock() {
            n.clear();
        }
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, notification: Notification) {
        if let Ok(mut n) = self.notifications.lock() {
            n.push(notification);
        }
    }
}

/// In-memory store, manual clock and a connected scripted signer.
pub struct Harness {
    pub store: Arc<MemoryAccountStore>,
    pub clock: Arc<ManualClock>,
    pub book: Arc<AccountBook>,
    pub signer: Arc<aurum_protocols::testing::ScriptedSigner>,
    pub session: Arc<WalletSession>,
    pub sink: Arc<RecordingSink>,
    pub executor: Arc<TransactionExecutor>,
}

impl Harness {
    /// Unix time the harness clock starts at.
    pub const START: i64 = 1_700_000_000;

    pub fn new() -> Self {
        let store = Arc::new(MemoryAccountStore::new());
        let clock = Arc::new(ManualClock::at_unix(Self::START));
        let book = Arc::new(AccountBook::new(store.clone(), clock.clone()));
        let signer = Arc::new(aurum_protocols::testing::ScriptedSigner::new("wallet-1"));
        let session = Arc::new(WalletSession::connected(signer.clone()));
        let sink = Arc::new(RecordingSink::default());
        let executor = Arc::new(TransactionExecutor::new(
            session.clone(),
            Arc::new(TransactionHistory::new(50)),
            clock.clone(),
            sink.clone(),
            Duration::from_secs(3),
        ));
        Self {
            store,
            clock,
            book,
            signer,
            session,
            sink,
            executor,
        }
    }

    /// Credits `amount` of `token` to `holder` directly in the store.
    pub async fn fund(&self, holder: &HolderId, token: &str, amount: Decimal) {
        let mut account = self.book.holder(holder).await.expect("load account");
        account.balances.credit(token, amount).expect("credit funding");
        account.commit().await.expect("commit funding");
    }

    pub async fn balance(&self, holder: &HolderId, token: &str) -> Decimal {
        self.book
            .read_holder(holder)
            .await
            .map(|account| account.balances.get(token))
            .unwrap_or_default()
    }

    pub fn advance_days(&self, days: i64) {
        self.clock.advance(chrono::Duration::days(days));
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
