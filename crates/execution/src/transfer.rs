//! Token transfers between holders.

use crate::lifecycle::TransactionExecutor;
use aurum_data::AccountBook;
use aurum_domain::entities::{HolderId, TxKind};
use aurum_domain::error::ActionError;
use aurum_protocols::signer::{ActionInstruction, UnsignedTransaction};
use rust_decimal::Decimal;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

pub struct TransferService {
    book: Arc<AccountBook>,
    executor: Arc<TransactionExecutor>,
}

impl TransferService {
    /// Creates a new TransferService.
    pub fn new(book: Arc<AccountBook>, executor: Arc<TransactionExecutor>) -> Self {
        Self { book, executor }
    }

    /// Sends `amount` of `token` from `from` to `to`; returns the sender's
    /// remaining balance.
    ///
    /// The recipient is credited only if it already has an account in the
    /// store. Both holders stay locked from validation to commit, and the
    /// debit and credit are persisted in one write.
    ///
    /// # Errors
    /// `InvalidAmount`, `InsufficientBalance`, or a signer, chain or storage
    /// failure.
    pub async fn send(
        &self,
        from: &HolderId,
        to: &HolderId,
        token: &str,
        amount: Decimal,
    ) -> Result<Decimal, ActionError> {
        let kind = TxKind::Send;
        if amount <= Decimal::ZERO {
            return Err(self.executor.reject(kind, ActionError::InvalidAmount { amount }));
        }
        let (account, recipient) = self
            .book
            .holder_pair(from, to)
            .await
            .map_err(|e| self.executor.reject(kind, e.into()))?;
        if let Err(e) = account.balances.ensure_available(token, amount) {
            return Err(self.executor.reject(kind, e));
        }

        let summary = format!("send {amount} {token} to {to}");
        let tx = UnsignedTransaction::Instruction(ActionInstruction {
            kind,
            holder: from.clone(),
            summary: summary.clone(),
            params: json!({ "to": to, "token": token, "amount": amount }),
        });
        let (to_id, symbol) = (to.clone(), token.to_string());
        let to_self = from == to;

        let executed = self
            .executor
            .execute(
                kind,
                from,
                summary,
                |_signer| async move { Ok(tx) },
                move |_signature| async move {
                    let mut account = account;
                    if to_self {
                        return Ok(account.balances.get(&symbol));
                    }
                    let remaining = account.balances.debit(&symbol, amount)?;
                    match recipient {
                        Some(mut recipient) => {
                            recipient.balances.credit(symbol, amount)?;
                            account.commit_with(recipient).await?;
                        }
                        None => {
                            debug!(to = %to_id, "Recipient not tracked, no credit");
                            account.commit().await?;
                        }
                    }
                    Ok(remaining)
                },
            )
            .await?;

        info!(from = %from, to = %to, token = %token, amount = %amount, "Transfer committed");
        Ok(executed.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Harness;
    use aurum_domain::entities::TxStatus;
    use aurum_domain::error::ErrorKind;
    use aurum_protocols::signer::SignerError;
    use aurum_protocols::testing::SignerStage;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_send_to_tracked_recipient() {
        let h = Harness::new();
        let transfers = TransferService::new(h.book.clone(), h.executor.clone());
        let (alice, bob) = (HolderId::new("alice"), HolderId::new("bob"));
        h.fund(&alice, "GOLD", dec!(10)).await;
        h.fund(&bob, "USDC", dec!(1)).await;

        let remaining = transfers.send(&alice, &bob, "GOLD", dec!(10)).await.unwrap();
        assert_eq!(remaining, Decimal::ZERO);
        assert_eq!(h.balance(&bob, "GOLD").await, dec!(10));
    }

    #[tokio::test]
    async fn test_send_to_untracked_recipient() {
        let h = Harness::new();
        let transfers = TransferService::new(h.book.clone(), h.executor.clone());
        let (alice, carol) = (HolderId::new("alice"), HolderId::new("carol"));
        h.fund(&alice, "GOLD", dec!(10)).await;

        transfers.send(&alice, &carol, "GOLD", dec!(2.5)).await.unwrap();
        assert_eq!(h.balance(&alice, "GOLD").await, dec!(7.5));
        assert_eq!(h.store.account_count().await, 1);
    }

    #[tokio::test]
    async fn test_send_failures_keep_balance() {
        let h = Harness::new();
        let transfers = TransferService::new(h.book.clone(), h.executor.clone());
        let (alice, bob) = (HolderId::new("alice"), HolderId::new("bob"));
        h.fund(&alice, "GOLD", dec!(10)).await;

        let err = transfers.send(&alice, &bob, "GOLD", dec!(10.000001)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientBalance);
        let err = transfers.send(&alice, &bob, "GOLD", Decimal::ZERO).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidAmount);

        h.signer
            .fail_at(SignerStage::Broadcast, SignerError::Broadcast("node unreachable".into()));
        let err = transfers.send(&alice, &bob, "GOLD", dec!(1)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransactionFailed);
        assert_eq!(h.balance(&alice, "GOLD").await, dec!(10));
    }

    #[tokio::test]
    async fn test_recipient_write_failure_keeps_sender_balance() {
        let h = Harness::new();
        let transfers = TransferService::new(h.book.clone(), h.executor.clone());
        let (alice, bob) = (HolderId::new("alice"), HolderId::new("bob"));
        h.fund(&alice, "GOLD", dec!(10)).await;
        h.fund(&bob, "USDC", dec!(1)).await;
        h.store.reject_holder_writes(&bob);

        let err = transfers.send(&alice, &bob, "GOLD", dec!(4)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StorageError);
        assert_eq!(h.balance(&alice, "GOLD").await, dec!(10));
        assert_eq!(h.balance(&bob, "GOLD").await, Decimal::ZERO);
        let record = &h.executor.history().recent().await[0];
        assert_eq!(record.status, TxStatus::Failed);
    }

    #[tokio::test]
    async fn test_opposite_sends_do_not_deadlock() {
        let h = Harness::new();
        let transfers = Arc::new(TransferService::new(h.book.clone(), h.executor.clone()));
        let (alice, bob) = (HolderId::new("alice"), HolderId::new("bob"));
        h.fund(&alice, "GOLD", dec!(10)).await;
        h.fund(&bob, "GOLD", dec!(10)).await;

        let forward = {
            let (transfers, alice, bob) = (Arc::clone(&transfers), alice.clone(), bob.clone());
            tokio::spawn(async move { transfers.send(&alice, &bob, "GOLD", dec!(3)).await })
        };
        let backward = {
            let (transfers, alice, bob) = (Arc::clone(&transfers), alice.clone(), bob.clone());
            tokio::spawn(async move { transfers.send(&bob, &alice, "GOLD", dec!(1)).await })
        };
        forward.await.unwrap().unwrap();
        backward.await.unwrap().unwrap();

        assert_eq!(h.balance(&alice, "GOLD").await, dec!(8));
        assert_eq!(h.balance(&bob, "GOLD").await, dec!(12));
    }

    #[tokio::test]
    async fn test_send_to_self_keeps_balance() {
        let h = Harness::new();
        let transfers = TransferService::new(h.book.clone(), h.executor.clone());
        let alice = HolderId::new("alice");
        h.fund(&alice, "GOLD", dec!(10)).await;

        let remaining = transfers.send(&alice, &alice, "GOLD", dec!(4)).await.unwrap();
        assert_eq!(remaining, dec!(10));
        assert_eq!(h.balance(&alice, "GOLD").await, dec!(10));
    }
}
