//! Runs actions through the signer with lifecycle tracking.

use super::{LifecyclePhase, PhaseBoard, PhaseError, PhaseUpdate, TransactionHistory, TransactionLifecycle};
use crate::notify::{Notification, NotificationSink};
use crate::wallet::WalletSession;
use aurum_domain::clock::Clock;
use aurum_domain::entities::{HolderId, TransactionRecord, TxKind};
use aurum_domain::error::ActionError;
use aurum_protocols::signer::{TransactionSigner, UnsignedTransaction};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Result of a confirmed action.
#[derive(Debug, Clone)]
pub struct Executed<T> {
    pub value: T,
    pub record: TransactionRecord,
}

/// Drives one [`TransactionLifecycle`] per action.
///
/// Order of work: build the transaction, sign, broadcast, wait for
/// confirmation, then run the caller's commit. Local state is only mutated
/// by the commit, after the chain accepted the transaction.
pub struct TransactionExecutor {
    session: Arc<WalletSession>,
    history: Arc<TransactionHistory>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn NotificationSink>,
    phases: Arc<PhaseBoard>,
    cooldown: Duration,
}

impl TransactionExecutor {
    /// Creates a new TransactionExecutor.
    pub fn new(
        session: Arc<WalletSession>,
        history: Arc<TransactionHistory>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn NotificationSink>,
        cooldown: Duration,
    ) -> Self {
        Self {
            session,
            history,
            clock,
            notifier,
            phases: Arc::new(PhaseBoard::new()),
            cooldown,
        }
    }

    /// Subscribes to phase updates of the most recent action.
    pub fn subscribe(&self) -> watch::Receiver<PhaseUpdate> {
        self.phases.subscribe()
    }

    pub fn current_phase(&self) -> PhaseUpdate {
        self.phases.latest()
    }

    /// Phases of every tracked action, for observing overlapping actions.
    pub fn phases(&self) -> &Arc<PhaseBoard> {
        &self.phases
    }

    pub fn history(&self) -> &Arc<TransactionHistory> {
        &self.history
    }

    pub fn session(&self) -> &Arc<WalletSession> {
        &self.session
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn notifier(&self) -> &Arc<dyn NotificationSink> {
        &self.notifier
    }

    /// Reports an action rejected before it started and hands the error back.
    pub fn reject(&self, kind: TxKind, err: ActionError) -> ActionError {
        warn!(kind = %kind, error = %err, "Action rejected");
        self.notifier
            .notify(Notification::from_error(kind.to_string(), &err));
        err
    }

    /// Runs one action.
    ///
    /// `prepare` receives the signer address and builds the transaction;
    /// `commit` receives the confirmed signature and applies local state.
    /// Swap failures are reported as `SwapFailed`.
    ///
    /// # Errors
    /// `NotConnected` without a signer, otherwise the first failing step's
    /// error. The transaction record is `failed` in every error case after
    /// the lifecycle started.
    pub async fn execute<T, P, PF, C, CF>(
        &self,
        kind: TxKind,
        holder: &HolderId,
        summary: impl Into<String>,
        prepare: P,
        commit: C,
    ) -> Result<Executed<T>, ActionError>
    where
        P: FnOnce(String) -> PF,
        PF: Future<Output = Result<UnsignedTransaction, ActionError>>,
        C: FnOnce(String) -> CF,
        CF: Future<Output = Result<T, ActionError>>,
    {
        let Some(signer) = self.session.signer().await else {
            return Err(self.reject(kind, ActionError::NotConnected));
        };

        let summary = summary.into();
        let mut lifecycle = TransactionLifecycle::begin(
            kind,
            holder.clone(),
            summary.clone(),
            self.clock.now(),
            Arc::clone(&self.phases),
        );
        self.history.record(lifecycle.record().clone()).await;

        let outcome = self.drive(&mut lifecycle, signer, prepare, commit).await;

        match outcome {
            Ok((value, signature)) => {
                let record = lifecycle.succeed(&signature).map_err(|e| {
                    error!(error = %e, "Lifecycle out of order after confirmation");
                    phase_failure(e)
                })?;
                info!(
                    tx = %record.id,
                    kind = %kind,
                    holder = %holder,
                    signature = %signature,
                    "Transaction completed"
                );
                self.notifier.notify(Notification::success(
                    kind.to_string(),
                    format!("{summary} confirmed"),
                ));
                self.history.record(record.clone()).await;
                self.schedule_reset(record.id);
                Ok(Executed { value, record })
            }
            Err(err) => {
                let err = if kind == TxKind::Swap {
                    err.into_swap_failure()
                } else {
                    err
                };
                let record = lifecycle.fail(&err);
                error!(
                    tx = %record.id,
                    kind = %kind,
                    holder = %holder,
                    error = %err,
                    "Transaction failed"
                );
                self.notifier
                    .notify(Notification::from_error(kind.to_string(), &err));
                self.history.record(record.clone()).await;
                self.schedule_reset(record.id);
                Err(err)
            }
        }
    }

    async fn drive<T, P, PF, C, CF>(
        &self,
        lifecycle: &mut TransactionLifecycle,
        signer: Arc<dyn TransactionSigner>,
        prepare: P,
        commit: C,
    ) -> Result<(T, String), ActionError>
    where
        P: FnOnce(String) -> PF,
        PF: Future<Output = Result<UnsignedTransaction, ActionError>>,
        C: FnOnce(String) -> CF,
        CF: Future<Output = Result<T, ActionError>>,
    {
        let tx = prepare(signer.address()).await?;

        lifecycle
            .advance(LifecyclePhase::Signing)
            .map_err(phase_failure)?;
        let signed = signer.sign(tx).await?;
        let signature = signer.broadcast(&signed).await?;

        lifecycle.confirming(&signature).map_err(phase_failure)?;
        self.history.record(lifecycle.record().clone()).await;
        signer.confirm(&signature).await?;

        let value = commit(signature.clone()).await?;
        Ok((value, signature))
    }

    /// Returns the displayed phase to idle after the cooldown, unless a newer
    /// action has taken over.
    fn schedule_reset(&self, tx_id: Uuid) {
        let phases = Arc::clone(&self.phases);
        let cooldown = self.cooldown;
        tokio::spawn(async move {
            tokio::time::sleep(cooldown).await;
            phases.reset(tx_id);
        });
    }
}

fn phase_failure(err: PhaseError) -> ActionError {
    ActionError::TransactionFailed(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingSink;
    use aurum_domain::clock::ManualClock;
    use aurum_domain::entities::TxStatus;
    use aurum_domain::error::ErrorKind;
    use aurum_protocols::signer::{ActionInstruction, SignerError};
    use aurum_protocols::testing::{ScriptedSigner, SignerStage};

    struct Fixture {
        executor: TransactionExecutor,
        signer: Arc<ScriptedSigner>,
        sink: Arc<RecordingSink>,
    }

    fn fixture(cooldown: Duration) -> Fixture {
        let signer = Arc::new(ScriptedSigner::new("wallet-1"));
        let sink = Arc::new(RecordingSink::default());
        let executor = TransactionExecutor::new(
            Arc::new(WalletSession::connected(signer.clone())),
            Arc::new(TransactionHistory::new(10)),
            Arc::new(ManualClock::at_unix(1_700_000_000)),
            sink.clone(),
            cooldown,
        );
        Fixture {
            executor,
            signer,
            sink,
        }
    }

    fn instruction(address: String) -> UnsignedTransaction {
        UnsignedTransaction::Instruction(ActionInstruction {
            kind: TxKind::Claim,
            holder: HolderId::new(address),
            summary: "claim".into(),
            params: serde_json::Value::Null,
        })
    }

    #[tokio::test]
    async fn test_success_commits_after_confirmation() {
        let f = fixture(Duration::from_secs(60));
        let executed = f
            .executor
            .execute(
                TxKind::Claim,
                &HolderId::new("alice"),
                "claim 1 GOLD",
                |address| async move { Ok(instruction(address)) },
                |signature| async move { Ok(signature.len()) },
            )
            .await
            .unwrap();

        assert_eq!(executed.value, "sig-1".len());
        assert_eq!(executed.record.status, TxStatus::Completed);
        assert_eq!(f.executor.current_phase().phase, LifecyclePhase::Success);
        assert_eq!(f.signer.signed().len(), 1);
        let stored = f.executor.history().get(executed.record.id).await.unwrap();
        assert_eq!(stored.status, TxStatus::Completed);
        assert_eq!(f.sink.notifications()[0].message, "claim 1 GOLD confirmed");
    }

    #[tokio::test]
    async fn test_confirm_failure_skips_commit() {
        let f = fixture(Duration::from_secs(60));
        f.signer.fail_at(
            SignerStage::Confirm,
            SignerError::Confirmation("blockhash expired".into()),
        );

        let committed = std::sync::atomic::AtomicBool::new(false);
        let err = f
            .executor
            .execute(
                TxKind::Stake,
                &HolderId::new("alice"),
                "stake 1 GOLD",
                |address| async move { Ok(instruction(address)) },
                |_signature| async {
                    committed.store(true, std::sync::atomic::Ordering::SeqCst);
                    Ok(())
                },
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::TransactionFailed);
        assert!(!committed.load(std::sync::atomic::Ordering::SeqCst));
        let record = &f.executor.history().recent().await[0];
        assert_eq!(record.status, TxStatus::Failed);
        assert_eq!(record.chain_signature.as_deref(), Some("sig-1"));
        assert_eq!(f.executor.current_phase().phase, LifecyclePhase::Error);
    }

    #[tokio::test]
    async fn test_swap_errors_become_swap_failed() {
        let f = fixture(Duration::from_secs(60));
        let err = f
            .executor
            .execute(
                TxKind::Swap,
                &HolderId::new("alice"),
                "swap",
                |_address| async { Err(ActionError::SwapBuildFailed("no route".into())) },
                |_signature| async { Ok(()) },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SwapFailed);
        assert!(f.signer.signed().is_empty());
    }

    #[tokio::test]
    async fn test_not_connected_creates_no_record() {
        let f = fixture(Duration::from_secs(60));
        f.executor.session().disconnect().await;
        let err = f
            .executor
            .execute(
                TxKind::Send,
                &HolderId::new("alice"),
                "send",
                |address| async move { Ok(instruction(address)) },
                |_signature| async { Ok(()) },
            )
            .await
            .unwrap_err();
        assert_eq!(err, ActionError::NotConnected);
        assert!(f.executor.history().is_empty().await);
        assert_eq!(f.sink.notifications()[0].error_kind, Some(ErrorKind::NotConnected));
    }

    #[tokio::test]
    async fn test_terminal_phase_resets_after_cooldown() {
        let f = fixture(Duration::from_millis(10));
        let mut rx = f.executor.subscribe();
        let executed = f
            .executor
            .execute(
                TxKind::Claim,
                &HolderId::new("alice"),
                "claim",
                |address| async move { Ok(instruction(address)) },
                |_signature| async { Ok(()) },
            )
            .await
            .unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if rx.borrow_and_update().phase == LifecyclePhase::Idle {
                    break;
                }
                if rx.changed().await.is_err() {
                    break;
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(f.executor.current_phase().phase, LifecyclePhase::Idle);
        assert!(f.executor.phases().phase_of(executed.record.id).is_none());
    }
}
