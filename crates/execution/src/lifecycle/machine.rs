//! Lifecycle phase machine.

use aurum_domain::entities::{HolderId, TransactionRecord, TxKind};
use aurum_domain::error::ActionError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::debug;
use uuid::Uuid;

/// Phase of an in-flight action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecyclePhase {
    #[default]
    Idle,
    Preparing,
    Signing,
    Confirming,
    Success,
    Error,
}

impl LifecyclePhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }

    /// Whether `self → to` is a legal step.
    ///
    /// Phases advance one at a time; `Error` is reachable from any
    /// non-terminal phase and terminal phases only return to `Idle`.
    pub fn can_transition_to(self, to: Self) -> bool {
        use LifecyclePhase::*;
        match (self, to) {
            (Idle, Preparing) | (Preparing, Signing) | (Signing, Confirming) | (Confirming, Success) => true,
            (from, Error) => !from.is_terminal(),
            (Success | Error, Idle) => true,
            _ => false,
        }
    }
}

/// Rejected phase transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid lifecycle transition {from:?} -> {to:?}")]
pub struct PhaseError {
    pub from: LifecyclePhase,
    pub to: LifecyclePhase,
}

/// Latest lifecycle state published to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PhaseUpdate {
    /// Transaction the phase belongs to, `None` before the first action.
    pub tx_id: Option<Uuid>,
    pub kind: Option<TxKind>,
    pub phase: LifecyclePhase,
}

/// Published lifecycle phases.
///
/// `latest` follows whichever action moved last; `actions` holds one entry
/// per action, keyed by transaction id, until its terminal phase is reset.
#[derive(Debug)]
pub struct PhaseBoard {
    latest: watch::Sender<PhaseUpdate>,
    actions: watch::Sender<HashMap<Uuid, PhaseUpdate>>,
}

impl Default for PhaseBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseBoard {
    /// Creates a new PhaseBoard.
    #[must_use]
    pub fn new() -> Self {
        let (latest, _) = watch::channel(PhaseUpdate::default());
        let (actions, _) = watch::channel(HashMap::new());
        Self { latest, actions }
    }

    /// Subscribes to the phase of the most recently updated action.
    pub fn subscribe(&self) -> watch::Receiver<PhaseUpdate> {
        self.latest.subscribe()
    }

    /// Subscribes to the phases of all tracked actions.
    pub fn subscribe_actions(&self) -> watch::Receiver<HashMap<Uuid, PhaseUpdate>> {
        self.actions.subscribe()
    }

    pub fn latest(&self) -> PhaseUpdate {
        *self.latest.borrow()
    }

    /// Current phase of the action behind `tx_id`.
    pub fn phase_of(&self, tx_id: Uuid) -> Option<PhaseUpdate> {
        self.actions.borrow().get(&tx_id).copied()
    }

    fn publish(&self, update: PhaseUpdate) {
        if let Some(tx_id) = update.tx_id {
            self.actions.send_modify(|actions| {
                actions.insert(tx_id, update);
            });
        }
        self.latest.send_replace(update);
    }

    /// Drops an ended action and returns the latest phase to `Idle` if it
    /// still shows that action.
    pub fn reset(&self, tx_id: Uuid) {
        self.actions.send_if_modified(|actions| {
            let ended = actions
                .get(&tx_id)
                .is_some_and(|update| update.phase.is_terminal());
            if ended {
                actions.remove(&tx_id);
            }
            ended
        });
        self.latest.send_if_modified(|update| {
            if update.tx_id == Some(tx_id) && update.phase.is_terminal() {
                update.phase = LifecyclePhase::Idle;
                true
            } else {
                false
            }
        });
    }
}

/// Lifecycle of one action and its transaction record.
#[derive(Debug)]
pub struct TransactionLifecycle {
    record: TransactionRecord,
    phase: LifecyclePhase,
    board: Arc<PhaseBoard>,
}

impl TransactionLifecycle {
    /// Starts a lifecycle: creates the pending record and enters `Preparing`.
    pub fn begin(
        kind: TxKind,
        holder: HolderId,
        summary: impl Into<String>,
        now: DateTime<Utc>,
        board: Arc<PhaseBoard>,
    ) -> Self {
        let mut lifecycle = Self {
            record: TransactionRecord::new(kind, holder, summary, now),
            phase: LifecyclePhase::Idle,
            board,
        };
        lifecycle.publish(LifecyclePhase::Preparing);
        lifecycle
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    pub fn record(&self) -> &TransactionRecord {
        &self.record
    }

    /// Moves to `to` if the step is legal.
    ///
    /// # Errors
    /// Returns `PhaseError` for skipped or backwards steps.
    pub fn advance(&mut self, to: LifecyclePhase) -> Result<(), PhaseError> {
        if !self.phase.can_transition_to(to) || to == LifecyclePhase::Idle {
            return Err(PhaseError {
                from: self.phase,
                to,
            });
        }
        self.publish(to);
        Ok(())
    }

    /// Records the broadcast signature and enters `Confirming`.
    ///
    /// # Errors
    /// Returns `PhaseError` unless the lifecycle is `Signing`.
    pub fn confirming(&mut self, signature: &str) -> Result<(), PhaseError> {
        self.advance(LifecyclePhase::Confirming)?;
        self.record.attach_signature(signature);
        Ok(())
    }

    /// Completes the record and enters `Success`.
    ///
    /// # Errors
    /// Returns `PhaseError` unless the lifecycle is `Confirming`.
    pub fn succeed(mut self, signature: &str) -> Result<TransactionRecord, PhaseError> {
        self.advance(LifecyclePhase::Success)?;
        self.record.complete(signature).map_err(|_| PhaseError {
            from: LifecyclePhase::Confirming,
            to: LifecyclePhase::Success,
        })?;
        Ok(self.record)
    }

    /// Fails the record with `err` and enters `Error`.
    ///
    /// A lifecycle that already ended is returned unchanged.
    pub fn fail(mut self, err: &ActionError) -> TransactionRecord {
        if self.advance(LifecyclePhase::Error).is_ok() {
            let _ = self.record.fail(err);
        }
        self.record
    }

    fn publish(&mut self, phase: LifecyclePhase) {
        debug!(tx = %self.record.id, kind = %self.record.kind, ?phase, "Lifecycle phase");
        self.phase = phase;
        self.board.publish(PhaseUpdate {
            tx_id: Some(self.record.id),
            kind: Some(self.record.kind),
            phase,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aurum_domain::entities::TxStatus;

    fn begin(board: &Arc<PhaseBoard>, kind: TxKind) -> TransactionLifecycle {
        TransactionLifecycle::begin(
            kind,
            HolderId::new("alice"),
            "stake 1 GOLD",
            DateTime::from_timestamp(0, 0).unwrap(),
            Arc::clone(board),
        )
    }

    fn lifecycle() -> (TransactionLifecycle, watch::Receiver<PhaseUpdate>) {
        let board = Arc::new(PhaseBoard::new());
        let rx = board.subscribe();
        (begin(&board, TxKind::Stake), rx)
    }

    #[test]
    fn test_transition_table() {
        use LifecyclePhase::*;
        assert!(Idle.can_transition_to(Preparing));
        assert!(!Idle.can_transition_to(Signing));
        assert!(!Preparing.can_transition_to(Confirming));
        assert!(!Signing.can_transition_to(Success));
        for phase in [Idle, Preparing, Signing, Confirming] {
            assert!(phase.can_transition_to(Error));
        }
        assert!(!Success.can_transition_to(Error));
        assert!(!Error.can_transition_to(Success));
        assert!(Success.can_transition_to(Idle));
        assert!(!Confirming.can_transition_to(Idle));
    }

    #[test]
    fn test_happy_path() {
        let (mut lc, rx) = lifecycle();
        assert_eq!(lc.phase(), LifecyclePhase::Preparing);
        assert_eq!(lc.record().status, TxStatus::Pending);

        lc.advance(LifecyclePhase::Signing).unwrap();
        lc.confirming("sig-1").unwrap();
        assert_eq!(rx.borrow().phase, LifecyclePhase::Confirming);

        let record = lc.succeed("sig-1").unwrap();
        assert_eq!(record.status, TxStatus::Completed);
        assert_eq!(record.chain_signature.as_deref(), Some("sig-1"));
        assert_eq!(rx.borrow().phase, LifecyclePhase::Success);
        assert_eq!(rx.borrow().tx_id, Some(record.id));
    }

    #[test]
    fn test_skip_rejected() {
        let (mut lc, _rx) = lifecycle();
        let err = lc.advance(LifecyclePhase::Confirming).unwrap_err();
        assert_eq!(err.from, LifecyclePhase::Preparing);
        assert!(lc.succeed("sig").is_err());
    }

    #[test]
    fn test_error_from_signing() {
        let (mut lc, rx) = lifecycle();
        lc.advance(LifecyclePhase::Signing).unwrap();
        let record = lc.fail(&ActionError::TransactionFailed("rejected".into()));
        assert_eq!(record.status, TxStatus::Failed);
        assert_eq!(rx.borrow().phase, LifecyclePhase::Error);
    }

    #[test]
    fn test_overlapping_actions_tracked_separately() {
        let board = Arc::new(PhaseBoard::new());
        let mut stake = begin(&board, TxKind::Stake);
        let mut claim = begin(&board, TxKind::Claim);
        let (stake_id, claim_id) = (stake.record().id, claim.record().id);

        stake.advance(LifecyclePhase::Signing).unwrap();
        stake.confirming("sig-1").unwrap();
        claim.advance(LifecyclePhase::Signing).unwrap();

        assert_eq!(board.latest().tx_id, Some(claim_id));
        assert_eq!(board.phase_of(stake_id).unwrap().phase, LifecyclePhase::Confirming);
        assert_eq!(board.phase_of(claim_id).unwrap().phase, LifecyclePhase::Signing);

        let record = claim.fail(&ActionError::TransactionFailed("rejected".into()));
        assert_eq!(record.status, TxStatus::Failed);
        assert_eq!(board.phase_of(stake_id).unwrap().phase, LifecyclePhase::Confirming);

        board.reset(claim_id);
        board.reset(stake_id);
        assert!(board.phase_of(claim_id).is_none());
        // still in flight, so kept
        assert_eq!(board.phase_of(stake_id).unwrap().phase, LifecyclePhase::Confirming);
        assert_eq!(board.subscribe_actions().borrow().len(), 1);
    }
}
