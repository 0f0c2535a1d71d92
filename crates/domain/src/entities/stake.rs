use crate::error::ActionError;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A holder's stake in one staking pool.
///
/// Invariant: `stake_start_time.is_none()` iff `staked_amount == 0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StakePosition {
    pub staked_amount: Decimal,
    pub stake_start_time: Option<DateTime<Utc>>,
}

impl StakePosition {
    pub fn is_staked(&self) -> bool {
        self.staked_amount > Decimal::ZERO
    }

    /// Adds to the stake. The reward clock starts on the zero to non-zero
    /// transition and is left alone by later additions.
    ///
    /// # Errors
    /// `InvalidAmount` if the stake would overflow.
    pub fn add(&mut self, amount: Decimal, now: DateTime<Utc>) -> Result<(), ActionError> {
        let staked = self
            .staked_amount
            .checked_add(amount)
            .ok_or(ActionError::InvalidAmount { amount })?;
        if !self.is_staked() {
            self.stake_start_time = Some(now);
        }
        self.staked_amount = staked;
        Ok(())
    }

    /// Removes from the stake, clearing the clock when fully withdrawn.
    ///
    /// # Errors
    /// `InsufficientStake` if `amount` exceeds the staked amount.
    pub fn remove(&mut self, amount: Decimal) -> Result<(), ActionError> {
        if amount > self.staked_amount {
            return Err(ActionError::InsufficientStake {
                requested: amount,
                staked: self.staked_amount,
            });
        }
        self.staked_amount -= amount;
        if self.staked_amount.is_zero() {
            self.stake_start_time = None;
        }
        Ok(())
    }

    /// Restarts the reward clock after a payout.
    pub fn restart_clock(&mut self, now: DateTime<Utc>) {
        if self.is_staked() {
            self.stake_start_time = Some(now);
        }
    }

    /// Remaining lock time, `max(0, start + min_lock - now)`.
    pub fn lock_remaining(&self, min_lock: Duration, now: DateTime<Utc>) -> Duration {
        match self.stake_start_time {
            Some(start) => (start + min_lock - now).max(Duration::zero()),
            None => Duration::zero(),
        }
    }
}

/// Read-only view of a stake for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StakeView {
    pub staked_amount: Decimal,
    pub stake_start_time: Option<DateTime<Utc>>,
    pub pending_rewards: Decimal,
    pub lock_remaining_secs: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn test_clock_starts_on_first_stake_only() {
        let mut stake = StakePosition::default();
        stake.add(dec!(10), at(100)).unwrap();
        stake.add(dec!(5), at(500)).unwrap();

        assert_eq!(stake.staked_amount, dec!(15));
        assert_eq!(stake.stake_start_time, Some(at(100)));
    }

    #[test]
    fn test_full_withdrawal_clears_clock() {
        let mut stake = StakePosition::default();
        stake.add(dec!(10), at(100)).unwrap();

        assert!(stake.remove(dec!(11)).is_err());
        stake.remove(dec!(10)).unwrap();
        assert_eq!(stake, StakePosition::default());
    }

    #[test]
    fn test_lock_remaining_never_negative() {
        let mut stake = StakePosition::default();
        stake.add(dec!(1), at(0)).unwrap();

        let lock = Duration::seconds(60);
        assert_eq!(stake.lock_remaining(lock, at(20)).num_seconds(), 40);
        assert_eq!(stake.lock_remaining(lock, at(60)).num_seconds(), 0);
        assert_eq!(stake.lock_remaining(lock, at(600)).num_seconds(), 0);
    }

    #[test]
    fn test_add_overflow_keeps_position() {
        let mut stake = StakePosition::default();
        stake.add(Decimal::MAX, at(0)).unwrap();
        assert!(matches!(
            stake.add(Decimal::ONE, at(10)),
            Err(ActionError::InvalidAmount { .. })
        ));
        assert_eq!(stake.staked_amount, Decimal::MAX);
        assert_eq!(stake.stake_start_time, Some(at(0)));
    }
}
