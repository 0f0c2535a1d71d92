use super::{DAYS_PER_YEAR, SECONDS_PER_DAY};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Daily reward rate for an annual yield: `apy / 365`.
pub fn daily_rate(apy: Decimal) -> Decimal {
    apy / Decimal::from(DAYS_PER_YEAR)
}

/// Fractional days between `start` and `now`.
///
/// Computed from the whole-second delta divided by 86 400 and never floored,
/// so a minute of staking already accrues. Negative deltas clamp to zero.
pub fn days_elapsed(start: DateTime<Utc>, now: DateTime<Utc>) -> Decimal {
    let secs = (now - start).num_seconds().max(0);
    Decimal::from(secs) / Decimal::from(SECONDS_PER_DAY)
}

/// Simple, non-compounding reward: `staked × (apy / 365) × days`.
///
/// Saturates at `Decimal::MAX`; crediting such a reward is then refused.
pub fn pending_reward(
    staked: Decimal,
    apy: Decimal,
    stake_start: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Decimal {
    match stake_start {
        Some(start) if staked > Decimal::ZERO => {
            staked
                .checked_mul(daily_rate(apy))
                .and_then(|per_day| per_day.checked_mul(days_elapsed(start, now)))
                .unwrap_or(Decimal::MAX)
        }
        _ => Decimal::ZERO,
    }
}
