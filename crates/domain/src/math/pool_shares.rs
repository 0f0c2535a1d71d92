use super::SECONDS_PER_DAY;
use rust_decimal::Decimal;

/// Share units minted for a deposit of `amount` base tokens.
///
/// The first deposit into an empty pool mints one unit per token; later
/// deposits mint at the current rate `total_shares / reserve`.
pub fn shares_for_deposit(amount: Decimal, total_shares: Decimal, reserve: Decimal) -> Decimal {
    if total_shares.is_zero() || reserve.is_zero() {
        return amount;
    }
    amount * total_shares / reserve
}

/// Base tokens returned for burning `shares`, the inverse of
/// [`shares_for_deposit`].
pub fn amount_for_shares(shares: Decimal, total_shares: Decimal, reserve: Decimal) -> Decimal {
    if total_shares.is_zero() {
        return Decimal::ZERO;
    }
    if shares >= total_shares {
        // last holder out takes the whole reserve
        return reserve;
    }
    shares * reserve / total_shares
}

/// Fraction of the pool owned, 0 for an empty pool.
pub fn share_percentage(shares: Decimal, total_shares: Decimal) -> Decimal {
    if total_shares.is_zero() {
        return Decimal::ZERO;
    }
    shares / total_shares
}

/// Advances the fee-per-share accumulator by `elapsed_secs` of emission.
///
/// With no shares outstanding nobody is entitled and the accumulator stays put.
pub fn accrue_fee_per_share(
    fee_per_share: Decimal,
    daily_emission: Decimal,
    total_shares: Decimal,
    elapsed_secs: i64,
) -> Decimal {
    if total_shares.is_zero() || elapsed_secs <= 0 {
        return fee_per_share;
    }
    let days = Decimal::from(elapsed_secs) / Decimal::from(SECONDS_PER_DAY);
    fee_per_share + daily_emission * days / total_shares
}

/// Fees owed to a holder: settled fees plus accrual since the checkpoint.
pub fn pending_fees(
    share_units: Decimal,
    fee_per_share: Decimal,
    checkpoint: Decimal,
    settled: Decimal,
) -> Decimal {
    let delta = (fee_per_share - checkpoint).max(Decimal::ZERO);
    settled + share_units * delta
}
