use super::{BPS_DENOMINATOR, DAYS_PER_YEAR};
use rust_decimal::Decimal;

/// Calculates total fees earned by the pool given volume and fee tier.
pub fn calculate_pool_fees(volume: Decimal, fee_bps: u32) -> Decimal {
    volume * Decimal::from(fee_bps) / Decimal::from(BPS_DENOMINATOR)
}

/// Annualises fees earned over `days` on `principal`.
pub fn calculate_apy(fees_earned: Decimal, principal: Decimal, days: u32) -> Result<Decimal, &'static str> {
    if principal.is_zero() {
        return Err("Principal cannot be zero");
    }
    if days == 0 {
        return Err("Days cannot be zero");
    }

    // multiply first so exact ratios stay exact
    let annual = fees_earned
        .checked_mul(Decimal::from(DAYS_PER_YEAR))
        .ok_or("Overflow")?;
    let scaled = principal.checked_mul(Decimal::from(days)).ok_or("Overflow")?;
    Ok(annual / scaled)
}
