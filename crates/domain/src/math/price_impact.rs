use super::BPS_DENOMINATOR;
use rust_decimal::Decimal;

/// Minimum acceptable output after applying `slippage_bps` to `out_amount`.
pub fn min_out_with_slippage(out_amount: Decimal, slippage_bps: u16) -> Decimal {
    let bps = Decimal::from(slippage_bps.min(BPS_DENOMINATOR as u16));
    out_amount * (Decimal::from(BPS_DENOMINATOR) - bps) / Decimal::from(BPS_DENOMINATOR)
}

/// Price impact in percent derived from known amounts.
///
/// Execution price is the slippage-bounded output per input, market price the
/// quoted output per input; the result is
/// `|(execution − market) / market| × 100`. Returns `None` when either price
/// is undefined.
pub fn derived_price_impact_pct(
    in_amount: Decimal,
    out_amount: Decimal,
    out_amount_with_slippage: Decimal,
) -> Option<Decimal> {
    if in_amount.is_zero() || out_amount.is_zero() {
        return None;
    }
    let market_price = out_amount / in_amount;
    let execution_price = out_amount_with_slippage / in_amount;
    Some(((execution_price - market_price) / market_price * Decimal::ONE_HUNDRED).abs())
}

/// Display price impact: the aggregator's figure when present, otherwise the
/// derived one.
pub fn resolve_price_impact_pct(
    reported: Option<Decimal>,
    in_amount: Decimal,
    out_amount: Decimal,
    out_amount_with_slippage: Decimal,
) -> Decimal {
    reported
        .or_else(|| derived_price_impact_pct(in_amount, out_amount, out_amount_with_slippage))
        .unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_min_out() {
        assert_eq!(min_out_with_slippage(dec!(1000), 100), dec!(990));
        assert_eq!(min_out_with_slippage(dec!(1000), 50), dec!(995));
    }

    #[test]
    fn test_reported_used_verbatim() {
        let impact = resolve_price_impact_pct(Some(dec!(0.37)), dec!(1), dec!(100), dec!(99));
        assert_eq!(impact, dec!(0.37));
    }

    #[test]
    fn test_derived_from_slippage() {
        let out = dec!(150);
        let impact = resolve_price_impact_pct(None, dec!(1), out, min_out_with_slippage(out, 100));
        assert_eq!(impact, dec!(1));
    }

    #[test]
    fn test_undefined_prices() {
        assert_eq!(derived_price_impact_pct(Decimal::ZERO, dec!(1), dec!(1)), None);
        assert_eq!(resolve_price_impact_pct(None, dec!(1), Decimal::ZERO, Decimal::ZERO), Decimal::ZERO);
    }
}
