use rust_decimal::Decimal;

/// Calculates the spot price of token_in in terms of token_out
/// Price = reserve_out / reserve_in
pub fn calculate_spot_price(reserve_in: Decimal, reserve_out: Decimal) -> Result<Decimal, &'static str> {
    if reserve_in.is_zero() {
        return Err("Reserve in is zero");
    }
    Ok(reserve_out / reserve_in)
}

/// Total value locked, denominated in token A.
///
/// Token B is valued at the pool's own spot price, so a balanced pool is
/// worth twice its A-side reserve.
pub fn tvl_in_token_a(reserve_a: Decimal, reserve_b: Decimal) -> Decimal {
    match calculate_spot_price(reserve_b, reserve_a) {
        Ok(price_b_in_a) => reserve_a + reserve_b * price_b_in_a,
        Err(_) => reserve_a,
    }
}
