// 2.0: bonding curve math. constant reserve ratio: the connector keeps `weight` of the
// smart supply's market cap in connected tokens, so price = C / (S * w).
// 2.0 has the result struct. 2.1-2.4 are the four conversions. all pure, no state.
//
// market conversions truncate the output (floor). exact-output conversions round the
// required input up (ceil). either way the pool never hands out more than the curve says.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};

/// Integer outcome of one curve evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversion {
    /// Smallest units actually delivered (market) or required (exact-output).
    pub amount: i64,
    /// Real-valued curve result before rounding.
    pub theoretical: Decimal,
    /// Share of the theoretical result realized after rounding, in [0, 1].
    pub ratio: Decimal,
}

impl Conversion {
    /// Result of a market conversion: truncate and measure the loss.
    pub fn truncated(theoretical: Decimal) -> Result<Self, CurveError> {
        let theoretical = theoretical.max(Decimal::ZERO);
        let amount = to_units(theoretical.floor())?;
        Ok(Self {
            amount,
            theoretical,
            ratio: realized_ratio(Decimal::from(amount), theoretical),
        })
    }

    /// Result of an exact-output solve: the required input rounded up.
    pub fn rounded_up(theoretical: Decimal) -> Result<Self, CurveError> {
        let theoretical = theoretical.max(Decimal::ZERO);
        let amount = to_units(theoretical.ceil())?;
        Ok(Self {
            amount,
            theoretical,
            ratio: realized_ratio(theoretical, Decimal::from(amount)),
        })
    }

    /// Part of `input` left unused because the output was truncated: floor(input * (1 - ratio)).
    pub fn unused_share(&self, input: i64) -> i64 {
        let unused = Decimal::from(input) * (Decimal::ONE - self.ratio);
        unused.floor().to_i64().unwrap_or(0).max(0)
    }
}

/// part / whole, with 0/0 defined as 1 (nothing was produced, so nothing was lost).
pub fn realized_ratio(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        return Decimal::ONE;
    }
    (part / whole).min(Decimal::ONE)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CurveError {
    #[error("Connector balance must be positive, got {0}")]
    EmptyBalance(i64),

    #[error("Smart token supply must be positive, got {0}")]
    EmptySupply(i64),

    #[error("Conversion amount must be positive, got {0}")]
    NonPositiveAmount(i64),

    #[error("Cannot sell {amount} against a supply of {supply}")]
    ExceedsSupply { amount: i64, supply: i64 },

    #[error("Cannot withdraw {amount} from a connector balance of {balance}")]
    ReserveExhausted { amount: i64, balance: i64 },

    #[error("Administered rate must be positive, got {0}")]
    InvalidRate(Decimal),

    #[error("Arithmetic overflow in curve evaluation")]
    Overflow,
}

fn check_state(balance: i64, supply: i64, amount: i64) -> Result<(Decimal, Decimal, Decimal), CurveError> {
    if balance <= 0 {
        return Err(CurveError::EmptyBalance(balance));
    }
    if supply <= 0 {
        return Err(CurveError::EmptySupply(supply));
    }
    if amount <= 0 {
        return Err(CurveError::NonPositiveAmount(amount));
    }
    Ok((Decimal::from(balance), Decimal::from(supply), Decimal::from(amount)))
}

fn to_units(value: Decimal) -> Result<i64, CurveError> {
    value.to_i64().ok_or(CurveError::Overflow)
}

fn pow(base: Decimal, exp: Decimal) -> Result<Decimal, CurveError> {
    if base.is_zero() {
        return Ok(Decimal::ZERO);
    }
    base.checked_powd(exp).ok_or(CurveError::Overflow)
}

fn scaled(factor: Decimal, by: Decimal) -> Result<Decimal, CurveError> {
    factor.checked_mul(by).ok_or(CurveError::Overflow)
}

// 2.1: pay dC connected, receive dS = S * ((1 + dC/C)^w - 1)
pub fn convert_to_smart(
    balance: i64,
    supply: i64,
    weight: Decimal,
    connected_in: i64,
) -> Result<Conversion, CurveError> {
    let (c, s, dc) = check_state(balance, supply, connected_in)?;
    let growth = pow(Decimal::ONE + dc / c, weight)?;
    Conversion::truncated(scaled(s, growth - Decimal::ONE)?)
}

// 2.2: sell dS smart, receive dC = C * (1 - (1 - dS/S)^(1/w))
pub fn convert_from_smart(
    balance: i64,
    supply: i64,
    weight: Decimal,
    smart_in: i64,
) -> Result<Conversion, CurveError> {
    let (c, s, ds) = check_state(balance, supply, smart_in)?;
    if smart_in > supply {
        return Err(CurveError::ExceedsSupply { amount: smart_in, supply });
    }
    let shrink = pow(Decimal::ONE - ds / s, Decimal::ONE / weight)?;
    Conversion::truncated(scaled(c, Decimal::ONE - shrink)?)
}

// 2.3: inverse of 2.1. connected needed to receive exactly dS smart.
pub fn convert_to_exact_smart(
    balance: i64,
    supply: i64,
    weight: Decimal,
    smart_out: i64,
) -> Result<Conversion, CurveError> {
    let (c, s, ds) = check_state(balance, supply, smart_out)?;
    let growth = pow(Decimal::ONE + ds / s, Decimal::ONE / weight)?;
    Conversion::rounded_up(scaled(c, growth - Decimal::ONE)?)
}

// 2.4: inverse of 2.2. smart needed to receive exactly dC connected.
pub fn convert_exact_from_smart(
    balance: i64,
    supply: i64,
    weight: Decimal,
    connected_out: i64,
) -> Result<Conversion, CurveError> {
    let (c, s, dc) = check_state(balance, supply, connected_out)?;
    if connected_out >= balance {
        return Err(CurveError::ReserveExhausted { amount: connected_out, balance });
    }
    let shrink = pow(Decimal::ONE - dc / c, weight)?;
    Conversion::rounded_up(scaled(s, Decimal::ONE - shrink)?)
}

/// Marginal price in connected units per smart unit: C / (S * w).
pub fn spot_price(balance: i64, supply: i64, weight: Decimal) -> Option<Decimal> {
    let denom = Decimal::from(supply).checked_mul(weight)?;
    if denom.is_zero() {
        return None;
    }
    Decimal::from(balance).checked_div(denom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    // 1,000,000.0000 connected backing 10,000.0000 smart at 50% weight
    const C: i64 = 10_000_000_000;
    const S: i64 = 100_000_000;

    #[test]
    fn buy_worked_example() {
        // 10,000.0000 in: S * (sqrt(1.01) - 1) = 498756.21.. units = 49.8756
        let out = convert_to_smart(C, S, dec!(0.5), 100_000_000).unwrap();
        assert_eq!(out.amount, 498_756);
        assert!(out.ratio < Decimal::ONE);
        assert!(out.ratio > dec!(0.99999));
    }

    #[test]
    fn sell_at_full_weight_is_linear() {
        // w = 1 means price is flat at C / S = 100 connected units per smart unit
        let out = convert_from_smart(C, S, Decimal::ONE, 1_000).unwrap();
        assert_eq!(out.amount, 100_000);
        assert_eq!(out.ratio, Decimal::ONE);
    }

    #[test]
    fn sell_whole_supply_drains_balance() {
        let out = convert_from_smart(C, S, dec!(0.5), S).unwrap();
        assert_eq!(out.amount, C);
    }

    #[test]
    fn sell_more_than_supply_rejected() {
        let err = convert_from_smart(C, S, dec!(0.5), S + 1).unwrap_err();
        assert!(matches!(err, CurveError::ExceedsSupply { .. }));
    }

    #[test]
    fn exact_smart_requires_enough_connected() {
        let required = convert_to_exact_smart(C, S, dec!(0.5), 498_756).unwrap();
        // round trip through 2.1 must deliver at least what was asked
        let delivered = convert_to_smart(C, S, dec!(0.5), required.amount).unwrap();
        assert!(delivered.amount >= 498_756);
        assert!(required.amount <= 100_000_000);
        assert!(required.ratio <= Decimal::ONE);
    }

    #[test]
    fn exact_connected_requires_enough_smart() {
        let required = convert_exact_from_smart(C, S, dec!(0.5), 5_000_000).unwrap();
        let delivered = convert_from_smart(C, S, dec!(0.5), required.amount).unwrap();
        assert!(delivered.amount >= 5_000_000);
    }

    #[test]
    fn exact_connected_cannot_drain_reserve() {
        let err = convert_exact_from_smart(C, S, dec!(0.5), C).unwrap_err();
        assert!(matches!(err, CurveError::ReserveExhausted { .. }));
    }

    #[test]
    fn dust_input_truncates_to_zero_with_ratio_one() {
        // 100 smart units outstanding: 1,000,000 connected units buy 0.005 of one
        let out = convert_to_smart(C, 100, dec!(0.5), 1_000_000).unwrap();
        assert_eq!(out.amount, 0);
        assert!(out.theoretical > Decimal::ZERO);
        assert_eq!(out.ratio, Decimal::ZERO);
        assert_eq!(out.unused_share(1_000_000), 1_000_000);
    }

    #[test]
    fn zero_theoretical_result_defines_ratio_as_one() {
        let out = Conversion::truncated(Decimal::ZERO).unwrap();
        assert_eq!(out.amount, 0);
        assert_eq!(out.ratio, Decimal::ONE);
        assert_eq!(out.unused_share(1_000), 0);

        let out = Conversion::rounded_up(dec!(-3)).unwrap();
        assert_eq!(out.amount, 0);
        assert_eq!(out.ratio, Decimal::ONE);
    }

    #[test]
    fn unused_share_floors() {
        let out = Conversion::truncated(dec!(10.5)).unwrap();
        assert_eq!(out.amount, 10);
        // 1 - 10/10.5 = 0.0476.. of 100 -> 4
        assert_eq!(out.unused_share(100), 4);
    }

    #[test]
    fn rejects_empty_state() {
        assert_eq!(
            convert_to_smart(0, S, dec!(0.5), 1).unwrap_err(),
            CurveError::EmptyBalance(0)
        );
        assert_eq!(
            convert_to_smart(C, 0, dec!(0.5), 1).unwrap_err(),
            CurveError::EmptySupply(0)
        );
        assert_eq!(
            convert_to_smart(C, S, dec!(0.5), 0).unwrap_err(),
            CurveError::NonPositiveAmount(0)
        );
    }

    #[test]
    fn spot_price_matches_reserve_ratio() {
        assert_eq!(spot_price(C, S, dec!(0.5)), Some(dec!(200)));
        assert_eq!(spot_price(C, 0, dec!(0.5)), None);
    }
}
