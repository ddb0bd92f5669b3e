// 4.0 reserve.rs: administered price source. a reserve backs a smart token with an
// underlying deposit at a fixed rate and lets holders claim (redeem and burn) at that rate.
// 4.1 has the override selection: the exchange uses the reserve rate instead of the curve
// whenever it gives the trader a strictly better price.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::curve::{Conversion, CurveError};
use crate::ledger::{Ledger, LedgerError};
use crate::types::{AccountName, ConversionMode, Direction, ExtendedAsset, ExtendedSymbol};

const CLAIM_MEMO: &str = "claim reserve";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReserveRecord {
    pub derivative: ExtendedSymbol,
    /// Underlying still held for redemption.
    pub underlying: ExtendedAsset,
    /// Underlying per derivative, in whole-token (display) units.
    pub rate: Decimal,
}

impl ReserveRecord {
    /// Rate from the initial deposit: `underlying` backs `derivative_amount` smallest units.
    pub fn from_deposit(derivative: ExtendedSymbol, derivative_amount: i64, underlying: ExtendedAsset) -> Option<Self> {
        if derivative_amount <= 0 {
            return None;
        }
        let issued = Decimal::new(derivative_amount, derivative.precision() as u32);
        let rate = underlying.to_display().checked_div(issued)?;
        Some(Self {
            derivative,
            underlying,
            rate,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReserveError {
    #[error("No reserve for {0}")]
    NotFound(ExtendedSymbol),

    #[error("Claim quantity must be positive, got {0}")]
    InvalidQuantity(i64),

    #[error("Reserve for {symbol} holds {available}, claim needs {requested}")]
    InsufficientUnderlying { symbol: ExtendedSymbol, available: i64, requested: i64 },

    #[error("Ledger error during claim: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Rate scaling failed: {0}")]
    Rate(#[from] CurveError),
}

pub trait Reserve {
    fn has_reserve(&self, symbol: &ExtendedSymbol) -> bool;

    /// Administered rate in display units, if a reserve exists.
    fn get_rate(&self, symbol: &ExtendedSymbol) -> Option<Decimal>;

    /// Burn `value` from `owner` and pay out the underlying at the administered rate.
    fn claim(
        &mut self,
        ledger: &mut dyn Ledger,
        owner: &AccountName,
        value: &ExtendedAsset,
    ) -> Result<ExtendedAsset, ReserveError>;
}

/// Reserve records plus the account that custodies the underlying.
#[derive(Debug, Clone)]
pub struct InMemoryReserve {
    account: AccountName,
    records: BTreeMap<ExtendedSymbol, ReserveRecord>,
}

impl InMemoryReserve {
    pub fn new(account: AccountName) -> Self {
        Self {
            account,
            records: BTreeMap::new(),
        }
    }

    pub fn account(&self) -> &AccountName {
        &self.account
    }

    pub fn insert(&mut self, record: ReserveRecord) {
        self.records.insert(record.derivative.clone(), record);
    }

    pub fn record(&self, symbol: &ExtendedSymbol) -> Option<&ReserveRecord> {
        self.records.get(symbol)
    }
}

impl Default for InMemoryReserve {
    fn default() -> Self {
        Self::new(AccountName::new("gxc.reserve"))
    }
}

impl Reserve for InMemoryReserve {
    fn has_reserve(&self, symbol: &ExtendedSymbol) -> bool {
        self.records.contains_key(symbol)
    }

    fn get_rate(&self, symbol: &ExtendedSymbol) -> Option<Decimal> {
        self.records.get(symbol).map(|r| r.rate)
    }

    fn claim(
        &mut self,
        ledger: &mut dyn Ledger,
        owner: &AccountName,
        value: &ExtendedAsset,
    ) -> Result<ExtendedAsset, ReserveError> {
        if value.amount <= 0 {
            return Err(ReserveError::InvalidQuantity(value.amount));
        }
        let record = self
            .records
            .get(&value.symbol)
            .ok_or_else(|| ReserveError::NotFound(value.symbol.clone()))?;

        let per_unit = raw_rate(record.rate, value.symbol.precision(), record.underlying.symbol.precision())?;
        let owed = value.as_decimal().checked_mul(per_unit).ok_or(CurveError::Overflow)?;
        let claimed = Conversion::truncated(owed)?.amount;
        if claimed > record.underlying.amount {
            return Err(ReserveError::InsufficientUnderlying {
                symbol: value.symbol.clone(),
                available: record.underlying.amount,
                requested: claimed,
            });
        }
        let payout = record.underlying.with_amount(claimed);

        ledger.retire(owner, value, CLAIM_MEMO)?;
        if payout.is_positive() {
            ledger.transfer(&self.account, owner, &payout, CLAIM_MEMO)?;
        }

        if let Some(record) = self.records.get_mut(&value.symbol) {
            record.underlying.amount -= claimed;
        }
        Ok(payout)
    }
}

/// Display-unit rate scaled to connected smallest units per smart smallest unit.
pub fn raw_rate(rate: Decimal, smart_precision: u8, connected_precision: u8) -> Result<Decimal, CurveError> {
    let shift = connected_precision as i32 - smart_precision as i32;
    let factor = 10i64
        .checked_pow(shift.unsigned_abs())
        .map(Decimal::from)
        .ok_or(CurveError::Overflow)?;
    if shift >= 0 {
        rate.checked_mul(factor)
    } else {
        rate.checked_div(factor)
    }
    .ok_or(CurveError::Overflow)
}

/// Connected units per smart unit. None when no smart moves (infinitely expensive).
pub fn implied_price(connected: i64, smart: i64) -> Option<Decimal> {
    if smart <= 0 {
        return None;
    }
    Some(Decimal::from(connected) / Decimal::from(smart))
}

// 4.1: buyers want a lower price, sellers a higher one. strict: ties keep the curve.
pub fn is_more_favorable(direction: Direction, curve_price: Option<Decimal>, administered: Decimal) -> bool {
    if administered <= Decimal::ZERO {
        return false;
    }
    match (direction, curve_price) {
        (Direction::BuySmart, None) => true,
        (Direction::BuySmart, Some(price)) => administered < price,
        (Direction::SellSmart, None) => false,
        (Direction::SellSmart, Some(price)) => administered > price,
    }
}

/// Price the curve candidate implies for the trader.
///
/// `given` is the fixed side of the request: connected in for a market buy, smart in
/// for a market sell, smart out for an exact buy, connected out for an exact sell.
pub fn curve_price(direction: Direction, mode: ConversionMode, given: i64, curve: &Conversion) -> Option<Decimal> {
    match (direction, mode) {
        (Direction::BuySmart, ConversionMode::Market) => implied_price(given, curve.amount),
        (Direction::SellSmart, ConversionMode::Market) => implied_price(curve.amount, given),
        (Direction::BuySmart, ConversionMode::ExactOutput) => implied_price(curve.amount, given),
        (Direction::SellSmart, ConversionMode::ExactOutput) => implied_price(given, curve.amount),
    }
}

/// The same conversion priced at a flat raw rate instead of the curve, with the same
/// rounding rules: market outputs truncate, exact-output inputs round up.
pub fn convert_at_rate(
    direction: Direction,
    mode: ConversionMode,
    given: i64,
    rate: Decimal,
) -> Result<Conversion, CurveError> {
    if given <= 0 {
        return Err(CurveError::NonPositiveAmount(given));
    }
    if rate <= Decimal::ZERO {
        return Err(CurveError::InvalidRate(rate));
    }
    let given = Decimal::from(given);
    match (direction, mode) {
        (Direction::BuySmart, ConversionMode::Market) => {
            Conversion::truncated(given.checked_div(rate).ok_or(CurveError::Overflow)?)
        }
        (Direction::SellSmart, ConversionMode::Market) => {
            Conversion::truncated(given.checked_mul(rate).ok_or(CurveError::Overflow)?)
        }
        (Direction::BuySmart, ConversionMode::ExactOutput) => {
            Conversion::rounded_up(given.checked_mul(rate).ok_or(CurveError::Overflow)?)
        }
        (Direction::SellSmart, ConversionMode::ExactOutput) => {
            Conversion::rounded_up(given.checked_div(rate).ok_or(CurveError::Overflow)?)
        }
    }
}

/// Replacement outcome when the administered raw rate beats the curve candidate.
pub fn select_override(
    direction: Direction,
    mode: ConversionMode,
    given: i64,
    curve: &Conversion,
    rate: Decimal,
) -> Result<Option<Conversion>, CurveError> {
    if !is_more_favorable(direction, curve_price(direction, mode, given, curve), rate) {
        return Ok(None);
    }
    convert_at_rate(direction, mode, given, rate).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::InMemoryLedger;
    use rust_decimal_macros::dec;

    fn candidate(amount: i64) -> Conversion {
        Conversion::truncated(Decimal::from(amount)).unwrap()
    }

    #[test]
    fn buy_override_triggers_when_cheaper() {
        // curve: 1020 connected buys 1000 smart, 1.02 per smart. reserve sells at 1.00
        let curve = candidate(1_000);
        let chosen = select_override(Direction::BuySmart, ConversionMode::Market, 1_020, &curve, dec!(1))
            .unwrap()
            .expect("override should trigger");
        assert_eq!(chosen.amount, 1_020);
        assert_eq!(chosen.ratio, Decimal::ONE);
    }

    #[test]
    fn sell_override_does_not_trigger_at_same_rate() {
        // curve: 1000 smart sells for 1020 connected, 1.02 per smart. reserve pays only 1.00
        let curve = candidate(1_020);
        let chosen = select_override(Direction::SellSmart, ConversionMode::Market, 1_000, &curve, dec!(1)).unwrap();
        assert!(chosen.is_none());
    }

    #[test]
    fn sell_override_triggers_when_reserve_pays_more() {
        let curve = candidate(1_020);
        let chosen = select_override(Direction::SellSmart, ConversionMode::Market, 1_000, &curve, dec!(1.05))
            .unwrap()
            .expect("override should trigger");
        assert_eq!(chosen.amount, 1_050);
    }

    #[test]
    fn buy_override_does_not_trigger_when_dearer() {
        let curve = candidate(1_000);
        let chosen = select_override(Direction::BuySmart, ConversionMode::Market, 1_020, &curve, dec!(1.03)).unwrap();
        assert!(chosen.is_none());
    }

    #[test]
    fn equal_price_keeps_curve() {
        let curve = candidate(1_000);
        let chosen = select_override(Direction::BuySmart, ConversionMode::Market, 1_020, &curve, dec!(1.02)).unwrap();
        assert!(chosen.is_none());
    }

    #[test]
    fn exact_output_override_rounds_required_input_up() {
        // want exactly 1000 smart; curve asks 1020 connected. reserve at 0.9995 asks 999.5 -> 1000
        let curve = candidate(1_020);
        let chosen = select_override(Direction::BuySmart, ConversionMode::ExactOutput, 1_000, &curve, dec!(0.9995))
            .unwrap()
            .unwrap();
        assert_eq!(chosen.amount, 1_000);
        assert!(chosen.ratio < Decimal::ONE);

        // want exactly 1000 connected; curve asks 990 smart (1.0101 per smart). reserve pays 1.02
        let curve = candidate(990);
        let chosen = select_override(Direction::SellSmart, ConversionMode::ExactOutput, 1_000, &curve, dec!(1.02))
            .unwrap()
            .unwrap();
        // 1000 / 1.02 = 980.39 -> 981
        assert_eq!(chosen.amount, 981);
    }

    #[test]
    fn zero_curve_output_always_loses_for_buyer() {
        let curve = candidate(0);
        assert!(is_more_favorable(Direction::BuySmart, curve_price(Direction::BuySmart, ConversionMode::Market, 5, &curve), dec!(100)));
        assert!(!is_more_favorable(Direction::BuySmart, Some(dec!(1)), Decimal::ZERO));
    }

    #[test]
    fn raw_rate_scales_by_precision() {
        // smart at 4 decimals, connected at 4: unchanged
        assert_eq!(raw_rate(dec!(1.5), 4, 4).unwrap(), dec!(1.5));
        // smart at 2 decimals, connected at 4: one smart unit is 100x bigger
        assert_eq!(raw_rate(dec!(1.5), 2, 4).unwrap(), dec!(150));
        assert_eq!(raw_rate(dec!(1.5), 6, 4).unwrap(), dec!(0.015));
    }

    #[test]
    fn raw_rate_overflow_is_an_error() {
        assert_eq!(raw_rate(dec!(1), 24, 4), Err(CurveError::Overflow));
        assert_eq!(raw_rate(dec!(1), 0, 19), Err(CurveError::Overflow));
        assert!(raw_rate(dec!(1), 0, 18).is_ok());
    }

    #[test]
    fn record_rate_from_deposit() {
        let smart = ExtendedSymbol::new("TKN", 4, "tkn.token");
        let gxc = ExtendedSymbol::new("GXC", 4, "gxc.token");
        // 1,000.0000 underlying behind 500.0000 derivative -> 2 per smart
        let record = ReserveRecord::from_deposit(smart, 5_000_000, ExtendedAsset::new(10_000_000, gxc)).unwrap();
        assert_eq!(record.rate, dec!(2));
    }

    #[test]
    fn claim_burns_and_pays_underlying() {
        let smart = ExtendedSymbol::new("TKN", 4, "tkn.token");
        let gxc = ExtendedSymbol::new("GXC", 4, "gxc.token");
        let holder = AccountName::new("alice");

        let mut ledger = InMemoryLedger::new();
        ledger.create_token(smart.clone(), i64::MAX).unwrap();
        ledger.create_token(gxc.clone(), i64::MAX).unwrap();
        ledger.issue(&holder, &ExtendedAsset::new(1_000, smart.clone()), "").unwrap();

        let mut reserve = InMemoryReserve::default();
        ledger.issue(reserve.account(), &ExtendedAsset::new(5_000, gxc.clone()), "").unwrap();
        reserve.insert(ReserveRecord {
            derivative: smart.clone(),
            underlying: ExtendedAsset::new(5_000, gxc.clone()),
            rate: dec!(1.5),
        });

        let paid = reserve
            .claim(&mut ledger, &holder, &ExtendedAsset::new(1_000, smart.clone()))
            .unwrap();
        assert_eq!(paid.amount, 1_500);
        assert_eq!(ledger.balance_of(&holder, &gxc), 1_500);
        assert_eq!(ledger.get_supply(&smart).unwrap().amount, 0);
        assert_eq!(reserve.record(&smart).unwrap().underlying.amount, 3_500);
    }

    #[test]
    fn claim_without_reserve_fails() {
        let smart = ExtendedSymbol::new("TKN", 4, "tkn.token");
        let mut ledger = InMemoryLedger::new();
        let mut reserve = InMemoryReserve::default();
        let err = reserve
            .claim(&mut ledger, &AccountName::new("alice"), &ExtendedAsset::new(1, smart.clone()))
            .unwrap_err();
        assert_eq!(err, ReserveError::NotFound(smart));
    }
}
