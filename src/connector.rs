//! Connector state.
//!
//! A connector is the reserve pool behind one smart token: how much connected token
//! backs it and at what constant reserve ratio. Mutation is value-in/value-out: the
//! engine loads a copy, derives the updated copy, and writes it back when the whole
//! conversion succeeds.

use crate::curve::{self, Conversion, CurveError};
use crate::types::{ExtendedAsset, ExtendedSymbol};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Constant reserve ratio, 0 < w <= 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Weight(Decimal);

impl Weight {
    #[must_use]
    pub fn new(value: Decimal) -> Option<Self> {
        if value > Decimal::ZERO && value <= Decimal::ONE {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl std::fmt::Display for Weight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connector {
    pub smart: ExtendedSymbol,
    /// Connected tokens backing `smart`. Only ever moved by applied integer deltas.
    pub balance: ExtendedAsset,
    pub weight: Weight,
}

impl Connector {
    pub fn new(smart: ExtendedSymbol, balance: ExtendedAsset, weight: Weight) -> Self {
        Self {
            smart,
            balance,
            weight,
        }
    }

    pub fn to_smart(&self, supply: i64, connected_in: i64) -> Result<Conversion, CurveError> {
        curve::convert_to_smart(self.balance.amount, supply, self.weight.value(), connected_in)
    }

    pub fn from_smart(&self, supply: i64, smart_in: i64) -> Result<Conversion, CurveError> {
        curve::convert_from_smart(self.balance.amount, supply, self.weight.value(), smart_in)
    }

    pub fn to_exact_smart(&self, supply: i64, smart_out: i64) -> Result<Conversion, CurveError> {
        curve::convert_to_exact_smart(self.balance.amount, supply, self.weight.value(), smart_out)
    }

    pub fn exact_from_smart(&self, supply: i64, connected_out: i64) -> Result<Conversion, CurveError> {
        curve::convert_exact_from_smart(self.balance.amount, supply, self.weight.value(), connected_out)
    }

    pub fn spot_price(&self, supply: i64) -> Option<Decimal> {
        curve::spot_price(self.balance.amount, supply, self.weight.value())
    }

    /// Balance after applying a signed connected delta. Never goes negative.
    pub fn with_delta(self, delta: i64) -> Result<Self, CurveError> {
        let next = self
            .balance
            .amount
            .checked_add(delta)
            .ok_or(CurveError::Overflow)?;
        if next < 0 {
            return Err(CurveError::ReserveExhausted {
                amount: -delta,
                balance: self.balance.amount,
            });
        }
        Ok(Self {
            balance: self.balance.with_amount(next),
            ..self
        })
    }
}
