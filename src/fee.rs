//! Conversion fees.
//!
//! Fees are always denominated in the connected token: charged on the input of a
//! buy and on the output of a sell. A policy is a per-mille rate plus a fixed
//! amount. Any non-exempt policy charges at least one smallest unit so that small
//! conversions cannot round the fee away.

use crate::types::PerMille;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Smallest fee a non-exempt policy can produce on a positive value.
pub const MIN_FEE: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeePolicy {
    pub rate: PerMille,
    /// Flat amount in connected smallest units, added after the rate.
    pub fixed_fee: i64,
}

impl FeePolicy {
    pub fn new(rate: PerMille, fixed_fee: i64) -> Self {
        Self { rate, fixed_fee }
    }

    pub fn exempt() -> Self {
        Self {
            rate: PerMille::zero(),
            fixed_fee: 0,
        }
    }

    /// A policy that charges neither a rate nor a fixed amount waives the minimum too.
    pub fn is_exempted(&self) -> bool {
        self.rate.is_zero() && self.fixed_fee == 0
    }
}

impl Default for FeePolicy {
    fn default() -> Self {
        Self::exempt()
    }
}

// 3.1: floor(value * rate / 1000) + fixed, floored at MIN_FEE
pub fn compute_fee(value: i64, policy: &FeePolicy) -> i64 {
    if policy.is_exempted() || value <= 0 {
        return 0;
    }
    let proportional = (Decimal::from(value) * policy.rate.as_fraction())
        .floor()
        .to_i64()
        .unwrap_or(i64::MAX);
    let fee = proportional.saturating_add(policy.fixed_fee.max(0));
    fee.max(MIN_FEE)
}

/// Who absorbs the fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChargeMode {
    /// Taken out of a given amount (market conversions).
    NonRequired,
    /// Added on top of an amount that must be delivered intact (exact-output conversions).
    Required,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Charge {
    /// Amount before the fee is split off.
    pub gross: i64,
    pub fee: i64,
    /// Amount left for the conversion itself.
    pub net: i64,
}

// 3.2: net may come out <= 0 for NonRequired; callers reject that.
pub fn charge(value: i64, policy: &FeePolicy, mode: ChargeMode) -> Charge {
    let fee = compute_fee(value, policy);
    match mode {
        ChargeMode::NonRequired => Charge {
            gross: value,
            fee,
            net: value - fee,
        },
        ChargeMode::Required => Charge {
            gross: value.saturating_add(fee),
            fee,
            net: value,
        },
    }
}

// 3.3: per-asset policy wins over the global default. neither means free.
pub fn resolve_policy(per_asset: Option<&FeePolicy>, default: Option<&FeePolicy>) -> FeePolicy {
    per_asset.or(default).copied().unwrap_or_default()
}
