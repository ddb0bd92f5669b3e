// 1.0: all the primitives live here. nothing in the exchange works without these types.
// account names, symbols, amounts, per-mille rates, timestamps. each is a newtype so the
// compiler catches type mixups between a smart asset and its connected asset.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountName(String);

impl AccountName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for AccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// BuySmart = pay connected, receive smart. SellSmart = pay smart, receive connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    BuySmart,
    SellSmart,
}

// Market = input fixed, solve output. ExactOutput = output fixed, solve input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConversionMode {
    Market,
    ExactOutput,
}

// 1.1: ticker without precision. tables are keyed by this.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SymbolCode(String);

impl SymbolCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SymbolCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Most decimals a symbol may carry: 10^18 is the largest power of ten an i64 holds.
pub const MAX_PRECISION: u8 = 18;

// 1.2: ticker plus decimal precision. "GXC" with 4 decimals means 1 GXC = 10_000 units.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Symbol {
    pub code: SymbolCode,
    pub precision: u8,
}

impl Symbol {
    pub fn new(code: impl Into<String>, precision: u8) -> Self {
        Self {
            code: SymbolCode::new(code),
            precision,
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.code.as_str().is_empty() && self.precision <= MAX_PRECISION
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.precision, self.code)
    }
}

// 1.3: symbol qualified by the contract that issues it. two tokens with the same ticker
// from different issuers are different assets.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExtendedSymbol {
    pub symbol: Symbol,
    pub contract: AccountName,
}

impl ExtendedSymbol {
    pub fn new(code: impl Into<String>, precision: u8, contract: impl Into<String>) -> Self {
        Self {
            symbol: Symbol::new(code, precision),
            contract: AccountName::new(contract),
        }
    }

    pub fn code(&self) -> &SymbolCode {
        &self.symbol.code
    }

    pub fn precision(&self) -> u8 {
        self.symbol.precision
    }

    pub fn is_valid(&self) -> bool {
        self.symbol.is_valid() && !self.contract.is_empty()
    }
}

impl fmt::Display for ExtendedSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.symbol, self.contract)
    }
}

// 1.4: integer amount of smallest units of one extended symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExtendedAsset {
    pub amount: i64,
    pub symbol: ExtendedSymbol,
}

impl ExtendedAsset {
    pub fn new(amount: i64, symbol: ExtendedSymbol) -> Self {
        Self { amount, symbol }
    }

    pub fn zero(symbol: ExtendedSymbol) -> Self {
        Self { amount: 0, symbol }
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }

    pub fn is_positive(&self) -> bool {
        self.amount > 0
    }

    /// Same symbol, different amount.
    pub fn with_amount(&self, amount: i64) -> Self {
        Self {
            amount,
            symbol: self.symbol.clone(),
        }
    }

    pub fn as_decimal(&self) -> Decimal {
        Decimal::from(self.amount)
    }

    /// Amount in whole tokens, e.g. 10_000 units at precision 4 -> 1.0000
    ///
    /// Precisions beyond what `Decimal` can scale fall back to the raw unit count.
    pub fn to_display(&self) -> Decimal {
        Decimal::try_new(self.amount, self.symbol.precision() as u32)
            .unwrap_or_else(|_| Decimal::from(self.amount))
    }
}

impl fmt::Display for ExtendedAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}@{}",
            self.to_display(),
            self.symbol.code(),
            self.symbol.contract
        )
    }
}

// 1.5: per mille. 1000 = 100%, 5 = 0.5%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PerMille(u16);

impl PerMille {
    pub const MAX: u16 = 1000;

    #[must_use]
    pub fn new(value: u16) -> Option<Self> {
        if value <= Self::MAX {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn zero() -> Self {
        Self(0)
    }

    pub fn value(&self) -> u16 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn as_fraction(&self) -> Decimal {
        Decimal::new(self.0 as i64, 3)
    }
}

impl fmt::Display for PerMille {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}‰", self.0)
    }
}

// 1.6: millisecond timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp_millis())
    }

    pub fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }
}
