// 8.0.2: result types and errors for exchange operations.

use crate::auth::AuthError;
use crate::config::ConfigError;
use crate::curve::{Conversion, CurveError};
use crate::ledger::LedgerError;
use crate::reserve::ReserveError;
use crate::types::{ConversionMode, Direction, ExtendedAsset, ExtendedSymbol};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Everything a conversion will move, computed before anything is moved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionPlan {
    pub direction: Direction,
    pub mode: ConversionMode,
    pub smart: ExtendedSymbol,
    /// Taken from the trader (nominal input minus refund, or required input plus fee).
    pub pay: ExtendedAsset,
    /// Share of a market input left with the trader because the output was truncated.
    pub refund: ExtendedAsset,
    /// Connected tokens routed to the owner.
    pub fee: ExtendedAsset,
    /// Delivered to the trader.
    pub receive: ExtendedAsset,
    /// Signed connected delta committed to the connector balance.
    pub balance_delta: i64,
    /// Curve candidate before any override.
    pub curve: Conversion,
    /// Realized ratio of the outcome actually used.
    pub ratio: Decimal,
    pub override_applied: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionReceipt {
    pub plan: ConversionPlan,
    pub balance_after: ExtendedAsset,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExchangeError {
    #[error("Contract not initialized")]
    NotInitialized,

    #[error("Contract already initialized")]
    AlreadyInitialized,

    #[error("Connector for {0} not found")]
    ConnectorNotFound(ExtendedSymbol),

    #[error("Connector for {0} already exists")]
    ConnectorAlreadyExists(ExtendedSymbol),

    #[error("No charge policy for {0}")]
    FeePolicyNotFound(ExtendedSymbol),

    #[error("Paid token not enough after charging fee: {0}")]
    InsufficientAfterFee(ExtendedAsset),

    #[error("Rate {0} outside 0-1000 per mille")]
    InvalidRateRange(i16),

    #[error("Symbol mismatch: expected {expected}, got {actual}")]
    SymbolMismatch { expected: ExtendedSymbol, actual: ExtendedSymbol },

    #[error("Weight {0} outside (0, 1]")]
    InvalidWeight(Decimal),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(#[from] AuthError),

    #[error("Curve error: {0}")]
    Curve(#[from] CurveError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Reserve error: {0}")]
    Reserve(#[from] ReserveError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}
