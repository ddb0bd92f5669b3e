// 7.0 config.rs: two layers. Configuration is the persisted singleton the admin actions
// write (connected token, default fee, fee recipient). EngineConfig is how this process
// runs the exchange (which account it acts as, how much audit history it keeps).

use serde::{Deserialize, Serialize};

use crate::fee::FeePolicy;
use crate::types::{AccountName, ExtendedSymbol, PerMille};

/** 7.1: persisted singleton. created by init, changed by setcharge/setowner */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    // Reserve token every connector is denominated in
    pub connected: ExtendedSymbol,
    // Default fee rate in per mille
    pub fee_rate: PerMille,
    // Default fixed fee in connected smallest units
    pub fixed_fee: i64,
    // Receives conversion fees and funds new connectors
    pub owner: AccountName,
}

impl Configuration {
    pub fn new(owner: AccountName, connected: ExtendedSymbol) -> Self {
        Self {
            connected,
            fee_rate: PerMille::zero(),
            fixed_fee: 0,
            owner,
        }
    }

    pub fn default_policy(&self) -> FeePolicy {
        FeePolicy::new(self.fee_rate, self.fixed_fee)
    }

    pub fn is_connected(&self, symbol: &ExtendedSymbol) -> bool {
        &self.connected == symbol
    }
}

/** 7.2: runtime settings. loadable from TOML */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // Account the exchange custodies funds under and whose authority admin actions need
    pub contract: AccountName,
    // Maximum number of events to retain in memory
    pub max_events: usize,
    // Memo attached to fee transfers
    pub fee_memo: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            contract: AccountName::new("gxc.bancor"),
            max_events: 100_000,
            fee_memo: "conversion fee".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.contract.is_empty() {
            return Err(ConfigError::InvalidContract {
                reason: "contract account must not be empty".to_string(),
            });
        }
        if self.max_events == 0 {
            return Err(ConfigError::InvalidRetention {
                reason: "must retain at least one event".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid contract: {reason}")]
    InvalidContract { reason: String },

    #[error("Invalid event retention: {reason}")]
    InvalidRetention { reason: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),
}
