// 9.0 ledger.rs: token bookkeeping the exchange consumes. balances, supply, issue/retire.
// the real ledger lives outside this crate. InMemoryLedger is the mocked stand-in used by
// the simulator and the tests: no consensus, no persistence, just balance changes.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::types::{AccountName, ExtendedAsset, ExtendedSymbol, SymbolCode};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Unknown token {0}")]
    UnknownToken(ExtendedSymbol),

    #[error("Token {0} already exists")]
    TokenExists(ExtendedSymbol),

    #[error("Symbol mismatch: ledger has {expected}, request used {actual}")]
    SymbolMismatch { expected: ExtendedSymbol, actual: ExtendedSymbol },

    #[error("Quantity must be positive, got {0}")]
    InvalidQuantity(i64),

    #[error("Insufficient balance for {owner}: available {available}, requested {requested}")]
    InsufficientBalance { owner: AccountName, available: i64, requested: i64 },

    #[error("Account {0} is frozen")]
    Frozen(AccountName),

    #[error("Issuing {requested} of {symbol} would exceed max supply {max_supply}")]
    MaxSupplyExceeded { symbol: ExtendedSymbol, requested: i64, max_supply: i64 },
}

/// Atomic token primitives. Every call either applies fully or returns an error and
/// changes nothing.
pub trait Ledger {
    fn transfer(
        &mut self,
        from: &AccountName,
        to: &AccountName,
        value: &ExtendedAsset,
        memo: &str,
    ) -> Result<(), LedgerError>;

    /// Mint new supply to `to` through the token's system issuer.
    fn issue(&mut self, to: &AccountName, value: &ExtendedAsset, memo: &str) -> Result<(), LedgerError>;

    /// Burn from `from`'s balance, shrinking supply.
    fn retire(&mut self, from: &AccountName, value: &ExtendedAsset, memo: &str) -> Result<(), LedgerError>;

    fn get_supply(&self, symbol: &ExtendedSymbol) -> Result<ExtendedAsset, LedgerError>;

    fn balance_of(&self, owner: &AccountName, symbol: &ExtendedSymbol) -> i64;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenStats {
    pub symbol: ExtendedSymbol,
    pub supply: i64,
    pub max_supply: i64,
}

// what happened, in order. lets tests check that inbound legs settle before outbound ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEntry {
    Transfer {
        from: AccountName,
        to: AccountName,
        value: ExtendedAsset,
        memo: String,
    },
    Issue {
        to: AccountName,
        value: ExtendedAsset,
        memo: String,
    },
    Retire {
        from: AccountName,
        value: ExtendedAsset,
        memo: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    // keyed by (issuing contract, code) so precision mismatches are caught, not missed
    tokens: BTreeMap<(AccountName, SymbolCode), TokenStats>,
    balances: BTreeMap<(AccountName, ExtendedSymbol), i64>,
    frozen: BTreeSet<AccountName>,
    journal: Vec<LedgerEntry>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_token(&mut self, symbol: ExtendedSymbol, max_supply: i64) -> Result<(), LedgerError> {
        if max_supply <= 0 {
            return Err(LedgerError::InvalidQuantity(max_supply));
        }
        let key = (symbol.contract.clone(), symbol.code().clone());
        if self.tokens.contains_key(&key) {
            return Err(LedgerError::TokenExists(symbol));
        }
        self.tokens.insert(
            key,
            TokenStats {
                symbol,
                supply: 0,
                max_supply,
            },
        );
        Ok(())
    }

    pub fn freeze(&mut self, account: AccountName) {
        self.frozen.insert(account);
    }

    pub fn unfreeze(&mut self, account: &AccountName) {
        self.frozen.remove(account);
    }

    pub fn is_frozen(&self, account: &AccountName) -> bool {
        self.frozen.contains(account)
    }

    pub fn stats(&self, symbol: &ExtendedSymbol) -> Option<&TokenStats> {
        self.tokens.get(&(symbol.contract.clone(), symbol.code().clone()))
    }

    pub fn journal(&self) -> &[LedgerEntry] {
        &self.journal
    }

    /// Sum of all balances held for a symbol. Equals supply when the ledger is consistent.
    pub fn total_held(&self, symbol: &ExtendedSymbol) -> i64 {
        self.balances
            .iter()
            .filter(|((_, s), _)| s == symbol)
            .map(|(_, amount)| *amount)
            .sum()
    }

    fn check_token(&self, value: &ExtendedAsset) -> Result<&TokenStats, LedgerError> {
        if value.amount <= 0 {
            return Err(LedgerError::InvalidQuantity(value.amount));
        }
        let stats = self
            .stats(&value.symbol)
            .ok_or_else(|| LedgerError::UnknownToken(value.symbol.clone()))?;
        if stats.symbol != value.symbol {
            return Err(LedgerError::SymbolMismatch {
                expected: stats.symbol.clone(),
                actual: value.symbol.clone(),
            });
        }
        Ok(stats)
    }

    fn check_active(&self, account: &AccountName) -> Result<(), LedgerError> {
        if self.is_frozen(account) {
            return Err(LedgerError::Frozen(account.clone()));
        }
        Ok(())
    }

    fn debit(&mut self, owner: &AccountName, value: &ExtendedAsset) -> Result<(), LedgerError> {
        let available = self.balance_of(owner, &value.symbol);
        if available < value.amount {
            return Err(LedgerError::InsufficientBalance {
                owner: owner.clone(),
                available,
                requested: value.amount,
            });
        }
        self.balances
            .insert((owner.clone(), value.symbol.clone()), available - value.amount);
        Ok(())
    }

    fn credit(&mut self, owner: &AccountName, value: &ExtendedAsset) {
        *self
            .balances
            .entry((owner.clone(), value.symbol.clone()))
            .or_insert(0) += value.amount;
    }
}

impl Ledger for InMemoryLedger {
    fn transfer(
        &mut self,
        from: &AccountName,
        to: &AccountName,
        value: &ExtendedAsset,
        memo: &str,
    ) -> Result<(), LedgerError> {
        self.check_token(value)?;
        self.check_active(from)?;
        self.check_active(to)?;
        self.debit(from, value)?;
        self.credit(to, value);
        self.journal.push(LedgerEntry::Transfer {
            from: from.clone(),
            to: to.clone(),
            value: value.clone(),
            memo: memo.to_string(),
        });
        Ok(())
    }

    fn issue(&mut self, to: &AccountName, value: &ExtendedAsset, memo: &str) -> Result<(), LedgerError> {
        let stats = self.check_token(value)?;
        if stats.supply.saturating_add(value.amount) > stats.max_supply {
            return Err(LedgerError::MaxSupplyExceeded {
                symbol: value.symbol.clone(),
                requested: value.amount,
                max_supply: stats.max_supply,
            });
        }
        self.check_active(to)?;
        let key = (value.symbol.contract.clone(), value.symbol.code().clone());
        if let Some(stats) = self.tokens.get_mut(&key) {
            stats.supply += value.amount;
        }
        self.credit(to, value);
        self.journal.push(LedgerEntry::Issue {
            to: to.clone(),
            value: value.clone(),
            memo: memo.to_string(),
        });
        Ok(())
    }

    fn retire(&mut self, from: &AccountName, value: &ExtendedAsset, memo: &str) -> Result<(), LedgerError> {
        self.check_token(value)?;
        self.check_active(from)?;
        self.debit(from, value)?;
        let key = (value.symbol.contract.clone(), value.symbol.code().clone());
        if let Some(stats) = self.tokens.get_mut(&key) {
            stats.supply -= value.amount;
        }
        self.journal.push(LedgerEntry::Retire {
            from: from.clone(),
            value: value.clone(),
            memo: memo.to_string(),
        });
        Ok(())
    }

    fn get_supply(&self, symbol: &ExtendedSymbol) -> Result<ExtendedAsset, LedgerError> {
        let stats = self
            .stats(symbol)
            .ok_or_else(|| LedgerError::UnknownToken(symbol.clone()))?;
        Ok(ExtendedAsset::new(stats.supply, stats.symbol.clone()))
    }

    fn balance_of(&self, owner: &AccountName, symbol: &ExtendedSymbol) -> i64 {
        self.balances
            .get(&(owner.clone(), symbol.clone()))
            .copied()
            .unwrap_or(0)
    }
}
