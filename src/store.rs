// 6.0 store.rs: persisted state as plain ordered maps. a table row is addressed by the
// issuing contract (scope) and the symbol code (primary key). a singleton holds at most one.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{AccountName, ExtendedSymbol, SymbolCode};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RowKey {
    pub scope: AccountName,
    pub code: SymbolCode,
}

impl RowKey {
    pub fn new(scope: AccountName, code: SymbolCode) -> Self {
        Self { scope, code }
    }
}

impl From<&ExtendedSymbol> for RowKey {
    fn from(symbol: &ExtendedSymbol) -> Self {
        Self::new(symbol.contract.clone(), symbol.code().clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table<V> {
    rows: BTreeMap<RowKey, V>,
}

impl<V> Default for Table<V> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
        }
    }
}

impl<V> Table<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&self, key: &RowKey) -> Option<&V> {
        self.rows.get(key)
    }

    pub fn contains(&self, key: &RowKey) -> bool {
        self.rows.contains_key(key)
    }

    /// Insert or overwrite a row, returning the previous value.
    pub fn upsert(&mut self, key: RowKey, value: V) -> Option<V> {
        self.rows.insert(key, value)
    }

    pub fn erase(&mut self, key: &RowKey) -> Option<V> {
        self.rows.remove(key)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&RowKey, &V)> {
        self.rows.iter()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Singleton<T> {
    value: Option<T>,
}

impl<T> Default for Singleton<T> {
    fn default() -> Self {
        Self { value: None }
    }
}

impl<T> Singleton<T> {
    pub fn exists(&self) -> bool {
        self.value.is_some()
    }

    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn set(&mut self, value: T) {
        self.value = Some(value);
    }
}
