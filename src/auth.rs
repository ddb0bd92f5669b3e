// 9.1 auth.rs: capability check. the engine asks before it mutates anything and gets a
// result back; it never finds out mid-computation that the caller lacked authority.

use std::collections::BTreeSet;

use crate::types::AccountName;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Missing authority of {0}")]
    Unauthorized(AccountName),
}

pub trait Auth {
    fn authorize(&self, principal: &AccountName) -> Result<(), AuthError>;
}

/// Accounts whose signatures the current request carries.
#[derive(Debug, Clone, Default)]
pub struct SignerSet {
    signers: BTreeSet<AccountName>,
}

impl SignerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_by(name: &str) -> Self {
        Self::new().with(name)
    }

    pub fn with(mut self, name: &str) -> Self {
        self.signers.insert(AccountName::new(name));
        self
    }
}

impl Auth for SignerSet {
    fn authorize(&self, principal: &AccountName) -> Result<(), AuthError> {
        if self.signers.contains(principal) {
            Ok(())
        } else {
            Err(AuthError::Unauthorized(principal.clone()))
        }
    }
}
