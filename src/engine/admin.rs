//! Contract administration: init, connect, setcharge, setowner.
//!
//! All four require the contract's own authority and run as one unit of work.

use super::core::Exchange;
use super::results::ExchangeError;
use crate::auth::Auth;
use crate::config::Configuration;
use crate::connector::{Connector, Weight};
use crate::events::{
    ChargeRemovedEvent, ChargeUpdatedEvent, ConnectedEvent, EventPayload, InitializedEvent,
    OwnerChangedEvent,
};
use crate::fee::FeePolicy;
use crate::ledger::Ledger;
use crate::reserve::Reserve;
use crate::store::RowKey;
use crate::types::{AccountName, ExtendedAsset, ExtendedSymbol, PerMille, MAX_PRECISION};
use rust_decimal::Decimal;
use tracing::info;

/// setcharge rate that deletes a per-asset policy.
pub const DELETE_POLICY: i16 = -1;

const CONNECT_MEMO: &str = "connector deposit";

fn valid_symbol(symbol: &ExtendedSymbol) -> Result<(), ExchangeError> {
    if symbol.is_valid() {
        Ok(())
    } else {
        Err(ExchangeError::InvalidRequest(format!(
            "invalid symbol {}: precision must be at most {}",
            symbol, MAX_PRECISION
        )))
    }
}

fn per_mille(rate: i16) -> Result<PerMille, ExchangeError> {
    u16::try_from(rate)
        .ok()
        .and_then(PerMille::new)
        .ok_or(ExchangeError::InvalidRateRange(rate))
}

impl<L, R> Exchange<L, R>
where
    L: Ledger + Clone,
    R: Reserve + Clone,
{
    /// Create the configuration singleton. Fees start at zero.
    pub fn init(
        &mut self,
        auth: &dyn Auth,
        owner: AccountName,
        connected: ExtendedSymbol,
    ) -> Result<(), ExchangeError> {
        auth.authorize(&self.config.contract)?;
        if self.state.configuration.exists() {
            return Err(ExchangeError::AlreadyInitialized);
        }
        valid_symbol(&connected)?;

        self.state
            .configuration
            .set(Configuration::new(owner.clone(), connected.clone()));

        info!(%owner, %connected, "exchange initialized");
        self.emit_event(EventPayload::Initialized(InitializedEvent { owner, connected }));
        Ok(())
    }

    /// Register a connector for `smart`, funded by `initial_balance` from the owner.
    pub fn connect(
        &mut self,
        auth: &dyn Auth,
        smart: ExtendedSymbol,
        initial_balance: ExtendedAsset,
        weight: Decimal,
    ) -> Result<(), ExchangeError> {
        auth.authorize(&self.config.contract)?;

        let connector = self.atomically("connect", |ex| {
            let cfg = ex.configuration_or_err()?.clone();
            valid_symbol(&smart)?;
            if !cfg.is_connected(&initial_balance.symbol) {
                return Err(ExchangeError::SymbolMismatch {
                    expected: cfg.connected.clone(),
                    actual: initial_balance.symbol.clone(),
                });
            }
            if cfg.is_connected(&smart) {
                return Err(ExchangeError::InvalidRequest(
                    "connected token cannot be its own smart token".to_string(),
                ));
            }
            if !initial_balance.is_positive() {
                return Err(ExchangeError::InvalidRequest(format!(
                    "initial balance must be positive, got {}",
                    initial_balance
                )));
            }
            let weight = Weight::new(weight).ok_or(ExchangeError::InvalidWeight(weight))?;

            let key = RowKey::from(&smart);
            if ex.state.connectors.contains(&key) {
                return Err(ExchangeError::ConnectorAlreadyExists(smart.clone()));
            }

            let connector = Connector::new(smart.clone(), initial_balance.clone(), weight);
            ex.state.connectors.upsert(key, connector.clone());

            let contract = ex.config.contract.clone();
            ex.ledger
                .transfer(&cfg.owner, &contract, &initial_balance, CONNECT_MEMO)?;
            Ok(connector)
        })?;

        info!(smart = %connector.smart, balance = %connector.balance, weight = %connector.weight, "connector created");
        self.emit_event(EventPayload::Connected(ConnectedEvent {
            smart: connector.smart,
            balance: connector.balance,
            weight: connector.weight,
        }));
        Ok(())
    }

    /// Set the default fee (`target` None) or a per-asset policy.
    ///
    /// `rate` is per mille in 0..=1000, or [`DELETE_POLICY`] with a target to remove
    /// that asset's policy. An omitted `fixed` keeps the current fixed fee (zero for
    /// a new policy).
    pub fn set_charge(
        &mut self,
        auth: &dyn Auth,
        rate: i16,
        fixed: Option<ExtendedAsset>,
        target: Option<ExtendedSymbol>,
    ) -> Result<(), ExchangeError> {
        auth.authorize(&self.config.contract)?;

        let payload = self.atomically("setcharge", |ex| {
            let mut cfg = ex.configuration_or_err()?.clone();
            if let Some(fixed) = &fixed {
                if !cfg.is_connected(&fixed.symbol) {
                    return Err(ExchangeError::SymbolMismatch {
                        expected: cfg.connected.clone(),
                        actual: fixed.symbol.clone(),
                    });
                }
            }

            let Some(smart) = target else {
                cfg.fee_rate = per_mille(rate)?;
                if let Some(fixed) = &fixed {
                    cfg.fixed_fee = fixed.amount;
                }
                let policy = cfg.default_policy();
                ex.state.configuration.set(cfg);
                return Ok(EventPayload::ChargeUpdated(ChargeUpdatedEvent { target: None, policy }));
            };

            let key = RowKey::from(&smart);
            if rate == DELETE_POLICY {
                if ex.state.charges.erase(&key).is_none() {
                    return Err(ExchangeError::FeePolicyNotFound(smart));
                }
                return Ok(EventPayload::ChargeRemoved(ChargeRemovedEvent { smart }));
            }

            let rate = per_mille(rate)?;
            let fixed_fee = match (&fixed, ex.state.charges.find(&key)) {
                (Some(fixed), _) => fixed.amount,
                (None, Some(existing)) => existing.fixed_fee,
                (None, None) => 0,
            };
            let policy = FeePolicy::new(rate, fixed_fee);
            ex.state.charges.upsert(key, policy);
            Ok(EventPayload::ChargeUpdated(ChargeUpdatedEvent {
                target: Some(smart),
                policy,
            }))
        })?;

        info!(?payload, "charge updated");
        self.emit_event(payload);
        Ok(())
    }

    /// Change the fee recipient.
    pub fn set_owner(&mut self, auth: &dyn Auth, owner: AccountName) -> Result<(), ExchangeError> {
        auth.authorize(&self.config.contract)?;

        let mut cfg = self.configuration_or_err()?.clone();
        let previous = std::mem::replace(&mut cfg.owner, owner.clone());
        self.state.configuration.set(cfg);

        info!(%previous, %owner, "owner changed");
        self.emit_event(EventPayload::OwnerChanged(OwnerChangedEvent { previous, owner }));
        Ok(())
    }
}
