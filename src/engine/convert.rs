//! Conversion requests: validate, route to a connector, compute the plan.
//!
//! Computation is pure with respect to exchange state. `quote` stops here;
//! `convert` hands the plan to settlement inside one unit of work.

use super::core::Exchange;
use super::results::{ConversionPlan, ConversionReceipt, ExchangeError};
use crate::auth::Auth;
use crate::connector::Connector;
use crate::curve::{Conversion, CurveError};
use crate::events::{ConversionRejectedEvent, ConvertedEvent, EventPayload};
use crate::fee::{charge, ChargeMode};
use crate::ledger::Ledger;
use crate::reserve::{raw_rate, select_override, Reserve};
use crate::types::{AccountName, ConversionMode, Direction, ExtendedAsset};
use rust_decimal::Decimal;
use tracing::{debug, info};

/// Exactly one side of a request carries a positive amount; that side picks the mode.
pub fn conversion_mode(from: &ExtendedAsset, to: &ExtendedAsset) -> Result<ConversionMode, ExchangeError> {
    match (from.amount, to.amount) {
        (f, 0) if f > 0 => Ok(ConversionMode::Market),
        (0, t) if t > 0 => Ok(ConversionMode::ExactOutput),
        (f, t) => Err(ExchangeError::InvalidRequest(format!(
            "exactly one of from/to must be a positive amount, got {} and {}",
            f, t
        ))),
    }
}

impl<L, R> Exchange<L, R>
where
    L: Ledger + Clone,
    R: Reserve + Clone,
{
    /// Convert between the connected token and a smart token on behalf of `sender`.
    pub fn convert(
        &mut self,
        auth: &dyn Auth,
        sender: &AccountName,
        from: ExtendedAsset,
        to: ExtendedAsset,
    ) -> Result<ConversionReceipt, ExchangeError> {
        conversion_mode(&from, &to)?;
        self.configuration_or_err()?;
        auth.authorize(sender)?;

        let result = self.atomically("convert", |ex| {
            let (plan, connector) = ex.plan_conversion(&from, &to)?;
            let balance_after = ex.settle(sender, connector, &plan)?;
            Ok(ConversionReceipt { plan, balance_after })
        });

        match result {
            Ok(receipt) => {
                let plan = &receipt.plan;
                info!(
                    %sender,
                    smart = %plan.smart,
                    direction = ?plan.direction,
                    paid = %plan.pay,
                    received = %plan.receive,
                    fee = %plan.fee,
                    override_applied = plan.override_applied,
                    "conversion settled"
                );
                self.emit_event(EventPayload::Converted(ConvertedEvent {
                    sender: sender.clone(),
                    smart: plan.smart.clone(),
                    direction: plan.direction,
                    mode: plan.mode,
                    paid: plan.pay.clone(),
                    received: plan.receive.clone(),
                    fee: plan.fee.clone(),
                    ratio: plan.ratio,
                    override_applied: plan.override_applied,
                    balance_after: receipt.balance_after.clone(),
                }));
                Ok(receipt)
            }
            Err(e) => {
                self.emit_event(EventPayload::ConversionRejected(ConversionRejectedEvent {
                    sender: sender.clone(),
                    from,
                    to,
                    reason: e.to_string(),
                }));
                Err(e)
            }
        }
    }

    /// What `convert` would do, without authorization or any state change.
    pub fn quote(&self, from: &ExtendedAsset, to: &ExtendedAsset) -> Result<ConversionPlan, ExchangeError> {
        self.plan_conversion(from, to).map(|(plan, _)| plan)
    }

    pub(super) fn plan_conversion(
        &self,
        from: &ExtendedAsset,
        to: &ExtendedAsset,
    ) -> Result<(ConversionPlan, Connector), ExchangeError> {
        let mode = conversion_mode(from, to)?;
        let (direction, connector) = self.route(from, to)?;
        let supply = self.ledger.get_supply(&connector.smart)?.amount;

        debug!(
            smart = %connector.smart,
            ?direction,
            ?mode,
            balance = connector.balance.amount,
            supply,
            "computing conversion"
        );

        let plan = match (direction, mode) {
            (Direction::BuySmart, ConversionMode::Market) => self.plan_buy(&connector, supply, from)?,
            (Direction::SellSmart, ConversionMode::Market) => self.plan_sell(&connector, supply, from, to)?,
            (Direction::BuySmart, ConversionMode::ExactOutput) => {
                self.plan_buy_exact(&connector, supply, from, to)?
            }
            (Direction::SellSmart, ConversionMode::ExactOutput) => {
                self.plan_sell_exact(&connector, supply, from, to)?
            }
        };
        Ok((plan, connector))
    }

    // buy when paying the connected token, sell when paying a registered smart token
    fn route(&self, from: &ExtendedAsset, to: &ExtendedAsset) -> Result<(Direction, Connector), ExchangeError> {
        let cfg = self.configuration_or_err()?;
        if from.symbol == to.symbol {
            return Err(ExchangeError::InvalidRequest(format!(
                "cannot convert {} into itself",
                from.symbol
            )));
        }

        let (direction, smart) = if cfg.is_connected(&from.symbol) {
            (Direction::BuySmart, &to.symbol)
        } else {
            if !cfg.is_connected(&to.symbol) {
                return Err(ExchangeError::SymbolMismatch {
                    expected: cfg.connected.clone(),
                    actual: to.symbol.clone(),
                });
            }
            (Direction::SellSmart, &from.symbol)
        };

        let connector = self
            .connector(smart)
            .ok_or_else(|| ExchangeError::ConnectorNotFound(smart.clone()))?;
        // rows are keyed by code, so a precision mismatch still finds one
        if &connector.smart != smart {
            return Err(ExchangeError::SymbolMismatch {
                expected: connector.smart.clone(),
                actual: smart.clone(),
            });
        }
        Ok((direction, connector.clone()))
    }

    /// Administered rate in smallest units, if the smart token has a reserve.
    fn administered_rate(&self, connector: &Connector) -> Result<Option<Decimal>, CurveError> {
        if !self.reserve.has_reserve(&connector.smart) {
            return Ok(None);
        }
        let Some(rate) = self.reserve.get_rate(&connector.smart) else {
            return Ok(None);
        };
        raw_rate(rate, connector.smart.precision(), connector.balance.symbol.precision()).map(Some)
    }

    /// Curve candidate, or the reserve's outcome when that is strictly better for the trader.
    fn choose_outcome(
        &self,
        connector: &Connector,
        direction: Direction,
        mode: ConversionMode,
        given: i64,
        curve: &Conversion,
    ) -> Result<(Conversion, bool), CurveError> {
        let Some(rate) = self.administered_rate(connector)? else {
            return Ok((*curve, false));
        };
        match select_override(direction, mode, given, curve, rate)? {
            Some(replacement) => {
                debug!(smart = %connector.smart, %rate, curve = curve.amount, replacement = replacement.amount, "reserve override");
                Ok((replacement, true))
            }
            None => Ok((*curve, false)),
        }
    }

    // market buy: fee off the input, curve on the rest, refund the truncated share
    fn plan_buy(
        &self,
        connector: &Connector,
        supply: i64,
        from: &ExtendedAsset,
    ) -> Result<ConversionPlan, ExchangeError> {
        let policy = self.effective_policy(&connector.smart);
        let charged = charge(from.amount, &policy, ChargeMode::NonRequired);
        if charged.net <= 0 {
            return Err(ExchangeError::InsufficientAfterFee(from.with_amount(charged.net)));
        }

        let curve = connector.to_smart(supply, charged.net)?;
        let (chosen, override_applied) =
            self.choose_outcome(connector, Direction::BuySmart, ConversionMode::Market, charged.net, &curve)?;
        if chosen.amount <= 0 {
            return Err(ExchangeError::InsufficientAfterFee(from.with_amount(charged.net)));
        }

        let unused = chosen.unused_share(charged.net);
        let mut refund = unused;
        let mut fee = charged.fee;
        if refund > 0 {
            let overcharged = chosen.unused_share(fee);
            fee -= overcharged;
            refund += overcharged;
        }

        Ok(ConversionPlan {
            direction: Direction::BuySmart,
            mode: ConversionMode::Market,
            smart: connector.smart.clone(),
            pay: from.with_amount(from.amount - refund),
            refund: from.with_amount(refund),
            fee: from.with_amount(fee),
            receive: ExtendedAsset::new(chosen.amount, connector.smart.clone()),
            balance_delta: charged.net - unused,
            curve,
            ratio: chosen.ratio,
            override_applied,
        })
    }

    // market sell: curve on the full input, fee off the output
    fn plan_sell(
        &self,
        connector: &Connector,
        supply: i64,
        from: &ExtendedAsset,
        to: &ExtendedAsset,
    ) -> Result<ConversionPlan, ExchangeError> {
        let curve = connector.from_smart(supply, from.amount)?;
        let (chosen, override_applied) =
            self.choose_outcome(connector, Direction::SellSmart, ConversionMode::Market, from.amount, &curve)?;

        let policy = self.effective_policy(&connector.smart);
        let charged = charge(chosen.amount, &policy, ChargeMode::NonRequired);
        if charged.net <= 0 {
            return Err(ExchangeError::InsufficientAfterFee(to.with_amount(charged.net)));
        }

        let refund = chosen.unused_share(from.amount);
        Ok(ConversionPlan {
            direction: Direction::SellSmart,
            mode: ConversionMode::Market,
            smart: connector.smart.clone(),
            pay: from.with_amount(from.amount - refund),
            refund: from.with_amount(refund),
            fee: to.with_amount(charged.fee),
            receive: to.with_amount(charged.net),
            balance_delta: -curve.amount,
            curve,
            ratio: chosen.ratio,
            override_applied,
        })
    }

    // exact buy: required connected rounded up, fee on top
    fn plan_buy_exact(
        &self,
        connector: &Connector,
        supply: i64,
        from: &ExtendedAsset,
        to: &ExtendedAsset,
    ) -> Result<ConversionPlan, ExchangeError> {
        let curve = connector.to_exact_smart(supply, to.amount)?;
        let (chosen, override_applied) =
            self.choose_outcome(connector, Direction::BuySmart, ConversionMode::ExactOutput, to.amount, &curve)?;

        let policy = self.effective_policy(&connector.smart);
        let charged = charge(chosen.amount, &policy, ChargeMode::Required);

        Ok(ConversionPlan {
            direction: Direction::BuySmart,
            mode: ConversionMode::ExactOutput,
            smart: connector.smart.clone(),
            pay: from.with_amount(charged.gross),
            refund: from.with_amount(0),
            fee: from.with_amount(charged.fee),
            receive: to.clone(),
            balance_delta: chosen.amount,
            curve,
            ratio: chosen.ratio,
            override_applied,
        })
    }

    // exact sell: fee added to the requested output, smart needed for the gross rounded up
    fn plan_sell_exact(
        &self,
        connector: &Connector,
        supply: i64,
        from: &ExtendedAsset,
        to: &ExtendedAsset,
    ) -> Result<ConversionPlan, ExchangeError> {
        let policy = self.effective_policy(&connector.smart);
        let charged = charge(to.amount, &policy, ChargeMode::Required);

        let curve = connector.exact_from_smart(supply, charged.gross)?;
        let (chosen, override_applied) = self.choose_outcome(
            connector,
            Direction::SellSmart,
            ConversionMode::ExactOutput,
            charged.gross,
            &curve,
        )?;
        if chosen.amount > supply {
            return Err(CurveError::ExceedsSupply {
                amount: chosen.amount,
                supply,
            }
            .into());
        }

        Ok(ConversionPlan {
            direction: Direction::SellSmart,
            mode: ConversionMode::ExactOutput,
            smart: connector.smart.clone(),
            pay: from.with_amount(chosen.amount),
            refund: from.with_amount(0),
            fee: to.with_amount(charged.fee),
            receive: to.clone(),
            balance_delta: -charged.gross,
            curve,
            ratio: chosen.ratio,
            override_applied,
        })
    }
}
