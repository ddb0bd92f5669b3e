// 8.3: settlement. moves the legs of a computed plan through the ledger.
// order: connector row, inbound leg, redemption, fee, outbound leg. always called
// inside atomically so any failing leg undoes the ones before it.

use super::core::Exchange;
use super::results::{ConversionPlan, ExchangeError};
use crate::connector::Connector;
use crate::ledger::Ledger;
use crate::reserve::{Reserve, ReserveError};
use crate::store::RowKey;
use crate::types::{AccountName, Direction, ExtendedAsset};
use tracing::debug;

const CONVERT_MEMO: &str = "convert";

impl<L, R> Exchange<L, R>
where
    L: Ledger + Clone,
    R: Reserve + Clone,
{
    /// Apply `plan` for `sender` and return the connector balance after it.
    pub(super) fn settle(
        &mut self,
        sender: &AccountName,
        connector: Connector,
        plan: &ConversionPlan,
    ) -> Result<ExtendedAsset, ExchangeError> {
        let owner = self.configuration_or_err()?.owner.clone();
        let contract = self.config.contract.clone();

        let updated = connector.with_delta(plan.balance_delta)?;
        let balance_after = updated.balance.clone();
        self.state
            .connectors
            .upsert(RowKey::from(&updated.smart), updated);

        self.ledger.transfer(sender, &contract, &plan.pay, CONVERT_MEMO)?;

        match plan.direction {
            Direction::BuySmart => {
                self.pay_fee(&contract, &owner, &plan.fee)?;
                self.ledger.issue(sender, &plan.receive, CONVERT_MEMO)?;
            }
            Direction::SellSmart => {
                if plan.override_applied {
                    let payout = self.reserve.claim(&mut self.ledger, &contract, &plan.pay)?;
                    let needed = plan.receive.amount + plan.fee.amount;
                    if payout.symbol != plan.receive.symbol || payout.amount < needed {
                        return Err(ReserveError::InsufficientUnderlying {
                            symbol: plan.smart.clone(),
                            available: payout.amount,
                            requested: needed,
                        }
                        .into());
                    }
                    debug!(claimed = %plan.pay, payout = %payout, "redeemed through reserve");
                } else {
                    self.ledger.retire(&contract, &plan.pay, CONVERT_MEMO)?;
                }
                self.pay_fee(&contract, &owner, &plan.fee)?;
                self.ledger
                    .transfer(&contract, sender, &plan.receive, CONVERT_MEMO)?;
            }
        }

        Ok(balance_after)
    }

    fn pay_fee(&mut self, contract: &AccountName, owner: &AccountName, fee: &ExtendedAsset) -> Result<(), ExchangeError> {
        if !fee.is_positive() {
            return Ok(());
        }
        let memo = self.config.fee_memo.clone();
        self.ledger.transfer(contract, owner, fee, &memo)?;
        Ok(())
    }
}
