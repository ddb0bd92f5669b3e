//! Conservation invariant tests.
//!
//! These tests verify that connector balances only move by applied integer deltas
//! and that contract custody always matches what the connectors claim to hold.

use bancor_core::*;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn gxc() -> ExtendedSymbol {
    ExtendedSymbol::new("GXC", 4, "gxc.token")
}

fn tkn() -> ExtendedSymbol {
    ExtendedSymbol::new("TKN", 4, "tkn.token")
}

fn abc() -> ExtendedSymbol {
    ExtendedSymbol::new("ABC", 2, "abc.token")
}

fn name(s: &str) -> AccountName {
    AccountName::new(s)
}

const INITIAL_BALANCE: i64 = 10_000_000_000;

fn setup(weight: Decimal, rate: u16) -> (Exchange, SignerSet) {
    let signers = SignerSet::signed_by("gxc.bancor").with("alice").with("bob");
    let mut ex = Exchange::in_memory();
    let ledger = ex.ledger_mut();
    ledger.create_token(gxc(), i64::MAX).unwrap();
    ledger.create_token(tkn(), i64::MAX).unwrap();
    ledger.create_token(abc(), i64::MAX).unwrap();
    ledger.issue(&name("owner"), &ExtendedAsset::new(2 * INITIAL_BALANCE, gxc()), "").unwrap();
    ledger.issue(&name("alice"), &ExtendedAsset::new(5_000_000_000, gxc()), "").unwrap();
    ledger.issue(&name("bob"), &ExtendedAsset::new(5_000_000_000, gxc()), "").unwrap();
    ledger.issue(&name("founders"), &ExtendedAsset::new(100_000_000, tkn()), "").unwrap();
    ledger.issue(&name("founders"), &ExtendedAsset::new(1_000_000, abc()), "").unwrap();

    ex.init(&signers, name("owner"), gxc()).unwrap();
    ex.connect(&signers, tkn(), ExtendedAsset::new(INITIAL_BALANCE, gxc()), weight).unwrap();
    ex.connect(&signers, abc(), ExtendedAsset::new(INITIAL_BALANCE, gxc()), dec!(0.2)).unwrap();
    ex.set_charge(&signers, rate as i16, None, None).unwrap();
    (ex, signers)
}

fn custody(ex: &Exchange) -> i64 {
    ex.ledger().balance_of(ex.contract(), &gxc())
}

fn connector_total(ex: &Exchange) -> i64 {
    ex.connectors().map(|c| c.balance.amount).sum()
}

#[derive(Debug, Clone)]
enum Step {
    Buy { trader: bool, amount: i64 },
    Sell { trader: bool, permille: i64 },
    BuyExact { trader: bool, amount: i64 },
    SellExact { trader: bool, amount: i64 },
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        (any::<bool>(), 1i64..500_000_000i64).prop_map(|(trader, amount)| Step::Buy { trader, amount }),
        (any::<bool>(), 1i64..=1_000i64).prop_map(|(trader, permille)| Step::Sell { trader, permille }),
        (any::<bool>(), 1i64..2_000_000i64).prop_map(|(trader, amount)| Step::BuyExact { trader, amount }),
        (any::<bool>(), 1i64..50_000_000i64).prop_map(|(trader, amount)| Step::SellExact { trader, amount }),
    ]
}

fn run_step(ex: &mut Exchange, signers: &SignerSet, step: &Step) -> Result<ConversionReceipt, ExchangeError> {
    let who = |alice: bool| if alice { name("alice") } else { name("bob") };
    match step {
        Step::Buy { trader, amount } => ex.convert(
            signers,
            &who(*trader),
            ExtendedAsset::new(*amount, gxc()),
            ExtendedAsset::zero(tkn()),
        ),
        Step::Sell { trader, permille } => {
            let holder = who(*trader);
            let held = ex.ledger().balance_of(&holder, &tkn());
            ex.convert(
                signers,
                &holder,
                ExtendedAsset::new(held * permille / 1_000, tkn()),
                ExtendedAsset::zero(gxc()),
            )
        }
        Step::BuyExact { trader, amount } => ex.convert(
            signers,
            &who(*trader),
            ExtendedAsset::zero(gxc()),
            ExtendedAsset::new(*amount, tkn()),
        ),
        Step::SellExact { trader, amount } => ex.convert(
            signers,
            &who(*trader),
            ExtendedAsset::zero(tkn()),
            ExtendedAsset::new(*amount, gxc()),
        ),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Connector balance equals the initial deposit plus every applied delta, and
    /// custody equals the sum of connector balances.
    #[test]
    fn balance_is_sum_of_applied_deltas(
        weight in (1i64..=10i64).prop_map(|x| Decimal::new(x, 1)),
        rate in 0u16..=30u16,
        steps in proptest::collection::vec(step_strategy(), 1..30),
    ) {
        let (mut ex, signers) = setup(weight, rate);
        let mut applied = 0i64;

        for step in &steps {
            let before = ex.connector(&tkn()).unwrap().balance.amount;
            let custody_before = custody(&ex);
            match run_step(&mut ex, &signers, step) {
                Ok(receipt) => {
                    applied += receipt.plan.balance_delta;
                    prop_assert_eq!(receipt.balance_after.amount, before + receipt.plan.balance_delta);
                }
                Err(_) => {
                    prop_assert_eq!(ex.connector(&tkn()).unwrap().balance.amount, before);
                    prop_assert_eq!(custody(&ex), custody_before);
                }
            }
            prop_assert_eq!(custody(&ex), connector_total(&ex));
        }

        prop_assert_eq!(ex.connector(&tkn()).unwrap().balance.amount, INITIAL_BALANCE + applied);
    }

    /// Every smart unit in existence is held by someone: mints and burns go through supply.
    #[test]
    fn supply_matches_holdings(
        steps in proptest::collection::vec(step_strategy(), 1..30),
    ) {
        let (mut ex, signers) = setup(dec!(0.5), 5);
        for step in &steps {
            let _ = run_step(&mut ex, &signers, step);
            let supply = ex.ledger().get_supply(&tkn()).unwrap().amount;
            prop_assert_eq!(supply, ex.ledger().total_held(&tkn()));
        }
    }

    /// What leaves the trader is split exactly between custody growth and the fee.
    #[test]
    fn market_buy_legs_add_up(
        amount in 1_000i64..1_000_000_000i64,
        rate in 0u16..=50u16,
    ) {
        let (mut ex, signers) = setup(dec!(0.5), rate);
        let alice_before = ex.ledger().balance_of(&name("alice"), &gxc());
        let owner_before = ex.ledger().balance_of(&name("owner"), &gxc());

        if let Ok(receipt) = ex.convert(&signers, &name("alice"), ExtendedAsset::new(amount, gxc()), ExtendedAsset::zero(tkn())) {
            let plan = &receipt.plan;
            prop_assert_eq!(plan.pay.amount + plan.refund.amount, amount);
            prop_assert_eq!(plan.pay.amount, plan.balance_delta + plan.fee.amount);
            prop_assert_eq!(ex.ledger().balance_of(&name("alice"), &gxc()), alice_before - plan.pay.amount);
            prop_assert_eq!(ex.ledger().balance_of(&name("owner"), &gxc()), owner_before + plan.fee.amount);
            prop_assert_eq!(ex.ledger().balance_of(&name("alice"), &tkn()), plan.receive.amount);
        }
    }
}

/// Non-proptest conservation tests.
mod deterministic_conservation {
    use super::*;

    #[test]
    fn buy_then_sell_returns_less_than_paid() {
        let (mut ex, signers) = setup(dec!(0.5), 0);
        let bought = ex
            .convert(&signers, &name("alice"), ExtendedAsset::new(100_000_000, gxc()), ExtendedAsset::zero(tkn()))
            .unwrap();
        let sold = ex
            .convert(&signers, &name("alice"), bought.plan.receive.clone(), ExtendedAsset::zero(gxc()))
            .unwrap();

        assert!(sold.plan.receive.amount <= bought.plan.pay.amount);
        // the pool keeps the rounding dust
        assert!(ex.connector(&tkn()).unwrap().balance.amount >= INITIAL_BALANCE);
        assert_eq!(custody(&ex), connector_total(&ex));
    }

    #[test]
    fn connectors_are_independent() {
        let (mut ex, signers) = setup(dec!(0.5), 0);
        let abc_before = ex.connector(&abc()).unwrap().clone();
        ex.convert(&signers, &name("alice"), ExtendedAsset::new(100_000_000, gxc()), ExtendedAsset::zero(tkn()))
            .unwrap();
        assert_eq!(ex.connector(&abc()).unwrap(), &abc_before);
    }

    #[test]
    fn many_small_buys_conserve() {
        let (mut ex, signers) = setup(dec!(0.3), 2);
        let mut applied = 0;
        for i in 1..=50 {
            let receipt = ex
                .convert(&signers, &name("bob"), ExtendedAsset::new(10_000 * i, gxc()), ExtendedAsset::zero(tkn()))
                .unwrap();
            applied += receipt.plan.balance_delta;
        }
        assert_eq!(ex.connector(&tkn()).unwrap().balance.amount, INITIAL_BALANCE + applied);
        assert_eq!(custody(&ex), connector_total(&ex));
    }
}
