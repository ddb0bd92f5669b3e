//! Bancor exchange simulation.
//!
//! Walks the exchange through setup, market and exact-output conversions, fee
//! policies, a reserve override and a rolled back conversion.
//!
//! Usage: `bancor-sim [config.toml]`

use bancor_core::*;
use rust_decimal_macros::dec;
use std::error::Error;
use tracing::{info, warn};

type SimResult = Result<(), Box<dyn Error>>;

fn main() -> SimResult {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::from_toml_str(&std::fs::read_to_string(&path)?)?,
        None => EngineConfig::default(),
    };
    info!(contract = %config.contract, max_events = config.max_events, "bancor exchange simulation");

    scenario_1_worked_example(&config)?;
    scenario_2_fees_and_sell_back(&config)?;
    scenario_3_exact_output(&config)?;
    scenario_4_reserve_override(&config)?;
    scenario_5_rollback(&config)?;

    info!("all simulations completed");
    Ok(())
}

fn gxc() -> ExtendedSymbol {
    ExtendedSymbol::new("GXC", 4, "gxc.token")
}

fn tkn() -> ExtendedSymbol {
    ExtendedSymbol::new("TKN", 4, "tkn.token")
}

fn rsv() -> ExtendedSymbol {
    ExtendedSymbol::new("RSV", 4, "rsv.token")
}

fn name(s: &str) -> AccountName {
    AccountName::new(s)
}

/// Exchange with GXC as the connected token and TKN connected at 1,000,000 GXC / 10,000 TKN.
fn setup(config: &EngineConfig) -> Result<(Exchange, SignerSet), Box<dyn Error>> {
    let admin = SignerSet::signed_by(config.contract.as_str()).with("alice").with("bob");
    let mut exchange = Exchange::new(config.clone(), InMemoryLedger::new(), InMemoryReserve::default())?;

    let ledger = exchange.ledger_mut();
    ledger.create_token(gxc(), i64::MAX)?;
    ledger.create_token(tkn(), i64::MAX)?;
    ledger.create_token(rsv(), i64::MAX)?;
    ledger.issue(&name("owner"), &ExtendedAsset::new(20_000_000_000, gxc()), "genesis")?;
    ledger.issue(&name("alice"), &ExtendedAsset::new(1_000_000_000, gxc()), "genesis")?;
    ledger.issue(&name("bob"), &ExtendedAsset::new(1_000_000_000, gxc()), "genesis")?;
    ledger.issue(&name("founders"), &ExtendedAsset::new(100_000_000, tkn()), "genesis")?;

    exchange.init(&admin, name("owner"), gxc())?;
    exchange.connect(&admin, tkn(), ExtendedAsset::new(10_000_000_000, gxc()), dec!(0.5))?;
    Ok((exchange, admin))
}

fn log_receipt(label: &str, receipt: &ConversionReceipt) {
    let plan = &receipt.plan;
    info!(
        paid = %plan.pay,
        refunded = %plan.refund,
        fee = %plan.fee,
        received = %plan.receive,
        ratio = %plan.ratio.round_dp(8),
        override_applied = plan.override_applied,
        balance = %receipt.balance_after,
        "{}",
        label
    );
}

/// 10,000 GXC buys sqrt(1.01) - 1 of the supply.
fn scenario_1_worked_example(config: &EngineConfig) -> SimResult {
    info!("scenario 1: worked example");
    let (mut exchange, signers) = setup(config)?;

    let spot = exchange
        .connector(&tkn())
        .and_then(|c| c.spot_price(100_000_000));
    info!(spot = ?spot, "TKN spot price in GXC units per TKN unit");

    let receipt = exchange.convert(
        &signers,
        &name("alice"),
        ExtendedAsset::new(100_000_000, gxc()),
        ExtendedAsset::zero(tkn()),
    )?;
    log_receipt("alice buys with 10,000 GXC", &receipt);
    Ok(())
}

/// Default and per-asset fees, then selling back.
fn scenario_2_fees_and_sell_back(config: &EngineConfig) -> SimResult {
    info!("scenario 2: fee policies and sell back");
    let (mut exchange, signers) = setup(config)?;

    exchange.set_charge(&signers, 5, Some(ExtendedAsset::new(100, gxc())), None)?;
    let receipt = exchange.convert(
        &signers,
        &name("alice"),
        ExtendedAsset::new(50_000_000, gxc()),
        ExtendedAsset::zero(tkn()),
    )?;
    log_receipt("alice buys under the 5 per mille default", &receipt);

    exchange.advance_time(3_600_000);
    exchange.set_charge(&signers, 2, None, Some(tkn()))?;
    let bought = receipt.plan.receive.clone();
    let receipt = exchange.convert(&signers, &name("alice"), bought, ExtendedAsset::zero(gxc()))?;
    log_receipt("alice sells everything under the 2 per mille TKN policy", &receipt);

    exchange.set_charge(&signers, DELETE_POLICY, None, Some(tkn()))?;
    info!(
        owner_fees = exchange.ledger().balance_of(&name("owner"), &gxc()) - 10_000_000_000,
        "policy removed, fees collected by owner"
    );
    Ok(())
}

/// Fixed outputs: the required input is rounded up and the fee added on top.
fn scenario_3_exact_output(config: &EngineConfig) -> SimResult {
    info!("scenario 3: exact output");
    let (mut exchange, signers) = setup(config)?;
    exchange.set_charge(&signers, 3, None, None)?;

    let quote = exchange.quote(&ExtendedAsset::zero(gxc()), &ExtendedAsset::new(250_000, tkn()))?;
    info!(required = %quote.pay, "quote for exactly 25 TKN");

    let receipt = exchange.convert(
        &signers,
        &name("bob"),
        ExtendedAsset::zero(gxc()),
        ExtendedAsset::new(250_000, tkn()),
    )?;
    log_receipt("bob buys exactly 25 TKN", &receipt);

    let receipt = exchange.convert(
        &signers,
        &name("bob"),
        ExtendedAsset::zero(tkn()),
        ExtendedAsset::new(10_000_000, gxc()),
    )?;
    log_receipt("bob sells for exactly 1,000 GXC", &receipt);
    Ok(())
}

/// RSV trades at 1.02 on its curve while its reserve redeems at 1.00.
fn scenario_4_reserve_override(config: &EngineConfig) -> SimResult {
    info!("scenario 4: reserve override");
    let (mut exchange, signers) = setup(config)?;

    let reserve_account = exchange.reserve().account().clone();
    exchange
        .ledger_mut()
        .issue(&name("issuer"), &ExtendedAsset::new(100_000_000, rsv()), "genesis")?;
    exchange
        .ledger_mut()
        .issue(&reserve_account, &ExtendedAsset::new(100_000_000, gxc()), "reserve deposit")?;
    if let Some(record) =
        ReserveRecord::from_deposit(rsv(), 100_000_000, ExtendedAsset::new(100_000_000, gxc()))
    {
        exchange.reserve_mut().insert(record);
    }
    exchange.connect(&signers, rsv(), ExtendedAsset::new(102_000_000, gxc()), dec!(1))?;

    let receipt = exchange.convert(
        &signers,
        &name("alice"),
        ExtendedAsset::new(10_200, gxc()),
        ExtendedAsset::zero(rsv()),
    )?;
    log_receipt("alice buys RSV: reserve price is cheaper", &receipt);

    let receipt = exchange.convert(&signers, &name("alice"), receipt.plan.receive, ExtendedAsset::zero(gxc()))?;
    log_receipt("alice sells RSV: curve pays more", &receipt);
    Ok(())
}

/// A failing outbound leg leaves no trace.
fn scenario_5_rollback(config: &EngineConfig) -> SimResult {
    info!("scenario 5: rollback");
    let (mut exchange, signers) = setup(config)?;
    exchange.set_charge(&signers, 5, None, None)?;
    exchange.ledger_mut().freeze(name("owner"));

    let before = exchange.connector(&tkn()).map(|c| c.balance.clone());
    let result = exchange.convert(
        &signers,
        &name("alice"),
        ExtendedAsset::new(100_000_000, gxc()),
        ExtendedAsset::zero(tkn()),
    );
    let after = exchange.connector(&tkn()).map(|c| c.balance.clone());

    match result {
        Ok(receipt) => log_receipt("unexpected success", &receipt),
        Err(e) => warn!(error = %e, unchanged = before == after, "conversion rejected"),
    }
    for event in exchange.recent_events(2) {
        info!(id = event.id.0, at = event.timestamp.as_millis(), payload = ?event.payload, "audit log");
    }
    Ok(())
}
