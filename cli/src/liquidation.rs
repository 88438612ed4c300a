//! Fee collection and liquidation subcommands.

use anyhow::Result;
use colored::Colorize;

use stasis_engine::{
    Address, FixedSpreadStrategy, LiquidationEngine, PoolId, PoolPrice, Ray,
    StabilityFeeCollector, TableOracle, Wad,
};

use crate::util;

/// Ledger identities the default `stasis init` grants roles to.
const COLLECTOR: &str = "collector";
const LIQ_ENGINE: &str = "liq-engine";
const TREASURY: &str = "treasury";

pub fn collect(state: &str, now: u64, pool: PoolId) -> Result<()> {
    util::with_state(state, |ledger| {
        let collector = StabilityFeeCollector::new(Address::from_label(COLLECTOR));
        let rate = collector.collect(ledger, pool, now)?;
        println!(
            "{} {pool}: rate now {rate}, debt engine surplus {}",
            "Collected".bright_green(),
            ledger.stablecoin_of(ledger.system_debt_engine()),
        );
        Ok(())
    })
}

#[allow(clippy::too_many_arguments)]
pub fn liquidate(
    state: &str,
    caller: Address,
    now: u64,
    pool: PoolId,
    position: Address,
    repay: Wad,
    raw_price: Ray,
    min_collateral: Wad,
) -> Result<()> {
    util::with_state(state, |ledger| {
        // The safety check runs against the pool's stored safety price; the
        // supplied raw price only prices the seizure.
        let with_safety_margin = ledger.pool(pool)?.price_with_safety_margin;
        let mut oracle = TableOracle::default();
        oracle.set(
            pool,
            PoolPrice {
                raw: raw_price,
                with_safety_margin,
                age_secs: 0,
                ok: true,
            },
        );

        let engine = LiquidationEngine::new(
            Address::from_label(LIQ_ENGINE),
            Address::from_label(TREASURY),
            StabilityFeeCollector::new(Address::from_label(COLLECTOR)),
        );
        let receipt = engine.liquidate(
            ledger,
            &oracle,
            &FixedSpreadStrategy,
            None,
            now,
            pool,
            position,
            repay,
            min_collateral,
            caller,
            &[],
        )?;

        println!("{}", "=== Liquidation Settled ===".bright_green().bold());
        println!("{} {}", "Debt repaid:".bright_cyan(), receipt.debt_value_repaid);
        println!("{} {}", "Seized:".bright_cyan(), receipt.collateral_seized);
        println!(
            "{} {}",
            "Liquidator collateral:".bright_cyan(),
            receipt.liquidator_collateral
        );
        println!("{} {}", "Treasury fee:".bright_cyan(), receipt.treasury_fee);
        if !receipt.bad_debt.is_zero() {
            println!("{} {}", "Bad debt:".red().bold(), receipt.bad_debt);
        }
        if receipt.full_liquidation {
            println!("{}", "Position fully closed".yellow());
        }
        Ok(())
    })
}
