//! Pool administration subcommands.

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use stasis_engine::{Address, PoolId, PoolParams, Rad, Ray};

use crate::util;

#[derive(Subcommand)]
pub enum PoolCmd {
    /// Register a new collateral pool
    Add {
        id: PoolId,

        /// Pool debt ceiling (RAD)
        #[arg(long, default_value = "1000000")]
        ceiling: Rad,

        /// Dust threshold (RAD)
        #[arg(long, default_value = "100")]
        floor: Rad,

        /// Per-second stability fee factor (RAY)
        #[arg(long, default_value = "1")]
        fee_rate: Ray,

        /// Close factor in bps
        #[arg(long, default_value_t = 5_000)]
        close_factor_bps: u64,

        /// Liquidator incentive in bps (>= 10000)
        #[arg(long, default_value_t = 10_250)]
        incentive_bps: u64,

        /// Treasury share of the incentive in bps
        #[arg(long, default_value_t = 5_000)]
        treasury_fee_bps: u64,

        /// Maximum oracle price age in seconds
        #[arg(long, default_value_t = 3_600)]
        price_life_secs: u64,

        /// Custody adapter identity
        #[arg(long, default_value = "adapter")]
        adapter: Address,

        /// Liquidation strategy identity
        #[arg(long, default_value = "fixed-spread")]
        strategy: Address,
    },

    /// List registered pools
    List,

    /// Set a pool's price-with-safety-margin (RAY)
    SetPrice { id: PoolId, price: Ray },

    /// Set a pool's per-second stability fee factor (RAY). Collect first;
    /// the new factor applies to the whole window since the last accrual.
    SetRate { id: PoolId, rate: Ray },

    /// Cage a pool (no further adjustments or accrual)
    Cage { id: PoolId },
}

pub fn run(state: &str, caller: Address, now: u64, cmd: PoolCmd) -> Result<()> {
    match cmd {
        PoolCmd::Add {
            id,
            ceiling,
            floor,
            fee_rate,
            close_factor_bps,
            incentive_bps,
            treasury_fee_bps,
            price_life_secs,
            adapter,
            strategy,
        } => util::with_state(state, |ledger| {
            let params = PoolParams {
                debt_ceiling: ceiling,
                debt_floor: floor,
                stability_fee_rate: fee_rate,
                close_factor_bps,
                liquidator_incentive_bps: incentive_bps,
                treasury_fee_bps,
                price_life_secs,
                adapter,
                liquidation_strategy: strategy,
            };
            ledger.create_pool(caller, id, params, now)?;
            println!("{} {id}", "Created pool".bright_green());
            Ok(())
        }),
        PoolCmd::List => {
            let ledger = util::load(state)?;
            println!("{}", "=== Collateral Pools ===".bright_green().bold());
            for (id, pool) in ledger.pools() {
                let state_str = if pool.live { "live".green() } else { "caged".red() };
                println!(
                    "{} [{state_str}] rate {} price {} debt {} / {}",
                    id.to_string().bright_cyan(),
                    pool.debt_accumulated_rate,
                    pool.price_with_safety_margin,
                    pool.total_debt_value(),
                    pool.params.debt_ceiling,
                );
            }
            if ledger.pools().next().is_none() {
                println!("{}", "(none)".dimmed());
            }
            Ok(())
        }
        PoolCmd::SetPrice { id, price } => util::with_state(state, |ledger| {
            ledger.set_price_with_safety_margin(caller, id, price)?;
            println!("{id} safety price set to {price}");
            Ok(())
        }),
        PoolCmd::SetRate { id, rate } => util::with_state(state, |ledger| {
            ledger.set_stability_fee_rate(caller, id, rate)?;
            println!("{id} stability fee rate set to {rate}");
            Ok(())
        }),
        PoolCmd::Cage { id } => util::with_state(state, |ledger| {
            ledger.cage_pool(caller, id)?;
            println!("{} {id}", "Caged".red());
            Ok(())
        }),
    }
}
