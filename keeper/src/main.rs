//! Keeper daemon: collect stability fees, scan for unsafe positions,
//! liquidate.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info, warn};

use stasis_engine::{
    Address, FixedSpreadStrategy, LedgerError, LiquidationEngine, PoolId, SnapshotStore,
    StabilityFeeCollector, Wad,
};
use stasis_keeper::{health, PriceFeedFile};

#[derive(Parser)]
#[command(name = "stasis-keeper")]
#[command(about = "Liquidation keeper for the stasis ledger", long_about = None)]
#[command(version)]
struct Args {
    /// Path to the ledger snapshot file
    #[arg(short, long)]
    state: String,

    /// Path to the price feed file (JSON map of pool -> observation)
    #[arg(short, long)]
    prices: String,

    /// Seconds between rounds
    #[arg(short, long, default_value_t = 15)]
    interval: u64,

    /// Ledger identity receiving liquidation proceeds
    #[arg(short, long, default_value = "keeper")]
    keeper: Address,

    /// Liquidation engine's ledger identity
    #[arg(long, default_value = "liq-engine")]
    engine: Address,

    /// Fee collector's ledger identity
    #[arg(long, default_value = "collector")]
    collector: Address,

    /// Treasury account for liquidation fees
    #[arg(long, default_value = "treasury")]
    treasury: Address,

    /// Run a single round and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let store = SnapshotStore::new(&args.state);
    let feed = PriceFeedFile::new(&args.prices);
    let engine = LiquidationEngine::new(
        args.engine,
        args.treasury,
        StabilityFeeCollector::new(args.collector),
    );

    let mut ticker = tokio::time::interval(Duration::from_secs(args.interval.max(1)));
    loop {
        ticker.tick().await;
        if let Err(e) = run_round(&store, &feed, &engine, args.collector, args.keeper) {
            warn!("round failed: {e:#}");
        }
        if args.once {
            break;
        }
    }
    Ok(())
}

fn unix_now() -> Result<u64> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock before epoch")?
        .as_secs())
}

fn run_round(
    store: &SnapshotStore,
    feed: &PriceFeedFile,
    engine: &LiquidationEngine,
    collector_addr: Address,
    keeper: Address,
) -> Result<()> {
    let mut ledger = store.load().context("loading ledger snapshot")?;
    let oracle = feed.load()?;
    let now = unix_now()?;
    let collector = StabilityFeeCollector::new(collector_addr);

    let pool_ids: Vec<PoolId> = ledger.pools().map(|(id, _)| *id).collect();
    for pool_id in pool_ids {
        if let Err(e) = collector.collect(&mut ledger, pool_id, now) {
            warn!("collect {pool_id}: {e}");
            continue;
        }
        let candidates = health::scan_pool(&ledger, pool_id)?;
        if candidates.is_empty() {
            debug!("{pool_id}: all positions healthy");
            continue;
        }
        info!("{pool_id}: {} liquidation candidate(s)", candidates.len());
        for candidate in candidates {
            let outcome = engine.liquidate(
                &mut ledger,
                &oracle,
                &FixedSpreadStrategy,
                None,
                now,
                pool_id,
                candidate.owner,
                candidate.suggested_repay_share,
                Wad::ZERO,
                keeper,
                &[],
            );
            match outcome {
                Ok(receipt) => info!(
                    "liquidated {pool_id}/{}: repaid {} seized {}{}",
                    candidate.owner,
                    receipt.debt_value_repaid,
                    receipt.collateral_seized,
                    if receipt.full_liquidation { " (full)" } else { "" },
                ),
                // Expected, recoverable: wait for the next price or round.
                Err(LedgerError::PositionIsSafe) | Err(LedgerError::InvalidPrice) => {
                    debug!("{pool_id}/{}: not liquidatable this round", candidate.owner)
                }
                Err(e) => warn!("liquidate {pool_id}/{}: {e}", candidate.owner),
            }
        }
    }

    store.save(&ledger).context("persisting ledger snapshot")?;
    Ok(())
}
