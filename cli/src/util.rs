//! Snapshot plumbing and argument helpers shared by the subcommands.

use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use colored::Colorize;

use stasis_engine::{Address, Ledger, Rad, Role, SnapshotStore, Wad};

pub fn resolve_now(flag: Option<u64>) -> Result<u64> {
    match flag {
        Some(now) => Ok(now),
        None => Ok(SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .context("system clock before epoch")?
            .as_secs()),
    }
}

pub fn load(state: &str) -> Result<Ledger> {
    SnapshotStore::new(state)
        .load()
        .with_context(|| format!("loading {state} (run `stasis init` first?)"))
}

/// Load, mutate, persist. The engine's own atomicity applies per operation;
/// the snapshot is only rewritten when the closure succeeds.
pub fn with_state(state: &str, f: impl FnOnce(&mut Ledger) -> Result<()>) -> Result<()> {
    let store = SnapshotStore::new(state);
    let mut ledger = store
        .load()
        .with_context(|| format!("loading {state} (run `stasis init` first?)"))?;
    f(&mut ledger)?;
    store.save(&ledger).context("persisting snapshot")
}

/// Parse "1.5" / "-0.25" into a signed WAD delta.
pub fn parse_signed_wad(s: &str) -> Result<i128> {
    let (negative, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let wad: Wad = body
        .parse()
        .with_context(|| format!("invalid WAD amount {s:?}"))?;
    let magnitude = i128::try_from(wad.0).context("amount out of range")?;
    Ok(if negative { -magnitude } else { magnitude })
}

pub fn init_state(
    state: &str,
    ceiling: Rad,
    admin: Address,
    debt_engine: Address,
    liquidation_engine: Address,
    collector: Address,
) -> Result<()> {
    let store = SnapshotStore::new(state);
    if store.exists() {
        bail!("{state} already exists; refusing to overwrite");
    }
    let mut ledger = Ledger::new(admin, debt_engine, ceiling);
    ledger.grant_role(admin, liquidation_engine, Role::LiquidationEngine)?;
    ledger.grant_role(admin, collector, Role::FeeCollector)?;
    store.save(&ledger).context("writing snapshot")?;

    println!("{}", "=== Ledger Initialized ===".bright_green().bold());
    println!("{} {}", "State:".bright_cyan(), state);
    println!("{} {}", "Admin:".bright_cyan(), admin);
    println!("{} {}", "Debt engine:".bright_cyan(), debt_engine);
    println!("{} {}", "Global ceiling:".bright_cyan(), ceiling);
    Ok(())
}
