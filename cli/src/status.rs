//! Read-only views over a snapshot.

use anyhow::Result;
use colored::Colorize;

use stasis_engine::Address;

use crate::util;

pub fn status(state: &str) -> Result<()> {
    let ledger = util::load(state)?;
    println!("{}", "=== Ledger Status ===".bright_green().bold());
    println!("{} {}", "Total debt value:".bright_cyan(), ledger.total_debt_value());
    println!(
        "{} {}",
        "Global ceiling:".bright_cyan(),
        ledger.total_debt_ceiling()
    );
    let bad_debt = ledger.system_bad_debt();
    if bad_debt.is_zero() {
        println!("{} {}", "System bad debt:".bright_cyan(), "0".green());
    } else {
        println!("{} {}", "System bad debt:".bright_cyan(), bad_debt.to_string().red().bold());
    }
    println!(
        "{} {}",
        "Debt engine surplus:".bright_cyan(),
        ledger.stablecoin_of(ledger.system_debt_engine())
    );
    println!("{} {}", "Pools:".bright_cyan(), ledger.pools().count());
    Ok(())
}

pub fn balances(state: &str, addr: Address) -> Result<()> {
    let ledger = util::load(state)?;
    println!("{}", format!("=== Balances: {addr} ===").bright_green().bold());
    println!("{} {}", "Stablecoin:".bright_cyan(), ledger.stablecoin_of(addr));
    let unbacked = ledger.unbacked_debt_of(addr);
    if !unbacked.is_zero() {
        println!("{} {}", "Unbacked debt:".bright_cyan(), unbacked);
    }
    let mut any = false;
    for (pool_id, _) in ledger.pools() {
        let free = ledger.collateral_of(*pool_id, addr);
        let position = ledger.position(*pool_id, addr);
        if free.is_zero() && position.is_zeroed() {
            continue;
        }
        any = true;
        println!(
            "{} free {} locked {} share {}",
            pool_id.to_string().bright_cyan(),
            free,
            position.locked_collateral,
            position.debt_share,
        );
    }
    if !any {
        println!("{}", "(no collateral)".dimmed());
    }
    Ok(())
}
