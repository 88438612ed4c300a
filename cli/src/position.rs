//! Position subcommands.

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use stasis_engine::{Address, OwnerOnly, PoolId};

use crate::util;

#[derive(Subcommand)]
pub enum PositionCmd {
    /// Lock/free collateral and draw/repay debt in one adjustment
    Adjust {
        pool: PoolId,

        /// Signed collateral delta (WAD), e.g. "1.5" or "-0.5"
        #[arg(long, default_value = "0")]
        collateral: String,

        /// Signed debt-share delta (WAD)
        #[arg(long, default_value = "0")]
        debt: String,

        /// Position owner (defaults to the caller)
        #[arg(long)]
        owner: Option<Address>,

        /// Account whose free collateral funds the adjustment
        #[arg(long)]
        collateral_owner: Option<Address>,

        /// Account credited/debited with stablecoin
        #[arg(long)]
        recipient: Option<Address>,
    },

    /// Show one position
    Show { pool: PoolId, owner: Address },

    /// List all positions in a pool
    List { pool: PoolId },
}

pub fn run(state: &str, caller: Address, cmd: PositionCmd) -> Result<()> {
    match cmd {
        PositionCmd::Adjust {
            pool,
            collateral,
            debt,
            owner,
            collateral_owner,
            recipient,
        } => {
            let owner = owner.unwrap_or(caller);
            let collateral_owner = collateral_owner.unwrap_or(owner);
            let recipient = recipient.unwrap_or(owner);
            let delta_collateral = util::parse_signed_wad(&collateral)?;
            let delta_debt = util::parse_signed_wad(&debt)?;
            util::with_state(state, |ledger| {
                ledger.adjust_position(
                    caller,
                    &OwnerOnly,
                    pool,
                    owner,
                    collateral_owner,
                    recipient,
                    delta_collateral,
                    delta_debt,
                )?;
                let position = ledger.position(pool, owner);
                println!(
                    "{} {pool}/{owner}: locked {} share {}",
                    "Adjusted".bright_green(),
                    position.locked_collateral,
                    position.debt_share,
                );
                Ok(())
            })
        }
        PositionCmd::Show { pool, owner } => {
            let ledger = util::load(state)?;
            let position = ledger.position(pool, owner);
            let safe = ledger.is_position_safe(pool, owner)?;
            println!("{}", format!("=== {pool}/{owner} ===").bright_green().bold());
            println!("{} {}", "Locked:".bright_cyan(), position.locked_collateral);
            println!("{} {}", "Debt share:".bright_cyan(), position.debt_share);
            println!(
                "{} {}",
                "Safe:".bright_cyan(),
                if safe { "yes".green() } else { "NO".red().bold() }
            );
            Ok(())
        }
        PositionCmd::List { pool } => {
            let ledger = util::load(state)?;
            println!("{}", format!("=== Positions in {pool} ===").bright_green().bold());
            let mut count = 0;
            for (owner, position) in ledger.positions_in(pool) {
                count += 1;
                println!(
                    "{} locked {} share {}",
                    owner.to_string().bright_cyan(),
                    position.locked_collateral,
                    position.debt_share,
                );
            }
            if count == 0 {
                println!("{}", "(none)".dimmed());
            }
            Ok(())
        }
    }
}
