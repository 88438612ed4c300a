//! Stasis CLI - operate a ledger snapshot from the command line
//!
//! Every mutating subcommand loads the snapshot, applies one engine
//! operation as the `--caller` identity, and writes the snapshot back
//! atomically. The state file is the single-writer boundary: run one CLI
//! or keeper against a given snapshot at a time.

use clap::{Parser, Subcommand};

use stasis_engine::{Address, PoolId, Rad, Ray, Wad};

mod liquidation;
mod pool;
mod position;
mod status;
mod util;

#[derive(Parser)]
#[command(name = "stasis")]
#[command(about = "Stasis CDP ledger - pools, positions, liquidations", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the ledger snapshot file
    #[arg(short, long, default_value = "stasis.json")]
    state: String,

    /// Ledger identity to act as
    #[arg(short, long, default_value = "admin")]
    caller: Address,

    /// Override the wall clock (unix seconds) for accrual-sensitive ops
    #[arg(long)]
    now: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a fresh ledger snapshot
    Init {
        /// Global debt ceiling (RAD, decimal)
        #[arg(long, default_value = "1000000000")]
        ceiling: Rad,

        /// Admin identity
        #[arg(long, default_value = "admin")]
        admin: Address,

        /// System debt engine identity
        #[arg(long, default_value = "debt-engine")]
        debt_engine: Address,

        /// Liquidation engine identity (granted the engine role)
        #[arg(long, default_value = "liq-engine")]
        liquidation_engine: Address,

        /// Fee collector identity (granted the collector role)
        #[arg(long, default_value = "collector")]
        collector: Address,
    },

    /// Pool administration
    #[command(subcommand)]
    Pool(pool::PoolCmd),

    /// Position operations
    #[command(subcommand)]
    Position(position::PositionCmd),

    /// Credit free collateral through the pool's custody adapter
    AddCollateral {
        pool: PoolId,
        addr: Address,
        /// Signed WAD amount, e.g. "1.5" or "-0.25"
        amount: String,
    },

    /// Move free collateral between accounts
    MoveCollateral {
        pool: PoolId,
        from: Address,
        to: Address,
        amount: Wad,
    },

    /// Move internal stablecoin between accounts
    MoveStablecoin {
        from: Address,
        to: Address,
        amount: Rad,
    },

    /// Accrue the stability fee for a pool
    Collect { pool: PoolId },

    /// Liquidate an unsafe position (caller acts as liquidator)
    Liquidate {
        pool: PoolId,
        position: Address,
        /// Debt share to repay (WAD); saturates to the close-factor cap
        repay: Wad,
        /// Raw collateral price for seizure pricing (RAY)
        #[arg(long)]
        raw_price: Ray,
        /// Minimum collateral expected, else the call fails
        #[arg(long, default_value = "0")]
        min_collateral: Wad,
    },

    /// Show one account's balances
    Balances { addr: Address },

    /// Show global totals
    Status,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let now = util::resolve_now(cli.now)?;

    match cli.command {
        Commands::Init {
            ceiling,
            admin,
            debt_engine,
            liquidation_engine,
            collector,
        } => util::init_state(
            &cli.state,
            ceiling,
            admin,
            debt_engine,
            liquidation_engine,
            collector,
        ),
        Commands::Pool(cmd) => pool::run(&cli.state, cli.caller, now, cmd),
        Commands::Position(cmd) => position::run(&cli.state, cli.caller, cmd),
        Commands::AddCollateral { pool, addr, amount } => {
            let delta = util::parse_signed_wad(&amount)?;
            util::with_state(&cli.state, |ledger| {
                ledger.add_collateral(cli.caller, pool, addr, delta)?;
                println!("credited {} to {addr} in {pool}", amount);
                Ok(())
            })
        }
        Commands::MoveCollateral {
            pool,
            from,
            to,
            amount,
        } => util::with_state(&cli.state, |ledger| {
            ledger.move_collateral(cli.caller, &stasis_engine::OwnerOnly, pool, from, to, amount)?;
            println!("moved {amount} collateral {from} -> {to}");
            Ok(())
        }),
        Commands::MoveStablecoin { from, to, amount } => util::with_state(&cli.state, |ledger| {
            ledger.move_stablecoin(cli.caller, &stasis_engine::OwnerOnly, from, to, amount)?;
            println!("moved {amount} stablecoin {from} -> {to}");
            Ok(())
        }),
        Commands::Collect { pool } => liquidation::collect(&cli.state, now, pool),
        Commands::Liquidate {
            pool,
            position,
            repay,
            raw_price,
            min_collateral,
        } => liquidation::liquidate(
            &cli.state,
            cli.caller,
            now,
            pool,
            position,
            repay,
            raw_price,
            min_collateral,
        ),
        Commands::Balances { addr } => status::balances(&cli.state, addr),
        Commands::Status => status::status(&cli.state),
    }
}
