//! Liquidation keeper: watches ledger snapshots for unsafe positions and
//! resolves them through the liquidation engine.
//!
//! Retry policy lives here, not in the core: `PositionIsSafe` and
//! `InvalidPrice` mean "try again later", everything else is reported and
//! skipped until the next round.

pub mod feed;
pub mod health;

pub use feed::PriceFeedFile;
pub use health::{scan_all, scan_pool, LiquidationCandidate, PositionHealth};
