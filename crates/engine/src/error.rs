//! Error taxonomy for ledger and liquidation operations.

use thiserror::Error;

/// Errors surfaced by the ledger and the liquidation engine.
///
/// Every guard failure aborts the whole call before any state is written.
/// `PositionIsSafe` and `InvalidPrice` are expected, recoverable conditions
/// a liquidator bot should treat as "try again later". Bad debt is never an
/// error; it is recorded in the ledger. The core never retries anything.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// No pool registered under the given id.
    #[error("collateral pool not found")]
    PoolNotFound,

    /// A pool with this id already exists.
    #[error("collateral pool already exists")]
    PoolAlreadyExists,

    /// The pool has been caged.
    #[error("collateral pool is not live")]
    PoolNotLive,

    /// Pool parameter outside its permitted range.
    #[error("invalid pool parameter: {0}")]
    InvalidPoolParams(&'static str),

    /// Caller lacks the role or delegation the operation requires.
    #[error("caller is not authorized")]
    NotAuthorized,

    /// The adjustment would leave the position undercollateralized.
    #[error("position would be unsafe")]
    PositionUnsafe,

    /// The pool's debt ceiling would be exceeded.
    #[error("pool debt ceiling exceeded")]
    PoolCeilingExceeded,

    /// The global debt ceiling would be exceeded.
    #[error("global debt ceiling exceeded")]
    GlobalCeilingExceeded,

    /// Non-zero debt would fall below the pool's dust threshold.
    #[error("position debt below pool floor")]
    DebtFloorViolated,

    /// A balance or position field would underflow.
    #[error("insufficient balance")]
    InsufficientBalance,

    /// Arithmetic overflow or division by zero.
    #[error("arithmetic overflow")]
    Overflow,

    /// Accrual timestamp precedes the pool's last accrual.
    #[error("timestamp precedes last accrual")]
    InvalidTimestamp,

    /// Liquidation requested on a safe position.
    #[error("position is safe")]
    PositionIsSafe,

    /// Oracle price is stale, flagged unusable, or zero.
    #[error("invalid or stale oracle price")]
    InvalidPrice,

    /// Liquidator (or its flash callback) failed to deliver repayment funds.
    #[error("liquidator did not deliver repayment funds")]
    InsufficientFunds,

    /// Seized collateral fell below the liquidator's requested minimum.
    #[error("seized collateral below requested minimum")]
    CollateralBelowMinimum,

    /// Liquidation amounts round to zero.
    #[error("liquidation amounts round to zero")]
    ZeroLiquidationAmount,
}

pub type Result<T> = core::result::Result<T, LedgerError>;
