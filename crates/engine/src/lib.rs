//! Collateralized-debt-position ledger and liquidation engine.
//!
//! Users lock collateral into per-pool positions and mint an internal
//! stablecoin against it. The ledger guarantees that outstanding debt never
//! exceeds the risk-adjusted value of posted collateral, across independent
//! collateral pools, under continuous stability-fee accrual. Positions that
//! fall below the safety threshold are resolved by the liquidation engine
//! through partial, incentive-bearing, optionally flash-financed seizures,
//! with any uncovered shortfall tracked as system bad debt.
//!
//! All accounting runs on three fixed-point scales: WAD (1e18) for token
//! amounts and debt shares, RAY (1e27) for rates and prices, RAD (1e45) for
//! absolute debt value. See [`math`].
//!
//! The engine is synchronous and single-writer: ceiling and safety guards
//! are read-modify-write across shared aggregates, so hosts must serialize
//! mutating calls. [`service::SharedLedger`] provides that discipline.

#[cfg(kani)]
extern crate kani;

pub mod accrual;
pub mod error;
pub mod interfaces;
pub mod ledger;
pub mod liquidation;
pub mod math;
pub mod pool;
pub mod service;
pub mod types;

pub use accrual::StabilityFeeCollector;
pub use error::{LedgerError, Result};
pub use interfaces::{
    Allowlist, OwnerOnly, PoolPrice, PositionAuthorizer, PriceOracle, TableOracle,
};
pub use ledger::{Ledger, Position};
pub use liquidation::{
    FixedSpreadStrategy, FlashContext, FlashLiquidator, LiquidationEngine, LiquidationPlan,
    LiquidationReceipt, LiquidationStrategy,
};
pub use math::{Rad, Ray, Wad, BPS, RAY, WAD};
pub use pool::{CollateralPool, PoolParams, PoolRegistry};
pub use service::{SharedLedger, SnapshotStore};
pub use types::{Address, PoolId, Role, RoleTable};
