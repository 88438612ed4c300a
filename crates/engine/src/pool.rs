//! Collateral pool registry: per-pool risk parameters and aggregates.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{LedgerError, Result};
use crate::math::{Rad, Ray, Wad, BPS};
use crate::types::{Address, PoolId};

/// Static risk parameters supplied when a pool is registered.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolParams {
    /// Maximum total debt value for the pool (RAD).
    pub debt_ceiling: Rad,
    /// Minimum non-zero debt value per position (RAD, the dust threshold).
    pub debt_floor: Rad,
    /// Per-second compounding stability fee factor (RAY, at least 1.0).
    pub stability_fee_rate: Ray,
    /// Fraction of a position's debt share liquidatable per call (bps).
    pub close_factor_bps: u64,
    /// Collateral paid per unit of repaid debt value (bps, at least par).
    pub liquidator_incentive_bps: u64,
    /// Slice of the liquidator incentive routed to the treasury (bps).
    pub treasury_fee_bps: u64,
    /// Maximum accepted oracle price age in seconds.
    pub price_life_secs: u64,
    /// Custody adapter allowed to credit free collateral for this pool.
    pub adapter: Address,
    /// Liquidation strategy collaborator bound to this pool.
    pub liquidation_strategy: Address,
}

impl PoolParams {
    pub fn validate(&self) -> Result<()> {
        if self.close_factor_bps == 0 || self.close_factor_bps > BPS {
            return Err(LedgerError::InvalidPoolParams("close_factor_bps"));
        }
        if self.liquidator_incentive_bps < BPS {
            return Err(LedgerError::InvalidPoolParams(
                "liquidator_incentive_bps below par",
            ));
        }
        if self.treasury_fee_bps > BPS {
            return Err(LedgerError::InvalidPoolParams("treasury_fee_bps"));
        }
        if self.stability_fee_rate < Ray::ONE {
            return Err(LedgerError::InvalidPoolParams(
                "stability_fee_rate below 1.0",
            ));
        }
        if self.price_life_secs == 0 {
            return Err(LedgerError::InvalidPoolParams("price_life_secs"));
        }
        Ok(())
    }
}

/// A registered collateral pool: static parameters plus dynamic aggregates.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralPool {
    pub params: PoolParams,
    /// Oracle price already discounted by the pool's collateralization
    /// ratio (RAY). Zero until the first price update; nothing can be
    /// drawn against an unpriced pool.
    pub price_with_safety_margin: Ray,
    /// Cumulative debt rate multiplier (RAY), monotonically non-decreasing.
    pub debt_accumulated_rate: Ray,
    /// Sum of all positions' debt shares in the pool (WAD).
    pub total_debt_share: Wad,
    /// Timestamp of the last stability fee accrual.
    pub last_accrual_ts: u64,
    /// False once the pool has been caged.
    pub live: bool,
}

impl CollateralPool {
    fn new(params: PoolParams, now: u64) -> Self {
        CollateralPool {
            params,
            price_with_safety_margin: Ray::ZERO,
            debt_accumulated_rate: Ray::ONE,
            total_debt_share: Wad::ZERO,
            last_accrual_ts: now,
            live: true,
        }
    }

    /// Current total debt value of the pool (RAD).
    pub fn total_debt_value(&self) -> Rad {
        self.total_debt_share.ray_value(self.debt_accumulated_rate)
    }
}

/// All registered pools, keyed by pool id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolRegistry {
    pools: BTreeMap<PoolId, CollateralPool>,
}

impl PoolRegistry {
    pub fn create(&mut self, id: PoolId, params: PoolParams, now: u64) -> Result<()> {
        params.validate()?;
        if self.pools.contains_key(&id) {
            return Err(LedgerError::PoolAlreadyExists);
        }
        self.pools.insert(id, CollateralPool::new(params, now));
        Ok(())
    }

    pub fn get(&self, id: PoolId) -> Result<&CollateralPool> {
        self.pools.get(&id).ok_or(LedgerError::PoolNotFound)
    }

    pub(crate) fn get_mut(&mut self, id: PoolId) -> Result<&mut CollateralPool> {
        self.pools.get_mut(&id).ok_or(LedgerError::PoolNotFound)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PoolId, &CollateralPool)> {
        self.pools.iter()
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}
