//! Stability fee accrual.
//!
//! Each pool carries a per-second compounding fee factor. `collect`
//! advances the pool's cumulative debt rate over the elapsed wall-clock
//! window and feeds the accrued fee into the ledger as stablecoin surplus
//! for the system debt engine, without touching any position's share.
//!
//! Collection is permissionless and idempotent within a timestamp. Callers
//! that read a pool's debt value without collecting first see a stale,
//! slightly understated value — a documented staleness window, not a
//! correctness bug. The liquidation engine always collects before its
//! safety check.

use log::debug;

use crate::error::{LedgerError, Result};
use crate::ledger::Ledger;
use crate::math::Ray;
use crate::types::{Address, PoolId};

/// Advances pool rates. The address must hold the fee-collector role on the
/// ledger it collects into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StabilityFeeCollector {
    address: Address,
}

impl StabilityFeeCollector {
    pub fn new(address: Address) -> Self {
        StabilityFeeCollector { address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Compound `pool_id`'s rate up to `now` and credit the accrued fee to
    /// the system debt engine. Returns the pool's rate after collection.
    pub fn collect(&self, ledger: &mut Ledger, pool_id: PoolId, now: u64) -> Result<Ray> {
        let pool = ledger.pool(pool_id)?;
        if now < pool.last_accrual_ts {
            return Err(LedgerError::InvalidTimestamp);
        }
        let elapsed = now - pool.last_accrual_ts;
        let old_rate = pool.debt_accumulated_rate;
        if elapsed == 0 {
            return Ok(old_rate);
        }

        let multiplier = pool.params.stability_fee_rate.rpow(elapsed)?;
        let new_rate = old_rate.rmul_floor(multiplier)?;
        // The fee factor is at least 1.0, so the rate never decreases.
        let rate_delta = new_rate.checked_sub(old_rate)?;

        let recipient = ledger.system_debt_engine();
        let fee_value =
            ledger.accrue_stability_fee(self.address, pool_id, recipient, rate_delta, now)?;
        debug!("collect {pool_id}: {elapsed}s rate {old_rate} -> {new_rate} fee {fee_value}");
        Ok(new_rate)
    }
}
