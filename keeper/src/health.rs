//! Health calculation for positions
//!
//! The keeper mirrors the ledger's safety check off to the side: health is
//! the gap between a position's risk-adjusted collateral value and its debt
//! value. Positions with a shortfall are liquidation candidates, ranked
//! deepest-underwater first.

use anyhow::Result;

use stasis_engine::{Address, Ledger, PoolId, Position, Rad, Wad};

/// One position's standing against the safety threshold.
#[derive(Debug, Clone)]
pub struct PositionHealth {
    pub pool_id: PoolId,
    pub owner: Address,
    /// `lockedCollateral × priceWithSafetyMargin` (RAD).
    pub collateral_value: Rad,
    /// `debtShare × debtAccumulatedRate` (RAD).
    pub debt_value: Rad,
    /// `debt − collateral` when underwater, zero otherwise.
    pub shortfall: Rad,
    /// `collateral − debt` when healthy, zero otherwise.
    pub buffer: Rad,
}

impl PositionHealth {
    pub fn is_liquidatable(&self) -> bool {
        !self.shortfall.is_zero()
    }
}

/// A position the keeper should move on, with a close-factor-sized repay
/// suggestion (the engine clamps it again regardless).
#[derive(Debug, Clone)]
pub struct LiquidationCandidate {
    pub pool_id: PoolId,
    pub owner: Address,
    pub shortfall: Rad,
    pub suggested_repay_share: Wad,
}

/// Compute health for one position against its pool's current rate and
/// safety-margin price.
pub fn position_health(
    ledger: &Ledger,
    pool_id: PoolId,
    owner: Address,
    position: &Position,
) -> Result<PositionHealth> {
    let pool = ledger.pool(pool_id)?;
    let collateral_value = position
        .locked_collateral
        .ray_value(pool.price_with_safety_margin);
    let debt_value = position.debt_share.ray_value(pool.debt_accumulated_rate);
    Ok(PositionHealth {
        pool_id,
        owner,
        collateral_value,
        debt_value,
        shortfall: debt_value.saturating_sub(collateral_value),
        buffer: collateral_value.saturating_sub(debt_value),
    })
}

/// Scan one pool for liquidatable positions, deepest shortfall first.
pub fn scan_pool(ledger: &Ledger, pool_id: PoolId) -> Result<Vec<LiquidationCandidate>> {
    let pool = ledger.pool(pool_id)?;
    let close_factor_bps = pool.params.close_factor_bps;

    let mut candidates = Vec::new();
    for (owner, position) in ledger.positions_in(pool_id) {
        let health = position_health(ledger, pool_id, *owner, position)?;
        if !health.is_liquidatable() {
            continue;
        }
        let suggested_repay_share = position
            .debt_share
            .scale_bps_floor(close_factor_bps)
            .unwrap_or(Wad::ZERO);
        candidates.push(LiquidationCandidate {
            pool_id,
            owner: *owner,
            shortfall: health.shortfall,
            suggested_repay_share,
        });
    }
    candidates.sort_by(|a, b| b.shortfall.cmp(&a.shortfall));
    Ok(candidates)
}

/// Scan every pool on the ledger.
pub fn scan_all(ledger: &Ledger) -> Result<Vec<LiquidationCandidate>> {
    let pool_ids: Vec<PoolId> = ledger.pools().map(|(id, _)| *id).collect();
    let mut all = Vec::new();
    for pool_id in pool_ids {
        all.extend(scan_pool(ledger, pool_id)?);
    }
    Ok(all)
}
