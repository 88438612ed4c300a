//! Liquidation of unsafe positions.
//!
//! The engine detects positions whose risk-adjusted collateral value no
//! longer covers their debt and resolves them through partial,
//! incentive-bearing seizures planned by a strategy object. A liquidator
//! may interleave a flash callback to turn the seized collateral into
//! repayment funds within the same call. Every call is atomic: all effects
//! are staged on a copy of the ledger and committed only once the
//! liquidator's repayment is in hand, so a failed callback leaves the
//! ledger bit-identical to its pre-call state.
//!
//! Positions too deep underwater for one close-factor-capped call return
//! above the safety threshold (or close entirely) over several independent
//! calls; each call re-evaluates the safety check from scratch.

use log::info;

use crate::accrual::StabilityFeeCollector;
use crate::error::{LedgerError, Result};
use crate::interfaces::{OwnerOnly, PriceOracle};
use crate::ledger::{Ledger, Position};
use crate::math::{Rad, Ray, Wad};
use crate::pool::CollateralPool;
use crate::types::{Address, PoolId};

// ============================================================================
// Collaborator seams
// ============================================================================

/// Everything a flash liquidator sees when its callback runs.
pub struct FlashContext<'a> {
    pub pool_id: PoolId,
    pub position: Address,
    pub liquidator: Address,
    /// Collateral already credited to the liquidator's free balance (WAD).
    pub collateral_received: Wad,
    /// Stablecoin value that must sit on the liquidator's balance when the
    /// callback returns (RAD).
    pub debt_value_owed: Rad,
    /// Opaque bytes passed through from the liquidate call.
    pub data: &'a [u8],
}

/// Synchronous flash-liquidation callback.
///
/// Invoked against the staged ledger after the seized collateral has been
/// credited to the liquidator. If the callback errs, or returns without the
/// liquidator holding at least `debt_value_owed`, the entire liquidation
/// reverts.
pub trait FlashLiquidator {
    fn on_flash_liquidation(&mut self, ledger: &mut Ledger, ctx: FlashContext<'_>) -> Result<()>;
}

/// How a single liquidation call will settle, computed before any state is
/// touched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LiquidationPlan {
    /// Debt share removed from the position (WAD).
    pub debt_share_to_repay: Wad,
    /// Stablecoin value the liquidator must deliver (RAD).
    pub debt_value_to_repay: Rad,
    /// Collateral leaving the position (WAD).
    pub collateral_to_seize: Wad,
    /// Seized collateral net of the treasury fee (WAD).
    pub liquidator_collateral: Wad,
    /// Treasury's slice of the incentive spread (WAD).
    pub treasury_fee: Wad,
    /// Shortfall booked as system bad debt (RAD).
    pub bad_debt_value: Rad,
    /// True when the position's entire debt share is removed.
    pub full_liquidation: bool,
}

/// Pluggable liquidation policy: given an unsafe position and a validated
/// raw collateral price, decide how much debt is repaid and how the seized
/// collateral is split.
pub trait LiquidationStrategy {
    fn plan(
        &self,
        pool: &CollateralPool,
        position: &Position,
        raw_price: Ray,
        requested_share: Wad,
    ) -> Result<LiquidationPlan>;
}

// ============================================================================
// Fixed-spread strategy
// ============================================================================

/// Auction-free pricing: the liquidator buys collateral at the oracle price
/// plus a fixed spread (`liquidator_incentive_bps`), capped per call by the
/// pool's close factor.
pub struct FixedSpreadStrategy;

impl FixedSpreadStrategy {
    /// Collateral bought by `value` of debt at `price` with the incentive
    /// spread applied, rounding down.
    fn collateral_for(
        value: Rad,
        incentive_bps: u64,
        price: Ray,
    ) -> Result<Wad> {
        value.scale_bps_floor(incentive_bps)?.div_ray_floor(price)
    }
}

impl LiquidationStrategy for FixedSpreadStrategy {
    fn plan(
        &self,
        pool: &CollateralPool,
        position: &Position,
        raw_price: Ray,
        requested_share: Wad,
    ) -> Result<LiquidationPlan> {
        if raw_price.is_zero() {
            return Err(LedgerError::InvalidPrice);
        }
        let rate = pool.debt_accumulated_rate;
        let incentive_bps = pool.params.liquidator_incentive_bps;

        // Close-factor clamp. An oversized request (e.g. "repay everything")
        // saturates to the cap instead of failing.
        let capped_share = position
            .debt_share
            .scale_bps_floor(pool.params.close_factor_bps)?;
        let mut share = requested_share.min(capped_share);
        let mut value = share.ray_value(rate);
        let mut seize = Self::collateral_for(value, incentive_bps, raw_price)?;

        // Cap the seizure at what is actually locked, scaling the repayment
        // down proportionally. The uncovered remainder of the debt becomes
        // bad debt below.
        if seize > position.locked_collateral {
            seize = position.locked_collateral;
            value = seize.ray_value(raw_price).unscale_bps_floor(incentive_bps)?;
            share = value.div_ray_floor(rate)?;
        }

        let mut bad_debt = Rad::zero();
        let mut full_liquidation = false;
        let remaining_share = position.debt_share.checked_sub(share)?;
        let remaining_collateral = position.locked_collateral.checked_sub(seize)?;
        if remaining_share.is_zero() {
            full_liquidation = true;
        } else if remaining_collateral.is_zero()
            || remaining_share.ray_value(rate) < pool.params.debt_floor
        {
            // Dust-avoidance override: close the whole position, close
            // factor notwithstanding. Whatever the capped seizure cannot
            // cover is recorded as system bad debt.
            full_liquidation = true;
            share = position.debt_share;
            let full_value = share.ray_value(rate);
            let full_seize = Self::collateral_for(full_value, incentive_bps, raw_price)?;
            if full_seize > position.locked_collateral {
                seize = position.locked_collateral;
                value = seize.ray_value(raw_price).unscale_bps_floor(incentive_bps)?;
            } else {
                seize = full_seize;
                value = full_value;
            }
            bad_debt = full_value.checked_sub(value)?;
        }

        if share.is_zero() || seize.is_zero() {
            return Err(LedgerError::ZeroLiquidationAmount);
        }

        // Split the spread above par between liquidator and treasury.
        let par_collateral = seize.unscale_bps_floor(incentive_bps)?;
        let incentive = seize.checked_sub(par_collateral)?;
        let treasury_fee = incentive.scale_bps_floor(pool.params.treasury_fee_bps)?;
        let liquidator_collateral = seize.checked_sub(treasury_fee)?;

        Ok(LiquidationPlan {
            debt_share_to_repay: share,
            debt_value_to_repay: value,
            collateral_to_seize: seize,
            liquidator_collateral,
            treasury_fee,
            bad_debt_value: bad_debt,
            full_liquidation,
        })
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Settlement summary returned by a successful liquidation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LiquidationReceipt {
    pub pool_id: PoolId,
    pub position: Address,
    pub liquidator: Address,
    pub debt_share_repaid: Wad,
    pub debt_value_repaid: Rad,
    pub collateral_seized: Wad,
    pub liquidator_collateral: Wad,
    pub treasury_fee: Wad,
    pub bad_debt: Rad,
    pub full_liquidation: bool,
}

/// Orchestrates liquidations. `address` must hold the liquidation-engine
/// role on the ledger; the embedded collector must hold the fee-collector
/// role so debt is fresh at the safety check.
pub struct LiquidationEngine {
    address: Address,
    treasury: Address,
    collector: StabilityFeeCollector,
}

impl LiquidationEngine {
    pub fn new(address: Address, treasury: Address, collector: StabilityFeeCollector) -> Self {
        LiquidationEngine {
            address,
            treasury,
            collector,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Liquidate `position_addr` in `pool_id`, repaying up to
    /// `debt_share_to_repay` of its debt share on the liquidator's behalf.
    ///
    /// The liquidator must end the call holding the covered debt value in
    /// internal stablecoin — either pre-funded or produced by `callback`
    /// from the seized collateral. On any failure the ledger is untouched.
    #[allow(clippy::too_many_arguments)]
    pub fn liquidate(
        &self,
        ledger: &mut Ledger,
        oracle: &dyn PriceOracle,
        strategy: &dyn LiquidationStrategy,
        mut callback: Option<&mut dyn FlashLiquidator>,
        now: u64,
        pool_id: PoolId,
        position_addr: Address,
        debt_share_to_repay: Wad,
        min_collateral_expected: Wad,
        liquidator: Address,
        data: &[u8],
    ) -> Result<LiquidationReceipt> {
        // Stage everything on a copy; commit only on success.
        let mut staged = ledger.clone();

        // Debt must be current before the safety check.
        self.collector.collect(&mut staged, pool_id, now)?;

        let pool = staged.pool(pool_id)?.clone();
        if !pool.live {
            return Err(LedgerError::PoolNotLive);
        }
        let price = oracle.pool_price(pool_id)?;
        if !price.ok || price.age_secs > pool.params.price_life_secs || price.raw.is_zero() {
            return Err(LedgerError::InvalidPrice);
        }

        let position = staged.position(pool_id, position_addr);
        let collateral_value = position
            .locked_collateral
            .ray_value(pool.price_with_safety_margin);
        let debt_value = position.debt_share.ray_value(pool.debt_accumulated_rate);
        if collateral_value >= debt_value {
            return Err(LedgerError::PositionIsSafe);
        }

        let plan = strategy.plan(&pool, &position, price.raw, debt_share_to_repay)?;
        if plan.liquidator_collateral < min_collateral_expected {
            return Err(LedgerError::CollateralBelowMinimum);
        }

        // Seize: collateral to the engine, debt and shortfall off the books.
        let delta_collateral = to_negative_delta(plan.collateral_to_seize)?;
        let delta_debt_share = to_negative_delta(plan.debt_share_to_repay)?;
        staged.confiscate_position(
            self.address,
            pool_id,
            position_addr,
            self.address,
            delta_collateral,
            delta_debt_share,
            plan.bad_debt_value,
        )?;

        // Distribute: spread to the liquidator, fee slice to the treasury.
        staged.move_collateral(
            self.address,
            &OwnerOnly,
            pool_id,
            self.address,
            liquidator,
            plan.liquidator_collateral,
        )?;
        if !plan.treasury_fee.is_zero() {
            staged.move_collateral(
                self.address,
                &OwnerOnly,
                pool_id,
                self.address,
                self.treasury,
                plan.treasury_fee,
            )?;
        }

        // Optional flash financing: the callback may swap the seized
        // collateral for repayment funds before settlement.
        if let Some(flash) = callback.as_deref_mut() {
            flash.on_flash_liquidation(
                &mut staged,
                FlashContext {
                    pool_id,
                    position: position_addr,
                    liquidator,
                    collateral_received: plan.liquidator_collateral,
                    debt_value_owed: plan.debt_value_to_repay,
                    data,
                },
            )?;
        }

        // Settlement: pull the covered debt value into the debt engine.
        if staged.stablecoin_of(liquidator) < plan.debt_value_to_repay {
            return Err(LedgerError::InsufficientFunds);
        }
        let debt_engine = staged.system_debt_engine();
        staged.move_stablecoin(
            liquidator,
            &OwnerOnly,
            liquidator,
            debt_engine,
            plan.debt_value_to_repay,
        )?;

        let receipt = LiquidationReceipt {
            pool_id,
            position: position_addr,
            liquidator,
            debt_share_repaid: plan.debt_share_to_repay,
            debt_value_repaid: plan.debt_value_to_repay,
            collateral_seized: plan.collateral_to_seize,
            liquidator_collateral: plan.liquidator_collateral,
            treasury_fee: plan.treasury_fee,
            bad_debt: plan.bad_debt_value,
            full_liquidation: plan.full_liquidation,
        };
        info!(
            "liquidated {pool_id}/{position_addr}: repaid {} seized {} badDebt {}{}",
            receipt.debt_value_repaid,
            receipt.collateral_seized,
            receipt.bad_debt,
            if receipt.full_liquidation { " (full)" } else { "" },
        );
        *ledger = staged;
        Ok(receipt)
    }
}

fn to_negative_delta(amount: Wad) -> Result<i128> {
    let magnitude = i128::try_from(amount.0).map_err(|_| LedgerError::Overflow)?;
    Ok(-magnitude)
}
