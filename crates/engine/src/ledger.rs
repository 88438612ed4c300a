//! The authoritative bookkeeping engine.
//!
//! Tracks locked collateral and debt shares per position, free collateral
//! and internal stablecoin balances per account, per-pool aggregates, and
//! the system-wide bad-debt counter. Every mutating operation validates all
//! of its guards before touching any state, so a failed call leaves the
//! ledger untouched.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{LedgerError, Result};
use crate::interfaces::{PositionAuthorizer, PriceOracle};
use crate::math::{Rad, Ray, Wad};
use crate::pool::{CollateralPool, PoolParams, PoolRegistry};
use crate::types::{Address, PoolId, Role, RoleTable};

/// A collateralized debt position.
///
/// `debt_share` is a share of the pool's debt, not a raw value; the actual
/// debt value is `debt_share × debt_accumulated_rate` (RAD). Positions are
/// created implicitly on first adjustment and destroyed when both fields
/// reach zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Collateral locked behind the position (WAD).
    pub locked_collateral: Wad,
    /// Share of the pool's debt (WAD).
    pub debt_share: Wad,
}

impl Position {
    pub fn is_zeroed(&self) -> bool {
        self.locked_collateral.is_zero() && self.debt_share.is_zero()
    }
}

/// The ledger: pool registry, positions, free balances, global counters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    pools: PoolRegistry,
    /// pool → owner → position.
    positions: BTreeMap<PoolId, BTreeMap<Address, Position>>,
    /// pool → account → unlocked collateral (WAD).
    collateral: BTreeMap<PoolId, BTreeMap<Address, Wad>>,
    /// account → internal stablecoin balance (RAD).
    stablecoin: BTreeMap<Address, Rad>,
    /// account → unbacked debt bookkeeping (RAD).
    unbacked_debt: BTreeMap<Address, Rad>,
    /// Sum of `debt_share × rate` across all pools (RAD).
    total_debt_value: Rad,
    /// Global debt ceiling (RAD).
    total_debt_ceiling: Rad,
    /// Accumulated shortfall not covered by seized collateral (RAD).
    system_bad_debt: Rad,
    /// Sink account for stability fee surplus and bad debt.
    system_debt_engine: Address,
    roles: RoleTable,
}

impl Ledger {
    /// Fresh ledger. `admin` receives the admin role; `system_debt_engine`
    /// is the collaborator account fee surplus and bad debt are booked to.
    pub fn new(admin: Address, system_debt_engine: Address, total_debt_ceiling: Rad) -> Self {
        let mut roles = RoleTable::default();
        roles.grant(admin, Role::Admin);
        Ledger {
            pools: PoolRegistry::default(),
            positions: BTreeMap::new(),
            collateral: BTreeMap::new(),
            stablecoin: BTreeMap::new(),
            unbacked_debt: BTreeMap::new(),
            total_debt_value: Rad::zero(),
            total_debt_ceiling,
            system_bad_debt: Rad::zero(),
            system_debt_engine,
            roles,
        }
    }

    // ========================================================================
    // Views
    // ========================================================================

    pub fn pool(&self, pool_id: PoolId) -> Result<&CollateralPool> {
        self.pools.get(pool_id)
    }

    pub fn pools(&self) -> impl Iterator<Item = (&PoolId, &CollateralPool)> {
        self.pools.iter()
    }

    pub fn position(&self, pool_id: PoolId, owner: Address) -> Position {
        self.positions
            .get(&pool_id)
            .and_then(|m| m.get(&owner))
            .copied()
            .unwrap_or_default()
    }

    /// All open positions in a pool.
    pub fn positions_in(&self, pool_id: PoolId) -> impl Iterator<Item = (&Address, &Position)> {
        self.positions
            .get(&pool_id)
            .into_iter()
            .flat_map(|m| m.iter())
    }

    pub fn collateral_of(&self, pool_id: PoolId, addr: Address) -> Wad {
        self.collateral
            .get(&pool_id)
            .and_then(|m| m.get(&addr))
            .copied()
            .unwrap_or(Wad::ZERO)
    }

    pub fn stablecoin_of(&self, addr: Address) -> Rad {
        self.stablecoin.get(&addr).copied().unwrap_or(Rad::zero())
    }

    pub fn unbacked_debt_of(&self, addr: Address) -> Rad {
        self.unbacked_debt
            .get(&addr)
            .copied()
            .unwrap_or(Rad::zero())
    }

    pub fn total_debt_value(&self) -> Rad {
        self.total_debt_value
    }

    pub fn total_debt_ceiling(&self) -> Rad {
        self.total_debt_ceiling
    }

    pub fn system_bad_debt(&self) -> Rad {
        self.system_bad_debt
    }

    pub fn system_debt_engine(&self) -> Address {
        self.system_debt_engine
    }

    pub fn has_role(&self, addr: Address, role: Role) -> bool {
        self.roles.has(addr, role)
    }

    /// Does the position satisfy `locked × priceWithSafetyMargin ≥ debt`?
    pub fn is_position_safe(&self, pool_id: PoolId, owner: Address) -> Result<bool> {
        let pool = self.pools.get(pool_id)?;
        let position = self.position(pool_id, owner);
        let collateral_value = position
            .locked_collateral
            .ray_value(pool.price_with_safety_margin);
        let debt_value = position.debt_share.ray_value(pool.debt_accumulated_rate);
        Ok(collateral_value >= debt_value)
    }

    // ========================================================================
    // Administration
    // ========================================================================

    fn require_admin(&self, caller: Address) -> Result<()> {
        if self.roles.has(caller, Role::Admin) {
            Ok(())
        } else {
            Err(LedgerError::NotAuthorized)
        }
    }

    pub fn grant_role(&mut self, caller: Address, addr: Address, role: Role) -> Result<()> {
        self.require_admin(caller)?;
        self.roles.grant(addr, role);
        Ok(())
    }

    pub fn revoke_role(&mut self, caller: Address, addr: Address, role: Role) -> Result<()> {
        self.require_admin(caller)?;
        self.roles.revoke(addr, role);
        Ok(())
    }

    pub fn create_pool(
        &mut self,
        caller: Address,
        pool_id: PoolId,
        params: PoolParams,
        now: u64,
    ) -> Result<()> {
        self.require_admin(caller)?;
        self.pools.create(pool_id, params, now)?;
        info!("pool {pool_id} created");
        Ok(())
    }

    /// Cage a pool: no further risk-increasing adjustments or accrual.
    pub fn cage_pool(&mut self, caller: Address, pool_id: PoolId) -> Result<()> {
        self.require_admin(caller)?;
        self.pools.get_mut(pool_id)?.live = false;
        info!("pool {pool_id} caged");
        Ok(())
    }

    pub fn set_total_debt_ceiling(&mut self, caller: Address, ceiling: Rad) -> Result<()> {
        self.require_admin(caller)?;
        self.total_debt_ceiling = ceiling;
        Ok(())
    }

    pub fn set_debt_ceiling(&mut self, caller: Address, pool_id: PoolId, ceiling: Rad) -> Result<()> {
        self.require_admin(caller)?;
        self.pools.get_mut(pool_id)?.params.debt_ceiling = ceiling;
        Ok(())
    }

    pub fn set_debt_floor(&mut self, caller: Address, pool_id: PoolId, floor: Rad) -> Result<()> {
        self.require_admin(caller)?;
        self.pools.get_mut(pool_id)?.params.debt_floor = floor;
        Ok(())
    }

    /// Change the per-second fee factor. Collect the pool first: the new
    /// factor applies to the whole window since the last accrual.
    pub fn set_stability_fee_rate(
        &mut self,
        caller: Address,
        pool_id: PoolId,
        rate: Ray,
    ) -> Result<()> {
        self.require_admin(caller)?;
        if rate < Ray::ONE {
            return Err(LedgerError::InvalidPoolParams("stability_fee_rate below 1.0"));
        }
        self.pools.get_mut(pool_id)?.params.stability_fee_rate = rate;
        Ok(())
    }

    /// Direct price write, for hosts that run their own oracle pipeline.
    pub fn set_price_with_safety_margin(
        &mut self,
        caller: Address,
        pool_id: PoolId,
        price: Ray,
    ) -> Result<()> {
        self.require_admin(caller)?;
        self.pools.get_mut(pool_id)?.price_with_safety_margin = price;
        debug!("pool {pool_id} safety price set to {price}");
        Ok(())
    }

    /// Pull a fresh safety-margin price from the oracle. Permissionless;
    /// fails closed on flagged, zero, or expired observations.
    pub fn poke_price(&mut self, oracle: &dyn PriceOracle, pool_id: PoolId) -> Result<Ray> {
        let price_life = self.pools.get(pool_id)?.params.price_life_secs;
        let observed = oracle.pool_price(pool_id)?;
        if !observed.ok || observed.age_secs > price_life || observed.with_safety_margin.is_zero() {
            return Err(LedgerError::InvalidPrice);
        }
        self.pools.get_mut(pool_id)?.price_with_safety_margin = observed.with_safety_margin;
        debug!(
            "pool {pool_id} safety price poked to {}",
            observed.with_safety_margin
        );
        Ok(observed.with_safety_margin)
    }

    // ========================================================================
    // Free balances
    // ========================================================================

    /// Custody-adapter hook: credit or debit an account's free collateral.
    /// Only the pool's registered adapter may call this.
    pub fn add_collateral(
        &mut self,
        caller: Address,
        pool_id: PoolId,
        addr: Address,
        delta: i128,
    ) -> Result<()> {
        let pool = self.pools.get(pool_id)?;
        if caller != pool.params.adapter {
            return Err(LedgerError::NotAuthorized);
        }
        let balance = self.collateral_of(pool_id, addr).checked_add_signed(delta)?;
        self.set_collateral(pool_id, addr, balance);
        Ok(())
    }

    /// Transfer free collateral between accounts within a pool.
    pub fn move_collateral(
        &mut self,
        caller: Address,
        authorizer: &dyn PositionAuthorizer,
        pool_id: PoolId,
        from: Address,
        to: Address,
        amount: Wad,
    ) -> Result<()> {
        self.pools.get(pool_id)?;
        if caller != from && !authorizer.is_balance_delegate(from, caller) {
            return Err(LedgerError::NotAuthorized);
        }
        let debited = self.collateral_of(pool_id, from).checked_sub(amount)?;
        if from == to {
            return Ok(());
        }
        let credited = self.collateral_of(pool_id, to).checked_add(amount)?;
        self.set_collateral(pool_id, from, debited);
        self.set_collateral(pool_id, to, credited);
        Ok(())
    }

    /// Transfer internal stablecoin between accounts.
    pub fn move_stablecoin(
        &mut self,
        caller: Address,
        authorizer: &dyn PositionAuthorizer,
        from: Address,
        to: Address,
        amount: Rad,
    ) -> Result<()> {
        if caller != from && !authorizer.is_balance_delegate(from, caller) {
            return Err(LedgerError::NotAuthorized);
        }
        let debited = self.stablecoin_of(from).checked_sub(amount)?;
        if from == to {
            return Ok(());
        }
        let credited = self.stablecoin_of(to).checked_add(amount)?;
        self.set_stablecoin(from, debited);
        self.set_stablecoin(to, credited);
        Ok(())
    }

    // ========================================================================
    // Position adjustment
    // ========================================================================

    /// Adjust a position by signed collateral and debt-share deltas.
    ///
    /// Collateral moves against `collateral_owner`'s free balance; the debt
    /// value of the share delta moves against `stablecoin_recipient`'s
    /// internal stablecoin balance. Guards are checked in a fixed order,
    /// each failing with its own error, and nothing is written unless all
    /// of them pass.
    #[allow(clippy::too_many_arguments)]
    pub fn adjust_position(
        &mut self,
        caller: Address,
        authorizer: &dyn PositionAuthorizer,
        pool_id: PoolId,
        position_owner: Address,
        collateral_owner: Address,
        stablecoin_recipient: Address,
        delta_collateral: i128,
        delta_debt_share: i128,
    ) -> Result<()> {
        let pool = self.pools.get(pool_id)?;
        // (a) pool must be live
        if !pool.live {
            return Err(LedgerError::PoolNotLive);
        }
        let rate = pool.debt_accumulated_rate;
        let safety_price = pool.price_with_safety_margin;
        let pool_ceiling = pool.params.debt_ceiling;
        let debt_floor = pool.params.debt_floor;
        let pool_total_share = pool.total_debt_share;

        let position = self.position(pool_id, position_owner);
        let new_locked = position.locked_collateral.checked_add_signed(delta_collateral)?;
        let new_share = position.debt_share.checked_add_signed(delta_debt_share)?;
        let new_total_share = pool_total_share.checked_add_signed(delta_debt_share)?;
        let new_debt_value = new_share.ray_value(rate);

        // The share × rate product is exact, so the stablecoin leg moves the
        // precise debt value with no rounding in either direction.
        let delta_value = Wad(delta_debt_share.unsigned_abs()).ray_value(rate);
        let new_total_debt_value = if delta_debt_share >= 0 {
            self.total_debt_value.checked_add(delta_value)?
        } else {
            self.total_debt_value.checked_sub(delta_value)?
        };

        if delta_debt_share > 0 {
            // (b) the resulting position must stay safe
            if new_locked.ray_value(safety_price) < new_debt_value {
                return Err(LedgerError::PositionUnsafe);
            }
            // (c) pool and global ceilings
            if new_total_share.ray_value(rate) > pool_ceiling {
                return Err(LedgerError::PoolCeilingExceeded);
            }
            if new_total_debt_value > self.total_debt_ceiling {
                return Err(LedgerError::GlobalCeilingExceeded);
            }
        }
        // (d) non-zero debt must clear the dust floor
        if !new_share.is_zero() && new_debt_value < debt_floor {
            return Err(LedgerError::DebtFloorViolated);
        }
        // (e) consent: risk-increasing changes need the position owner,
        // taking collateral in needs its source, repaying needs the payer
        if (delta_collateral < 0 || delta_debt_share > 0)
            && caller != position_owner
            && !authorizer.is_authorized(pool_id, position_owner, caller)
        {
            return Err(LedgerError::NotAuthorized);
        }
        if delta_collateral > 0
            && caller != collateral_owner
            && !authorizer.is_balance_delegate(collateral_owner, caller)
        {
            return Err(LedgerError::NotAuthorized);
        }
        if delta_debt_share < 0
            && caller != stablecoin_recipient
            && !authorizer.is_balance_delegate(stablecoin_recipient, caller)
        {
            return Err(LedgerError::NotAuthorized);
        }

        // Free-balance legs, still fallible, still before any write.
        let neg_delta_collateral = delta_collateral.checked_neg().ok_or(LedgerError::Overflow)?;
        let new_collateral_balance = self
            .collateral_of(pool_id, collateral_owner)
            .checked_add_signed(neg_delta_collateral)?;
        let stablecoin_balance = self.stablecoin_of(stablecoin_recipient);
        let new_stablecoin_balance = if delta_debt_share >= 0 {
            stablecoin_balance.checked_add(delta_value)?
        } else {
            stablecoin_balance.checked_sub(delta_value)?
        };

        // Commit.
        self.set_collateral(pool_id, collateral_owner, new_collateral_balance);
        self.set_stablecoin(stablecoin_recipient, new_stablecoin_balance);
        self.total_debt_value = new_total_debt_value;
        self.pools.get_mut(pool_id)?.total_debt_share = new_total_share;
        self.put_position(
            pool_id,
            position_owner,
            Position {
                locked_collateral: new_locked,
                debt_share: new_share,
            },
        );
        debug!(
            "adjust {pool_id}/{position_owner}: dC={delta_collateral} dS={delta_debt_share} \
             locked={new_locked} share={new_share}"
        );
        Ok(())
    }

    // ========================================================================
    // Privileged operations
    // ========================================================================

    /// Forcibly remove collateral and debt from a position, crediting the
    /// seized collateral to `collateral_recipient`'s free balance and any
    /// uncovered shortfall to the system bad-debt account.
    ///
    /// Reserved for the liquidation engine (and the settlement
    /// collaborator). Bypasses the safety guard by design; the share still
    /// cannot go negative and collateral removed cannot exceed what is
    /// locked.
    #[allow(clippy::too_many_arguments)]
    pub fn confiscate_position(
        &mut self,
        caller: Address,
        pool_id: PoolId,
        position_addr: Address,
        collateral_recipient: Address,
        delta_collateral: i128,
        delta_debt_share: i128,
        bad_debt_delta: Rad,
    ) -> Result<()> {
        if !self.roles.has(caller, Role::LiquidationEngine) {
            return Err(LedgerError::NotAuthorized);
        }
        let pool = self.pools.get(pool_id)?;
        let rate = pool.debt_accumulated_rate;
        let pool_total_share = pool.total_debt_share;

        let position = self.position(pool_id, position_addr);
        let new_locked = position.locked_collateral.checked_add_signed(delta_collateral)?;
        let new_share = position.debt_share.checked_add_signed(delta_debt_share)?;
        let new_total_share = pool_total_share.checked_add_signed(delta_debt_share)?;

        let neg_delta_collateral = delta_collateral.checked_neg().ok_or(LedgerError::Overflow)?;
        let new_recipient_balance = self
            .collateral_of(pool_id, collateral_recipient)
            .checked_add_signed(neg_delta_collateral)?;

        let delta_value = Wad(delta_debt_share.unsigned_abs()).ray_value(rate);
        let new_total_debt_value = if delta_debt_share >= 0 {
            self.total_debt_value.checked_add(delta_value)?
        } else {
            self.total_debt_value.checked_sub(delta_value)?
        };
        let new_system_bad_debt = self.system_bad_debt.checked_add(bad_debt_delta)?;
        let new_engine_unbacked = self
            .unbacked_debt_of(self.system_debt_engine)
            .checked_add(bad_debt_delta)?;

        // Commit.
        self.set_collateral(pool_id, collateral_recipient, new_recipient_balance);
        self.total_debt_value = new_total_debt_value;
        self.system_bad_debt = new_system_bad_debt;
        let engine = self.system_debt_engine;
        self.set_unbacked_debt(engine, new_engine_unbacked);
        self.pools.get_mut(pool_id)?.total_debt_share = new_total_share;
        self.put_position(
            pool_id,
            position_addr,
            Position {
                locked_collateral: new_locked,
                debt_share: new_share,
            },
        );
        info!(
            "confiscate {pool_id}/{position_addr}: dC={delta_collateral} dS={delta_debt_share} \
             badDebt+={bad_debt_delta}"
        );
        Ok(())
    }

    /// Mint stablecoin against no collateral, booking the value as unbacked
    /// debt of `debtor`. Restricted to the system debt engine and admins.
    pub fn mint_unbacked(
        &mut self,
        caller: Address,
        debtor: Address,
        recipient: Address,
        value: Rad,
    ) -> Result<()> {
        if caller != self.system_debt_engine && !self.roles.has(caller, Role::Admin) {
            return Err(LedgerError::NotAuthorized);
        }
        let new_unbacked = self.unbacked_debt_of(debtor).checked_add(value)?;
        let new_bad_debt = self.system_bad_debt.checked_add(value)?;
        let new_balance = self.stablecoin_of(recipient).checked_add(value)?;
        self.set_unbacked_debt(debtor, new_unbacked);
        self.system_bad_debt = new_bad_debt;
        self.set_stablecoin(recipient, new_balance);
        Ok(())
    }

    /// Burn the caller's stablecoin against its recorded unbacked debt.
    /// This is how stability-fee surplus retires liquidation shortfall.
    pub fn settle_bad_debt(&mut self, caller: Address, value: Rad) -> Result<()> {
        let new_unbacked = self.unbacked_debt_of(caller).checked_sub(value)?;
        let new_balance = self.stablecoin_of(caller).checked_sub(value)?;
        let new_bad_debt = self.system_bad_debt.checked_sub(value)?;
        self.set_unbacked_debt(caller, new_unbacked);
        self.set_stablecoin(caller, new_balance);
        self.system_bad_debt = new_bad_debt;
        info!("settled {value} of system bad debt");
        Ok(())
    }

    /// Fold an accrued rate delta into a pool, crediting the fee value to
    /// `recipient`. Restricted to the fee-collector role; the caller is
    /// responsible for having computed `rate_delta` over `[last_accrual_ts,
    /// now]`.
    pub fn accrue_stability_fee(
        &mut self,
        caller: Address,
        pool_id: PoolId,
        recipient: Address,
        rate_delta: Ray,
        now: u64,
    ) -> Result<Rad> {
        if !self.roles.has(caller, Role::FeeCollector) {
            return Err(LedgerError::NotAuthorized);
        }
        let pool = self.pools.get(pool_id)?;
        if !pool.live {
            return Err(LedgerError::PoolNotLive);
        }
        let new_rate = pool.debt_accumulated_rate.checked_add(rate_delta)?;
        let fee_value = pool.total_debt_share.ray_value(rate_delta);
        let new_total_debt_value = self.total_debt_value.checked_add(fee_value)?;
        let new_balance = self.stablecoin_of(recipient).checked_add(fee_value)?;

        self.total_debt_value = new_total_debt_value;
        self.set_stablecoin(recipient, new_balance);
        let pool = self.pools.get_mut(pool_id)?;
        pool.debt_accumulated_rate = new_rate;
        pool.last_accrual_ts = now;
        Ok(fee_value)
    }

    // ========================================================================
    // Internal balance plumbing
    // ========================================================================

    fn put_position(&mut self, pool_id: PoolId, owner: Address, position: Position) {
        let by_owner = self.positions.entry(pool_id).or_default();
        if position.is_zeroed() {
            by_owner.remove(&owner);
            if by_owner.is_empty() {
                self.positions.remove(&pool_id);
            }
        } else {
            by_owner.insert(owner, position);
        }
    }

    fn set_collateral(&mut self, pool_id: PoolId, addr: Address, amount: Wad) {
        let by_addr = self.collateral.entry(pool_id).or_default();
        if amount.is_zero() {
            by_addr.remove(&addr);
            if by_addr.is_empty() {
                self.collateral.remove(&pool_id);
            }
        } else {
            by_addr.insert(addr, amount);
        }
    }

    fn set_stablecoin(&mut self, addr: Address, amount: Rad) {
        if amount.is_zero() {
            self.stablecoin.remove(&addr);
        } else {
            self.stablecoin.insert(addr, amount);
        }
    }

    fn set_unbacked_debt(&mut self, addr: Address, amount: Rad) {
        if amount.is_zero() {
            self.unbacked_debt.remove(&addr);
        } else {
            self.unbacked_debt.insert(addr, amount);
        }
    }
}
