//! Collaborator seams consumed by the core: price oracles and delegated
//! permissions. Each trait ships with a simple implementation used by tests
//! and the host tooling.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{LedgerError, Result};
use crate::math::Ray;
use crate::types::{Address, PoolId};

// ============================================================================
// Price oracle
// ============================================================================

/// A price observation for one pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolPrice {
    /// Raw collateral price (RAY), used to price seized collateral.
    pub raw: Ray,
    /// Price already discounted by the pool's collateralization ratio
    /// (RAY), used for the safety check.
    pub with_safety_margin: Ray,
    /// Seconds since the observation was produced.
    pub age_secs: u64,
    /// False when the feed flags the value as unusable.
    pub ok: bool,
}

/// Price feed collaborator. The core fails closed: a flagged, zero, or
/// too-old price surfaces as [`LedgerError::InvalidPrice`].
pub trait PriceOracle {
    fn pool_price(&self, pool_id: PoolId) -> Result<PoolPrice>;
}

/// In-memory oracle table; the test double and the backing store for
/// file-fed deployments.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableOracle {
    prices: BTreeMap<PoolId, PoolPrice>,
}

impl TableOracle {
    pub fn set(&mut self, pool_id: PoolId, price: PoolPrice) {
        self.prices.insert(pool_id, price);
    }
}

impl PriceOracle for TableOracle {
    fn pool_price(&self, pool_id: PoolId) -> Result<PoolPrice> {
        self.prices
            .get(&pool_id)
            .copied()
            .ok_or(LedgerError::InvalidPrice)
    }
}

// ============================================================================
// Delegated permissions
// ============================================================================

/// Delegation check consumed by the ledger's consent guards. The position
/// manager collaborator implements this; owners always act for themselves
/// without consulting it.
pub trait PositionAuthorizer {
    /// May `caller` act on `owner`'s position in `pool_id`?
    fn is_authorized(&self, pool_id: PoolId, owner: Address, caller: Address) -> bool;

    /// May `caller` move `owner`'s free balances?
    fn is_balance_delegate(&self, _owner: Address, _caller: Address) -> bool {
        false
    }
}

/// Authorizer that recognizes no delegates.
pub struct OwnerOnly;

impl PositionAuthorizer for OwnerOnly {
    fn is_authorized(&self, _pool_id: PoolId, _owner: Address, _caller: Address) -> bool {
        false
    }
}

/// Account-level allowlist: an owner names addresses that may act on all of
/// its positions and balances.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allowlist {
    grants: BTreeMap<Address, BTreeSet<Address>>,
}

impl Allowlist {
    pub fn permit(&mut self, owner: Address, delegate: Address) {
        self.grants.entry(owner).or_default().insert(delegate);
    }

    pub fn rescind(&mut self, owner: Address, delegate: Address) {
        if let Some(delegates) = self.grants.get_mut(&owner) {
            delegates.remove(&delegate);
            if delegates.is_empty() {
                self.grants.remove(&owner);
            }
        }
    }

    fn allowed(&self, owner: Address, caller: Address) -> bool {
        self.grants
            .get(&owner)
            .map(|delegates| delegates.contains(&caller))
            .unwrap_or(false)
    }
}

impl PositionAuthorizer for Allowlist {
    fn is_authorized(&self, _pool_id: PoolId, owner: Address, caller: Address) -> bool {
        self.allowed(owner, caller)
    }

    fn is_balance_delegate(&self, owner: Address, caller: Address) -> bool {
        self.allowed(owner, caller)
    }
}
