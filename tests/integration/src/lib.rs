//! Shared fixtures for the integration scenarios.

use stasis_engine::{
    Address, Ledger, LiquidationEngine, OwnerOnly, PoolId, PoolParams, PoolPrice, Rad, Ray, Role,
    StabilityFeeCollector, TableOracle, Wad,
};

pub fn addr(label: &str) -> Address {
    Address::from_label(label)
}

pub fn pid() -> PoolId {
    PoolId::from_label("XDC-A")
}

pub fn wad(s: &str) -> Wad {
    s.parse().unwrap()
}

pub fn ray(s: &str) -> Ray {
    s.parse().unwrap()
}

pub fn rad(s: &str) -> Rad {
    s.parse().unwrap()
}

/// A ledger with one pool, a liquidation engine wired up with its roles,
/// and an oracle all tests can mutate.
pub struct World {
    pub ledger: Ledger,
    pub oracle: TableOracle,
    pub engine: LiquidationEngine,
    pub collector: StabilityFeeCollector,
}

pub fn pool_params() -> PoolParams {
    PoolParams {
        debt_ceiling: rad("1000"),
        debt_floor: rad("0.05"),
        stability_fee_rate: Ray::ONE,
        close_factor_bps: 5_000,
        liquidator_incentive_bps: 10_250,
        treasury_fee_bps: 5_000,
        price_life_secs: 3_600,
        adapter: addr("adapter"),
        liquidation_strategy: addr("fixed-spread"),
    }
}

/// One pool ("XDC-A") at a safety price of 2 RAY and a raw price of 1 RAY.
pub fn world() -> World {
    world_with(pool_params())
}

pub fn world_with(params: PoolParams) -> World {
    let mut ledger = Ledger::new(addr("admin"), addr("debt-engine"), rad("100000"));
    ledger.create_pool(addr("admin"), pid(), params, 0).unwrap();
    ledger
        .set_price_with_safety_margin(addr("admin"), pid(), ray("2"))
        .unwrap();

    let collector = StabilityFeeCollector::new(addr("collector"));
    let engine = LiquidationEngine::new(addr("liq-engine"), addr("treasury"), collector);
    ledger
        .grant_role(addr("admin"), addr("liq-engine"), Role::LiquidationEngine)
        .unwrap();
    ledger
        .grant_role(addr("admin"), addr("collector"), Role::FeeCollector)
        .unwrap();

    let mut oracle = TableOracle::default();
    oracle.set(
        pid(),
        PoolPrice {
            raw: ray("1"),
            with_safety_margin: ray("2"),
            age_secs: 0,
            ok: true,
        },
    );

    World {
        ledger,
        oracle,
        engine,
        collector,
    }
}

/// The reference scenario's starting point: alice locks 1.0 and draws 1.0,
/// and a liquidator funds itself with a healthy position of its own (so its
/// stablecoin does not come from unbacked minting).
pub fn reference_world() -> World {
    let mut world = world();
    world.lock_and_draw("alice", "1", "1");
    world.lock_and_draw("liquidator", "4", "1");
    world
}

impl World {
    /// Credit free collateral through the adapter, lock it, and draw debt.
    pub fn lock_and_draw(&mut self, who: &str, lock: &str, draw: &str) {
        let who = addr(who);
        self.ledger
            .add_collateral(addr("adapter"), pid(), who, wad(lock).0 as i128)
            .unwrap();
        self.ledger
            .adjust_position(
                who,
                &OwnerOnly,
                pid(),
                who,
                who,
                who,
                wad(lock).0 as i128,
                wad(draw).0 as i128,
            )
            .unwrap();
    }

    /// Drop both the stored safety price and the oracle's raw price.
    pub fn crash_price(&mut self, raw: &str, safety: &str) {
        self.ledger
            .set_price_with_safety_margin(addr("admin"), pid(), ray(safety))
            .unwrap();
        self.oracle.set(
            pid(),
            PoolPrice {
                raw: ray(raw),
                with_safety_margin: ray(safety),
                age_secs: 0,
                ok: true,
            },
        );
    }

    /// Σ debtShare per pool equals the recorded aggregate, and the global
    /// debt value is consistent with every pool's share total.
    pub fn assert_conservation(&self) {
        let mut expected_total = Rad::zero();
        for (pool_id, pool) in self.ledger.pools() {
            let share_sum = self
                .ledger
                .positions_in(*pool_id)
                .fold(Wad::ZERO, |acc, (_, p)| {
                    acc.checked_add(p.debt_share).unwrap()
                });
            assert_eq!(share_sum, pool.total_debt_share, "share sum mismatch");
            expected_total = expected_total.checked_add(pool.total_debt_value()).unwrap();
        }
        assert_eq!(expected_total, self.ledger.total_debt_value());
    }
}
