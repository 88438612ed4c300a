//! End-to-end scenarios across the ledger, accrual, liquidation, keeper,
//! and persistence layers.

use stasis_engine::{
    FixedSpreadStrategy, FlashContext, FlashLiquidator, Ledger, LedgerError, OwnerOnly, Result,
    SharedLedger, SnapshotStore, Wad,
};
use stasis_integration_tests::{
    addr, pid, pool_params, rad, reference_world, wad, world_with, World,
};

/// The reference fixed-spread scenario: safety price 2, incentive 10_250,
/// treasury 5_000, close factor 5_000; 1.0 locked, 1.0 drawn; price slips
/// just under par and a liquidator repays half.
#[test]
fn fixed_spread_reference_numbers() {
    let mut world = reference_world();
    world.crash_price("1", "0.999999999999999999");

    let receipt = world
        .engine
        .liquidate(
            &mut world.ledger,
            &world.oracle,
            &FixedSpreadStrategy,
            None,
            0,
            pid(),
            addr("alice"),
            wad("0.5"),
            Wad::ZERO,
            addr("liquidator"),
            &[],
        )
        .unwrap();

    assert_eq!(receipt.collateral_seized, wad("0.5125"));
    assert_eq!(receipt.liquidator_collateral, wad("0.50625"));
    assert_eq!(receipt.treasury_fee, wad("0.00625"));
    assert_eq!(receipt.debt_value_repaid, rad("0.5"));
    assert!(receipt.bad_debt.is_zero());

    let position = world.ledger.position(pid(), addr("alice"));
    assert_eq!(position.locked_collateral, wad("0.4875"));
    assert_eq!(position.debt_share, wad("0.5"));
    assert!(world.ledger.system_bad_debt().is_zero());
    world.assert_conservation();
}

/// A 50% crash: the full 1.0 debt share cannot be covered by 1.0 of
/// collateral, so the position closes entirely and the gap lands in the
/// bad-debt counter — which the debt engine's surplus then partially
/// settles.
#[test]
fn underwater_closure_books_and_settles_bad_debt() {
    let mut world = reference_world();
    world.crash_price("0.5", "0.5");

    let receipt = world
        .engine
        .liquidate(
            &mut world.ledger,
            &world.oracle,
            &FixedSpreadStrategy,
            None,
            0,
            pid(),
            addr("alice"),
            wad("1"),
            Wad::ZERO,
            addr("liquidator"),
            &[],
        )
        .unwrap();

    assert!(receipt.full_liquidation);
    assert!(world.ledger.position(pid(), addr("alice")).is_zeroed());
    assert_eq!(
        receipt
            .debt_value_repaid
            .checked_add(receipt.bad_debt)
            .unwrap(),
        rad("1")
    );
    assert_eq!(world.ledger.system_bad_debt(), receipt.bad_debt);
    world.assert_conservation();

    // The liquidator's repayment sits on the debt engine as surplus; burn
    // it against the recorded shortfall.
    let debt_engine = world.ledger.system_debt_engine();
    let surplus = world.ledger.stablecoin_of(debt_engine);
    assert_eq!(surplus, receipt.debt_value_repaid);
    world.ledger.settle_bad_debt(debt_engine, surplus).unwrap();
    assert_eq!(
        world.ledger.system_bad_debt(),
        receipt.bad_debt.checked_sub(surplus).unwrap()
    );
}

/// Stability fees alone can sink a position: with a doubling per-second
/// rate, two seconds of accrual outgrow the collateral, and the engine's
/// internal collect sees the fresh debt at the safety check.
#[test]
fn interest_accrual_drives_liquidation() {
    let mut params = pool_params();
    params.stability_fee_rate = "2".parse().unwrap();
    let mut world = world_with(params);
    world.lock_and_draw("alice", "1", "1");
    // the liquidator funds itself before rates move
    world.lock_and_draw("liquidator", "4", "1");

    // at t=2 the rate is 4x: alice owes 4.0 against 2.0 of collateral value
    let receipt = world
        .engine
        .liquidate(
            &mut world.ledger,
            &world.oracle,
            &FixedSpreadStrategy,
            None,
            2,
            pid(),
            addr("alice"),
            Wad(u128::MAX),
            Wad::ZERO,
            addr("liquidator"),
            &[],
        )
        .unwrap();

    assert!(receipt.full_liquidation);
    assert!(!receipt.bad_debt.is_zero());
    assert!(world.ledger.position(pid(), addr("alice")).is_zeroed());
    world.assert_conservation();
}

struct Seller;

impl FlashLiquidator for Seller {
    fn on_flash_liquidation(&mut self, ledger: &mut Ledger, ctx: FlashContext<'_>) -> Result<()> {
        let buyer = addr("otc-desk");
        ledger.move_collateral(
            ctx.liquidator,
            &OwnerOnly,
            ctx.pool_id,
            ctx.liquidator,
            buyer,
            ctx.collateral_received,
        )?;
        ledger.move_stablecoin(buyer, &OwnerOnly, buyer, ctx.liquidator, ctx.debt_value_owed)
    }
}

struct Absconder;

impl FlashLiquidator for Absconder {
    fn on_flash_liquidation(&mut self, _: &mut Ledger, _: FlashContext<'_>) -> Result<()> {
        Ok(())
    }
}

/// Flash-financed liquidation through the single-writer service wrapper:
/// the callback sells collateral for stablecoin inside the call, and a
/// defaulting callback leaves the shared state bit-identical.
#[test]
fn flash_liquidation_through_shared_ledger() {
    let mut world = reference_world();
    world.crash_price("1", "0.999999999999999999");
    let debt_engine = world.ledger.system_debt_engine();
    world
        .ledger
        .mint_unbacked(debt_engine, debt_engine, addr("otc-desk"), rad("2"))
        .unwrap();

    let World {
        ledger,
        oracle,
        engine,
        ..
    } = world;
    let shared = SharedLedger::new(ledger);

    let before = shared.snapshot();
    let failed = shared.write(|ledger| {
        engine.liquidate(
            ledger,
            &oracle,
            &FixedSpreadStrategy,
            Some(&mut Absconder),
            0,
            pid(),
            addr("alice"),
            wad("0.5"),
            Wad::ZERO,
            addr("flash-bot"),
            &[],
        )
    });
    assert_eq!(failed.unwrap_err(), LedgerError::InsufficientFunds);
    assert_eq!(shared.snapshot(), before);

    let receipt = shared
        .write(|ledger| {
            engine.liquidate(
                ledger,
                &oracle,
                &FixedSpreadStrategy,
                Some(&mut Seller),
                0,
                pid(),
                addr("alice"),
                wad("0.5"),
                Wad::ZERO,
                addr("flash-bot"),
                &[],
            )
        })
        .unwrap();
    assert_eq!(receipt.debt_value_repaid, rad("0.5"));
    assert!(shared.read(|l| l.stablecoin_of(addr("flash-bot")).is_zero()));
    assert_eq!(
        shared.read(|l| l.collateral_of(pid(), addr("otc-desk"))),
        wad("0.50625")
    );
}

/// Gradual liquidation: a keeper keeps taking close-factor bites until the
/// scan comes back empty; the tail is closed by the dust override. Every
/// intermediate state conserves shares.
#[test]
fn keeper_grinds_a_position_back_to_health() {
    let mut world = reference_world();
    world.lock_and_draw("bob", "2", "1");
    world.crash_price("1", "0.999999999999999999");

    let mut rounds = 0;
    loop {
        let candidates = stasis_keeper::scan_pool(&world.ledger, pid()).unwrap();
        // bob (2 locked / 1 drawn) and the liquidator must never show up
        assert!(candidates.iter().all(|c| c.owner == addr("alice")));
        let Some(candidate) = candidates.first() else {
            break;
        };
        world
            .engine
            .liquidate(
                &mut world.ledger,
                &world.oracle,
                &FixedSpreadStrategy,
                None,
                0,
                pid(),
                candidate.owner,
                Wad(u128::MAX),
                Wad::ZERO,
                addr("liquidator"),
                &[],
            )
            .unwrap();
        world.assert_conservation();
        rounds += 1;
        assert!(rounds < 16, "liquidation did not converge");
    }

    // the close factor forced multiple passes before the dust override
    // closed the tail
    assert!(rounds > 1, "expected gradual liquidation, got {rounds} round(s)");
    assert!(world.ledger.position(pid(), addr("alice")).is_zeroed());
}

/// Everything the ledger tracks survives a serde round trip through the
/// snapshot store, including map keys and U256-backed RAD values.
#[test]
fn snapshot_persists_full_state() {
    let mut world = reference_world();
    world.crash_price("0.5", "0.5");
    world
        .engine
        .liquidate(
            &mut world.ledger,
            &world.oracle,
            &FixedSpreadStrategy,
            None,
            0,
            pid(),
            addr("alice"),
            wad("1"),
            Wad::ZERO,
            addr("liquidator"),
            &[],
        )
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let store = SnapshotStore::new(dir.path().join("ledger.json"));
    store.save(&world.ledger).unwrap();
    let restored = store.load().unwrap();
    assert_eq!(restored, world.ledger);
}

/// Dust discipline end to end: an adjustment may never leave debt below
/// the floor, and a liquidation either clears the position or leaves it at
/// or above the floor.
#[test]
fn dust_discipline_holds_everywhere() {
    let mut world = reference_world();
    // repaying down to 0.04 would leave dust under the 0.05 floor
    let err = world.ledger.adjust_position(
        addr("alice"),
        &OwnerOnly,
        pid(),
        addr("alice"),
        addr("alice"),
        addr("alice"),
        0,
        -(wad("0.96").0 as i128),
    );
    assert_eq!(err, Err(LedgerError::DebtFloorViolated));

    world.crash_price("1", "0.999999999999999999");
    world
        .ledger
        .set_debt_floor(addr("admin"), pid(), rad("0.75"))
        .unwrap();
    // half would leave 0.5 < 0.75: the engine must close it fully instead
    let receipt = world
        .engine
        .liquidate(
            &mut world.ledger,
            &world.oracle,
            &FixedSpreadStrategy,
            None,
            0,
            pid(),
            addr("alice"),
            wad("0.5"),
            Wad::ZERO,
            addr("liquidator"),
            &[],
        )
        .unwrap();
    assert!(receipt.full_liquidation);
    assert!(world.ledger.position(pid(), addr("alice")).debt_share.is_zero());
}

/// Collection is permissionless bookkeeping: anyone can call it, the rate
/// only moves forward, repeat calls at one timestamp change nothing, and
/// every accrued fee lands on the debt engine as stablecoin surplus.
#[test]
fn collection_is_idempotent_and_rate_monotone() {
    let mut params = pool_params();
    params.stability_fee_rate = "2".parse().unwrap();
    let mut world = world_with(params);
    world.lock_and_draw("alice", "4", "2");

    let debt_engine = world.ledger.system_debt_engine();
    let r1 = world.collector.collect(&mut world.ledger, pid(), 1).unwrap();
    let surplus_after_first = world.ledger.stablecoin_of(debt_engine);
    assert_eq!(surplus_after_first, rad("2")); // 2 shares × (2.0 − 1.0)

    // same timestamp: a no-op
    let snapshot = world.ledger.clone();
    let r2 = world.collector.collect(&mut world.ledger, pid(), 1).unwrap();
    assert_eq!(r1, r2);
    assert_eq!(world.ledger, snapshot);

    // later timestamp: the rate moves forward, never back
    let r3 = world.collector.collect(&mut world.ledger, pid(), 3).unwrap();
    assert!(r3 > r2);
    assert!(world.ledger.stablecoin_of(debt_engine) > surplus_after_first);
    world.assert_conservation();
}

/// Caged pools accept no adjustments and no liquidations.
#[test]
fn caged_pool_is_frozen() {
    let mut world = reference_world();
    world.crash_price("1", "0.999999999999999999");
    world.ledger.cage_pool(addr("admin"), pid()).unwrap();

    let err = world.engine.liquidate(
        &mut world.ledger,
        &world.oracle,
        &FixedSpreadStrategy,
        None,
        0,
        pid(),
        addr("alice"),
        wad("0.5"),
        Wad::ZERO,
        addr("liquidator"),
        &[],
    );
    assert_eq!(err, Err(LedgerError::PoolNotLive));

    let err = world.ledger.adjust_position(
        addr("alice"),
        &OwnerOnly,
        pid(),
        addr("alice"),
        addr("alice"),
        addr("alice"),
        wad("1").0 as i128,
        0,
    );
    assert_eq!(err, Err(LedgerError::PoolNotLive));
}
