//! Property-based tests for transfers between branch ledgers
//!
//! Each case opens a temporary sled database, so the number of cases is kept small.

use branch_ledger::{
    auth::Actor,
    config::LedgerConfig,
    service::{InventoryService, StockIn},
    types::TimeStamp,
};
use proptest::prelude::*;
use rust_decimal::Decimal;

const BRANCHES: [&str; 3] = ["north", "south", "east"];

/// Stock lots received at "north": (quantity, cost in cents)
fn receipts_strategy() -> impl Strategy<Value = Vec<(u64, i64)>> {
    prop::collection::vec((1u64..=20, 0i64..=50_000), 1..=6)
}

/// A sequence of (from, to, quantity) moves between distinct branches
fn moves_strategy() -> impl Strategy<Value = Vec<(usize, usize, u64)>> {
    prop::collection::vec(
        (0usize..3, 1usize..3, 1u64..=30).prop_map(|(from, offset, qty)| {
            (from, (from + offset) % 3, qty)
        }),
        1..=8,
    )
}

fn seeded(receipts: &[(u64, i64)]) -> (InventoryService, Actor) {
    let service = InventoryService::open(&LedgerConfig::temporary()).unwrap();
    let admin = Actor::admin("admin");
    for (i, (quantity, cents)) in receipts.iter().enumerate() {
        let stock = StockIn::new("north", "sku", *quantity, Decimal::new(*cents, 2), "acme")
            .acquired_at(TimeStamp::new_with(2024, 5, 1 + i as u32, 0, 0, 0).unwrap());
        service.receive_stock(&admin, stock).unwrap();
    }
    (service, admin)
}

fn totals(service: &InventoryService, branch: &str) -> (u64, Decimal) {
    match service.ledger(branch, "sku").unwrap() {
        Some(ledger) => (ledger.total_quantity(), ledger.total_value()),
        None => (0, Decimal::ZERO),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Property: sending N units away and back restores quantity and value at the source
    #[test]
    fn prop_round_trip_restores_totals(
        receipts in receipts_strategy(),
        fraction in 1u64..=100,
    ) {
        let (service, admin) = seeded(&receipts);
        let before = totals(&service, "north");
        let n = (before.0 * fraction / 100).max(1);

        let out = service.request_transfer(&admin, "north", "south", "sku", n).unwrap();
        service.approve_transfer(&admin, &out.id).unwrap();
        let back = service.request_transfer(&admin, "south", "north", "sku", n).unwrap();
        service.approve_transfer(&admin, &back.id).unwrap();

        prop_assert_eq!(totals(&service, "north"), before);
        prop_assert_eq!(totals(&service, "south"), (0, Decimal::ZERO));
    }

    /// Property: any sequence of approvals conserves stock across all branches, and a
    /// failed approval changes nothing
    #[test]
    fn prop_transfers_conserve_network_totals(
        receipts in receipts_strategy(),
        moves in moves_strategy(),
    ) {
        let (service, admin) = seeded(&receipts);
        let network = |service: &InventoryService| {
            BRANCHES.iter().fold((0u64, Decimal::ZERO), |(q, v), b| {
                let (bq, bv) = totals(service, b);
                (q + bq, v + bv)
            })
        };
        let start = network(&service);

        for (from, to, quantity) in moves {
            let source_before = totals(&service, BRANCHES[from]);
            let request = service
                .request_transfer(&admin, BRANCHES[from], BRANCHES[to], "sku", quantity)
                .unwrap();
            match service.approve_transfer(&admin, &request.id) {
                Ok(done) => {
                    let source_after = totals(&service, BRANCHES[from]);
                    prop_assert_eq!(source_before.0 - source_after.0, quantity);
                    prop_assert_eq!(Some(source_before.1 - source_after.1), done.total_value);
                }
                Err(_) => {
                    prop_assert!(source_before.0 < quantity);
                    prop_assert_eq!(totals(&service, BRANCHES[from]), source_before);
                }
            }
            prop_assert_eq!(network(&service), start);
        }
    }
}
