//! Property-based tests for FIFO lot consumption
//!
//! The consumption engine decides which lots leave a ledger and at what value, so any
//! bug here silently corrupts stock valuation. These properties are checked over random
//! lot lists and request sizes rather than a handful of hand-picked cases.

use branch_ledger::{
    error::LedgerError,
    fifo::{Consumption, consume},
    lot::LotEntry,
    types::TimeStamp,
};
use proptest::prelude::*;
use rust_decimal::Decimal;

// These property tests cover:
//
// 1. Conservation of quantity and value across a consumption
// 2. Non-negativity - no zero-quantity lot survives
// 3. FIFO order - lots are taken strictly from the front
// 4. The insufficient-stock boundary
// 5. Cost basis preservation for split lots

/// Strategy for one lot: 1..=50 units at 0.00..=999.99
fn lot_strategy() -> impl Strategy<Value = (u64, i64)> {
    (1u64..=50, 0i64..=99_999)
}

/// Strategy for an ordered list of lots, each acquired a day after the previous one
fn lots_strategy() -> impl Strategy<Value = Vec<LotEntry>> {
    prop::collection::vec(lot_strategy(), 1..=12).prop_map(|raw| {
        raw.into_iter()
            .enumerate()
            .map(|(i, (quantity, cents))| {
                LotEntry::new(
                    quantity,
                    Decimal::new(cents, 2),
                    format!("supplier_{i}"),
                    TimeStamp::new_with(2024, 1, 1 + i as u32, 0, 0, 0).unwrap(),
                )
                .unwrap()
            })
            .collect()
    })
}

/// Lots plus a request size between 1 and everything they hold
fn lots_and_request_strategy() -> impl Strategy<Value = (Vec<LotEntry>, u64)> {
    lots_strategy().prop_flat_map(|lots| {
        let available: u64 = lots.iter().map(|l| l.quantity).sum();
        (Just(lots), 1..=available)
    })
}

fn total_value(lots: &[LotEntry]) -> Decimal {
    lots.iter().map(|l| l.total_value).sum()
}

fn total_quantity(lots: &[LotEntry]) -> u64 {
    lots.iter().map(|l| l.quantity).sum()
}

proptest! {
    /// Property: removed quantity equals the request and value is neither created nor lost
    #[test]
    fn prop_consumption_conserves_quantity_and_value(
        (lots, request) in lots_and_request_strategy()
    ) {
        let Consumption { remaining, removed, total_value_removed } = consume(&lots, request).unwrap();

        prop_assert_eq!(total_quantity(&removed), request);
        prop_assert_eq!(total_quantity(&removed) + total_quantity(&remaining), total_quantity(&lots));
        prop_assert_eq!(total_value_removed, total_value(&removed));
        prop_assert_eq!(total_value(&removed) + total_value(&remaining), total_value(&lots));
    }

    /// Property: every lot that comes out of a consumption is positive and self-consistent
    #[test]
    fn prop_no_empty_or_inconsistent_lots(
        (lots, request) in lots_and_request_strategy()
    ) {
        let out = consume(&lots, request).unwrap();

        for lot in out.remaining.iter().chain(out.removed.iter()) {
            prop_assert!(lot.quantity > 0);
            prop_assert!(lot.validate().is_ok());
        }
    }

    /// Property: at most one lot is split, and everything before it is taken whole
    ///
    /// Remaining lots are a suffix of the original list, except that the first one may
    /// be the kept part of a split lot.
    #[test]
    fn prop_lots_are_taken_from_the_front(
        (lots, request) in lots_and_request_strategy()
    ) {
        let out = consume(&lots, request).unwrap();
        let untouched = lots.len() - out.removed.len();

        let split = out.remaining.len() > untouched;
        prop_assert!(out.remaining.len() <= untouched + 1);
        if split {
            let kept = &out.remaining[0];
            let taken = out.removed.last().unwrap();
            prop_assert_eq!(kept.acquired_at.clone(), taken.acquired_at.clone());
            prop_assert_eq!(kept.unit_cost, taken.unit_cost);
            prop_assert_eq!(&out.remaining[1..], &lots[lots.len() - untouched..]);
        } else {
            prop_assert_eq!(&out.remaining[..], &lots[lots.len() - untouched..]);
        }

        // whole lots removed are the original prefix, in order
        let whole = if split { out.removed.len() - 1 } else { out.removed.len() };
        prop_assert_eq!(&out.removed[..whole], &lots[..whole]);
    }

    /// Property: consuming exactly what is available empties the list
    #[test]
    fn prop_exact_available_empties(lots in lots_strategy()) {
        let available = total_quantity(&lots);
        let out = consume(&lots, available).unwrap();

        prop_assert!(out.remaining.is_empty());
        prop_assert_eq!(out.total_value_removed, total_value(&lots));
    }

    /// Property: asking for one unit more than available fails and reports the availability
    #[test]
    fn prop_over_request_fails(lots in lots_strategy(), extra in 1u64..=100) {
        let available = total_quantity(&lots);
        let err = consume(&lots, available + extra).unwrap_err();

        prop_assert!(
            matches!(err, LedgerError::InsufficientStock { available: a, .. } if a == available),
            "unexpected error {:?}", err
        );
    }
}
