//! FIFO consumption of lots
use super::error::{LedgerError, ValidationError};
use super::lot::LotEntry;
use rust_decimal::Decimal;

/// Outcome of taking stock out of an ordered lot list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Consumption {
    /// Lots left behind, in their original order.
    pub remaining: Vec<LotEntry>,
    /// Lots taken, oldest first. A partially consumed lot appears here as its taken part.
    pub removed: Vec<LotEntry>,
    pub total_value_removed: Decimal,
}

impl Consumption {
    pub fn quantity_removed(&self) -> u64 {
        self.removed
            .iter()
            .fold(0u64, |total, e| total.saturating_add(e.quantity))
    }
}

/// Remove `quantity` units from `entries`, oldest lot first.
///
/// A lot that is only partly needed is split; both halves keep its unit cost, supplier
/// and acquisition time. Fails without touching anything when the lots hold less than
/// `quantity` in total.
pub fn consume(entries: &[LotEntry], quantity: u64) -> Result<Consumption, LedgerError> {
    if quantity == 0 {
        return Err(ValidationError::ZeroQuantity.into());
    }

    let available = entries
        .iter()
        .try_fold(0u64, |total, e| total.checked_add(e.quantity))
        .ok_or(ValidationError::QuantityOverflow)?;
    if quantity > available {
        return Err(LedgerError::InsufficientStock {
            requested: quantity,
            available,
        });
    }

    let mut outstanding = quantity;
    let mut remaining = Vec::with_capacity(entries.len());
    let mut removed = Vec::new();
    let mut total_value_removed = Decimal::ZERO;

    for entry in entries {
        if outstanding == 0 {
            remaining.push(entry.clone());
        } else if entry.quantity <= outstanding {
            outstanding -= entry.quantity;
            total_value_removed = add_value(total_value_removed, entry.total_value)?;
            removed.push(entry.clone());
        } else {
            let (taken, kept) = entry.split(outstanding)?;
            outstanding = 0;
            total_value_removed = add_value(total_value_removed, taken.total_value)?;
            removed.push(taken);
            remaining.push(kept);
        }
    }

    Ok(Consumption {
        remaining,
        removed,
        total_value_removed,
    })
}

fn add_value(total: Decimal, value: Decimal) -> Result<Decimal, ValidationError> {
    total.checked_add(value).ok_or(ValidationError::ValueOverflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TimeStamp;

    fn lot(quantity: u64, unit_cost: i64, day: u32) -> LotEntry {
        LotEntry::new(
            quantity,
            Decimal::from(unit_cost),
            "acme",
            TimeStamp::new_with(2024, 1, day, 0, 0, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn oldest_lot_goes_first() {
        let a = lot(5, 10, 1);
        let b = lot(5, 20, 2);

        let out = consume(&[a.clone(), b.clone()], 7).unwrap();

        assert_eq!(out.removed.len(), 2);
        assert_eq!(out.removed[0], a);
        assert_eq!(out.removed[1].quantity, 2);
        assert_eq!(out.removed[1].total_value, Decimal::from(40));
        assert_eq!(out.remaining, vec![lot(3, 20, 2)]);
        assert_eq!(out.total_value_removed, Decimal::from(90));
    }

    #[test]
    fn consuming_everything_empties_the_ledger() {
        let entries = vec![lot(2, 3, 1), lot(4, 5, 2)];
        let out = consume(&entries, 6).unwrap();

        assert!(out.remaining.is_empty());
        assert_eq!(out.removed, entries);
        assert_eq!(out.total_value_removed, Decimal::from(26));
    }

    #[test]
    fn one_more_than_available_fails() {
        let entries = vec![lot(2, 3, 1), lot(4, 5, 2)];
        let err = consume(&entries, 7).unwrap_err();

        assert!(matches!(
            err,
            LedgerError::InsufficientStock {
                requested: 7,
                available: 6
            }
        ));
    }

    #[test]
    fn exact_lot_boundary_does_not_split() {
        let entries = vec![lot(3, 1, 1), lot(3, 2, 2), lot(3, 3, 3)];
        let out = consume(&entries, 3).unwrap();

        assert_eq!(out.removed, vec![entries[0].clone()]);
        assert_eq!(out.remaining, entries[1..].to_vec());
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let err = consume(&[lot(1, 1, 1)], 0).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Validation(ValidationError::ZeroQuantity)
        ));
    }

    #[test]
    fn overflowing_availability_is_an_error() {
        let entries = vec![lot(u64::MAX, 0, 1), lot(1, 0, 2)];
        let err = consume(&entries, 1).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Validation(ValidationError::QuantityOverflow)
        ));
    }

    #[test]
    fn empty_ledger_reports_zero_available() {
        let err = consume(&[], 1).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientStock { available: 0, .. }
        ));
    }
}
