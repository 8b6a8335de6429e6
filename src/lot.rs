//! Purchase lots, the unit of stock tracked by a ledger
use crate::error::ValidationError;
use crate::types::TimeStamp;
use chrono::Utc;
use rust_decimal::Decimal;

/// A batch of stock acquired together at one cost and date.
///
/// `total_value` is a cached `quantity * unit_cost`; it is never authoritative on its
/// own and every constructor recomputes it.
#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct LotEntry {
    #[n(0)]
    pub quantity: u64,
    #[n(1)]
    #[cbor(with = "crate::types::decimal")]
    pub unit_cost: Decimal,
    #[n(2)]
    pub supplier: String,
    #[n(3)]
    pub acquired_at: TimeStamp<Utc>,
    #[n(4)]
    #[cbor(with = "crate::types::decimal")]
    pub total_value: Decimal,
}

impl LotEntry {
    pub fn new(
        quantity: u64,
        unit_cost: Decimal,
        supplier: impl Into<String>,
        acquired_at: TimeStamp<Utc>,
    ) -> Result<Self, ValidationError> {
        let supplier = supplier.into();
        if quantity == 0 {
            return Err(ValidationError::ZeroQuantity);
        }
        if unit_cost < Decimal::ZERO {
            return Err(ValidationError::NegativeUnitCost);
        }
        if supplier.trim().is_empty() {
            return Err(ValidationError::EmptySupplier);
        }

        Ok(Self {
            quantity,
            unit_cost,
            supplier,
            acquired_at,
            total_value: value_of(quantity, unit_cost)?,
        })
    }

    /// Same lot metadata and cost basis, different quantity.
    fn with_quantity(&self, quantity: u64) -> Result<Self, ValidationError> {
        Ok(Self {
            quantity,
            unit_cost: self.unit_cost,
            supplier: self.supplier.clone(),
            acquired_at: self.acquired_at.clone(),
            total_value: value_of(quantity, self.unit_cost)?,
        })
    }

    /// Split into `(taken, kept)` where `taken.quantity == take`.
    ///
    /// `take` must be strictly between zero and `self.quantity`.
    pub fn split(&self, take: u64) -> Result<(LotEntry, LotEntry), ValidationError> {
        if take == 0 || take >= self.quantity {
            return Err(ValidationError::ZeroQuantity);
        }
        Ok((
            self.with_quantity(take)?,
            self.with_quantity(self.quantity - take)?,
        ))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.quantity == 0 {
            return Err(ValidationError::ZeroQuantity);
        }
        if self.unit_cost < Decimal::ZERO {
            return Err(ValidationError::NegativeUnitCost);
        }
        if self.supplier.trim().is_empty() {
            return Err(ValidationError::EmptySupplier);
        }
        if self.total_value != value_of(self.quantity, self.unit_cost)? {
            return Err(ValidationError::InconsistentLot);
        }
        Ok(())
    }
}

/// `quantity * unit_cost`, refusing results a `Decimal` cannot hold.
pub fn value_of(quantity: u64, unit_cost: Decimal) -> Result<Decimal, ValidationError> {
    Decimal::from(quantity)
        .checked_mul(unit_cost)
        .ok_or(ValidationError::ValueOverflow)
}
