//! Immutable audit records for stock entering or leaving a ledger
use super::error::LedgerError;
use super::ledger::LedgerKey;
use super::lot::LotEntry;
use super::types::TimeStamp;
use super::utils;
use chrono::Utc;
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum MovementKind {
    #[n(0)]
    Incoming,
    #[n(1)]
    Outgoing,
    #[n(2)]
    TransferOut,
    #[n(3)]
    TransferIn,
}

// Stored under the sha256 of its own cbor encoding, so it is written once and never updated.
#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct MovementRecord {
    #[n(0)]
    pub id: String, // uuid7, bech32 "move_"
    #[n(1)]
    pub kind: MovementKind,
    #[n(2)]
    pub ledger_key: String,
    #[n(3)]
    pub branch_id: String,
    #[n(4)]
    pub item_id: String,
    #[n(5)]
    pub quantity: u64,
    #[n(6)]
    #[cbor(with = "crate::types::decimal_opt")]
    pub unit_cost: Option<Decimal>,
    #[n(7)]
    pub reason: Option<String>,
    #[n(8)]
    pub supplier: Option<String>,
    #[n(9)]
    #[cbor(with = "crate::types::decimal")]
    pub total_value: Decimal,
    #[n(10)]
    pub reference: Option<String>, // transfer id for transfer legs
    #[n(11)]
    pub created_at: TimeStamp<Utc>,
}

impl MovementRecord {
    fn base(kind: MovementKind, key: &LedgerKey, quantity: u64, total_value: Decimal) -> Self {
        Self {
            id: new_movement_id(),
            kind,
            ledger_key: key.to_string(),
            branch_id: key.branch_id().to_string(),
            item_id: key.item_id().to_string(),
            quantity,
            unit_cost: None,
            reason: None,
            supplier: None,
            total_value,
            reference: None,
            created_at: TimeStamp::new(),
        }
    }

    pub fn incoming(key: &LedgerKey, lot: &LotEntry) -> Self {
        let mut record = Self::base(MovementKind::Incoming, key, lot.quantity, lot.total_value);
        record.unit_cost = Some(lot.unit_cost);
        record.supplier = Some(lot.supplier.clone());
        record
    }

    pub fn outgoing(key: &LedgerKey, quantity: u64, reason: &str, total_value: Decimal) -> Self {
        let mut record = Self::base(MovementKind::Outgoing, key, quantity, total_value);
        record.reason = Some(reason.to_string());
        record
    }

    pub fn transfer_leg(
        kind: MovementKind,
        key: &LedgerKey,
        quantity: u64,
        total_value: Decimal,
        transfer_id: &str,
    ) -> Self {
        let mut record = Self::base(kind, key, quantity, total_value);
        record.reference = Some(transfer_id.to_string());
        record
    }

    /// Returns `(hash, cbor)`; the hash is the storage key.
    pub fn build(&self) -> Result<(String, Vec<u8>), LedgerError> {
        utils::hash_cbor(self)
    }
}

fn new_movement_id() -> String {
    // constant hrp
    utils::new_uuid_to_bech32("move_").unwrap_or_else(|_| uuid7::uuid7().to_string())
}
