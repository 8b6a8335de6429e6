//! Inter-branch transfer requests and their lifecycle
use super::error::{LedgerError, ValidationError};
use super::ledger::LedgerKey;
use super::types::TimeStamp;
use chrono::Utc;
use rust_decimal::Decimal;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum TransferStatus {
    #[n(0)]
    Pending,
    #[n(1)]
    Completed,
    #[n(2)]
    Rejected,
}

impl TransferStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransferStatus::Pending)
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransferStatus::Pending => "pending",
            TransferStatus::Completed => "completed",
            TransferStatus::Rejected => "rejected",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct TransferRequest {
    #[n(0)]
    pub id: String, // uuid7, bech32 "xfer_"
    #[n(1)]
    pub from_branch_id: String,
    #[n(2)]
    pub to_branch_id: String,
    #[n(3)]
    pub item_id: String,
    #[n(4)]
    pub quantity: u64,
    #[n(5)]
    pub status: TransferStatus,
    #[n(6)]
    pub created_at: TimeStamp<Utc>,
    #[n(7)]
    pub requested_by: String,
    #[n(8)]
    #[cbor(with = "crate::types::decimal_opt")]
    pub total_value: Option<Decimal>, // set on approval
    #[n(9)]
    pub resolved_at: Option<TimeStamp<Utc>>,
    #[n(10)]
    pub resolved_by: Option<String>,
}

impl TransferRequest {
    /// Validate and build a `pending` request. Self-transfers are refused here, not at approval.
    pub fn new(
        id: String,
        from_branch_id: &str,
        to_branch_id: &str,
        item_id: &str,
        quantity: u64,
        requested_by: &str,
    ) -> Result<Self, ValidationError> {
        if quantity == 0 {
            return Err(ValidationError::ZeroQuantity);
        }
        let source = LedgerKey::new(from_branch_id, item_id)?;
        let destination = LedgerKey::new(to_branch_id, item_id)?;
        if source.branch_id() == destination.branch_id() {
            return Err(ValidationError::SelfTransfer);
        }

        Ok(Self {
            id,
            from_branch_id: source.branch_id().to_string(),
            to_branch_id: destination.branch_id().to_string(),
            item_id: source.item_id().to_string(),
            quantity,
            status: TransferStatus::Pending,
            created_at: TimeStamp::new(),
            requested_by: requested_by.to_string(),
            total_value: None,
            resolved_at: None,
            resolved_by: None,
        })
    }

    pub fn source_key(&self) -> Result<LedgerKey, ValidationError> {
        LedgerKey::new(&self.from_branch_id, &self.item_id)
    }

    pub fn destination_key(&self) -> Result<LedgerKey, ValidationError> {
        LedgerKey::new(&self.to_branch_id, &self.item_id)
    }

    pub fn ensure_pending(&self) -> Result<(), LedgerError> {
        if self.status.is_terminal() {
            return Err(LedgerError::TransferResolved {
                id: self.id.clone(),
                status: self.status,
            });
        }
        Ok(())
    }

    pub fn complete(&mut self, total_value: Decimal, resolved_by: Option<&str>) {
        self.status = TransferStatus::Completed;
        self.total_value = Some(total_value);
        self.resolve(resolved_by);
    }

    pub fn reject(&mut self, resolved_by: Option<&str>) {
        self.status = TransferStatus::Rejected;
        self.resolve(resolved_by);
    }

    fn resolve(&mut self, resolved_by: Option<&str>) {
        self.resolved_at = Some(TimeStamp::new());
        self.resolved_by = resolved_by.map(str::to_string);
    }
}
