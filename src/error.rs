use crate::transfer::TransferStatus;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("quantity must be greater than zero")]
    ZeroQuantity,
    #[error("unit cost must not be negative")]
    NegativeUnitCost,
    #[error("supplier must not be empty")]
    EmptySupplier,
    #[error("a reason is required for outgoing stock")]
    EmptyReason,
    #[error("source and destination branch are the same")]
    SelfTransfer,
    #[error("invalid identifier {0:?}")]
    InvalidIdentifier(String),
    #[error("lot total value does not match quantity * unit cost")]
    InconsistentLot,
    #[error("retry budget must allow at least one attempt")]
    NoAttempts,
    #[error("stock quantity exceeds the largest representable total")]
    QuantityOverflow,
    #[error("stock value exceeds the largest representable decimal")]
    ValueOverflow,
}

#[derive(thiserror::Error, Debug)]
pub enum LedgerError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: u64, available: u64 },
    #[error("transaction still conflicting after {attempts} attempts")]
    Conflict { attempts: u32 },
    #[error("ledger {0} already exists")]
    AlreadyExists(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("transfer {id} is already {status}")]
    TransferResolved { id: String, status: TransferStatus },
    #[error("{user} is not permitted to {action}")]
    Forbidden { user: String, action: String },
    #[error("failed to decode stored document: {0}")]
    Decode(#[from] minicbor::decode::Error),
    #[error("failed to encode document: {0}")]
    Encode(String),
    #[error(transparent)]
    Storage(#[from] sled::Error),
}

impl LedgerError {
    /// Transient failures the caller may retry as a whole user action.
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::Conflict { .. })
    }
}
