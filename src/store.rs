//! sled-backed document store for ledgers, movements and transfer requests
//!
//! Every mutation goes through [`LedgerStore::atomically`], which runs a closure inside a
//! sled multi-tree transaction. sled re-runs the closure when it detects a conflicting
//! concurrent write; the store caps how many times that may happen.
use super::config::LedgerConfig;
use super::error::LedgerError;
use super::ledger::{LedgerKey, LedgerRecord};
use super::lot::LotEntry;
use super::movement::MovementRecord;
use super::transfer::{TransferRequest, TransferStatus};
use sled::transaction::{
    ConflictableTransactionError, TransactionError, TransactionalTree, UnabortableTransactionError,
};
use sled::{Db, Transactional, Tree};
use std::cell::Cell;
use std::sync::Arc;

pub const LEDGER_TREE: &str = "inventory_ledgers";
pub const MOVEMENT_TREE: &str = "stock_movements";
pub const TRANSFER_TREE: &str = "transfer_requests";

/// Error raised inside a transaction closure.
#[derive(Debug)]
pub enum TxError {
    /// Domain failure; aborts with no effect and is not retried.
    Abort(LedgerError),
    /// Raised by sled; conflicts are retried, storage failures surface.
    Store(UnabortableTransactionError),
}

pub type TxResult<T> = Result<T, TxError>;

impl From<LedgerError> for TxError {
    fn from(value: LedgerError) -> Self {
        TxError::Abort(value)
    }
}

impl From<crate::error::ValidationError> for TxError {
    fn from(value: crate::error::ValidationError) -> Self {
        TxError::Abort(value.into())
    }
}

impl From<UnabortableTransactionError> for TxError {
    fn from(value: UnabortableTransactionError) -> Self {
        TxError::Store(value)
    }
}

impl From<TxError> for ConflictableTransactionError<LedgerError> {
    fn from(value: TxError) -> Self {
        match value {
            TxError::Abort(err) => ConflictableTransactionError::Abort(err),
            TxError::Store(err) => err.into(),
        }
    }
}

#[derive(Clone)]
pub struct LedgerStore {
    instance: Arc<Db>,
    ledgers: Tree,
    movements: Tree,
    transfers: Tree,
    max_attempts: u32,
}

impl LedgerStore {
    pub fn new(instance: Arc<Db>) -> Result<Self, LedgerError> {
        let ledgers = instance.open_tree(LEDGER_TREE)?;
        let movements = instance.open_tree(MOVEMENT_TREE)?;
        let transfers = instance.open_tree(TRANSFER_TREE)?;

        Ok(Self {
            instance,
            ledgers,
            movements,
            transfers,
            max_attempts: crate::config::DEFAULT_MAX_ATTEMPTS,
        })
    }

    pub fn open(config: &LedgerConfig) -> Result<Self, LedgerError> {
        config.validate()?;
        let mut sled_config = sled::Config::new().temporary(config.temporary);
        if !config.temporary {
            sled_config = sled_config.path(&config.db_path);
        }
        let db = sled_config.open()?;
        Ok(Self::new(Arc::new(db))?.with_max_attempts(config.max_attempts))
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run `f` against a consistent snapshot of all three collections and commit its
    /// writes as one unit.
    ///
    /// `f` may be invoked several times and must not have side effects outside `tx`.
    pub fn atomically<T, F>(&self, f: F) -> Result<T, LedgerError>
    where
        F: Fn(&LedgerTx<'_>) -> TxResult<T>,
    {
        let attempts = Cell::new(0u32);
        let max_attempts = self.max_attempts;

        let result: Result<T, TransactionError<LedgerError>> =
            (&self.ledgers, &self.movements, &self.transfers).transaction(
                |(ledgers, movements, transfers)| {
                    let attempt = attempts.get() + 1;
                    attempts.set(attempt);
                    if attempt > max_attempts {
                        tracing::warn!(attempts = max_attempts, "transaction retry budget exhausted");
                        return Err(ConflictableTransactionError::Abort(LedgerError::Conflict {
                            attempts: max_attempts,
                        }));
                    }
                    if attempt > 1 {
                        tracing::debug!(attempt, "retrying transaction after conflict");
                    }

                    let tx = LedgerTx {
                        ledgers,
                        movements,
                        transfers,
                    };
                    f(&tx).map_err(ConflictableTransactionError::from)
                },
            );

        match result {
            Ok(value) => Ok(value),
            Err(TransactionError::Abort(err)) => Err(err),
            Err(TransactionError::Storage(err)) => Err(LedgerError::Storage(err)),
        }
    }

    pub fn get(&self, key: &LedgerKey) -> Result<Option<LedgerRecord>, LedgerError> {
        match self.ledgers.get(key.to_string().as_bytes())? {
            Some(bytes) => Ok(Some(minicbor::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Create the ledger for `key` holding `initial_entry`. Fails if one already exists.
    pub fn create(
        &self,
        key: &LedgerKey,
        initial_entry: LotEntry,
        rack_location: Option<String>,
    ) -> Result<LedgerRecord, LedgerError> {
        self.atomically(|tx| {
            if tx.ledger(key)?.is_some() {
                return Err(LedgerError::AlreadyExists(key.to_string()).into());
            }
            let record =
                LedgerRecord::with_entries(key, vec![initial_entry.clone()], rack_location.clone());
            tx.put_ledger(&record)?;
            Ok(record)
        })
    }

    /// Append one lot after the existing entries. The ledger must exist.
    pub fn append_entry(
        &self,
        key: &LedgerKey,
        entry: LotEntry,
    ) -> Result<LedgerRecord, LedgerError> {
        self.atomically(|tx| {
            let mut record = tx.require_ledger(key)?;
            record.push_lots([entry.clone()]);
            tx.put_ledger(&record)?;
            Ok(record)
        })
    }

    /// Ledgers of one branch in key order.
    pub fn ledgers_for_branch(&self, branch_id: &str) -> Result<Vec<LedgerRecord>, LedgerError> {
        let prefix = LedgerKey::branch_prefix(branch_id)?;
        self.ledgers
            .scan_prefix(prefix.as_bytes())
            .map(|item| -> Result<LedgerRecord, LedgerError> {
                let (_, bytes) = item?;
                Ok(minicbor::decode(&bytes)?)
            })
            .collect()
    }

    /// Movements recorded against one ledger, oldest first.
    pub fn movements_for(&self, key: &LedgerKey) -> Result<Vec<MovementRecord>, LedgerError> {
        let ledger_key = key.to_string();
        let mut movements = Vec::new();
        for item in self.movements.iter() {
            let (_, bytes) = item?;
            let movement: MovementRecord = minicbor::decode(&bytes)?;
            if movement.ledger_key == ledger_key {
                movements.push(movement);
            }
        }
        movements.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(movements)
    }

    /// Re-hash a stored movement and check it still matches its key.
    pub fn verify_movement(&self, hash: &str) -> Result<bool, LedgerError> {
        let bytes = self
            .movements
            .get(hash.as_bytes())?
            .ok_or_else(|| LedgerError::NotFound(format!("movement {hash}")))?;
        Ok(sha256::digest(&bytes.to_vec()) == hash)
    }

    pub fn transfer(&self, id: &str) -> Result<Option<TransferRequest>, LedgerError> {
        match self.transfers.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(minicbor::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Transfer requests matching `filter`, newest first.
    pub fn transfers(&self, filter: &TransferFilter) -> Result<Vec<TransferRequest>, LedgerError> {
        let mut requests = Vec::new();
        for item in self.transfers.iter() {
            let (_, bytes) = item?;
            let request: TransferRequest = minicbor::decode(&bytes)?;
            if filter.matches(&request) {
                requests.push(request);
            }
        }
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let page = requests.into_iter().skip(filter.offset);
        Ok(match filter.limit {
            Some(limit) => page.take(limit).collect(),
            None => page.collect(),
        })
    }

    pub fn flush(&self) -> Result<usize, LedgerError> {
        Ok(self.instance.flush()?)
    }
}

/// Listing options for transfer requests.
#[derive(Debug, Clone, Default)]
pub struct TransferFilter {
    pub status: Option<TransferStatus>,
    pub branch_id: Option<String>, // matches either side
    pub offset: usize,
    pub limit: Option<usize>,
}

impl TransferFilter {
    pub fn with_status(status: TransferStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    fn matches(&self, request: &TransferRequest) -> bool {
        let status_ok = self.status.is_none_or(|s| s == request.status);
        let branch_ok = self.branch_id.as_deref().is_none_or(|b| {
            request.from_branch_id == b || request.to_branch_id == b
        });
        status_ok && branch_ok
    }
}

/// Transactional view handed to [`LedgerStore::atomically`] closures.
pub struct LedgerTx<'a> {
    ledgers: &'a TransactionalTree,
    movements: &'a TransactionalTree,
    transfers: &'a TransactionalTree,
}

impl LedgerTx<'_> {
    pub fn ledger(&self, key: &LedgerKey) -> TxResult<Option<LedgerRecord>> {
        match self.ledgers.get(key.to_string().as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn require_ledger(&self, key: &LedgerKey) -> TxResult<LedgerRecord> {
        self.ledger(key)?
            .ok_or_else(|| LedgerError::NotFound(format!("ledger {key}")).into())
    }

    /// Write a ledger under its canonical key after checking its invariants.
    pub fn put_ledger(&self, record: &LedgerRecord) -> TxResult<()> {
        record.validate()?;
        let key = record.key()?;
        self.ledgers
            .insert(key.to_string().into_bytes(), encode(record)?)?;
        Ok(())
    }

    /// Store a movement under its content hash and return the hash.
    pub fn record_movement(&self, movement: &MovementRecord) -> TxResult<String> {
        let (hash, cbor) = movement.build()?;
        self.movements.insert(hash.as_bytes(), cbor)?;
        Ok(hash)
    }

    pub fn transfer(&self, id: &str) -> TxResult<Option<TransferRequest>> {
        match self.transfers.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn require_transfer(&self, id: &str) -> TxResult<TransferRequest> {
        self.transfer(id)?
            .ok_or_else(|| LedgerError::NotFound(format!("transfer {id}")).into())
    }

    pub fn put_transfer(&self, request: &TransferRequest) -> TxResult<()> {
        self.transfers
            .insert(request.id.as_bytes(), encode(request)?)?;
        Ok(())
    }

    pub fn remove_transfer(&self, id: &str) -> TxResult<Option<TransferRequest>> {
        match self.transfers.remove(id.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }
}

fn decode<T>(bytes: &[u8]) -> Result<T, LedgerError>
where
    T: for<'b> minicbor::Decode<'b, ()>,
{
    Ok(minicbor::decode(bytes)?)
}

fn encode<T: minicbor::Encode<()>>(document: &T) -> Result<Vec<u8>, LedgerError> {
    minicbor::to_vec(document).map_err(|e| LedgerError::Encode(e.to_string()))
}
