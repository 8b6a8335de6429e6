//! Service layer API for stock and transfer operations
//!
//! Each `InventoryService` method checks the actor's capability, validates its input and
//! then runs one atomic transaction. The `*_in` functions are the transaction bodies
//! themselves; they take no actor and can be composed inside a larger
//! [`LedgerStore::atomically`] call.
use super::auth::{Action, Actor};
use super::config::LedgerConfig;
use super::error::{LedgerError, ValidationError};
use super::fifo;
use super::ledger::{LedgerKey, LedgerRecord};
use super::lot::LotEntry;
use super::movement::{MovementKind, MovementRecord};
use super::store::{LedgerStore, LedgerTx, TransferFilter, TxResult};
use super::transfer::TransferRequest;
use super::types::TimeStamp;
use super::utils;
use chrono::Utc;
use rust_decimal::Decimal;

/// A purchase arriving at a branch.
#[derive(Debug, Clone)]
pub struct StockIn {
    pub branch_id: String,
    pub item_id: String,
    pub quantity: u64,
    pub unit_cost: Decimal,
    pub supplier: String,
    pub acquired_at: Option<TimeStamp<Utc>>, // defaults to now
    pub rack_location: Option<String>,
}

impl StockIn {
    pub fn new(
        branch_id: &str,
        item_id: &str,
        quantity: u64,
        unit_cost: Decimal,
        supplier: &str,
    ) -> Self {
        Self {
            branch_id: branch_id.to_string(),
            item_id: item_id.to_string(),
            quantity,
            unit_cost,
            supplier: supplier.to_string(),
            acquired_at: None,
            rack_location: None,
        }
    }
    pub fn acquired_at(mut self, acquired_at: TimeStamp<Utc>) -> Self {
        self.acquired_at = Some(acquired_at);
        self
    }
    pub fn rack_location(mut self, rack_location: &str) -> Self {
        self.rack_location = Some(rack_location.to_string());
        self
    }
}

/// Stock leaving a branch for a reason other than a transfer.
#[derive(Debug, Clone)]
pub struct StockOut {
    pub branch_id: String,
    pub item_id: String,
    pub quantity: u64,
    pub reason: String,
}

impl StockOut {
    pub fn new(branch_id: &str, item_id: &str, quantity: u64, reason: &str) -> Self {
        Self {
            branch_id: branch_id.to_string(),
            item_id: item_id.to_string(),
            quantity,
            reason: reason.to_string(),
        }
    }
}

/// Add `lot` to the ledger at `key`, creating the ledger if needed, and log the receipt.
pub fn receive_stock_in(
    tx: &LedgerTx<'_>,
    key: &LedgerKey,
    lot: &LotEntry,
    rack_location: Option<&str>,
) -> TxResult<MovementRecord> {
    let record = match tx.ledger(key)? {
        Some(mut record) => {
            record.push_lots([lot.clone()]);
            if let Some(location) = rack_location {
                record.set_rack_location(Some(location.to_string()));
            }
            record
        }
        None => LedgerRecord::with_entries(
            key,
            vec![lot.clone()],
            rack_location.map(str::to_string),
        ),
    };
    tx.put_ledger(&record)?;

    let movement = MovementRecord::incoming(key, lot);
    tx.record_movement(&movement)?;
    Ok(movement)
}

/// Consume `quantity` from the ledger at `key` in FIFO order and log the removal.
pub fn record_outgoing_in(
    tx: &LedgerTx<'_>,
    key: &LedgerKey,
    quantity: u64,
    reason: &str,
) -> TxResult<MovementRecord> {
    let mut ledger = tx.require_ledger(key)?;
    let consumption = fifo::consume(&ledger.entries, quantity)?;

    ledger.replace_entries(consumption.remaining);
    tx.put_ledger(&ledger)?;

    let movement = MovementRecord::outgoing(key, quantity, reason, consumption.total_value_removed);
    tx.record_movement(&movement)?;
    Ok(movement)
}

/// Move the requested lots from source to destination and complete the request.
///
/// Transferred lots keep their cost and acquisition time and are appended after whatever
/// the destination already holds.
pub fn approve_transfer_in(
    tx: &LedgerTx<'_>,
    transfer_id: &str,
    approved_by: Option<&str>,
) -> TxResult<TransferRequest> {
    let mut request = tx.require_transfer(transfer_id)?;
    request.ensure_pending()?;

    let source_key = request.source_key()?;
    let mut source = tx.require_ledger(&source_key)?;
    let consumption = fifo::consume(&source.entries, request.quantity)?;
    let total_value = consumption.total_value_removed;

    source.replace_entries(consumption.remaining);
    tx.put_ledger(&source)?;

    let destination_key = request.destination_key()?;
    let destination = match tx.ledger(&destination_key)? {
        Some(mut existing) => {
            existing.push_lots(consumption.removed);
            existing
        }
        None => LedgerRecord::with_entries(&destination_key, consumption.removed, None),
    };
    tx.put_ledger(&destination)?;

    for (kind, key) in [
        (MovementKind::TransferOut, &source_key),
        (MovementKind::TransferIn, &destination_key),
    ] {
        let leg = MovementRecord::transfer_leg(kind, key, request.quantity, total_value, &request.id);
        tx.record_movement(&leg)?;
    }

    request.complete(total_value, approved_by);
    tx.put_transfer(&request)?;
    Ok(request)
}

pub fn reject_transfer_in(
    tx: &LedgerTx<'_>,
    transfer_id: &str,
    rejected_by: Option<&str>,
) -> TxResult<TransferRequest> {
    let mut request = tx.require_transfer(transfer_id)?;
    request.ensure_pending()?;
    request.reject(rejected_by);
    tx.put_transfer(&request)?;
    Ok(request)
}

#[derive(Clone)]
pub struct InventoryService {
    store: LedgerStore,
}

impl InventoryService {
    pub fn new(store: LedgerStore) -> Self {
        Self { store }
    }

    pub fn open(config: &LedgerConfig) -> Result<Self, LedgerError> {
        Ok(Self::new(LedgerStore::open(config)?))
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    /// Record a purchase lot arriving at a branch
    pub fn receive_stock(
        &self,
        actor: &Actor,
        stock: StockIn,
    ) -> Result<MovementRecord, LedgerError> {
        actor.authorize(&Action::ReceiveStock {
            branch_id: &stock.branch_id,
        })?;
        let key = LedgerKey::new(&stock.branch_id, &stock.item_id)?;
        let lot = LotEntry::new(
            stock.quantity,
            stock.unit_cost,
            stock.supplier.trim(),
            stock.acquired_at.unwrap_or_else(TimeStamp::new),
        )?;

        let movement = self.store.atomically(|tx| {
            receive_stock_in(tx, &key, &lot, stock.rack_location.as_deref())
        })?;

        tracing::info!(
            ledger = %key,
            quantity = lot.quantity,
            value = %lot.total_value,
            user = %actor.user_id,
            "received stock"
        );
        Ok(movement)
    }

    /// Remove stock from a branch, oldest lots first
    pub fn record_outgoing(
        &self,
        actor: &Actor,
        stock: StockOut,
    ) -> Result<MovementRecord, LedgerError> {
        actor.authorize(&Action::RecordOutgoing {
            branch_id: &stock.branch_id,
        })?;
        let key = LedgerKey::new(&stock.branch_id, &stock.item_id)?;
        if stock.quantity == 0 {
            return Err(ValidationError::ZeroQuantity.into());
        }
        let reason = stock.reason.trim();
        if reason.is_empty() {
            return Err(ValidationError::EmptyReason.into());
        }

        let movement = self
            .store
            .atomically(|tx| record_outgoing_in(tx, &key, stock.quantity, reason))?;

        tracing::info!(
            ledger = %key,
            quantity = stock.quantity,
            value = %movement.total_value,
            user = %actor.user_id,
            "recorded outgoing stock"
        );
        Ok(movement)
    }

    pub fn set_rack_location(
        &self,
        actor: &Actor,
        branch_id: &str,
        item_id: &str,
        rack_location: Option<&str>,
    ) -> Result<LedgerRecord, LedgerError> {
        actor.authorize(&Action::EditLedger { branch_id })?;
        let key = LedgerKey::new(branch_id, item_id)?;

        self.store.atomically(|tx| {
            let mut record = tx.require_ledger(&key)?;
            record.set_rack_location(rack_location.map(str::to_string));
            tx.put_ledger(&record)?;
            Ok(record)
        })
    }

    /// Create a pending transfer request
    pub fn request_transfer(
        &self,
        actor: &Actor,
        from_branch_id: &str,
        to_branch_id: &str,
        item_id: &str,
        quantity: u64,
    ) -> Result<TransferRequest, LedgerError> {
        actor.authorize(&Action::RequestTransfer {
            from: from_branch_id,
            to: to_branch_id,
        })?;
        let id = utils::new_uuid_to_bech32("xfer_")
            .map_err(|e| LedgerError::Encode(e.to_string()))?;
        let request = TransferRequest::new(
            id,
            from_branch_id,
            to_branch_id,
            item_id,
            quantity,
            &actor.user_id,
        )?;

        self.store.atomically(|tx| {
            if tx.transfer(&request.id)?.is_some() {
                return Err(LedgerError::AlreadyExists(request.id.clone()).into());
            }
            tx.put_transfer(&request)
        })?;

        tracing::info!(
            transfer = %request.id,
            from = %request.from_branch_id,
            to = %request.to_branch_id,
            item = %request.item_id,
            quantity = request.quantity,
            "transfer requested"
        );
        Ok(request)
    }

    /// Approve a pending transfer, moving its lots between branches
    pub fn approve_transfer(
        &self,
        actor: &Actor,
        transfer_id: &str,
    ) -> Result<TransferRequest, LedgerError> {
        actor.authorize(&Action::ResolveTransfer)?;

        let request = self
            .store
            .atomically(|tx| approve_transfer_in(tx, transfer_id, Some(actor.user_id.as_str())))?;

        tracing::info!(
            transfer = %request.id,
            value = ?request.total_value,
            user = %actor.user_id,
            "transfer completed"
        );
        Ok(request)
    }

    /// Reject a pending transfer. No ledger is touched.
    pub fn reject_transfer(
        &self,
        actor: &Actor,
        transfer_id: &str,
    ) -> Result<TransferRequest, LedgerError> {
        actor.authorize(&Action::ResolveTransfer)?;

        let request = self
            .store
            .atomically(|tx| reject_transfer_in(tx, transfer_id, Some(actor.user_id.as_str())))?;

        tracing::info!(transfer = %request.id, user = %actor.user_id, "transfer rejected");
        Ok(request)
    }

    /// Administrative removal of a request in any state. Ledger effects of a completed
    /// transfer are not reversed.
    pub fn delete_transfer(
        &self,
        actor: &Actor,
        transfer_id: &str,
    ) -> Result<TransferRequest, LedgerError> {
        actor.authorize(&Action::DeleteTransfer)?;

        let request = self.store.atomically(|tx| {
            tx.remove_transfer(transfer_id)?
                .ok_or_else(|| LedgerError::NotFound(format!("transfer {transfer_id}")).into())
        })?;

        if request.status.is_terminal() {
            tracing::warn!(
                transfer = %request.id,
                status = %request.status,
                user = %actor.user_id,
                "deleted resolved transfer; ledgers left as they are"
            );
        } else {
            tracing::info!(transfer = %request.id, user = %actor.user_id, "transfer deleted");
        }
        Ok(request)
    }

    pub fn ledger(
        &self,
        branch_id: &str,
        item_id: &str,
    ) -> Result<Option<LedgerRecord>, LedgerError> {
        self.store.get(&LedgerKey::new(branch_id, item_id)?)
    }

    pub fn ledgers_for_branch(&self, branch_id: &str) -> Result<Vec<LedgerRecord>, LedgerError> {
        self.store.ledgers_for_branch(branch_id)
    }

    pub fn movements_for(
        &self,
        branch_id: &str,
        item_id: &str,
    ) -> Result<Vec<MovementRecord>, LedgerError> {
        self.store.movements_for(&LedgerKey::new(branch_id, item_id)?)
    }

    pub fn transfer(&self, transfer_id: &str) -> Result<Option<TransferRequest>, LedgerError> {
        self.store.transfer(transfer_id)
    }

    pub fn transfers(&self, filter: &TransferFilter) -> Result<Vec<TransferRequest>, LedgerError> {
        self.store.transfers(filter)
    }
}
