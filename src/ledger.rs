//! Per-(branch, item) ledgers and their canonical composite key
use super::error::{LedgerError, ValidationError};
use super::lot::LotEntry;
use super::types::TimeStamp;
use chrono::Utc;
use rust_decimal::Decimal;
use std::fmt;

pub const KEY_SEPARATOR: char = '_';

/// Identity of a ledger. Its string form `"{branch_id}_{item_id}"` is the storage key.
///
/// Branch ids may not contain the separator, so the first `_` always splits the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LedgerKey {
    branch_id: String,
    item_id: String,
}

impl LedgerKey {
    pub fn new(branch_id: &str, item_id: &str) -> Result<Self, ValidationError> {
        let branch_id = Self::check_branch(branch_id)?;
        let item_id = item_id.trim();
        if item_id.is_empty() {
            return Err(ValidationError::InvalidIdentifier(item_id.to_string()));
        }
        Ok(Self {
            branch_id: branch_id.to_string(),
            item_id: item_id.to_string(),
        })
    }

    pub fn parse(key: &str) -> Result<Self, ValidationError> {
        match key.split_once(KEY_SEPARATOR) {
            Some((branch_id, item_id)) => Self::new(branch_id, item_id),
            None => Err(ValidationError::InvalidIdentifier(key.to_string())),
        }
    }

    /// Prefix shared by every ledger key of one branch.
    pub fn branch_prefix(branch_id: &str) -> Result<String, ValidationError> {
        let branch_id = Self::check_branch(branch_id)?;
        Ok(format!("{branch_id}{KEY_SEPARATOR}"))
    }

    // a separator in the branch would make the key split ambiguously
    fn check_branch(branch_id: &str) -> Result<&str, ValidationError> {
        let branch_id = branch_id.trim();
        if branch_id.is_empty() || branch_id.contains(KEY_SEPARATOR) {
            return Err(ValidationError::InvalidIdentifier(branch_id.to_string()));
        }
        Ok(branch_id)
    }

    pub fn branch_id(&self) -> &str {
        &self.branch_id
    }

    pub fn item_id(&self) -> &str {
        &self.item_id
    }
}

impl fmt::Display for LedgerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.branch_id, KEY_SEPARATOR, self.item_id)
    }
}

/// Stock of one item held at one branch, as an ordered list of lots.
///
/// `entries` is kept in insertion order, which is also the FIFO consumption order.
/// Totals are computed on read and never stored.
#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct LedgerRecord {
    #[n(0)]
    pub branch_id: String,
    #[n(1)]
    pub item_id: String,
    #[n(2)]
    pub rack_location: Option<String>,
    #[n(3)]
    pub entries: Vec<LotEntry>,
    #[n(4)]
    pub updated_at: TimeStamp<Utc>,
}

impl LedgerRecord {
    pub fn new(key: &LedgerKey, rack_location: Option<String>) -> Self {
        Self::with_entries(key, Vec::new(), rack_location)
    }

    pub fn with_entries(
        key: &LedgerKey,
        entries: Vec<LotEntry>,
        rack_location: Option<String>,
    ) -> Self {
        let mut record = Self {
            branch_id: key.branch_id().to_string(),
            item_id: key.item_id().to_string(),
            rack_location: normalise_location(rack_location),
            entries: Vec::new(),
            updated_at: TimeStamp::new(),
        };
        record.replace_entries(entries);
        record
    }

    pub fn key(&self) -> Result<LedgerKey, ValidationError> {
        LedgerKey::new(&self.branch_id, &self.item_id)
    }

    /// Never wraps; `validate` keeps stored ledgers within `u64`.
    pub fn total_quantity(&self) -> u64 {
        self.entries
            .iter()
            .fold(0u64, |total, e| total.saturating_add(e.quantity))
    }

    pub fn total_value(&self) -> Decimal {
        self.entries
            .iter()
            .fold(Decimal::ZERO, |total, e| total.saturating_add(e.total_value))
    }

    pub fn average_cost(&self) -> Decimal {
        let quantity = self.total_quantity();
        if quantity == 0 {
            return Decimal::ZERO;
        }
        self.total_value() / Decimal::from(quantity)
    }

    /// An empty ledger still exists physically but holds no stock.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append lots after everything already held.
    pub fn push_lots(&mut self, lots: impl IntoIterator<Item = LotEntry>) {
        self.entries
            .extend(lots.into_iter().filter(|lot| lot.quantity > 0));
        self.updated_at = TimeStamp::new();
    }

    /// Replace the whole lot list, dropping zero-quantity lots.
    pub fn replace_entries(&mut self, entries: Vec<LotEntry>) {
        self.entries = entries;
        self.entries.retain(|lot| lot.quantity > 0);
        self.updated_at = TimeStamp::new();
    }

    pub fn set_rack_location(&mut self, rack_location: Option<String>) {
        self.rack_location = normalise_location(rack_location);
        self.updated_at = TimeStamp::new();
    }

    /// Checks every persisted invariant. Called by the store before each write.
    pub fn validate(&self) -> Result<(), LedgerError> {
        self.key()?;
        let mut quantity = 0u64;
        let mut value = Decimal::ZERO;
        for entry in &self.entries {
            entry.validate()?;
            quantity = quantity
                .checked_add(entry.quantity)
                .ok_or(ValidationError::QuantityOverflow)?;
            value = value
                .checked_add(entry.total_value)
                .ok_or(ValidationError::ValueOverflow)?;
        }
        Ok(())
    }
}

fn normalise_location(rack_location: Option<String>) -> Option<String> {
    rack_location
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lot(quantity: u64, unit_cost: i64) -> LotEntry {
        LotEntry::new(quantity, Decimal::from(unit_cost), "acme", TimeStamp::new()).unwrap()
    }

    #[test]
    fn key_format_is_branch_underscore_item() {
        let key = LedgerKey::new("north", "sku_42").unwrap();
        assert_eq!(key.to_string(), "north_sku_42");

        let parsed = LedgerKey::parse("north_sku_42").unwrap();
        assert_eq!(parsed, key);
        assert_eq!(parsed.item_id(), "sku_42");
    }

    #[test]
    fn key_rejects_ambiguous_or_empty_ids() {
        assert!(LedgerKey::new("north_east", "sku").is_err());
        assert!(LedgerKey::new("", "sku").is_err());
        assert!(LedgerKey::new("north", " ").is_err());
        assert!(LedgerKey::parse("nounderscore").is_err());
    }

    #[test]
    fn derived_totals() {
        let key = LedgerKey::new("north", "sku").unwrap();
        let record = LedgerRecord::with_entries(&key, vec![lot(5, 10), lot(5, 20)], None);

        assert_eq!(record.total_quantity(), 10);
        assert_eq!(record.total_value(), Decimal::from(150));
        assert_eq!(record.average_cost(), Decimal::from(15));
    }

    #[test]
    fn empty_ledger_has_zero_average() {
        let key = LedgerKey::new("north", "sku").unwrap();
        let record = LedgerRecord::new(&key, Some("  ".into()));

        assert!(record.is_empty());
        assert_eq!(record.average_cost(), Decimal::ZERO);
        assert_eq!(record.rack_location, None);
    }

    #[test]
    fn push_lots_appends_in_order() {
        let key = LedgerKey::new("north", "sku").unwrap();
        let mut record = LedgerRecord::with_entries(&key, vec![lot(1, 1)], None);
        record.push_lots(vec![lot(2, 2), lot(3, 3)]);

        let quantities: Vec<u64> = record.entries.iter().map(|e| e.quantity).collect();
        assert_eq!(quantities, vec![1, 2, 3]);
    }

    #[test]
    fn branch_prefix_refuses_separator() {
        assert_eq!(LedgerKey::branch_prefix(" north ").unwrap(), "north_");
        assert!(matches!(
            LedgerKey::branch_prefix("north_x"),
            Err(ValidationError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn totals_beyond_u64_fail_validation() {
        let key = LedgerKey::new("north", "sku").unwrap();
        let record = LedgerRecord::with_entries(&key, vec![lot(u64::MAX, 0), lot(1, 0)], None);

        assert!(matches!(
            record.validate(),
            Err(LedgerError::Validation(ValidationError::QuantityOverflow))
        ));
        assert_eq!(record.total_quantity(), u64::MAX);
    }

    #[test]
    fn record_cbor_roundtrip() {
        let key = LedgerKey::new("north", "sku").unwrap();
        let record = LedgerRecord::with_entries(&key, vec![lot(5, 10)], Some("A-1".into()));

        let encoded = minicbor::to_vec(&record).unwrap();
        let decoded: LedgerRecord = minicbor::decode(&encoded).unwrap();
        assert_eq!(decoded, record);
    }
}
