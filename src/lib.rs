pub mod auth;
pub mod config;
pub mod error;
pub mod fifo;
pub mod ledger;
pub mod lot;
pub mod movement;
pub mod service;
pub mod store;
pub mod transfer;
pub mod types;
pub mod utils;

pub use error::{LedgerError, ValidationError};
pub use ledger::{LedgerKey, LedgerRecord};
pub use lot::LotEntry;
pub use service::InventoryService;
pub use store::LedgerStore;
