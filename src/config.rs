use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::error::ValidationError;

pub const DEFAULT_DB_PATH: &str = "branch-ledger.db";
pub const DEFAULT_MAX_ATTEMPTS: u32 = 16;

#[derive(Clone, Debug)]
pub struct LedgerConfig {
    pub db_path: PathBuf,
    /// Times a conflicting transaction is run before giving up with `Conflict`.
    pub max_attempts: u32,
    /// Throwaway database removed on drop, at a fresh path (`db_path` is ignored).
    pub temporary: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            temporary: false,
        }
    }
}

impl LedgerConfig {
    pub fn from_env() -> Result<Self> {
        let db_path = std::env::var("LEDGER_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DB_PATH));
        let max_attempts = match std::env::var("LEDGER_MAX_ATTEMPTS") {
            Ok(raw) => raw
                .parse::<u32>()
                .with_context(|| format!("LEDGER_MAX_ATTEMPTS must be an integer, got {raw:?}"))?,
            Err(_) => DEFAULT_MAX_ATTEMPTS,
        };

        let config = Self {
            db_path,
            max_attempts,
            temporary: false,
        };
        config.validate().context("invalid ledger configuration")?;
        Ok(config)
    }

    pub fn temporary() -> Self {
        Self {
            temporary: true,
            ..Self::default()
        }
    }

    pub fn with_db_path(mut self, db_path: impl Into<PathBuf>) -> Self {
        self.db_path = db_path.into();
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_attempts == 0 {
            return Err(ValidationError::NoAttempts);
        }
        Ok(())
    }
}
