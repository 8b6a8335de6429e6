//! Role-based capability checks, evaluated before any ledger transaction runs
use super::error::LedgerError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Manager,
}

/// The user performing an action, as supplied by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: String,
    pub role: Role,
    pub branch_id: Option<String>, // assigned branch, managers only
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action<'a> {
    ReceiveStock { branch_id: &'a str },
    RecordOutgoing { branch_id: &'a str },
    EditLedger { branch_id: &'a str },
    RequestTransfer { from: &'a str, to: &'a str },
    ResolveTransfer,
    DeleteTransfer,
}

impl fmt::Display for Action<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::ReceiveStock { branch_id } => write!(f, "receive stock at {branch_id}"),
            Action::RecordOutgoing { branch_id } => write!(f, "record outgoing stock at {branch_id}"),
            Action::EditLedger { branch_id } => write!(f, "edit ledgers at {branch_id}"),
            Action::RequestTransfer { from, to } => write!(f, "request a transfer {from} -> {to}"),
            Action::ResolveTransfer => f.write_str("approve or reject transfers"),
            Action::DeleteTransfer => f.write_str("delete transfers"),
        }
    }
}

impl Actor {
    pub fn admin(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: Role::Admin,
            branch_id: None,
        }
    }

    pub fn manager(user_id: impl Into<String>, branch_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: Role::Manager,
            branch_id: Some(branch_id.into()),
        }
    }

    fn manages(&self, branch_id: &str) -> bool {
        self.branch_id.as_deref() == Some(branch_id)
    }

    pub fn can(&self, action: &Action<'_>) -> bool {
        match self.role {
            Role::Admin => true,
            Role::Manager => match action {
                Action::ReceiveStock { branch_id }
                | Action::RecordOutgoing { branch_id }
                | Action::EditLedger { branch_id } => self.manages(branch_id),
                Action::RequestTransfer { from, to } => self.manages(from) || self.manages(to),
                Action::ResolveTransfer | Action::DeleteTransfer => false,
            },
        }
    }

    pub fn authorize(&self, action: &Action<'_>) -> Result<(), LedgerError> {
        if self.can(action) {
            return Ok(());
        }
        tracing::warn!(user = %self.user_id, %action, "action denied");
        Err(LedgerError::Forbidden {
            user: self.user_id.clone(),
            action: action.to_string(),
        })
    }
}
