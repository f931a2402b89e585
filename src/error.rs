use serde::Serialize;
use thiserror::Error;

use crate::entities::{Account, AccountType};

/// One candidate of an ambiguous account lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountCandidate {
    pub name: String,
    pub full_path: String,
    pub account_type: AccountType,
}

impl From<&Account> for AccountCandidate {
    fn from(account: &Account) -> Self {
        AccountCandidate {
            name: account.name.clone(),
            full_path: account.full_path.clone(),
            account_type: account.account_type,
        }
    }
}

/// Error type for every ledger query and report.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("no account found matching '{query}'")]
    NotFound { query: String },

    #[error(
        "multiple accounts match '{query}':\n{}\nPlease be more specific.",
        format_candidates(.candidates)
    )]
    Ambiguous {
        query: String,
        candidates: Vec<AccountCandidate>,
    },

    #[error("{context}: {source}")]
    StoreFailure {
        context: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("query cancelled")]
    Cancelled,

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl LedgerError {
    pub fn store(context: &'static str, source: rusqlite::Error) -> Self {
        LedgerError::StoreFailure { context, source }
    }

    /// Candidates of an ambiguous match, empty for every other variant.
    pub fn candidates(&self) -> &[AccountCandidate] {
        match self {
            LedgerError::Ambiguous { candidates, .. } => candidates,
            _ => &[],
        }
    }
}

fn format_candidates(candidates: &[AccountCandidate]) -> String {
    candidates
        .iter()
        .map(|c| format!("  - {} [{}]", c.name, c.account_type))
        .collect::<Vec<_>>()
        .join("\n")
}

pub type Result<T> = std::result::Result<T, LedgerError>;
