// Ledger Query - Core Library
// Read-only queries and reports over a GnuCash SQLite ledger, shared by the
// CLI and the API server.

pub mod cancel;
pub mod config;
pub mod dates;
pub mod db;
pub mod entities;
pub mod error;
pub mod logging;
pub mod money;
pub mod report;
pub mod resolver;
pub mod service;
pub mod store;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use cancel::{CancelGuard, CancelToken};
pub use config::{Config, ConfigError};
pub use dates::DateRange;
pub use db::LedgerDb;
pub use entities::{
    Account, AccountType, CategoryTotal, ExpenseGroup, MonthSummary, MonthlyTotalRow, Split,
    Transaction,
};
pub use error::{AccountCandidate, LedgerError, Result};
pub use logging::init_tracing;
pub use money::{format_decimal, Money};
pub use resolver::AccountResolver;
pub use service::{ReportEngine, ReportOptions};
pub use store::LedgerStore;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
