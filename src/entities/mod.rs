// Entity Models
//
// Everything here is read from the ledger per request and discarded
// once the report is rendered.

pub mod account;
pub mod summary;
pub mod transaction;

pub use account::{Account, AccountNode, AccountTree, AccountType, UnknownAccountType, TEMPLATE_ROOT_NAME};
pub use summary::{CategoryTotal, ExpenseGroup, MonthSummary, MonthlyTotalRow};
pub use transaction::{Split, Transaction};
