// Ledger Store capability
//
// The read-only query surface the resolver and report engine depend on.
// `LedgerDb` is the SQLite implementation; anything else that can answer
// these seven queries can stand in for it.

use chrono::NaiveDate;

use crate::cancel::CancelToken;
use crate::dates::DateRange;
use crate::entities::{Account, ExpenseGroup, MonthlyTotalRow, Transaction};
use crate::error::Result;
use crate::money::Money;

pub trait LedgerStore {
    /// Every real account (no ROOT nodes, no templates), ordered by name.
    fn list_accounts(&self, cancel: &CancelToken) -> Result<Vec<Account>>;

    /// Case-insensitive substring match on the account name, ordered by name.
    fn find_accounts_by_name(&self, cancel: &CancelToken, fragment: &str) -> Result<Vec<Account>>;

    /// Transactions touching `account_id` within `range`, newest first.
    ///
    /// `splits[0]` of each transaction is the queried account's leg, followed
    /// by one split per other leg. A positive `limit` caps the number of
    /// transactions returned.
    fn splits_for_account(
        &self,
        cancel: &CancelToken,
        account_id: &str,
        range: DateRange,
        limit: usize,
    ) -> Result<Vec<Transaction>>;

    /// Sum of the account's splits up to the end of `as_of` (all time when
    /// `None`). No splits yields zero over the default denominator.
    fn balance_for_account(
        &self,
        cancel: &CancelToken,
        account_id: &str,
        as_of: Option<NaiveDate>,
    ) -> Result<Money>;

    /// Distinct transactions whose description or any split memo contains
    /// `query` (case-insensitive), newest first, each with all its splits.
    fn search_transactions(
        &self,
        cancel: &CancelToken,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Transaction>>;

    /// Splits of EXPENSE accounts within the inclusive range, grouped by account.
    fn expense_splits(
        &self,
        cancel: &CancelToken,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ExpenseGroup>>;

    /// Per-month INCOME and EXPENSE totals within the inclusive range.
    fn monthly_totals(
        &self,
        cancel: &CancelToken,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<MonthlyTotalRow>>;
}

impl<S: LedgerStore + ?Sized> LedgerStore for std::sync::Arc<S> {
    fn list_accounts(&self, cancel: &CancelToken) -> Result<Vec<Account>> {
        (**self).list_accounts(cancel)
    }

    fn find_accounts_by_name(&self, cancel: &CancelToken, fragment: &str) -> Result<Vec<Account>> {
        (**self).find_accounts_by_name(cancel, fragment)
    }

    fn splits_for_account(
        &self,
        cancel: &CancelToken,
        account_id: &str,
        range: DateRange,
        limit: usize,
    ) -> Result<Vec<Transaction>> {
        (**self).splits_for_account(cancel, account_id, range, limit)
    }

    fn balance_for_account(
        &self,
        cancel: &CancelToken,
        account_id: &str,
        as_of: Option<NaiveDate>,
    ) -> Result<Money> {
        (**self).balance_for_account(cancel, account_id, as_of)
    }

    fn search_transactions(
        &self,
        cancel: &CancelToken,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Transaction>> {
        (**self).search_transactions(cancel, query, limit)
    }

    fn expense_splits(
        &self,
        cancel: &CancelToken,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ExpenseGroup>> {
        (**self).expense_splits(cancel, start, end)
    }

    fn monthly_totals(
        &self,
        cancel: &CancelToken,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<MonthlyTotalRow>> {
        (**self).monthly_totals(cancel, start, end)
    }
}
