// Report Engine
//
// The six report operations. Each resolves names through the resolver,
// pulls rows from the store, aggregates in memory and hands the result to
// the pure formatters in `report`.

use chrono::{Local, NaiveDate};
use std::collections::BTreeMap;
use tracing::debug;

use crate::cancel::CancelToken;
use crate::dates::{first_of_month, month_window_start, parse_date_arg, DateRange};
use crate::entities::{AccountType, CategoryTotal, MonthSummary};
use crate::error::{LedgerError, Result};
use crate::money::Money;
use crate::report;
use crate::resolver::AccountResolver;
use crate::store::LedgerStore;

pub const DEFAULT_CURRENCY: &str = "EUR";
pub const DEFAULT_TRANSACTION_LIMIT: usize = 50;
pub const DEFAULT_SEARCH_LIMIT: usize = 20;
pub const DEFAULT_MONTHS: u32 = 6;

/// Engine-wide settings; see `Config::report_options`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOptions {
    /// Display code appended to every amount
    pub currency: String,
    pub transaction_limit: usize,
    pub search_limit: usize,
    pub months: u32,
}

impl Default for ReportOptions {
    fn default() -> Self {
        ReportOptions {
            currency: DEFAULT_CURRENCY.to_string(),
            transaction_limit: DEFAULT_TRANSACTION_LIMIT,
            search_limit: DEFAULT_SEARCH_LIMIT,
            months: DEFAULT_MONTHS,
        }
    }
}

/// Non-positive caller values fall back to `default`.
fn positive_or(value: i64, default: usize) -> usize {
    usize::try_from(value)
        .ok()
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

pub struct ReportEngine<S> {
    store: S,
    options: ReportOptions,
    today: Option<NaiveDate>,
}

impl<S: LedgerStore> ReportEngine<S> {
    pub fn new(store: S, options: ReportOptions) -> Self {
        ReportEngine {
            store,
            options,
            today: None,
        }
    }

    /// Pin "today" for relative date defaults.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Give the store back, e.g. to close it explicitly.
    pub fn into_store(self) -> S {
        self.store
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    fn resolver(&self) -> AccountResolver<'_, S> {
        AccountResolver::new(&self.store)
    }

    fn currency(&self) -> &str {
        &self.options.currency
    }

    /// Chart of accounts, optionally restricted to one type tag.
    pub fn list_accounts(&self, cancel: &CancelToken, account_type: Option<&str>) -> Result<String> {
        let mut accounts = self.store.list_accounts(cancel)?;
        if let Some(filter) = account_type.map(str::trim).filter(|f| !f.is_empty()) {
            let wanted = filter.to_uppercase();
            accounts.retain(|a| a.account_type.as_str() == wanted);
        }
        Ok(report::accounts(&accounts))
    }

    pub fn balance(&self, cancel: &CancelToken, name: &str, as_of: Option<&str>) -> Result<String> {
        let as_of = parse_date_arg(as_of, "date")?;
        let account = self.resolver().resolve(cancel, name)?;
        let amount = self.store.balance_for_account(cancel, &account.id, as_of)?;
        Ok(report::balance(&account, as_of, amount, self.currency()))
    }

    pub fn transactions(
        &self,
        cancel: &CancelToken,
        name: &str,
        start: Option<&str>,
        end: Option<&str>,
        limit: i64,
    ) -> Result<String> {
        let range = DateRange::new(
            parse_date_arg(start, "start_date")?,
            parse_date_arg(end, "end_date")?,
        );
        let limit = positive_or(limit, self.options.transaction_limit);
        let account = self.resolver().resolve(cancel, name)?;
        let transactions = self
            .store
            .splits_for_account(cancel, &account.id, range, limit)?;
        Ok(report::transactions(
            &account,
            range,
            &transactions,
            self.currency(),
        ))
    }

    /// Expense totals per account. Defaults to the current month so far.
    pub fn spending_by_category(
        &self,
        cancel: &CancelToken,
        start: Option<&str>,
        end: Option<&str>,
        parent: Option<&str>,
    ) -> Result<String> {
        let today = self.today();
        let start = parse_date_arg(start, "start_date")?.unwrap_or_else(|| first_of_month(today));
        let end = parse_date_arg(end, "end_date")?.unwrap_or(today);

        let parent_id = match parent.map(str::trim).filter(|p| !p.is_empty()) {
            Some(name) => Some(self.resolver().resolve(cancel, name)?.id),
            None => None,
        };

        let groups = self.store.expense_splits(cancel, start, end)?;
        let mut categories: Vec<CategoryTotal> = groups
            .iter()
            .filter(|g| match &parent_id {
                Some(id) => g.parent_id.as_ref() == Some(id),
                None => true,
            })
            .map(CategoryTotal::from_group)
            .collect();
        categories.sort_by(|a, b| b.total.cmp_value(&a.total).then_with(|| a.name.cmp(&b.name)));

        let mut total = Money::zero();
        for category in &categories {
            total.accumulate(category.total);
        }
        debug!(%start, %end, categories = categories.len(), %total, "aggregated spending");
        Ok(report::spending(start, end, &categories, total, self.currency()))
    }

    /// Monthly income, expenses and net over the last `months` calendar months.
    pub fn income_vs_expenses(&self, cancel: &CancelToken, months: i64) -> Result<String> {
        let months = u32::try_from(positive_or(months, self.options.months as usize))
            .unwrap_or(u32::MAX);
        let today = self.today();
        let start = month_window_start(today, months);

        let rows = self.store.monthly_totals(cancel, start, today)?;
        let mut by_month: BTreeMap<String, MonthSummary> = BTreeMap::new();
        for row in rows {
            let summary = by_month
                .entry(row.month.clone())
                .or_insert_with(|| MonthSummary::new(row.month.clone()));
            match row.account_type {
                AccountType::Income => summary.income = -row.total,
                AccountType::Expense => summary.expenses = row.total,
                _ => {}
            }
        }
        let summaries: Vec<MonthSummary> = by_month.into_values().collect();
        Ok(report::income_vs_expenses(months, &summaries))
    }

    pub fn search(&self, cancel: &CancelToken, query: &str, limit: i64) -> Result<String> {
        let query = query.trim();
        if query.is_empty() {
            return Err(LedgerError::InvalidInput(
                "search query must not be empty".to_string(),
            ));
        }
        let limit = positive_or(limit, self.options.search_limit);
        let transactions = self.store.search_transactions(cancel, query, limit)?;
        Ok(report::search(query, &transactions, self.currency()))
    }
}
