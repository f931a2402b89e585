// Derived aggregation values
//
// Store-side rows (ExpenseGroup, MonthlyTotalRow) and the report-side
// totals built from them. All of them live for one request only.

use serde::Serialize;

use super::AccountType;
use crate::money::Money;

/// Expense splits of one account within a date range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpenseGroup {
    pub account_id: String,
    pub account_name: String,
    pub parent_id: Option<String>,
    pub values: Vec<Money>,
}

/// One (month, account type) aggregate from the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyTotalRow {
    /// `YYYY-MM`
    pub month: String,
    pub account_type: AccountType,
    pub total: Money,
}

/// Spending of one expense account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryTotal {
    pub name: String,
    pub total: Money,
    pub count: usize,
}

impl CategoryTotal {
    pub fn from_group(group: &ExpenseGroup) -> Self {
        let mut total = Money::zero();
        for value in &group.values {
            total.accumulate(*value);
        }
        CategoryTotal {
            name: group.account_name.clone(),
            total,
            count: group.values.len(),
        }
    }
}

/// Income against expenses for one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthSummary {
    pub month: String,
    /// Positive when money came in
    pub income: Money,
    pub expenses: Money,
}

impl MonthSummary {
    pub fn new(month: impl Into<String>) -> Self {
        MonthSummary {
            month: month.into(),
            income: Money::zero(),
            expenses: Money::zero(),
        }
    }

    pub fn net(&self) -> Money {
        self.income - self.expenses
    }
}
