// Report formatting
//
// Pure functions from aggregated ledger data to the text handed back to
// callers. Nothing here touches the store.

use chrono::NaiveDate;

use crate::dates::{DateRange, ARG_DATE_FORMAT};
use crate::entities::{Account, CategoryTotal, MonthSummary, Transaction};
use crate::money::Money;

const INCOME_RULE_WIDTH: usize = 48;

fn day(date: NaiveDate) -> String {
    date.format(ARG_DATE_FORMAT).to_string()
}

// ============================================================================
// ACCOUNTS
// ============================================================================

/// `FULL:PATH [TYPE]` plus hidden/placeholder markers.
pub fn account_line(account: &Account) -> String {
    let mut line = format!("{} [{}]", account.full_path, account.account_type);
    if account.hidden {
        line.push_str(" (hidden)");
    }
    if account.placeholder {
        line.push_str(" (placeholder)");
    }
    line
}

pub fn accounts(accounts: &[Account]) -> String {
    if accounts.is_empty() {
        return "No accounts found.".to_string();
    }
    let mut out = String::new();
    for account in accounts {
        out.push_str(&account_line(account));
        out.push('\n');
    }
    out
}

// ============================================================================
// BALANCE
// ============================================================================

pub fn balance(account: &Account, as_of: Option<NaiveDate>, amount: Money, currency: &str) -> String {
    let label = match as_of {
        Some(date) => format!("as of {}", day(date)),
        None => "current".to_string(),
    };
    format!(
        "Account: {}\nBalance ({}): {} {}",
        account.label(),
        label,
        amount,
        currency
    )
}

// ============================================================================
// TRANSACTIONS
// ============================================================================

fn range_suffix(range: DateRange) -> String {
    let bounds: Vec<String> = [
        range.start.map(|d| format!("from {}", day(d))),
        range.end.map(|d| format!("to {}", day(d))),
    ]
    .into_iter()
    .flatten()
    .collect();

    if bounds.is_empty() {
        String::new()
    } else {
        format!(" ({})", bounds.join(" "))
    }
}

pub fn transactions(
    account: &Account,
    range: DateRange,
    transactions: &[Transaction],
    currency: &str,
) -> String {
    if transactions.is_empty() {
        return format!(
            "No transactions found for {} in the given period.",
            account.name
        );
    }

    let mut out = format!(
        "Transactions for {}{}\nShowing {} transactions:\n\n",
        account.label(),
        range_suffix(range),
        transactions.len()
    );
    for tx in transactions {
        let amount = tx.primary_split().map(|s| s.value).unwrap_or_default();
        out.push_str(&format!(
            "{}  {} {}  {}",
            tx.date_label(),
            amount,
            currency,
            tx.description
        ));
        let counterparts = tx.counterpart_names();
        if !counterparts.is_empty() {
            out.push_str(&format!("  [{}]", counterparts.join(", ")));
        }
        out.push('\n');
    }
    out
}

// ============================================================================
// SPENDING BY CATEGORY
// ============================================================================

pub fn spending(
    start: NaiveDate,
    end: NaiveDate,
    categories: &[CategoryTotal],
    total: Money,
    currency: &str,
) -> String {
    if categories.is_empty() {
        return format!("No expenses found from {} to {}.", day(start), day(end));
    }

    let mut out = format!("Spending by category ({} to {}):\n\n", day(start), day(end));
    for category in categories {
        out.push_str(&format!(
            "  {:<30} {:>10} {}  ({} transactions)\n",
            category.name,
            category.total.to_string(),
            currency,
            category.count
        ));
    }
    out.push_str(&format!(
        "\n  {:<30} {:>10} {}\n",
        "TOTAL",
        total.to_string(),
        currency
    ));
    out
}

// ============================================================================
// INCOME VS EXPENSES
// ============================================================================

pub fn income_vs_expenses(months: u32, summaries: &[MonthSummary]) -> String {
    if summaries.is_empty() {
        return format!("No income or expenses found in the last {months} months.");
    }

    let mut out = format!("Income vs Expenses (last {months} months):\n\n");
    out.push_str(&format!(
        "  {:<10} {:>12} {:>12} {:>12}\n",
        "Month", "Income", "Expenses", "Net"
    ));
    out.push_str(&format!("  {}\n", "-".repeat(INCOME_RULE_WIDTH)));
    for summary in summaries {
        out.push_str(&format!(
            "  {:<10} {:>12} {:>12} {:>12}\n",
            summary.month,
            summary.income.to_string(),
            summary.expenses.to_string(),
            summary.net().to_string()
        ));
    }
    out
}

// ============================================================================
// SEARCH
// ============================================================================

pub fn search(query: &str, transactions: &[Transaction], currency: &str) -> String {
    if transactions.is_empty() {
        return format!("No transactions found matching '{query}'.");
    }

    let mut out = format!(
        "Search results for '{}' ({} found):\n\n",
        query,
        transactions.len()
    );
    for tx in transactions {
        out.push_str(&format!("{}  {}\n", tx.date_label(), tx.description));
        for split in &tx.splits {
            out.push_str(&format!(
                "    {}: {} {}",
                split.account_name, split.value, currency
            ));
            if split.has_memo() {
                out.push_str(&format!("  ({})", split.memo));
            }
            out.push('\n');
        }
        out.push('\n');
    }
    out
}
