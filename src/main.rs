use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use ledger_query::{init_tracing, CancelToken, Config, LedgerDb, ReportEngine};

/// Read-only reports over a GnuCash SQLite ledger.
#[derive(Parser, Debug)]
#[command(name = "ledger-query")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// GnuCash SQLite file (overrides LEDGER_FILE / GNUCASH_FILE)
    #[arg(long, value_name = "PATH", global = true)]
    ledger: Option<PathBuf>,

    /// JSON config file (overrides LEDGER_CONFIG)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Display currency code
    #[arg(long, value_name = "CODE", global = true)]
    currency: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// List accounts with their full paths
    Accounts {
        /// Only accounts of this type (BANK, EXPENSE, ...)
        #[arg(long = "type", value_name = "TYPE")]
        account_type: Option<String>,
    },
    /// Balance of one account
    Balance {
        /// Account name or colon-separated path
        name: String,
        /// Balance as of this date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
    },
    /// Transactions touching one account, newest first
    Transactions {
        name: String,
        #[arg(long = "from", value_name = "DATE")]
        start: Option<String>,
        #[arg(long = "to", value_name = "DATE")]
        end: Option<String>,
        /// Maximum transactions shown (0 = configured default)
        #[arg(long, default_value_t = 0)]
        limit: i64,
    },
    /// Expense totals per category
    Spending {
        #[arg(long = "from", value_name = "DATE")]
        start: Option<String>,
        #[arg(long = "to", value_name = "DATE")]
        end: Option<String>,
        /// Only categories directly under this account
        #[arg(long)]
        parent: Option<String>,
    },
    /// Monthly income against expenses
    Income {
        #[arg(long, default_value_t = 0)]
        months: i64,
    },
    /// Find transactions by description or memo
    Search {
        query: String,
        #[arg(long, default_value_t = 0)]
        limit: i64,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(ledger) = cli.ledger {
        config.ledger_path = Some(ledger);
    }
    if let Some(currency) = cli.currency {
        config.currency = currency;
    }

    let path = config.ledger_path()?.to_path_buf();
    let db = LedgerDb::open(&path)
        .with_context(|| format!("opening ledger {}", path.display()))?;
    let engine = ReportEngine::new(db, config.report_options());
    let cancel = CancelToken::with_timeout(config.query_timeout());

    let output = run(&engine, &cancel, cli.command)?;
    println!("{}", output.trim_end());

    engine
        .into_store()
        .close()
        .context("closing ledger")?;
    Ok(())
}

fn run(engine: &ReportEngine<LedgerDb>, cancel: &CancelToken, command: Command) -> Result<String> {
    let output = match command {
        Command::Accounts { account_type } => engine
            .list_accounts(cancel, account_type.as_deref())
            .context("listing accounts")?,
        Command::Balance { name, date } => engine
            .balance(cancel, &name, date.as_deref())
            .with_context(|| format!("balance of '{name}'"))?,
        Command::Transactions {
            name,
            start,
            end,
            limit,
        } => engine
            .transactions(cancel, &name, start.as_deref(), end.as_deref(), limit)
            .with_context(|| format!("transactions of '{name}'"))?,
        Command::Spending { start, end, parent } => engine
            .spending_by_category(cancel, start.as_deref(), end.as_deref(), parent.as_deref())
            .context("spending by category")?,
        Command::Income { months } => engine
            .income_vs_expenses(cancel, months)
            .context("income vs expenses")?,
        Command::Search { query, limit } => engine
            .search(cancel, &query, limit)
            .with_context(|| format!("searching '{query}'"))?,
    };
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_transactions_flags() {
        let cli = Cli::try_parse_from([
            "ledger-query",
            "--ledger",
            "books.gnucash",
            "transactions",
            "Expenses:Groceries",
            "--from",
            "2025-01-01",
            "--limit",
            "5",
        ])
        .unwrap();

        assert_eq!(cli.ledger, Some(PathBuf::from("books.gnucash")));
        assert_eq!(
            cli.command,
            Command::Transactions {
                name: "Expenses:Groceries".to_string(),
                start: Some("2025-01-01".to_string()),
                end: None,
                limit: 5,
            }
        );
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["ledger-query", "income", "--currency", "USD"]).unwrap();
        assert_eq!(cli.currency.as_deref(), Some("USD"));
        assert_eq!(cli.command, Command::Income { months: 0 });
    }

    #[test]
    fn test_search_requires_query() {
        assert!(Cli::try_parse_from(["ledger-query", "search"]).is_err());
        let cli = Cli::try_parse_from(["ledger-query", "accounts", "--type", "bank"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Accounts {
                account_type: Some("bank".to_string())
            }
        );
    }
}
