use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OpenFlags, Row};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::dates::{end_of_day, parse_post_date, start_of_day, DateRange};
use crate::entities::{
    Account, AccountNode, AccountTree, AccountType, ExpenseGroup, MonthlyTotalRow, Split,
    Transaction,
};
use crate::error::{LedgerError, Result};
use crate::money::{Money, DEFAULT_DENOM};
use crate::store::LedgerStore;

/// Virtual machine instructions between two cancellation checks.
const PROGRESS_OPS: i32 = 100;

/// Columns every schema probe must find before the ledger is accepted.
const SCHEMA_PROBES: &[&str] = &[
    "SELECT guid, name, account_type, parent_guid, description, hidden, placeholder FROM accounts LIMIT 0",
    "SELECT guid, post_date, description FROM transactions LIMIT 0",
    "SELECT guid, tx_guid, account_guid, memo, value_num, value_denom FROM splits LIMIT 0",
];

const ACCOUNT_COLUMNS: &str = "guid, COALESCE(name, ''), account_type, parent_guid, \
     COALESCE(description, ''), COALESCE(hidden, 0), COALESCE(placeholder, 0)";

/// `t.post_date` as `YYYY-MM-DD HH:MM:SS`, so compact `YYYYMMDDHHMMSS` rows
/// compare and sort against the same text bounds as dashed ones.
const POST_DATE_KEY: &str = "(CASE WHEN substr(t.post_date, 5, 1) = '-' THEN t.post_date \
     ELSE substr(t.post_date, 1, 4) || '-' || substr(t.post_date, 5, 2) || '-' \
     || substr(t.post_date, 7, 2) || ' ' || substr(t.post_date, 9, 2) || ':' \
     || substr(t.post_date, 11, 2) || ':' || substr(t.post_date, 13, 2) END)";

/// Read-only handle on a GnuCash SQLite ledger.
///
/// The connection is opened once and shared; every query takes the lock,
/// so concurrent callers are serialised on the connection.
pub struct LedgerDb {
    conn: Mutex<Connection>,
}

impl LedgerDb {
    /// Open a ledger file read-only and verify it carries the expected tables.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| LedgerError::store("open ledger", e))?;
        probe_schema(&conn)?;
        info!(path = %path.display(), "opened ledger read-only");
        Ok(Self::from_connection(conn))
    }

    /// Wrap an already opened connection (in-memory ledgers, embedding).
    pub fn from_connection(conn: Connection) -> Self {
        LedgerDb {
            conn: Mutex::new(conn),
        }
    }

    /// Close the connection, reporting a failure to close.
    pub fn close(self) -> Result<()> {
        let conn = self
            .conn
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        conn.close()
            .map_err(|(_, e)| LedgerError::store("close ledger", e))?;
        info!("closed ledger");
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // Queries never leave the connection half-written, so a panic in
        // another reader does not invalidate it.
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run `query` on the shared connection with `cancel` wired into
    /// SQLite's progress handler.
    fn with_conn<T>(
        &self,
        cancel: &CancelToken,
        context: &'static str,
        query: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T> {
        if cancel.is_cancelled() {
            warn!(context, "query cancelled before start");
            return Err(LedgerError::Cancelled);
        }

        let conn = self.lock();
        let token = cancel.clone();
        conn.progress_handler(PROGRESS_OPS, Some(move || token.is_cancelled()));
        let result = query(&*conn);
        conn.progress_handler(0, None::<fn() -> bool>);

        match result {
            Ok(value) => Ok(value),
            Err(e) if cancel.is_cancelled() || is_interrupt(&e) => {
                warn!(context, "query interrupted");
                Err(LedgerError::Cancelled)
            }
            Err(e) => Err(LedgerError::store(context, e)),
        }
    }
}

fn probe_schema(conn: &Connection) -> Result<()> {
    for probe in SCHEMA_PROBES {
        conn.prepare(probe)
            .map_err(|e| LedgerError::store("open ledger: verify schema", e))?;
    }
    Ok(())
}

fn is_interrupt(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::OperationInterrupted
    )
}

// ============================================================================
// Row mapping
// ============================================================================

fn decode_failure(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn account_type_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<AccountType> {
    let raw: String = row.get(idx)?;
    raw.parse::<AccountType>().map_err(|e| decode_failure(idx, e))
}

fn optional_guid(raw: Option<String>) -> Option<String> {
    raw.filter(|guid| !guid.trim().is_empty())
}

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        name: row.get(1)?,
        account_type: account_type_at(row, 2)?,
        parent_id: optional_guid(row.get(3)?),
        description: row.get(4)?,
        hidden: row.get::<_, i64>(5)? != 0,
        placeholder: row.get::<_, i64>(6)? != 0,
        full_path: String::new(),
    })
}

fn post_date_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<chrono::NaiveDateTime> {
    let raw: String = row.get(idx)?;
    parse_post_date(&raw).map_err(|e| decode_failure(idx, e))
}

fn split_from_row(row: &Row<'_>) -> rusqlite::Result<Split> {
    Ok(Split {
        id: row.get(0)?,
        transaction_id: row.get(1)?,
        account_id: row.get(2)?,
        account_name: row.get(3)?,
        memo: row.get(4)?,
        value: Money::new(row.get(5)?, row.get(6)?),
    })
}

/// Case-insensitive substring test, folding the full Unicode range.
/// `needle` is expected already lowercased.
fn contains_folded(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

fn sql_limit(limit: usize) -> i64 {
    if limit == 0 {
        -1
    } else {
        i64::try_from(limit).unwrap_or(i64::MAX)
    }
}

// ============================================================================
// Account queries
// ============================================================================

fn load_tree(conn: &Connection) -> rusqlite::Result<AccountTree> {
    let mut stmt =
        conn.prepare("SELECT guid, COALESCE(name, ''), account_type, parent_guid FROM accounts")?;
    let nodes = stmt
        .query_map([], |row| {
            Ok(AccountNode {
                id: row.get(0)?,
                name: row.get(1)?,
                account_type: account_type_at(row, 2)?,
                parent_id: optional_guid(row.get(3)?),
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(AccountTree::new(nodes))
}

/// Drop structural accounts and fill in full paths.
fn finish_accounts(tree: &AccountTree, accounts: Vec<Account>) -> Vec<Account> {
    accounts
        .into_iter()
        .filter(|a| !tree.is_structural(&a.id))
        .map(|mut a| {
            a.full_path = tree.full_path(&a.id);
            a
        })
        .collect()
}

fn query_accounts(conn: &Connection) -> rusqlite::Result<Vec<Account>> {
    let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY name, guid");
    let mut stmt = conn.prepare(&sql)?;
    let accounts = stmt
        .query_map([], account_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(accounts)
}

// ============================================================================
// LedgerStore implementation
// ============================================================================

impl LedgerStore for LedgerDb {
    fn list_accounts(&self, cancel: &CancelToken) -> Result<Vec<Account>> {
        let accounts = self.with_conn(cancel, "list accounts", |conn| {
            let tree = load_tree(conn)?;
            let accounts = query_accounts(conn)?;
            Ok(finish_accounts(&tree, accounts))
        })?;
        debug!(count = accounts.len(), "listed accounts");
        Ok(accounts)
    }

    fn find_accounts_by_name(&self, cancel: &CancelToken, fragment: &str) -> Result<Vec<Account>> {
        // SQLite's LOWER only folds ASCII, so matching happens here.
        let needle = fragment.to_lowercase();
        let accounts = self.with_conn(cancel, "find accounts by name", |conn| {
            let mut accounts = query_accounts(conn)?;
            accounts.retain(|a| contains_folded(&a.name, &needle));
            if accounts.is_empty() {
                return Ok(accounts);
            }
            let tree = load_tree(conn)?;
            Ok(finish_accounts(&tree, accounts))
        })?;
        debug!(fragment, count = accounts.len(), "matched accounts by name");
        Ok(accounts)
    }

    fn splits_for_account(
        &self,
        cancel: &CancelToken,
        account_id: &str,
        range: DateRange,
        limit: usize,
    ) -> Result<Vec<Transaction>> {
        // The limit applies to the queried account's legs, before the
        // counterpart join multiplies rows.
        let sql = format!(
            r"
            WITH picked AS (
                SELECT s.guid AS split_guid, t.guid AS tx_guid, t.post_date,
                       {POST_DATE_KEY} AS date_key,
                       COALESCE(t.description, '') AS description,
                       COALESCE(s.memo, '') AS memo, s.value_num, s.value_denom
                FROM splits s
                JOIN transactions t ON s.tx_guid = t.guid
                WHERE s.account_guid = ?1
                  AND (?2 IS NULL OR {POST_DATE_KEY} >= ?2)
                  AND (?3 IS NULL OR {POST_DATE_KEY} <= ?3)
                ORDER BY date_key DESC, t.guid
                LIMIT ?4
            )
            SELECT p.split_guid, p.tx_guid, p.post_date, p.description, p.memo,
                   p.value_num, p.value_denom,
                   s2.guid, s2.account_guid, COALESCE(a2.name, ''), COALESCE(s2.memo, ''),
                   s2.value_num, s2.value_denom
            FROM picked p
            LEFT JOIN splits s2 ON s2.tx_guid = p.tx_guid AND s2.guid != p.split_guid
            LEFT JOIN accounts a2 ON s2.account_guid = a2.guid
            ORDER BY p.date_key DESC, p.tx_guid, p.split_guid, s2.guid
        "
        );

        let transactions = self.with_conn(cancel, "reconstruct transactions", |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(params![
                account_id,
                range.start_bound(),
                range.end_bound(),
                sql_limit(limit),
            ])?;

            let mut transactions: Vec<Transaction> = Vec::new();
            let mut index: HashMap<String, usize> = HashMap::new();
            while let Some(row) = rows.next()? {
                let split_guid: String = row.get(0)?;
                let tx_guid: String = row.get(1)?;

                let existing = index.get(&split_guid).copied();
                let slot = match existing {
                    Some(slot) => slot,
                    None => {
                        transactions.push(Transaction {
                            id: tx_guid.clone(),
                            post_date: post_date_at(row, 2)?,
                            description: row.get(3)?,
                            splits: vec![Split {
                                id: split_guid.clone(),
                                transaction_id: tx_guid.clone(),
                                account_id: account_id.to_string(),
                                account_name: String::new(),
                                memo: row.get(4)?,
                                value: Money::new(row.get(5)?, row.get(6)?),
                            }],
                        });
                        index.insert(split_guid, transactions.len() - 1);
                        transactions.len() - 1
                    }
                };

                // Single-leg transactions come back with a NULL counterpart
                let counterpart_guid: Option<String> = row.get(7)?;
                if let Some(counterpart_guid) = counterpart_guid {
                    transactions[slot].splits.push(Split {
                        id: counterpart_guid,
                        transaction_id: tx_guid,
                        account_id: row.get(8)?,
                        account_name: row.get(9)?,
                        memo: row.get(10)?,
                        value: Money::new(row.get(11)?, row.get(12)?),
                    });
                }
            }
            Ok(transactions)
        })?;

        debug!(
            account_id,
            count = transactions.len(),
            "reconstructed transactions for account"
        );
        Ok(transactions)
    }

    fn balance_for_account(
        &self,
        cancel: &CancelToken,
        account_id: &str,
        as_of: Option<NaiveDate>,
    ) -> Result<Money> {
        let sql = format!(
            "SELECT COALESCE(SUM(s.value_num), 0), COALESCE(MAX(s.value_denom), ?3)
             FROM splits s
             JOIN transactions t ON s.tx_guid = t.guid
             WHERE s.account_guid = ?1
               AND (?2 IS NULL OR {POST_DATE_KEY} <= ?2)"
        );
        let balance = self.with_conn(cancel, "balance: sum splits", |conn| {
            conn.query_row(
                &sql,
                params![account_id, as_of.map(end_of_day), DEFAULT_DENOM],
                |row| Ok(Money::new(row.get(0)?, row.get(1)?)),
            )
        })?;
        debug!(account_id, %balance, "summed account splits");
        Ok(balance)
    }

    fn search_transactions(
        &self,
        cancel: &CancelToken,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Transaction>> {
        let needle = query.to_lowercase();
        let sql = format!(
            "SELECT t.guid, t.post_date, COALESCE(t.description, ''), COALESCE(s.memo, '')
             FROM transactions t
             LEFT JOIN splits s ON s.tx_guid = t.guid
             ORDER BY {POST_DATE_KEY} DESC, t.guid"
        );
        let mut transactions = self.with_conn(cancel, "search transactions", |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query([])?;

            // Rows of one transaction are adjacent; the first matching row wins.
            let mut transactions: Vec<Transaction> = Vec::new();
            while let Some(row) = rows.next()? {
                let guid: String = row.get(0)?;
                if transactions.last().is_some_and(|tx| tx.id == guid) {
                    continue;
                }
                let description: String = row.get(2)?;
                let memo: String = row.get(3)?;
                if !contains_folded(&description, &needle) && !contains_folded(&memo, &needle) {
                    continue;
                }
                transactions.push(Transaction {
                    id: guid,
                    post_date: post_date_at(row, 1)?,
                    description,
                    splits: Vec::new(),
                });
                if limit > 0 && transactions.len() >= limit {
                    break;
                }
            }
            Ok(transactions)
        })?;

        // One bounded query per hit; each one re-checks the token.
        for tx in &mut transactions {
            tx.splits = self.with_conn(cancel, "search transactions: load splits", |conn| {
                let mut stmt = conn.prepare(
                    "SELECT s.guid, s.tx_guid, s.account_guid, COALESCE(a.name, ''),
                            COALESCE(s.memo, ''), s.value_num, s.value_denom
                     FROM splits s
                     LEFT JOIN accounts a ON s.account_guid = a.guid
                     WHERE s.tx_guid = ?1
                     ORDER BY s.rowid",
                )?;
                let splits = stmt
                    .query_map([&tx.id], split_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(splits)
            })?;
        }

        debug!(query, count = transactions.len(), "searched transactions");
        Ok(transactions)
    }

    fn expense_splits(
        &self,
        cancel: &CancelToken,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ExpenseGroup>> {
        let sql = format!(
            "SELECT a.guid, COALESCE(a.name, ''), a.parent_guid, s.value_num, s.value_denom
             FROM splits s
             JOIN transactions t ON s.tx_guid = t.guid
             JOIN accounts a ON s.account_guid = a.guid
             WHERE a.account_type = ?1
               AND {POST_DATE_KEY} >= ?2
               AND {POST_DATE_KEY} <= ?3
             ORDER BY a.name, a.guid, {POST_DATE_KEY}, s.guid"
        );
        let groups = self.with_conn(cancel, "expense splits", |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(params![
                AccountType::Expense.as_str(),
                start_of_day(start),
                end_of_day(end),
            ])?;

            let mut groups: Vec<ExpenseGroup> = Vec::new();
            while let Some(row) = rows.next()? {
                let account_id: String = row.get(0)?;
                let value = Money::new(row.get(3)?, row.get(4)?);
                if let Some(group) = groups.last_mut() {
                    if group.account_id == account_id {
                        group.values.push(value);
                        continue;
                    }
                }
                groups.push(ExpenseGroup {
                    account_id,
                    account_name: row.get(1)?,
                    parent_id: optional_guid(row.get(2)?),
                    values: vec![value],
                });
            }
            Ok(groups)
        })?;
        debug!(%start, %end, groups = groups.len(), "grouped expense splits");
        Ok(groups)
    }

    fn monthly_totals(
        &self,
        cancel: &CancelToken,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<MonthlyTotalRow>> {
        let sql = format!(
            "SELECT substr({POST_DATE_KEY}, 1, 7) AS month,
                    a.account_type,
                    SUM(s.value_num) AS total,
                    MAX(s.value_denom) AS denom
             FROM splits s
             JOIN transactions t ON s.tx_guid = t.guid
             JOIN accounts a ON s.account_guid = a.guid
             WHERE a.account_type IN (?1, ?2)
               AND {POST_DATE_KEY} >= ?3
               AND {POST_DATE_KEY} <= ?4
             GROUP BY month, a.account_type
             ORDER BY month, a.account_type"
        );
        let rows = self.with_conn(cancel, "monthly totals", |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(
                    params![
                        AccountType::Income.as_str(),
                        AccountType::Expense.as_str(),
                        start_of_day(start),
                        end_of_day(end),
                    ],
                    |row| {
                        Ok(MonthlyTotalRow {
                            month: row.get(0)?,
                            account_type: account_type_at(row, 1)?,
                            total: Money::new(row.get(2)?, row.get(3)?),
                        })
                    },
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })?;
        debug!(%start, %end, rows = rows.len(), "aggregated monthly totals");
        Ok(rows)
    }
}
