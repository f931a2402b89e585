// Shared fixtures for unit tests: an in-memory GnuCash ledger with a small
// chart of accounts and five EUR transactions.

use chrono::NaiveDate;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::LedgerDb;

const SCHEMA: &str = "
    CREATE TABLE accounts (
        guid TEXT PRIMARY KEY,
        name TEXT,
        account_type TEXT,
        parent_guid TEXT,
        description TEXT,
        commodity_guid TEXT,
        hidden INTEGER DEFAULT 0,
        placeholder INTEGER DEFAULT 0
    );
    CREATE TABLE transactions (
        guid TEXT PRIMARY KEY,
        currency_guid TEXT,
        post_date TEXT,
        enter_date TEXT,
        description TEXT
    );
    CREATE TABLE splits (
        guid TEXT PRIMARY KEY,
        tx_guid TEXT,
        account_guid TEXT,
        memo TEXT,
        value_num INTEGER,
        value_denom INTEGER,
        quantity_num INTEGER,
        quantity_denom INTEGER
    );
";

const SEED: &str = "
    INSERT INTO accounts VALUES ('root', 'Root Account', 'ROOT', NULL, '', '', 0, 0);

    INSERT INTO accounts VALUES ('assets',   'Assets',   'ASSET',   'root', '', '', 0, 0);
    INSERT INTO accounts VALUES ('expenses', 'Expenses', 'EXPENSE', 'root', '', '', 0, 0);
    INSERT INTO accounts VALUES ('income',   'Income',   'INCOME',  'root', '', '', 0, 0);

    INSERT INTO accounts VALUES ('checking',   'Checking',   'BANK',    'assets',   'Main checking account', '', 0, 0);
    INSERT INTO accounts VALUES ('groceries',  'Groceries',  'EXPENSE', 'expenses', '', '', 0, 0);
    INSERT INTO accounts VALUES ('restaurant', 'Restaurant', 'EXPENSE', 'expenses', '', '', 0, 0);
    INSERT INTO accounts VALUES ('salary',     'Salary',     'INCOME',  'income',   '', '', 0, 0);

    -- Scheduled-transaction templates live under their own root
    INSERT INTO accounts VALUES ('troot', 'Template Root', 'ROOT', NULL, '', '', 0, 0);
    INSERT INTO accounts VALUES ('tmpl',  'ScheduledRent', 'BANK', 'troot', '', '', 0, 0);

    INSERT INTO transactions VALUES ('tx1', 'eur', '2025-01-15 00:00:00', '2025-01-15 00:00:00', 'January salary');
    INSERT INTO splits VALUES ('sp1a', 'tx1', 'checking',  '', 300000, 100, 300000, 100);
    INSERT INTO splits VALUES ('sp1b', 'tx1', 'salary',    '', -300000, 100, -300000, 100);

    INSERT INTO transactions VALUES ('tx2', 'eur', '2025-01-20 00:00:00', '2025-01-20 00:00:00', 'Supermarket');
    INSERT INTO splits VALUES ('sp2a', 'tx2', 'checking',  '', -8550, 100, -8550, 100);
    INSERT INTO splits VALUES ('sp2b', 'tx2', 'groceries', 'Weekly shop', 8550, 100, 8550, 100);

    INSERT INTO transactions VALUES ('tx3', 'eur', '2025-02-05 00:00:00', '2025-02-05 00:00:00', 'Market');
    INSERT INTO splits VALUES ('sp3a', 'tx3', 'checking',  '', -4200, 100, -4200, 100);
    INSERT INTO splits VALUES ('sp3b', 'tx3', 'groceries', '', 4200, 100, 4200, 100);

    INSERT INTO transactions VALUES ('tx4', 'eur', '2025-01-25 00:00:00', '2025-01-25 00:00:00', 'Pizza place');
    INSERT INTO splits VALUES ('sp4a', 'tx4', 'checking',   '', -2500, 100, -2500, 100);
    INSERT INTO splits VALUES ('sp4b', 'tx4', 'restaurant', '', 2500, 100, 2500, 100);

    INSERT INTO transactions VALUES ('tx5', 'eur', '2025-02-15 00:00:00', '2025-02-15 00:00:00', 'February salary');
    INSERT INTO splits VALUES ('sp5a', 'tx5', 'checking',  '', 300000, 100, 300000, 100);
    INSERT INTO splits VALUES ('sp5b', 'tx5', 'salary',    '', -300000, 100, -300000, 100);
";

pub fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Create the ledger tables and load the seed data into `conn`.
pub fn seed(conn: &Connection) {
    conn.execute_batch(SCHEMA).unwrap();
    conn.execute_batch(SEED).unwrap();
}

pub fn seeded_connection() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    seed(&conn);
    conn
}

pub fn seeded_db() -> LedgerDb {
    LedgerDb::from_connection(seeded_connection())
}

/// One leg of a fixture transaction, value in cents.
pub struct Leg<'a> {
    pub account: &'a str,
    pub cents: i64,
    pub memo: &'a str,
}

impl<'a> Leg<'a> {
    pub fn new(account: &'a str, cents: i64) -> Self {
        Leg {
            account,
            cents,
            memo: "",
        }
    }

    pub fn memo(mut self, memo: &'a str) -> Self {
        self.memo = memo;
        self
    }
}

/// Adds transactions and accounts on top of the seed before the
/// connection is handed to a `LedgerDb`.
pub struct LedgerBuilder {
    conn: Connection,
}

impl LedgerBuilder {
    pub fn new(conn: Connection) -> Self {
        LedgerBuilder { conn }
    }

    pub fn account(&mut self, guid: &str, name: &str, account_type: &str, parent: &str) -> &mut Self {
        self.conn
            .execute(
                "INSERT INTO accounts VALUES (?1, ?2, ?3, ?4, '', '', 0, 0)",
                params![guid, name, account_type, parent],
            )
            .unwrap();
        self
    }

    /// Insert a transaction; split guids sort in leg order.
    pub fn transaction(&mut self, post_date: &str, description: &str, legs: &[Leg<'_>]) -> String {
        let tx_guid = Uuid::new_v4().simple().to_string();
        self.conn
            .execute(
                "INSERT INTO transactions VALUES (?1, 'eur', ?2, ?2, ?3)",
                params![tx_guid, post_date, description],
            )
            .unwrap();
        for (idx, leg) in legs.iter().enumerate() {
            self.conn
                .execute(
                    "INSERT INTO splits VALUES (?1, ?2, ?3, ?4, ?5, 100, ?5, 100)",
                    params![
                        format!("{tx_guid}-{idx}"),
                        tx_guid,
                        leg.account,
                        leg.memo,
                        leg.cents
                    ],
                )
                .unwrap();
        }
        tx_guid
    }

    pub fn into_db(self) -> LedgerDb {
        LedgerDb::from_connection(self.conn)
    }
}
