// Transaction and Split entities
//
// A transaction is reconstructed from its legs (splits). All split values
// of one transaction sum to zero; that invariant is assumed, not checked.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::money::Money;

/// One leg of a double-entry transaction.
///
/// Sign convention: debits positive, credits negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Split {
    pub id: String,
    pub transaction_id: String,
    /// Lookup/display reference, not ownership
    pub account_id: String,
    /// Joined from `accounts.name`, empty when not resolved
    pub account_name: String,
    pub memo: String,
    pub value: Money,
}

impl Split {
    pub fn has_memo(&self) -> bool {
        !self.memo.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    pub id: String,
    pub post_date: NaiveDateTime,
    pub description: String,
    /// For account-scoped queries `splits[0]` is the queried account's leg
    pub splits: Vec<Split>,
}

impl Transaction {
    /// `YYYY-MM-DD` of the posting date
    pub fn date_label(&self) -> String {
        self.post_date.format("%Y-%m-%d").to_string()
    }

    /// The leg belonging to the queried account in account-scoped results.
    pub fn primary_split(&self) -> Option<&Split> {
        self.splits.first()
    }

    /// Every leg after the primary one.
    pub fn counterparts(&self) -> &[Split] {
        self.splits.get(1..).unwrap_or(&[])
    }

    /// Display names of the counterpart accounts, in split order.
    pub fn counterpart_names(&self) -> Vec<&str> {
        self.counterparts()
            .iter()
            .map(|s| s.account_name.as_str())
            .collect()
    }
}
