// Account entity - one node of the chart of accounts
//
// Accounts form a forest under one or more ROOT nodes. The full path
// ("Expenses:Groceries") is derived from the parent chain and never
// includes the synthetic root.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Name GnuCash gives the sentinel that owns scheduled-transaction templates.
pub const TEMPLATE_ROOT_NAME: &str = "Template Root";

// ============================================================================
// ACCOUNT TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    Asset,
    Bank,
    Cash,
    Credit,
    Equity,
    Expense,
    Income,
    Liability,
    /// Structural top of the tree, never shown to callers
    Root,
    Stock,
    Mutual,
    Receivable,
    Payable,
    Trading,
}

impl AccountType {
    pub const ALL: [AccountType; 14] = [
        AccountType::Asset,
        AccountType::Bank,
        AccountType::Cash,
        AccountType::Credit,
        AccountType::Equity,
        AccountType::Expense,
        AccountType::Income,
        AccountType::Liability,
        AccountType::Root,
        AccountType::Stock,
        AccountType::Mutual,
        AccountType::Receivable,
        AccountType::Payable,
        AccountType::Trading,
    ];

    /// Token as stored in `accounts.account_type`
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Asset => "ASSET",
            AccountType::Bank => "BANK",
            AccountType::Cash => "CASH",
            AccountType::Credit => "CREDIT",
            AccountType::Equity => "EQUITY",
            AccountType::Expense => "EXPENSE",
            AccountType::Income => "INCOME",
            AccountType::Liability => "LIABILITY",
            AccountType::Root => "ROOT",
            AccountType::Stock => "STOCK",
            AccountType::Mutual => "MUTUAL",
            AccountType::Receivable => "RECEIVABLE",
            AccountType::Payable => "PAYABLE",
            AccountType::Trading => "TRADING",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAccountType(pub String);

impl fmt::Display for UnknownAccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown account type '{}'", self.0)
    }
}

impl std::error::Error for UnknownAccountType {}

impl FromStr for AccountType {
    type Err = UnknownAccountType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        AccountType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(token))
            .ok_or_else(|| UnknownAccountType(s.to_string()))
    }
}

// ============================================================================
// ACCOUNT ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    /// Opaque guid
    pub id: String,
    pub name: String,
    pub account_type: AccountType,
    /// Hierarchy link only, `None` for ROOT nodes
    pub parent_id: Option<String>,
    pub description: String,
    pub hidden: bool,
    pub placeholder: bool,
    /// Colon-joined ancestor names, excluding the synthetic root
    pub full_path: String,
}

impl Account {
    /// `NAME [TYPE]`, the label used in report headers
    pub fn label(&self) -> String {
        format!("{} [{}]", self.name, self.account_type)
    }

    /// Case-insensitive equality against the name or the full path.
    pub fn matches_exactly(&self, input: &str) -> bool {
        self.name.to_lowercase() == input.to_lowercase()
            || self.full_path.to_lowercase() == input.to_lowercase()
    }
}

// ============================================================================
// ACCOUNT TREE
// ============================================================================

/// Minimal node data needed to walk the hierarchy.
#[derive(Debug, Clone)]
pub struct AccountNode {
    pub id: String,
    pub name: String,
    pub account_type: AccountType,
    pub parent_id: Option<String>,
}

/// Parent-chain index over every account in the ledger.
///
/// Walks are bounded by the number of nodes, so a corrupt ledger with a
/// parent cycle yields a truncated path instead of looping.
#[derive(Debug, Default)]
pub struct AccountTree {
    nodes: HashMap<String, AccountNode>,
}

impl AccountTree {
    pub fn new(nodes: impl IntoIterator<Item = AccountNode>) -> Self {
        AccountTree {
            nodes: nodes.into_iter().map(|n| (n.id.clone(), n)).collect(),
        }
    }

    /// Ancestors of `id`, starting with the account itself.
    fn chain(&self, id: &str) -> Vec<&AccountNode> {
        let mut chain = Vec::new();
        let mut current = self.nodes.get(id);
        while let Some(node) = current {
            if chain.len() >= self.nodes.len() {
                break;
            }
            chain.push(node);
            current = node.parent_id.as_deref().and_then(|p| self.nodes.get(p));
        }
        chain
    }

    /// Full path of `id`. Unknown ids resolve to an empty path.
    pub fn full_path(&self, id: &str) -> String {
        let mut names: Vec<&str> = self
            .chain(id)
            .into_iter()
            .filter(|n| n.account_type != AccountType::Root)
            .map(|n| n.name.as_str())
            .collect();
        names.reverse();
        names.join(":")
    }

    /// True for the Template Root sentinel and everything beneath it.
    pub fn is_template(&self, id: &str) -> bool {
        self.chain(id).iter().any(|n| n.name == TEMPLATE_ROOT_NAME)
    }

    /// True for nodes callers should never see: ROOT nodes and templates.
    pub fn is_structural(&self, id: &str) -> bool {
        match self.nodes.get(id) {
            Some(node) => node.account_type == AccountType::Root || self.is_template(id),
            None => false,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, name: &str, account_type: AccountType, parent: Option<&str>) -> AccountNode {
        AccountNode {
            id: id.to_string(),
            name: name.to_string(),
            account_type,
            parent_id: parent.map(str::to_string),
        }
    }

    fn sample_tree() -> AccountTree {
        AccountTree::new(vec![
            node("root", "Root Account", AccountType::Root, None),
            node("expenses", "Expenses", AccountType::Expense, Some("root")),
            node("groceries", "Groceries", AccountType::Expense, Some("expenses")),
            node("veg", "Vegetables", AccountType::Expense, Some("groceries")),
            node("troot", TEMPLATE_ROOT_NAME, AccountType::Root, None),
            node("tmpl", "a1b2c3", AccountType::Bank, Some("troot")),
        ])
    }

    #[test]
    fn test_account_type_round_trip_tokens() {
        for t in AccountType::ALL {
            assert_eq!(t.as_str().parse::<AccountType>().unwrap(), t);
        }
        assert_eq!("expense".parse::<AccountType>().unwrap(), AccountType::Expense);
        assert!("SAVINGS".parse::<AccountType>().is_err());
    }

    #[test]
    fn test_full_path_excludes_root() {
        let tree = sample_tree();
        assert_eq!(tree.full_path("expenses"), "Expenses");
        assert_eq!(tree.full_path("veg"), "Expenses:Groceries:Vegetables");
        assert_eq!(tree.full_path("root"), "");
        assert_eq!(tree.full_path("missing"), "");
    }

    #[test]
    fn test_template_accounts_are_structural() {
        let tree = sample_tree();
        assert!(tree.is_template("tmpl"));
        assert!(tree.is_structural("tmpl"));
        assert!(tree.is_structural("root"));
        assert!(!tree.is_structural("groceries"));
    }

    #[test]
    fn test_parent_cycle_terminates() {
        let tree = AccountTree::new(vec![
            node("a", "A", AccountType::Asset, Some("b")),
            node("b", "B", AccountType::Asset, Some("a")),
        ]);
        let path = tree.full_path("a");
        assert!(path.ends_with("A"));
        assert!(!tree.is_template("a"));
    }

    #[test]
    fn test_matches_exactly_accepts_path() {
        let account = Account {
            id: "groceries".to_string(),
            name: "Groceries".to_string(),
            account_type: AccountType::Expense,
            parent_id: Some("expenses".to_string()),
            description: String::new(),
            hidden: false,
            placeholder: false,
            full_path: "Expenses:Groceries".to_string(),
        };
        assert!(account.matches_exactly("groceries"));
        assert!(account.matches_exactly("EXPENSES:GROCERIES"));
        assert!(!account.matches_exactly("Grocer"));
        assert_eq!(account.label(), "Groceries [EXPENSE]");
    }
}
