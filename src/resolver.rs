// Account Resolver
//
// Turns a user-supplied name or path fragment into exactly one account.

use tracing::{debug, warn};

use crate::cancel::CancelToken;
use crate::entities::Account;
use crate::error::{AccountCandidate, LedgerError, Result};
use crate::store::LedgerStore;

const PATH_SEPARATOR: char = ':';

pub struct AccountResolver<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: LedgerStore + ?Sized> AccountResolver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        AccountResolver { store }
    }

    /// Resolve `name` to a single account.
    ///
    /// Inputs containing `:` are treated as paths: the store is searched
    /// with the last segment and candidates must contain the whole input
    /// in their full path.
    pub fn resolve(&self, cancel: &CancelToken, name: &str) -> Result<Account> {
        let input = name.trim();
        if input.is_empty() {
            return Err(LedgerError::InvalidInput(
                "account name must not be empty".to_string(),
            ));
        }

        let candidates = if input.contains(PATH_SEPARATOR) {
            let segment = input
                .rsplit(PATH_SEPARATOR)
                .map(str::trim)
                .find(|s| !s.is_empty())
                .ok_or_else(|| {
                    LedgerError::InvalidInput(format!("account path '{input}' has no name"))
                })?;
            let needle = input.to_lowercase();
            self.store
                .find_accounts_by_name(cancel, segment)?
                .into_iter()
                .filter(|a| a.full_path.to_lowercase().contains(&needle))
                .collect()
        } else {
            self.store.find_accounts_by_name(cancel, input)?
        };

        select_account(input, candidates)
    }
}

/// Pick the account `input` refers to among `candidates`.
pub fn select_account(input: &str, mut candidates: Vec<Account>) -> Result<Account> {
    if let Some(pos) = candidates.iter().position(|a| a.matches_exactly(input)) {
        let account = candidates.swap_remove(pos);
        debug!(input, account = %account.full_path, "exact account match");
        return Ok(account);
    }

    match candidates.len() {
        0 => Err(LedgerError::NotFound {
            query: input.to_string(),
        }),
        1 => Ok(candidates.remove(0)),
        n => {
            warn!(input, candidates = n, "ambiguous account name");
            Err(LedgerError::Ambiguous {
                query: input.to_string(),
                candidates: candidates.iter().map(AccountCandidate::from).collect(),
            })
        }
    }
}
