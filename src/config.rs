use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::service::{
    ReportOptions, DEFAULT_CURRENCY, DEFAULT_MONTHS, DEFAULT_SEARCH_LIMIT,
    DEFAULT_TRANSACTION_LIMIT,
};

pub const ENV_CONFIG: &str = "LEDGER_CONFIG";
pub const ENV_LEDGER_FILE: &str = "LEDGER_FILE";
/// Accepted when `LEDGER_FILE` is unset.
pub const ENV_GNUCASH_FILE: &str = "GNUCASH_FILE";
pub const ENV_CURRENCY: &str = "LEDGER_CURRENCY";
pub const ENV_QUERY_TIMEOUT: &str = "LEDGER_QUERY_TIMEOUT_SECS";
pub const ENV_BIND_ADDR: &str = "LEDGER_BIND_ADDR";

const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value '{value}' for {var}")]
    InvalidEnv { var: &'static str, value: String },

    #[error("no ledger file configured; pass --ledger or set LEDGER_FILE")]
    MissingLedgerPath,
}

/// Runtime settings shared by the CLI and the HTTP server.
///
/// Layered lowest to highest: defaults, JSON file, environment, then
/// whatever the binary applies from its own flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ledger_path: Option<PathBuf>,
    pub currency: String,
    pub transaction_limit: usize,
    pub search_limit: usize,
    pub months: u32,
    pub query_timeout_secs: u64,
    /// Only read by `ledger-server`
    pub bind_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ledger_path: None,
            currency: DEFAULT_CURRENCY.into(),
            transaction_limit: DEFAULT_TRANSACTION_LIMIT,
            search_limit: DEFAULT_SEARCH_LIMIT,
            months: DEFAULT_MONTHS,
            query_timeout_secs: DEFAULT_QUERY_TIMEOUT_SECS,
            bind_addr: DEFAULT_BIND_ADDR.into(),
        }
    }
}

impl Config {
    /// Defaults, then `config_file` (or `$LEDGER_CONFIG`), then the environment.
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let from_env = std::env::var_os(ENV_CONFIG).map(PathBuf::from);
        let mut config = match config_file.map(Path::to_path_buf).or(from_env) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_vars(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overlay settings found through `lookup`; blank values are ignored.
    pub fn apply_vars(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(path) = get(ENV_LEDGER_FILE).or_else(|| get(ENV_GNUCASH_FILE)) {
            self.ledger_path = Some(PathBuf::from(path));
        }
        if let Some(currency) = get(ENV_CURRENCY) {
            self.currency = currency.trim().to_string();
        }
        if let Some(raw) = get(ENV_QUERY_TIMEOUT) {
            self.query_timeout_secs =
                raw.trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidEnv {
                        var: ENV_QUERY_TIMEOUT,
                        value: raw.clone(),
                    })?;
        }
        if let Some(addr) = get(ENV_BIND_ADDR) {
            self.bind_addr = addr.trim().to_string();
        }
        Ok(())
    }

    pub fn ledger_path(&self) -> Result<&Path, ConfigError> {
        self.ledger_path
            .as_deref()
            .ok_or(ConfigError::MissingLedgerPath)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    pub fn report_options(&self) -> ReportOptions {
        ReportOptions {
            currency: self.currency.clone(),
            transaction_limit: self.transaction_limit,
            search_limit: self.search_limit,
            months: self.months,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.currency, "EUR");
        assert_eq!(config.query_timeout(), Duration::from_secs(30));
        assert!(matches!(config.ledger_path(), Err(ConfigError::MissingLedgerPath)));
        assert_eq!(config.report_options(), ReportOptions::default());
    }

    #[test]
    fn test_file_overrides_defaults_partially() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"currency": "CHF", "months": 12}}"#).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.currency, "CHF");
        assert_eq!(config.months, 12);
        assert_eq!(config.search_limit, 20);
        assert_eq!(config.report_options().months, 12);
    }

    #[test]
    fn test_bad_file_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));

        let dir = tempfile::tempdir().unwrap();
        let err = Config::from_file(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = Config {
            currency: "CHF".into(),
            ..Config::default()
        };
        config
            .apply_vars(vars(&[
                (ENV_GNUCASH_FILE, "/books/old.gnucash"),
                (ENV_CURRENCY, "USD"),
                (ENV_QUERY_TIMEOUT, "5"),
            ]))
            .unwrap();

        assert_eq!(config.ledger_path().unwrap(), Path::new("/books/old.gnucash"));
        assert_eq!(config.currency, "USD");
        assert_eq!(config.query_timeout_secs, 5);
    }

    #[test]
    fn test_ledger_file_takes_precedence_over_gnucash_file() {
        let mut config = Config::default();
        config
            .apply_vars(vars(&[
                (ENV_LEDGER_FILE, "/books/main.gnucash"),
                (ENV_GNUCASH_FILE, "/books/old.gnucash"),
                (ENV_BIND_ADDR, " "),
            ]))
            .unwrap();
        assert_eq!(config.ledger_path().unwrap(), Path::new("/books/main.gnucash"));
        assert_eq!(config.bind_addr, "127.0.0.1:3000");
    }

    #[test]
    fn test_invalid_timeout_is_rejected() {
        let mut config = Config::default();
        let err = config
            .apply_vars(vars(&[(ENV_QUERY_TIMEOUT, "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { var: ENV_QUERY_TIMEOUT, .. }));
    }
}
