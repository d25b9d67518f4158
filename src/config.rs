//! Configuration file handling.
//!
//! Settings live in `joint-transfers.toml`. Every field has a default that
//! matches the host page the engine was written for, so an empty file (or no
//! file at all) is a valid configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "joint-transfers.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Class names of the host page and of the injected elements.
    #[serde(default)]
    pub schema: HostSchema,

    /// Summary panel settings.
    #[serde(default)]
    pub summary: SummaryConfig,

    /// Readiness detection before the first reconciliation.
    #[serde(default)]
    pub readiness: ReadinessConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

// ============================================================================
// HOST SCHEMA
// ============================================================================

/// Minimal schema the engine assumes about the host page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostSchema {
    /// One element per transaction; carries the row `id` attribute.
    #[serde(default = "default_row")]
    pub row: String,

    /// Element inside a row that receives the selection control.
    #[serde(default = "default_data_row")]
    pub data_row: String,

    #[serde(default = "default_date")]
    pub date: String,

    #[serde(default = "default_description")]
    pub description: String,

    #[serde(default = "default_category")]
    pub category: String,

    #[serde(default = "default_amount")]
    pub amount: String,

    /// Container the summary panel is inserted into.
    #[serde(default = "default_container")]
    pub container: String,

    /// Class of the injected checkbox.
    #[serde(default = "default_control")]
    pub control: String,

    /// Class of the injected summary panel.
    #[serde(default = "default_panel")]
    pub panel: String,

    /// Class of the injected refresh button.
    #[serde(default = "default_refresh")]
    pub refresh: String,

    /// Attribute marking a control whose toggle handler is already bound.
    #[serde(default = "default_bound_marker")]
    pub bound_marker: String,
}

impl Default for HostSchema {
    fn default() -> Self {
        Self {
            row: default_row(),
            data_row: default_data_row(),
            date: default_date(),
            description: default_description(),
            category: default_category(),
            amount: default_amount(),
            container: default_container(),
            control: default_control(),
            panel: default_panel(),
            refresh: default_refresh(),
            bound_marker: default_bound_marker(),
        }
    }
}

fn default_row() -> String {
    "transaction-entry".to_string()
}

fn default_data_row() -> String {
    "transactions-data-row".to_string()
}

fn default_date() -> String {
    "transactions-date".to_string()
}

fn default_description() -> String {
    "transactions-description".to_string()
}

fn default_category() -> String {
    "transactions-category".to_string()
}

fn default_amount() -> String {
    "transactions-amount".to_string()
}

fn default_container() -> String {
    "transactionsView".to_string()
}

fn default_control() -> String {
    "expenseCheck".to_string()
}

fn default_panel() -> String {
    "jointTransfers".to_string()
}

fn default_refresh() -> String {
    "btnRefresh".to_string()
}

fn default_bound_marker() -> String {
    "data-jt-bound".to_string()
}

// ============================================================================
// SUMMARY
// ============================================================================

/// Which signal decides whether a selected row counts toward the total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionAuthority {
    /// Store membership decides; checkbox state is a derived view.
    #[default]
    Store,
    /// Only rows whose checkbox is currently checked count.
    CheckedState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryConfig {
    /// Panel heading.
    #[serde(default = "default_title")]
    pub title: String,

    /// Symbol printed in front of the total.
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,

    #[serde(default)]
    pub authority: SelectionAuthority,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            currency_symbol: default_currency_symbol(),
            authority: SelectionAuthority::default(),
        }
    }
}

fn default_title() -> String {
    "Joint Transfers".to_string()
}

fn default_currency_symbol() -> String {
    "$".to_string()
}

// ============================================================================
// READINESS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessConfig {
    /// How long the document must stay unchanged before it counts as settled.
    #[serde(default = "default_quiet_period_ms")]
    pub quiet_period_ms: u64,

    /// Upper bound on waiting; reconciliation starts anyway afterwards.
    #[serde(default = "default_max_wait_ms")]
    pub max_wait_ms: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            quiet_period_ms: default_quiet_period_ms(),
            max_wait_ms: default_max_wait_ms(),
        }
    }
}

fn default_quiet_period_ms() -> u64 {
    500
}

fn default_max_wait_ms() -> u64 {
    6000
}

// ============================================================================
// LOGGING
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set.
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `joint-transfers.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(DEFAULT_CONFIG_FILE);

        if path.exists() {
            Ok(Some(Self::load(&path)?))
        } else {
            Ok(None)
        }
    }

    /// Default configuration rendered as TOML, for `init-config`.
    pub fn default_toml() -> Result<String> {
        let body = toml::to_string_pretty(&Config::default())
            .context("Failed to serialize default config")?;
        Ok(format!(
            "# joint-transfers configuration\n# Every key is optional; defaults are shown.\n\n{}",
            body
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_schema_matches_host_page() {
        let config = Config::default();

        assert_eq!(config.schema.row, "transaction-entry");
        assert_eq!(config.schema.container, "transactionsView");
        assert_eq!(config.summary.authority, SelectionAuthority::Store);
        assert_eq!(config.readiness.quiet_period_ms, 500);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[summary]\nauthority = \"checked-state\"\n\n[schema]\nrow = \"tx-row\""
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.summary.authority, SelectionAuthority::CheckedState);
        assert_eq!(config.summary.title, "Joint Transfers");
        assert_eq!(config.schema.row, "tx-row");
        assert_eq!(config.schema.amount, "transactions-amount");
    }

    #[test]
    fn test_default_toml_round_trips() {
        let text = Config::default_toml().unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();

        assert_eq!(parsed.schema, HostSchema::default());
        assert_eq!(parsed.readiness, ReadinessConfig::default());
    }

    #[test]
    fn test_load_from_dir_without_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load_from_dir(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[summary]\nauthority = \"everyone\"").unwrap();

        assert!(Config::load(file.path()).is_err());
    }
}
