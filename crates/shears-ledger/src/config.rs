//! # Ledger Configuration
//!
//! Store settings, database location and the payment-method catalog.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     SHEARS_DB_PATH=/var/lib/shears/ledger.db                           │
//! │     SHEARS_STORE_NAME="Fade Factory"                                   │
//! │     SHEARS_TAX_RATE=1900            (basis points)                     │
//! │     SHEARS_TAX_REGISTERED=true                                         │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/shears-pos/ledger.toml (Linux)                           │
//! │     ~/Library/Application Support/com.shears.pos/ledger.toml (macOS)   │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     not tax registered, cash + card + transfer                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # ledger.toml
//! [database]
//! path = "/var/lib/shears/ledger.db"
//! max_connections = 5
//! busy_timeout_secs = 5
//!
//! [store]
//! name = "Fade Factory"
//! currency_code = "USD"
//! tax_registered = true
//! tax_rate_bps = 1900   # 19%
//!
//! [[payment_methods]]
//! id = "cash"
//! display_name = "Cash"
//!
//! [[payment_methods]]
//! id = "card"
//! display_name = "Card"
//! enabled = true
//! ```

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use shears_core::validation::validate_tax_rate_bps;
use shears_core::{PaymentMethodCatalog, PaymentMethodConfig, TaxRate};
use shears_db::DbConfig;
use tracing::{debug, info, warn};

use crate::error::{LedgerError, LedgerResult};

// =============================================================================
// Database Settings
// =============================================================================

/// Where and how the ledger database is opened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Defaults to the platform data directory.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a writer waits for SQLite's write lock.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_secs: u64,
}

fn default_db_path() -> PathBuf {
    directories::ProjectDirs::from("com", "shears", "pos")
        .map(|dirs| dirs.data_dir().join("ledger.db"))
        .unwrap_or_else(|| PathBuf::from("ledger.db"))
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout() -> u64 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
            busy_timeout_secs: default_busy_timeout(),
        }
    }
}

impl DatabaseSettings {
    /// Pool settings for [`shears_db::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.path.clone())
            .max_connections(self.max_connections)
            .busy_timeout(Duration::from_secs(self.busy_timeout_secs))
    }
}

// =============================================================================
// Store Settings
// =============================================================================

/// The barbershop itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default = "default_store_name")]
    pub name: String,

    /// ISO 4217 code, shown on invoices.
    #[serde(default = "default_currency")]
    pub currency_code: String,

    /// Whether invoices break out tax at all.
    #[serde(default)]
    pub tax_registered: bool,

    /// Tax rate included in every price, in basis points.
    #[serde(default)]
    pub tax_rate_bps: u32,
}

fn default_store_name() -> String {
    "Barbershop".to_string()
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            name: default_store_name(),
            currency_code: default_currency(),
            tax_registered: false,
            tax_rate_bps: 0,
        }
    }
}

impl StoreSettings {
    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps)
    }
}

fn default_payment_methods() -> Vec<PaymentMethodConfig> {
    [("cash", "Cash"), ("card", "Card"), ("transfer", "Bank Transfer")]
        .into_iter()
        .map(|(id, name)| PaymentMethodConfig {
            id: id.to_string(),
            display_name: name.to_string(),
            enabled: true,
        })
        .collect()
}

// =============================================================================
// Main Ledger Configuration
// =============================================================================

/// Complete ledger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default = "default_payment_methods")]
    pub payment_methods: Vec<PaymentMethodConfig>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            database: DatabaseSettings::default(),
            store: StoreSettings::default(),
            payment_methods: default_payment_methods(),
        }
    }
}

impl LedgerConfig {
    /// Loads configuration from file, environment and defaults.
    ///
    /// `config_path` falls back to the platform config directory. A missing
    /// file is not an error.
    pub fn load(config_path: Option<PathBuf>) -> LedgerResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading ledger config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Like [`load`](Self::load), but never fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load ledger config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Parses a TOML document and validates it. Environment is not read.
    pub fn from_toml(contents: &str) -> LedgerResult<Self> {
        let config: LedgerConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the configuration as TOML.
    pub fn save(&self, config_path: Option<PathBuf>) -> LedgerResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| LedgerError::Config("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Ledger config saved");
        Ok(())
    }

    pub fn validate(&self) -> LedgerResult<()> {
        if self.store.name.trim().is_empty() {
            return Err(LedgerError::Config("store.name must not be empty".into()));
        }

        validate_tax_rate_bps(self.store.tax_rate_bps)
            .map_err(|e| LedgerError::Config(e.to_string()))?;

        if self.database.max_connections == 0 {
            return Err(LedgerError::Config(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        let mut seen = HashSet::new();
        for method in &self.payment_methods {
            if method.id.trim().is_empty() {
                return Err(LedgerError::Config("payment method id must not be empty".into()));
            }
            if !seen.insert(method.id.as_str()) {
                return Err(LedgerError::Config(format!(
                    "Duplicate payment method: '{}'",
                    method.id
                )));
            }
        }

        if !self.payment_methods.iter().any(|m| m.enabled) {
            return Err(LedgerError::Config(
                "At least one payment method must be enabled".into(),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies `SHEARS_*` overrides read through `lookup`.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("SHEARS_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(name) = lookup("SHEARS_STORE_NAME") {
            self.store.name = name;
        }

        if let Some(rate) = lookup("SHEARS_TAX_RATE") {
            match rate.parse::<u32>() {
                Ok(bps) => {
                    debug!(bps, "Overriding tax rate from environment");
                    self.store.tax_rate_bps = bps;
                }
                Err(_) => warn!(rate = %rate, "Ignoring unparseable SHEARS_TAX_RATE"),
            }
        }

        if let Some(flag) = lookup("SHEARS_TAX_REGISTERED") {
            match flag.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.store.tax_registered = true,
                "0" | "false" | "no" => self.store.tax_registered = false,
                _ => warn!(flag = %flag, "Unknown SHEARS_TAX_REGISTERED value"),
            }
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "shears", "pos")
            .map(|dirs| dirs.config_dir().join("ledger.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn payment_catalog(&self) -> PaymentMethodCatalog {
        PaymentMethodCatalog::new(self.payment_methods.clone())
    }

    /// Rate invoices apply: zero unless the store is tax registered.
    pub fn effective_tax_rate(&self) -> TaxRate {
        if self.store.tax_registered {
            self.store.tax_rate()
        } else {
            TaxRate::zero()
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config_is_valid() {
        let config = LedgerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.payment_catalog().enabled().count(), 3);
        assert!(config.effective_tax_rate().is_zero());
    }

    #[test]
    fn test_parse_toml() {
        let config = LedgerConfig::from_toml(
            r#"
            [database]
            path = "/tmp/shears.db"
            busy_timeout_secs = 2

            [store]
            name = "Fade Factory"
            tax_registered = true
            tax_rate_bps = 1900

            [[payment_methods]]
            id = "cash"
            display_name = "Cash"

            [[payment_methods]]
            id = "card"
            display_name = "Card"
            enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(config.database.path, PathBuf::from("/tmp/shears.db"));
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.store.currency_code, "USD");
        assert_eq!(config.effective_tax_rate().bps(), 1900);

        let catalog = config.payment_catalog();
        assert!(catalog.resolve("cash").is_ok());
        assert!(catalog.resolve("card").is_err());
    }

    #[test]
    fn test_rejects_duplicate_methods() {
        let err = LedgerConfig::from_toml(
            r#"
            [[payment_methods]]
            id = "cash"
            display_name = "Cash"

            [[payment_methods]]
            id = "cash"
            display_name = "Cash again"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::Config(msg) if msg.contains("Duplicate")));
    }

    #[test]
    fn test_rejects_all_disabled() {
        let err = LedgerConfig::from_toml(
            r#"
            [[payment_methods]]
            id = "cash"
            display_name = "Cash"
            enabled = false
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::Config(_)));
    }

    #[test]
    fn test_rejects_tax_rate_over_100_percent() {
        let err = LedgerConfig::from_toml("[store]\ntax_rate_bps = 10001\n").unwrap_err();
        assert!(matches!(err, LedgerError::Config(_)));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("SHEARS_DB_PATH", "/data/ledger.db"),
            ("SHEARS_STORE_NAME", "Sharp Edges"),
            ("SHEARS_TAX_RATE", "1600"),
            ("SHEARS_TAX_REGISTERED", "yes"),
        ]
        .into_iter()
        .collect();

        let mut config = LedgerConfig::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.database.path, PathBuf::from("/data/ledger.db"));
        assert_eq!(config.store.name, "Sharp Edges");
        assert_eq!(config.effective_tax_rate().bps(), 1600);
    }

    #[test]
    fn test_bad_override_ignored() {
        let mut config = LedgerConfig::default();
        config.apply_overrides(|k| (k == "SHEARS_TAX_RATE").then(|| "lots".to_string()));
        assert_eq!(config.store.tax_rate_bps, 0);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ledger.toml");

        let mut config = LedgerConfig::default();
        config.store.name = "Round Trip Cuts".into();
        config.save(Some(path.clone())).unwrap();

        let loaded = LedgerConfig::from_toml(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.store.name, "Round Trip Cuts");
        assert_eq!(loaded.payment_methods, config.payment_methods);
    }
}
