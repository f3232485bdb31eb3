//! # Engine Configuration
//!
//! Configuration management for the booking engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     INNKEEP_DATABASE_PATH=/var/lib/innkeep/innkeep.db                  │
//! │     INNKEEP_DEFAULT_FEE_CENTS=1500                                     │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/innkeep/engine.toml (Linux)                              │
//! │     ~/Library/Application Support/com.innkeep.engine/engine.toml       │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     ./innkeep.db, 5 connections, fee 10.00                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # engine.toml
//! [database]
//! path = "/var/lib/innkeep/innkeep.db"
//! max_connections = 5
//! busy_timeout_ms = 5000
//!
//! [ledger]
//! default_fee_cents = 1000  # charged per line when a room type has no fee schedule
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{EngineError, EngineResult};
use innkeep_core::{Money, DEFAULT_SERVICE_FEE_CENTS};
use innkeep_db::DbConfig;

// =============================================================================
// Database Settings
// =============================================================================

/// Where and how the engine stores its data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite database file.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    /// Pool size.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a writer waits for the database lock (milliseconds).
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./innkeep.db")
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout() -> u64 {
    5_000
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: default_max_connections(),
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

// =============================================================================
// Ledger Settings
// =============================================================================

/// Fee settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSettings {
    /// Fee per accepted line for room types without a fee schedule.
    #[serde(default = "default_fee_cents")]
    pub default_fee_cents: i64,
}

fn default_fee_cents() -> i64 {
    DEFAULT_SERVICE_FEE_CENTS
}

impl Default for LedgerSettings {
    fn default() -> Self {
        LedgerSettings {
            default_fee_cents: default_fee_cents(),
        }
    }
}

// =============================================================================
// Engine Configuration
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub ledger: LedgerSettings,
}

impl EngineConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (engine.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> EngineResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading engine config from file");
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

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load engine config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Validates the configuration.
    pub fn validate(&self) -> EngineResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(EngineError::InvalidConfig("database.path must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(EngineError::InvalidConfig(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.ledger.default_fee_cents < 0 {
            return Err(EngineError::InvalidConfig(
                "ledger.default_fee_cents must not be negative".into(),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("INNKEEP_DATABASE_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Ok(max) = std::env::var("INNKEEP_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring invalid INNKEEP_MAX_CONNECTIONS"),
            }
        }

        if let Ok(fee) = std::env::var("INNKEEP_DEFAULT_FEE_CENTS") {
            match fee.parse::<i64>() {
                Ok(cents) => {
                    debug!(cents, "Overriding default fee from environment");
                    self.ledger.default_fee_cents = cents;
                }
                Err(_) => warn!(value = %fee, "Ignoring invalid INNKEEP_DEFAULT_FEE_CENTS"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "innkeep", "engine")
            .map(|dirs| dirs.config_dir().join("engine.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Pool configuration for [`innkeep_db::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path)
            .max_connections(self.database.max_connections)
            .busy_timeout(Duration::from_millis(self.database.busy_timeout_ms))
    }

    /// Fee charged for room types without a schedule.
    pub fn default_fee(&self) -> Money {
        Money::from_cents(self.ledger.default_fee_cents)
    }
}
