//! The [`Engine`] handle.
//!
//! Operations are spread over the modules that own them (`booking`,
//! `catalogue`, `inventory`, `ledger`, `reports`), each adding an
//! `impl Engine` block.

use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use tracing::info;

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::EngineResult;
use innkeep_core::Money;
use innkeep_db::Database;

/// Entry point for every booking, inventory and ledger operation.
#[derive(Clone)]
pub struct Engine {
    db: Database,
    config: EngineConfig,
    clock: Arc<dyn Clock>,
}

impl Engine {
    /// Opens the database named by the config and applies migrations.
    pub async fn open(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let db = Database::new(config.db_config()).await?;
        info!(path = ?config.database.path, "Engine ready");
        Ok(Self::new(db, config))
    }

    pub fn new(db: Database, config: EngineConfig) -> Self {
        Self::with_clock(db, config, Arc::new(SystemClock))
    }

    pub fn with_clock(db: Database, config: EngineConfig, clock: Arc<dyn Clock>) -> Self {
        Engine { db, config, clock }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub(crate) fn default_fee(&self) -> Money {
        self.config.default_fee()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("now", &self.clock.now())
            .finish()
    }
}
