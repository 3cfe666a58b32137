//! Verification context for dependency injection

use std::path::{Path, PathBuf};
use xfck_config::{Config, LedgerConfig, WorkerConfig};
use xfck_errors::{Error, OpsError};
use xfck_ledger::{create_pool, Ledger, Side};

/// Everything a phase needs, built once and passed to every task
#[derive(Debug, Clone)]
pub struct VerifyContext {
    /// Ledger handle shared by all workers
    pub ledger: Ledger,
    /// Destination tree root
    pub new_root: PathBuf,
    /// Source tree root
    pub old_root: PathBuf,
    /// Raw SQL predicate narrowing the pending-row queries
    pub filter: Option<String>,
    /// Concurrency limits
    pub workers: WorkerConfig,
}

impl VerifyContext {
    /// Validate `config`, open the ledger pool and build a context
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is incomplete or the store
    /// cannot be reached.
    pub async fn open(config: &Config) -> Result<Self, Error> {
        config.validate()?;
        let ledger = open_ledger(&config.ledger).await?;

        VerifyContextBuilder::from_config(config)
            .with_ledger(ledger)
            .build()
    }

    /// Tree root for `side`
    #[must_use]
    pub fn root(&self, side: Side) -> &Path {
        match side {
            Side::New => &self.new_root,
            Side::Old => &self.old_root,
        }
    }

    #[must_use]
    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    /// Close the pool, waiting for checked-out connections to return
    pub async fn close(self) {
        self.ledger.close().await;
    }
}

/// Validate the store settings and connect to the ledger
///
/// Tree roots are not required, so read-only commands can use this alone.
///
/// # Errors
///
/// Returns an error if the store settings are invalid or the store cannot
/// be reached.
pub async fn open_ledger(config: &LedgerConfig) -> Result<Ledger, Error> {
    config.validate()?;
    let pool = create_pool(config).await?;
    Ok(Ledger::new(pool, &config.table_name))
}

/// Builder for [`VerifyContext`]
#[derive(Debug, Default)]
pub struct VerifyContextBuilder {
    ledger: Option<Ledger>,
    new_root: Option<PathBuf>,
    old_root: Option<PathBuf>,
    filter: Option<String>,
    workers: Option<WorkerConfig>,
}

impl VerifyContextBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed roots, filter and worker limits from configuration
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            ledger: None,
            new_root: config.paths.new_path.clone(),
            old_root: config.paths.old_path.clone(),
            filter: config.ledger.filter().map(str::to_string),
            workers: Some(config.workers.clone()),
        }
    }

    #[must_use]
    pub fn with_ledger(mut self, ledger: Ledger) -> Self {
        self.ledger = Some(ledger);
        self
    }

    #[must_use]
    pub fn with_new_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.new_root = Some(root.into());
        self
    }

    #[must_use]
    pub fn with_old_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.old_root = Some(root.into());
        self
    }

    /// Set the filter; blank fragments clear it
    #[must_use]
    pub fn with_filter(mut self, filter: Option<String>) -> Self {
        self.filter = filter
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty());
        self
    }

    #[must_use]
    pub fn with_workers(mut self, workers: WorkerConfig) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Build the context
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger or either root is missing.
    pub fn build(self) -> Result<VerifyContext, Error> {
        let missing = |what: &str| {
            Error::from(OpsError::ContextCreationFailed {
                message: format!("{what} is required"),
            })
        };

        Ok(VerifyContext {
            ledger: self.ledger.ok_or_else(|| missing("ledger"))?,
            new_root: self.new_root.ok_or_else(|| missing("destination root"))?,
            old_root: self.old_root.ok_or_else(|| missing("source root"))?,
            filter: self.filter,
            workers: self.workers.unwrap_or_default(),
        })
    }
}
