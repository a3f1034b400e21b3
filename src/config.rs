//! Configuration
//!
//! Layered, lowest priority first:
//! 1. Built-in defaults
//! 2. TOML file (`--config`, `PARLEY_CONFIG_PATH`, or `./parley.toml` if present)
//! 3. `PARLEY_*` environment variables, nested with `__`
//!    (e.g. `PARLEY_DRIVER__MAX_STEPS_PER_TURN=500`)
//! 4. Builder overrides
//!
//! A `.env` file is read first, so its variables take part in step 3.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub store: StoreConfig,
    pub snapshot: SnapshotConfig,
    pub driver: DriverConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 20,
            min_connections: 2,
            acquire_timeout_secs: 10,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// gzip level, 0 (none) to 9 (best)
    pub compression_level: u32,

    /// Reject blobs larger than this many bytes
    pub max_blob_bytes: Option<usize>,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            compression_level: 6,
            max_blob_bytes: None,
        }
    }
}

/// What to do with a stored fiber that cannot be decoded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorruptSnapshotPolicy {
    /// Abort the turn and leave the blob alone
    #[default]
    Fail,
    /// Discard the blob and start the conversation over
    Reset,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub max_steps_per_turn: usize,
    pub on_corrupt_snapshot: CorruptSnapshotPolicy,
    pub bot_id: String,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            max_steps_per_turn: 10_000,
            on_corrupt_snapshot: CorruptSnapshotPolicy::Fail,
            bot_id: "parley".to_string(),
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load with no overrides
    pub fn load() -> Result<Self> {
        Self::builder().build()
    }

    pub fn validate(&self) -> Result<()> {
        if self.snapshot.compression_level > 9 {
            bail!(
                "snapshot.compression_level must be between 0 and 9, got {}",
                self.snapshot.compression_level
            );
        }
        if self.driver.max_steps_per_turn == 0 {
            bail!("driver.max_steps_per_turn must be greater than 0");
        }
        if self.store.backend == StoreBackend::Postgres && self.database.url.is_none() {
            bail!(
                "store.backend is 'postgres' but no database URL is configured\n\n\
                Set PARLEY_DATABASE_URL, database.url in parley.toml, or pass --database-url"
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    database_url: Option<String>,
    config_path: Option<PathBuf>,
}

impl ConfigBuilder {
    pub fn database_url(mut self, url: Option<String>) -> Self {
        self.database_url = url;
        self
    }

    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    pub fn build(self) -> Result<Config> {
        dotenvy::dotenv().ok();

        let mut builder = config::Config::builder();

        let path = self
            .config_path
            .or_else(|| std::env::var("PARLEY_CONFIG_PATH").ok().map(PathBuf::from));
        builder = match path {
            Some(path) => builder.add_source(config::File::from(path).required(true)),
            None => builder.add_source(config::File::with_name("parley").required(false)),
        };

        builder = builder.add_source(
            config::Environment::with_prefix("PARLEY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // Flat variable kept for parity with other tools' DATABASE_URL conventions
        let database_url = self
            .database_url
            .or_else(|| std::env::var("PARLEY_DATABASE_URL").ok());
        builder = builder
            .set_override_option("database.url", database_url)
            .context("Failed to apply database URL override")?;

        let config: Config = builder
            .build()
            .context("Failed to read configuration sources")?
            .try_deserialize()
            .context("Invalid configuration")?;

        config.validate()?;
        Ok(config)
    }
}
