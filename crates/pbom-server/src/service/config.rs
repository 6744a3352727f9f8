use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default values for configuration options.
mod defaults {
    use std::path::PathBuf;

    /// Default directory for persisted records.
    pub fn storage_dir() -> PathBuf {
        "./pbom-data".into()
    }

    /// Default budget of one enrichment in seconds.
    pub const ENRICHMENT_TIMEOUT_SECS: u64 = 120;
}

/// App [`state`] configuration.
///
/// [`state`]: crate::service::ServiceState
#[derive(Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct ServiceConfig {
    /// Shared secret used to verify webhook signatures
    #[cfg_attr(
        feature = "config",
        arg(long, env = "PBOM_WEBHOOK_SECRET", hide_env_values = true)
    )]
    #[serde(default, skip_serializing)]
    pub webhook_secret: String,

    /// Directory where enriched records are written
    #[cfg_attr(
        feature = "config",
        arg(long, env = "PBOM_STORAGE_DIR", default_value = "./pbom-data")
    )]
    #[serde(default = "defaults::storage_dir")]
    pub storage_dir: PathBuf,

    /// Time budget in seconds for enriching one event, retries included
    #[cfg_attr(
        feature = "config",
        arg(long, env = "PBOM_ENRICHMENT_TIMEOUT", default_value = "120")
    )]
    #[serde(default = "enrichment_timeout_default")]
    pub enrichment_timeout: u64,
}

fn enrichment_timeout_default() -> u64 {
    defaults::ENRICHMENT_TIMEOUT_SECS
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            webhook_secret: String::new(),
            storage_dir: defaults::storage_dir(),
            enrichment_timeout: defaults::ENRICHMENT_TIMEOUT_SECS,
        }
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("webhook_secret", &"<redacted>")
            .field("storage_dir", &self.storage_dir)
            .field("enrichment_timeout", &self.enrichment_timeout)
            .finish()
    }
}

impl ServiceConfig {
    /// Creates a configuration with the given webhook secret and defaults
    /// for everything else.
    pub fn new(webhook_secret: impl Into<String>) -> Self {
        Self {
            webhook_secret: webhook_secret.into(),
            ..Self::default()
        }
    }

    /// Sets the record storage directory.
    pub fn with_storage_dir(mut self, storage_dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = storage_dir.into();
        self
    }

    /// Sets the enrichment time budget in seconds.
    pub fn with_enrichment_timeout(mut self, secs: u64) -> Self {
        self.enrichment_timeout = secs;
        self
    }

    /// Returns the enrichment time budget.
    #[must_use]
    pub fn enrichment_timeout(&self) -> Duration {
        Duration::from_secs(self.enrichment_timeout)
    }

    /// Validates the configuration.
    ///
    /// An empty webhook secret would make every signature check fail, so it
    /// is rejected at startup instead.
    pub fn validate(&self) -> Result<()> {
        if self.webhook_secret.trim().is_empty() {
            return Err(Error::config("webhook secret must not be empty"));
        }

        if self.storage_dir.as_os_str().is_empty() {
            return Err(Error::config("storage directory must not be empty"));
        }

        if self.enrichment_timeout == 0 {
            return Err(Error::config("enrichment timeout must be at least 1 second"));
        }

        Ok(())
    }
}
