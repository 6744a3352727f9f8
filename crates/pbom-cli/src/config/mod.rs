//! CLI configuration management.
//!
//! ```text
//! Cli
//! ├── server: ServerConfig      # Host, port, shutdown window
//! ├── recovery: RecoveryConfig  # Request timeout
//! ├── service: ServiceConfig    # Webhook secret, storage, enrichment deadline
//! ├── github: ReqwestConfig     # GitHub token, API URL, HTTP timeout
//! └── log_json                  # JSON log output
//! ```
//!
//! All configuration can be provided via CLI arguments or environment variables.
//! Use `--help` to see all available options.

mod server;

use std::process;

use anyhow::{Context, anyhow};
use clap::Parser;
use pbom_github::reqwest::ReqwestConfig;
use pbom_server::middleware::RecoveryConfig;
use pbom_server::service::ServiceConfig;
use serde::{Deserialize, Serialize};
pub use server::ServerConfig;

use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_SERVER_STARTUP};

/// Largest accepted request timeout in seconds.
const MAX_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[command(name = "pbom-webhook")]
#[command(about = "Enriches GitHub Actions runs into Pipeline Bill of Materials records")]
#[command(version)]
pub struct Cli {
    /// Server network and lifecycle configuration.
    #[clap(flatten)]
    pub server: ServerConfig,

    /// Request timeout and panic recovery.
    #[clap(flatten)]
    pub recovery: RecoveryConfig,

    /// Webhook authentication, record storage and enrichment deadline.
    #[clap(flatten)]
    pub service: ServiceConfig,

    /// GitHub REST API client.
    #[clap(flatten)]
    pub github: ReqwestConfig,

    /// Emit logs as JSON lines instead of human readable text
    #[arg(long, env = "LOG_JSON")]
    #[serde(default)]
    pub log_json: bool,
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    ///
    /// The .env file is loaded first so clap's `env` fallbacks can see its values.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    /// Loads environment variables from .env file if the dotenv feature is enabled.
    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    /// No-op when dotenv feature is disabled.
    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Validates all configuration values.
    ///
    /// Runs before the listener binds, so every error here is fatal at startup.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.server
            .validate()
            .context("invalid server configuration")?;

        let request_timeout = self.recovery.request_timeout;
        if request_timeout == 0 || request_timeout > MAX_REQUEST_TIMEOUT_SECS {
            return Err(anyhow!(
                "Request timeout {request_timeout} seconds is invalid. Must be between 1 and {MAX_REQUEST_TIMEOUT_SECS} seconds."
            ));
        }

        self.service
            .validate()
            .context("invalid service configuration")?;

        if !self.github.has_token() {
            return Err(anyhow!(
                "GitHub token is required. Set GITHUB_TOKEN or pass --github-token."
            ));
        }

        Ok(())
    }

    /// Logs configuration (no sensitive information).
    pub fn log(&self) {
        Self::log_build_info();
        self.server.log();

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            request_timeout_secs = self.recovery.request_timeout,
            "Recovery configuration"
        );

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            storage_dir = %self.service.storage_dir.display(),
            enrichment_timeout_secs = self.service.enrichment_timeout,
            "Service configuration"
        );

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            api_url = %self.github.api_url,
            http_timeout_secs = self.github.http_timeout,
            user_agent = %self.github.effective_user_agent(),
            "GitHub client configuration"
        );
    }

    /// Logs build information at debug level.
    fn log_build_info() {
        tracing::debug!(
            target: TRACING_TARGET_SERVER_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            arch = std::env::consts::ARCH,
            os = std::env::consts::OS,
            features = ?Self::enabled_features(),
            "Build information"
        );
    }

    /// Returns a list of enabled compile-time features.
    fn enabled_features() -> Vec<&'static str> {
        [cfg!(feature = "dotenv").then_some("dotenv")]
            .into_iter()
            .flatten()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    fn valid() -> Cli {
        Cli {
            server: ServerConfig::default(),
            recovery: RecoveryConfig::default(),
            service: ServiceConfig::new("s3cret"),
            github: ReqwestConfig::new("ghp_token"),
            log_json: false,
        }
    }

    #[test]
    fn command_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn explicit_arguments_parse() {
        let cli = Cli::try_parse_from([
            "pbom-webhook",
            "--webhook-secret",
            "s3cret",
            "--github-token",
            "ghp_token",
            "--host",
            "127.0.0.1",
            "--port",
            "9090",
            "--storage-dir",
            "/var/lib/pbom",
            "--enrichment-timeout",
            "60",
            "--request-timeout",
            "20",
            "--log-json",
        ])
        .unwrap();

        assert_eq!(cli.server.port, 9090);
        assert_eq!(cli.service.webhook_secret, "s3cret");
        assert_eq!(cli.service.storage_dir.to_str(), Some("/var/lib/pbom"));
        assert_eq!(cli.service.enrichment_timeout, 60);
        assert_eq!(cli.recovery.request_timeout, 20);
        assert!(cli.log_json);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn valid_configuration_passes() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn missing_secret_is_fatal() {
        let mut cli = valid();
        cli.service.webhook_secret = String::new();
        assert!(cli.validate().is_err());
    }

    #[test]
    fn missing_token_is_fatal() {
        let mut cli = valid();
        cli.github.github_token = "  ".into();
        assert!(cli.validate().is_err());
    }

    #[test]
    fn out_of_range_request_timeout_is_fatal() {
        let mut cli = valid();
        cli.recovery.request_timeout = 0;
        assert!(cli.validate().is_err());

        cli.recovery.request_timeout = 301;
        assert!(cli.validate().is_err());
    }

    #[test]
    fn secrets_are_not_logged() {
        let rendered = format!("{:?}", valid());
        assert!(!rendered.contains("s3cret"));
        assert!(!rendered.contains("ghp_token"));
    }
}
