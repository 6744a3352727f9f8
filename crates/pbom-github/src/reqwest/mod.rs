//! Reqwest-based client for the GitHub REST API.
//!
//! This module provides a reqwest-based implementation of the
//! [`GithubProvider`] trait.
//!
//! # Example
//!
//! ```rust,ignore
//! use pbom_github::reqwest::{ReqwestClient, ReqwestConfig};
//! use pbom_github::GithubService;
//!
//! let client = ReqwestClient::new(ReqwestConfig::new("ghp_..."))?;
//!
//! // Convert to a service for dependency injection
//! let service: GithubService = client.into_service();
//! ```
//!
//! [`GithubProvider`]: crate::GithubProvider

mod client;
mod config;
mod error;

pub use client::ReqwestClient;
pub use config::ReqwestConfig;
pub use error::{Error, Result};

/// Tracing target for reqwest client operations.
pub const TRACING_TARGET: &str = "pbom_github::reqwest";
