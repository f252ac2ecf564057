//! Pipeline configuration and construction of the shared HTTP client.

use std::time::Duration;

use anyhow::{Context, Result};
use log::debug;
use reqwest::Client;

use crate::error::ErrorCatalog;
use crate::http::{DEFAULT_TIMEOUT, HttpClient};

/// User agent sent when none is configured.
pub const DEFAULT_USER_AGENT: &str = concat!("paywire/", env!("PAYWIRE_VERSION"));

/// Settings shared by every call made through one [`HttpClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Applied to requests that do not set their own timeout.
    pub default_timeout: Duration,
    pub connect_timeout: Option<Duration>,
    pub user_agent: String,
    pub catalog: ErrorCatalog,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            default_timeout: DEFAULT_TIMEOUT,
            connect_timeout: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            catalog: ErrorCatalog::default(),
        }
    }
}

impl ClientConfig {
    /// Sets the default timeout. Zero keeps the built-in default.
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        if !timeout.is_zero() {
            self.default_timeout = timeout;
        }
        self
    }

    /// Sets the TCP connect timeout. Unset means no separate limit.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the `User-Agent` header sent with every request.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets the catalog used to describe errors.
    pub fn catalog(mut self, catalog: ErrorCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Builds the connection pool and wraps it in an [`HttpClient`].
    pub fn build(&self) -> Result<HttpClient> {
        debug!(
            "Building HTTP client (timeout {:?}, connect timeout {:?})",
            self.default_timeout, self.connect_timeout
        );

        let mut builder = Client::builder().user_agent(&self.user_agent);
        if let Some(timeout) = self.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        let client = builder.build().context("Failed to build HTTP client")?;

        Ok(HttpClient::new(client)
            .with_default_timeout(self.default_timeout)
            .with_catalog(self.catalog.clone()))
    }
}
