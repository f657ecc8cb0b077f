// Copyright (C) 2025 DSLab - Fondazione Bruno Kessler
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration for the SDK.

use std::env;
use std::time::Duration;

use crate::error::{Result, SdkError};

const DEFAULT_ENDPOINT: &str = "http://localhost:8080";

/// Configuration shared by contexts, processors and runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkConfig {
    /// Backend base URL.
    pub endpoint: String,
    /// Timeout applied to every backend request.
    pub request_timeout: Duration,
    /// Interval between two polls in `Run::wait`.
    pub wait_poll_interval: Duration,
    /// Optional deadline for `Run::wait`. `None` waits forever.
    pub wait_timeout: Option<Duration>,
    /// Operate without a backend.
    pub local: bool,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout: Duration::from_secs(30),
            wait_poll_interval: Duration::from_secs(5),
            wait_timeout: None,
            local: false,
        }
    }
}

impl SdkConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration for backend-less operation.
    pub fn local() -> Self {
        Self {
            local: true,
            ..Self::default()
        }
    }

    /// Create a configuration from environment variables.
    ///
    /// Environment variables:
    /// - `DHCORE_ENDPOINT`: Backend base URL (default: "http://localhost:8080")
    /// - `DHCORE_REQUEST_TIMEOUT_MS`: Request timeout in milliseconds (default: 30000)
    /// - `DHUB_WAIT_POLL_INTERVAL_MS`: Poll interval of `wait` in milliseconds (default: 5000)
    /// - `DHUB_WAIT_TIMEOUT_MS`: Deadline of `wait` in milliseconds (default: unset, no deadline)
    /// - `DHUB_LOCAL`: Operate without a backend (default: "false")
    pub fn from_env() -> Result<Self> {
        let endpoint = env::var("DHCORE_ENDPOINT")
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(SdkError::Config(format!(
                "invalid DHCORE_ENDPOINT: {} (expected http:// or https://)",
                endpoint
            )));
        }

        let request_timeout_ms: u64 = env::var("DHCORE_REQUEST_TIMEOUT_MS")
            .unwrap_or_else(|_| "30000".to_string())
            .parse()
            .map_err(|e| SdkError::Config(format!("invalid DHCORE_REQUEST_TIMEOUT_MS: {}", e)))?;

        let wait_poll_interval_ms: u64 = env::var("DHUB_WAIT_POLL_INTERVAL_MS")
            .unwrap_or_else(|_| "5000".to_string())
            .parse()
            .map_err(|e| SdkError::Config(format!("invalid DHUB_WAIT_POLL_INTERVAL_MS: {}", e)))?;

        let wait_timeout = match env::var("DHUB_WAIT_TIMEOUT_MS") {
            Ok(v) => Some(Duration::from_millis(v.parse().map_err(|e| {
                SdkError::Config(format!("invalid DHUB_WAIT_TIMEOUT_MS: {}", e))
            })?)),
            Err(_) => None,
        };

        let local = env::var("DHUB_LOCAL")
            .map(|v| v.to_lowercase() == "true" || v == "1")
            .unwrap_or(false);

        Ok(Self {
            endpoint,
            request_timeout: Duration::from_millis(request_timeout_ms),
            wait_poll_interval: Duration::from_millis(wait_poll_interval_ms),
            wait_timeout,
            local,
        })
    }

    /// Set the backend endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the poll interval of `wait`.
    pub fn with_wait_poll_interval(mut self, interval: Duration) -> Self {
        self.wait_poll_interval = interval;
        self
    }

    /// Set (or clear) the deadline of `wait`.
    pub fn with_wait_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.wait_timeout = timeout;
        self
    }

    /// Select local or backend mode.
    pub fn with_local(mut self, local: bool) -> Self {
        self.local = local;
        self
    }
}
