//! Cluster client configuration
//!
//! Describes how endpoints are reached: the base path of the cluster's
//! control API and an optional shared token.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::EnvLookup;

/// Configuration of the HTTP client used against every endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base path of the cluster endpoints (default: "/_raft")
    /// Endpoints will be: {path}/status, {path}/kv/{key}, {path}/members
    pub base_path: String,
    /// If set, every request carries header `X-Raft-Token: <token>`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    pub connect_timeout_ms: u64,
    /// Timeout of a single status query
    pub status_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_path: "/_raft".to_string(),
            auth_token: None,
            connect_timeout_ms: 5_000,
            status_timeout_ms: 5_000,
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_path(mut self, path: impl Into<String>) -> Self {
        self.base_path = path.into();
        self
    }

    pub fn with_auth(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub(crate) fn apply_env(&mut self, env: &EnvLookup<'_>) {
        if let Some(path) = env("JOINBENCH_BASE_PATH") {
            self.base_path = path;
        }
        if let Some(token) = env("JOINBENCH_TOKEN") {
            if !token.is_empty() {
                self.auth_token = Some(token);
            }
        }
        if let Some(ms) = env("JOINBENCH_CONNECT_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.connect_timeout_ms = ms;
        }
        if let Some(ms) = env("JOINBENCH_STATUS_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.status_timeout_ms = ms;
        }
    }

    pub fn status_path(&self) -> String {
        format!("{}/status", self.base_path)
    }

    pub fn kv_path(&self, key: &str) -> String {
        format!("{}/kv/{}", self.base_path, key)
    }

    pub fn members_path(&self) -> String {
        format!("{}/members", self.base_path)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn status_timeout(&self) -> Duration {
        Duration::from_millis(self.status_timeout_ms)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.base_path.starts_with('/') {
            anyhow::bail!("client base_path must start with '/', got '{}'", self.base_path);
        }
        if self.base_path.len() > 1 && self.base_path.ends_with('/') {
            anyhow::bail!("client base_path must not end with '/'");
        }
        if self.connect_timeout_ms == 0 || self.status_timeout_ms == 0 {
            anyhow::bail!("client timeouts must be greater than zero");
        }
        Ok(())
    }
}
