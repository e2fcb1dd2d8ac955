//! Executor configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{Error, ErrorContext, Result};

const DEFAULT_TEARDOWN_GRACE_MS: u64 = 5_000;

/// Tunables for [`PipelineExecutor`](super::PipelineExecutor).
///
/// Everything is optional. Values can come from code, from YAML, or from the
/// environment:
/// - `AI_HOOKS_DEFAULT_TIMEOUT_MS`: deadline for requests whose context has none
/// - `AI_HOOKS_TEARDOWN_GRACE_MS`: bound on each post-hook once a request is cancelled
/// - `AI_HOOKS_MAX_INFLIGHT`: backpressure limit on concurrent executions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_timeout_ms: Option<u64>,
    pub teardown_grace_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_inflight: Option<usize>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: None,
            teardown_grace_ms: DEFAULT_TEARDOWN_GRACE_MS,
            max_inflight: None,
        }
    }
}

impl ExecutorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn with_teardown_grace(mut self, grace: Duration) -> Self {
        self.teardown_grace_ms = grace.as_millis() as u64;
        self
    }

    /// Limit concurrent executions. Zero is raised to one.
    pub fn with_max_inflight(mut self, n: usize) -> Self {
        self.max_inflight = Some(n.max(1));
        self
    }

    /// Parse a YAML document such as:
    ///
    /// ```yaml
    /// default_timeout_ms: 30000
    /// teardown_grace_ms: 2000
    /// max_inflight: 256
    /// ```
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let cfg: Self = serde_yaml::from_str(content).map_err(|e| {
            Error::configuration_with_context(
                "Failed to parse executor config",
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source("executor_config"),
            )
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Defaults overridden by `AI_HOOKS_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `AI_HOOKS_*` environment overrides. Unparseable or zero values are ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(ms) = env_u64("AI_HOOKS_DEFAULT_TIMEOUT_MS") {
            self.default_timeout_ms = Some(ms);
        }
        if let Some(ms) = env_u64("AI_HOOKS_TEARDOWN_GRACE_MS") {
            self.teardown_grace_ms = ms;
        }
        if let Some(n) = env_u64("AI_HOOKS_MAX_INFLIGHT") {
            self.max_inflight = Some(n as usize);
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_inflight == Some(0) {
            return Err(Error::configuration_with_context(
                "max_inflight must be at least 1",
                ErrorContext::new()
                    .with_field_path("max_inflight")
                    .with_source("executor_config"),
            ));
        }
        if self.default_timeout_ms == Some(0) {
            return Err(Error::configuration_with_context(
                "default_timeout_ms must be positive",
                ErrorContext::new()
                    .with_field_path("default_timeout_ms")
                    .with_source("executor_config"),
            ));
        }
        Ok(())
    }

    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout_ms.map(Duration::from_millis)
    }

    pub fn teardown_grace(&self) -> Duration {
        Duration::from_millis(self.teardown_grace_ms)
    }
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name)
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
}
