//! Process-teardown cleanup across all registered plugins.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::Stage;
use crate::pipeline::PipelineExecutor;
use crate::plugins::PluginRegistry;
use crate::{Error, Result};

/// A plugin whose cleanup failed.
#[derive(Debug)]
pub struct CleanupFailure {
    pub plugin_index: usize,
    pub plugin: String,
    /// Always an [`Error::Cleanup`] or a cleanup-stage [`Error::Cancelled`].
    pub error: Error,
}

/// Calls every plugin's cleanup exactly once, in registration order.
///
/// Run it only after in-flight executions have finished, either by draining
/// externally or through [`drain_and_shutdown`](Self::drain_and_shutdown).
#[derive(Debug, Clone)]
pub struct ShutdownCoordinator {
    registry: Arc<PluginRegistry>,
}

impl ShutdownCoordinator {
    pub fn new(registry: Arc<PluginRegistry>) -> Self {
        Self { registry }
    }

    pub fn for_executor(executor: &PipelineExecutor) -> Self {
        Self::new(Arc::clone(executor.registry()))
    }

    /// Clean up every plugin sequentially and report the failures in
    /// registration order. A failure never stops later cleanups.
    ///
    /// Only the first call on a registry does any work; later calls log a
    /// warning and return no failures.
    pub async fn shutdown_all(&self) -> Vec<CleanupFailure> {
        if !self.registry.begin_shutdown() {
            warn!("plugin cleanup already ran for this registry; skipping");
            return Vec::new();
        }

        info!(plugins = self.registry.len(), "cleaning up plugins");
        let mut failures = Vec::new();
        for (index, plugin) in self.registry.forward() {
            debug!(plugin_index = index, plugin = plugin.name(), "running cleanup");
            if let Err(err) = plugin.cleanup().await {
                let error = err.attribute(Stage::Cleanup, Some((index, plugin.name())));
                warn!(plugin_index = index, plugin = plugin.name(), error = %error, "plugin cleanup failed");
                failures.push(CleanupFailure {
                    plugin_index: index,
                    plugin: plugin.name().to_string(),
                    error,
                });
            }
        }
        info!(failed = failures.len(), "plugin cleanup finished");
        failures
    }

    /// Wait for `executor` to go idle, then clean up.
    ///
    /// Fails with [`Error::DrainTimeout`] without cleaning anything up if
    /// executions are still running after `timeout`.
    pub async fn drain_and_shutdown(
        &self,
        executor: &PipelineExecutor,
        timeout: Duration,
    ) -> Result<Vec<CleanupFailure>> {
        if tokio::time::timeout(timeout, executor.wait_idle())
            .await
            .is_err()
        {
            let inflight = executor.signals().inflight;
            warn!(inflight, ?timeout, "executor did not drain before shutdown");
            return Err(Error::DrainTimeout {
                inflight,
                waited: timeout,
            });
        }
        Ok(self.shutdown_all().await)
    }
}
