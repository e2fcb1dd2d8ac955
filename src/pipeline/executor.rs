//! Forward / provider / reverse orchestration.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, debug_span, info, warn, Instrument};

use super::config::ExecutorConfig;
use super::context::ExecutionContext;
use super::record::ExecutionRecord;
use super::signals::{Counters, ExecutorSignals, InflightSnapshot};
use crate::error::{CancelReason, Stage};
use crate::plugins::PluginRegistry;
use crate::types::{Request, Response};
use crate::{Error, ErrorContext, Result};

/// Final state of one pipeline execution.
#[derive(Debug)]
pub struct PipelineOutcome {
    /// The response after every activated post-hook had its turn. An
    /// error-response if the forward phase or the provider failed.
    pub response: Response,
    /// Every failure of the execution: none, a single error, or a composite.
    pub error: Option<Error>,
    pub record: ExecutionRecord,
    pub request_id: String,
}

impl PipelineOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<Response> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.response),
        }
    }
}

struct Inner {
    registry: Arc<PluginRegistry>,
    config: ExecutorConfig,
    inflight: Option<Arc<Semaphore>>,
    counters: Arc<Counters>,
}

/// Runs requests through the sealed plugin chain.
///
/// For every request:
/// 1. pre-hooks run in registration order until one short-circuits, fails or
///    is cancelled;
/// 2. the provider is invoked unless the forward phase stopped early;
/// 3. post-hooks run for exactly the activated plugins, in reverse order.
///
/// A failing or cancelled pre-hook counts as activated, so its own post-hook
/// still runs. Post-hook failures are collected and never stop the reverse
/// phase. Cloning is cheap; clones share the registry and counters.
#[derive(Clone)]
pub struct PipelineExecutor {
    inner: Arc<Inner>,
}

impl PipelineExecutor {
    pub fn new(registry: Arc<PluginRegistry>) -> Self {
        Self::with_config(registry, ExecutorConfig::default())
    }

    /// A `max_inflight` of zero is raised to one, as with
    /// [`ExecutorConfig::with_max_inflight`].
    pub fn with_config(registry: Arc<PluginRegistry>, mut config: ExecutorConfig) -> Self {
        config.max_inflight = config.max_inflight.map(|n| n.max(1));
        let inflight = config
            .max_inflight
            .map(|n| Arc::new(Semaphore::new(n)));
        Self {
            inner: Arc::new(Inner {
                registry,
                config,
                inflight,
                counters: Arc::new(Counters::default()),
            }),
        }
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.inner.registry
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.inner.config
    }

    pub fn signals(&self) -> ExecutorSignals {
        let backpressure = self.inner.inflight.as_ref().and_then(|sem| {
            let max = self.inner.config.max_inflight?;
            let available = sem.available_permits();
            Some(InflightSnapshot {
                max,
                available,
                in_use: max.saturating_sub(available),
            })
        });
        self.inner.counters.snapshot(backpressure)
    }

    /// Resolves once no execution is in flight.
    pub async fn wait_idle(&self) {
        self.inner.counters.wait_idle().await
    }

    /// Execute `request` with a fresh context.
    pub async fn execute<F, Fut>(&self, request: Request, invoke: F) -> PipelineOutcome
    where
        F: FnOnce(Request) -> Fut,
        Fut: Future<Output = Result<Response>>,
    {
        self.execute_in(ExecutionContext::new(), request, invoke)
            .await
    }

    /// Execute `request` with a caller-built context (parent token, deadline,
    /// request id, seed values). The context is consumed.
    pub async fn execute_in<F, Fut>(
        &self,
        ctx: ExecutionContext,
        request: Request,
        invoke: F,
    ) -> PipelineOutcome
    where
        F: FnOnce(Request) -> Fut,
        Fut: Future<Output = Result<Response>>,
    {
        let span = debug_span!(
            "pipeline",
            request_id = %ctx.request_id(),
            model = %request.model_id()
        );
        self.run(ctx, request, invoke).instrument(span).await
    }

    async fn run<F, Fut>(&self, ctx: ExecutionContext, request: Request, invoke: F) -> PipelineOutcome
    where
        F: FnOnce(Request) -> Fut,
        Fut: Future<Output = Result<Response>>,
    {
        let _guard = self.inner.counters.enter();
        let mut ctx = match self.inner.config.default_timeout() {
            Some(timeout) if ctx.deadline().is_none() => ctx.with_timeout(timeout),
            _ => ctx,
        };
        let request_id = ctx.request_id().to_string();

        let _permit = match self.acquire_permit(&ctx).await {
            Ok(permit) => permit,
            Err(err) => {
                warn!(error = %err, "request rejected before the forward phase");
                self.inner.counters.record(false, true);
                return PipelineOutcome {
                    response: Response::error_response(&err),
                    error: Some(err),
                    record: ExecutionRecord::new(),
                    request_id,
                };
            }
        };

        let registry = Arc::clone(&self.inner.registry);
        let mut record = ExecutionRecord::with_capacity(registry.len());
        let mut request = request;
        let mut response: Option<Response> = None;
        let mut terminal: Option<Error> = None;

        // Forward phase.
        for (index, plugin) in registry.forward() {
            ctx.enter(Stage::Pre, Some(index));
            if let Some(reason) = ctx.cancel_reason() {
                // The hook never runs, so it is not activated.
                warn!(plugin_index = index, plugin = plugin.name(), %reason, "request cancelled before pre-hook");
                terminal = Some(Error::cancelled(Stage::Pre, Some(index), reason));
                break;
            }

            debug!(plugin_index = index, plugin = plugin.name(), "running pre-hook");
            let signal = ctx.signal();
            let result = signal.guard(plugin.pre_hook(&mut ctx, &request)).await;
            record.activate(index);

            match result {
                Ok(Ok(outcome)) => {
                    if let Some(replacement) = outcome.request {
                        request = replacement;
                    }
                    if let Some(early) = outcome.response {
                        info!(plugin_index = index, plugin = plugin.name(), "pre-hook short-circuited request");
                        record.mark_short_circuit(index);
                        response = Some(early);
                        break;
                    }
                }
                Ok(Err(err)) => {
                    let err = err.attribute(Stage::Pre, Some((index, plugin.name())));
                    warn!(plugin_index = index, plugin = plugin.name(), error = %err, "pre-hook failed");
                    record.mark_failed(index);
                    terminal = Some(err);
                    break;
                }
                Err(reason) => {
                    warn!(plugin_index = index, plugin = plugin.name(), %reason, "pre-hook cancelled");
                    record.mark_failed(index);
                    terminal = Some(Error::cancelled(Stage::Pre, Some(index), reason));
                    break;
                }
            }
        }

        // Provider phase.
        if response.is_none() && terminal.is_none() {
            ctx.enter(Stage::Provider, None);
            match ctx.cancel_reason() {
                Some(reason) => {
                    warn!(%reason, "request cancelled before provider invocation");
                    terminal = Some(Error::cancelled(Stage::Provider, None, reason));
                }
                None => {
                    debug!("invoking provider");
                    record.mark_provider_invoked();
                    let signal = ctx.signal();
                    match signal.guard(invoke(request)).await {
                        Ok(Ok(r)) => response = Some(r),
                        Ok(Err(err)) => {
                            let err = err.attribute(Stage::Provider, None);
                            warn!(error = %err, "provider invocation failed");
                            terminal = Some(err);
                        }
                        Err(reason) => {
                            warn!(%reason, "provider invocation cancelled");
                            terminal = Some(Error::cancelled(Stage::Provider, None, reason));
                        }
                    }
                }
            }
        }

        let mut response = response.unwrap_or_else(|| {
            terminal
                .as_ref()
                .map(Response::error_response)
                .unwrap_or_default()
        });

        // Reverse phase: every activated plugin, newest first, whatever happened above.
        let mut errors: Vec<Error> = terminal.into_iter().collect();
        let grace = self.inner.config.teardown_grace();
        for index in record.teardown_order() {
            let Some(plugin) = registry.get(index) else {
                continue;
            };
            ctx.enter(Stage::Post, Some(index));
            debug!(plugin_index = index, plugin = plugin.name(), "running post-hook");

            let result = if ctx.is_cancelled() {
                tokio::time::timeout(grace, plugin.post_hook(&mut ctx, &response))
                    .await
                    .map_err(|_| CancelReason::TeardownGraceElapsed)
            } else {
                let signal = ctx.signal();
                signal.guard(plugin.post_hook(&mut ctx, &response)).await
            };

            match result {
                Ok(Ok(Some(next))) => response = next,
                Ok(Ok(None)) => {}
                Ok(Err(err)) => {
                    let err = err.attribute(Stage::Post, Some((index, plugin.name())));
                    warn!(plugin_index = index, plugin = plugin.name(), error = %err, "post-hook failed");
                    errors.push(err);
                }
                Err(reason) => {
                    warn!(plugin_index = index, plugin = plugin.name(), %reason, "post-hook cancelled");
                    errors.push(Error::cancelled(Stage::Post, Some(index), reason));
                }
            }
        }

        let error = Error::combine(errors);
        self.inner
            .counters
            .record(record.short_circuited_by().is_some(), error.is_some());
        debug!(
            activated = record.len(),
            short_circuited = record.short_circuited_by().is_some(),
            failed = error.is_some(),
            "pipeline finished"
        );

        PipelineOutcome {
            response,
            error,
            record,
            request_id,
        }
    }

    async fn acquire_permit(&self, ctx: &ExecutionContext) -> Result<Option<OwnedSemaphorePermit>> {
        let Some(sem) = &self.inner.inflight else {
            return Ok(None);
        };
        match ctx.signal().guard(Arc::clone(sem).acquire_owned()).await {
            Ok(Ok(permit)) => Ok(Some(permit)),
            Ok(Err(_)) => Err(Error::runtime_with_context(
                "Backpressure semaphore closed",
                ErrorContext::new().with_source("backpressure"),
            )),
            Err(reason) => Err(Error::cancelled(Stage::Pre, None, reason)),
        }
    }
}

impl std::fmt::Debug for PipelineExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineExecutor")
            .field("registry", &self.inner.registry)
            .field("config", &self.inner.config)
            .finish()
    }
}
