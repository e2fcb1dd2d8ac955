//! # ai-gateway-hooks
//!
//! Plugin hook pipeline for AI gateways: every provider call is wrapped in an
//! ordered chain of independently developed plugins (rate limiting, caching,
//! logging, monitoring) that observe and modify traffic without touching the
//! gateway's dispatch code.
//!
//! ## Guarantees
//!
//! - A plugin's post-hook runs if and only if its pre-hook ran for that request.
//! - Post-hooks run in the exact reverse order of pre-hook activation.
//! - Once a pre-hook answers a request (short-circuit), no later pre-hook and
//!   no provider call run.
//! - Failures and cancellations stop the forward phase but never skip the
//!   post-hooks of plugins that were already activated.
//! - Every plugin is cleaned up exactly once at shutdown.
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`plugins`] | Plugin contract, closure-backed plugins, registry |
//! | [`pipeline`] | Executor, per-request context and record, config |
//! | [`shutdown`] | Sequential cleanup at process teardown |
//! | [`types`] | Request and response values |
//! | [`logging`] | `tracing` subscriber setup |
//!
//! ## Plugin Order
//!
//! Registration order is load-bearing. With `[RateLimit, Cache, Logging]`, a
//! cache hit in `Cache` skips `Logging` entirely, and the post-hooks run as
//! `Cache`, then `RateLimit`.

pub mod error;
pub mod logging;
pub mod pipeline;
pub mod plugins;
pub mod shutdown;
pub mod types;

pub use error::{CancelReason, CompositeError, Error, ErrorContext, Stage};
pub use pipeline::{
    ExecutionContext, ExecutionRecord, ExecutorConfig, ExecutorSignals, PipelineExecutor,
    PipelineOutcome,
};
pub use plugins::{FnPlugin, Plugin, PluginRegistry, PreHookOutcome};
pub use shutdown::{CleanupFailure, ShutdownCoordinator};
pub use types::{Request, Response, Usage};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;
