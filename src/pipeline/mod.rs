//! # Hook Pipeline Layer
//!
//! Wraps every provider call in the registry's ordered chain of plugins.
//!
//! ## Stages
//!
//! ```text
//! Request → Pre(0) → Pre(1) → … → Pre(N-1) → Provider → Post(N-1) → … → Post(0) → Response
//!              │                     │
//!              └─ short-circuit / error / cancel: skip ahead to the
//!                 post-hooks of the plugins activated so far
//! ```
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`PipelineExecutor`] | Forward, provider and reverse phases |
//! | [`ExecutionContext`] | Per-request cancellation, deadline and shared values |
//! | [`ExecutionRecord`] | Activated plugin indices driving the reverse phase |
//! | [`ExecutorConfig`] | Timeouts and backpressure |
//! | [`ExecutorSignals`] | In-flight and outcome counters |
//!
//! ## Example
//!
//! ```rust
//! use ai_gateway_hooks::pipeline::PipelineExecutor;
//! use ai_gateway_hooks::plugins::{FnPlugin, PluginRegistry};
//! use ai_gateway_hooks::types::{Request, Response};
//!
//! async fn call_provider(req: Request) -> ai_gateway_hooks::Result<Response> {
//!     Ok(Response::new(serde_json::json!({ "echo": req.model })))
//! }
//!
//! # async fn demo() -> ai_gateway_hooks::Result<()> {
//! let registry = PluginRegistry::new()
//!     .with(FnPlugin::new("logging"))
//!     .seal();
//! let executor = PipelineExecutor::new(registry);
//!
//! let outcome = executor
//!     .execute(Request::for_model("openai/gpt-4o"), call_provider)
//!     .await;
//! let response = outcome.into_result()?;
//! # let _ = response;
//! # Ok(())
//! # }
//! ```

mod config;
mod context;
mod executor;
mod record;
mod signals;

#[cfg(test)]
mod tests;

pub use config::ExecutorConfig;
pub use context::{CancelSignal, ExecutionContext};
pub use executor::{PipelineExecutor, PipelineOutcome};
pub use record::ExecutionRecord;
pub use signals::{ExecutorSignals, InflightSnapshot};
