use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured error context for configuration and runtime failures.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorContext {
    /// Configuration key or field that caused the error (e.g., "max_inflight")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected type, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "executor_config", "backpressure")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Pipeline stage an error is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Pre,
    Post,
    Provider,
    Cleanup,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Pre => "pre",
            Stage::Post => "post",
            Stage::Provider => "provider",
            Stage::Cleanup => "cleanup",
        };
        f.write_str(s)
    }
}

/// Why a request stopped waiting on a hook or the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    /// The request's cancellation token fired.
    Cancelled,
    /// The request's deadline elapsed.
    DeadlineExceeded,
    /// A post-hook outlived the teardown grace period of a cancelled request.
    TeardownGraceElapsed,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CancelReason::Cancelled => "cancelled",
            CancelReason::DeadlineExceeded => "deadline exceeded",
            CancelReason::TeardownGraceElapsed => "teardown grace elapsed",
        };
        f.write_str(s)
    }
}

/// Unified error type for the hook pipeline.
///
/// Stage-tagged variants (`PreHook`, `PostHook`, `Provider`, `Cleanup`,
/// `Cancelled`) are produced by the executor and the shutdown coordinator.
/// Hook implementations usually return `Plugin` (via `anyhow`) and let the
/// executor attach the stage and plugin index.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Pre-hook of plugin #{plugin_index} ({plugin}) failed: {source}")]
    PreHook {
        plugin_index: usize,
        plugin: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Post-hook of plugin #{plugin_index} ({plugin}) failed: {source}")]
    PostHook {
        plugin_index: usize,
        plugin: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Provider invocation failed: {source}")]
    Provider {
        #[source]
        source: Box<Error>,
    },

    #[error("Cleanup of plugin #{plugin_index} ({plugin}) failed: {source}")]
    Cleanup {
        plugin_index: usize,
        plugin: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Request {reason} during {stage} stage{}", format_index(.plugin_index))]
    Cancelled {
        stage: Stage,
        plugin_index: Option<usize>,
        reason: CancelReason,
    },

    #[error("{0}")]
    Composite(CompositeError),

    #[error("Timed out after {waited:?} waiting for {inflight} in-flight executions to drain")]
    DrainTimeout { inflight: usize, waited: Duration },

    #[error("Plugin error: {0}")]
    Plugin(#[from] anyhow::Error),

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Runtime error: {message}{}", format_context(.context))]
    Runtime {
        message: String,
        context: ErrorContext,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn format_index(index: &Option<usize>) -> String {
    index
        .map(|i| format!(" (plugin #{})", i))
        .unwrap_or_default()
}

fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    /// Shorthand for a plugin-level failure with a plain message.
    pub fn plugin(msg: impl fmt::Display + fmt::Debug + Send + Sync + 'static) -> Self {
        Error::Plugin(anyhow::Error::msg(msg))
    }

    pub fn runtime_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Runtime {
            message: msg.into(),
            context,
        }
    }

    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Build a cancellation error for the given stage.
    pub fn cancelled(stage: Stage, plugin_index: Option<usize>, reason: CancelReason) -> Self {
        Error::Cancelled {
            stage,
            plugin_index,
            reason,
        }
    }

    /// Stage this error is attributed to, if any.
    ///
    /// A composite reports the stage of its first member.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::PreHook { .. } => Some(Stage::Pre),
            Error::PostHook { .. } => Some(Stage::Post),
            Error::Provider { .. } => Some(Stage::Provider),
            Error::Cleanup { .. } => Some(Stage::Cleanup),
            Error::Cancelled { stage, .. } => Some(*stage),
            Error::Composite(c) => c.errors.first().and_then(Error::stage),
            _ => None,
        }
    }

    /// Index of the plugin this error is attributed to, if any.
    pub fn plugin_index(&self) -> Option<usize> {
        match self {
            Error::PreHook { plugin_index, .. }
            | Error::PostHook { plugin_index, .. }
            | Error::Cleanup { plugin_index, .. } => Some(*plugin_index),
            Error::Cancelled { plugin_index, .. } => *plugin_index,
            _ => None,
        }
    }

    /// True if this error, or any member of a composite, is a cancellation.
    pub fn is_cancellation(&self) -> bool {
        self.iter()
            .any(|e| matches!(e, Error::Cancelled { .. }))
    }

    /// Iterate over the leaf errors, flattening composites.
    pub fn iter(&self) -> Box<dyn Iterator<Item = &Error> + '_> {
        match self {
            Error::Composite(c) => Box::new(c.errors.iter().flat_map(Error::iter)),
            other => Box::new(std::iter::once(other)),
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } | Error::Runtime { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Tag an error returned by a hook, the provider or a cleanup with the
    /// stage and plugin it came from.
    ///
    /// Cancellations are re-tagged rather than wrapped; a provider error that
    /// is already tagged is kept as is.
    pub(crate) fn attribute(self, stage: Stage, plugin: Option<(usize, &str)>) -> Self {
        let (index, name) = match plugin {
            Some((i, n)) => (Some(i), n.to_string()),
            None => (None, String::new()),
        };
        match (self, stage, index) {
            (Error::Cancelled { reason, .. }, stage, index) => Error::cancelled(stage, index, reason),
            (err @ Error::Provider { .. }, Stage::Provider, _) => err,
            (err, Stage::Pre, Some(plugin_index)) => Error::PreHook {
                plugin_index,
                plugin: name,
                source: Box::new(err),
            },
            (err, Stage::Post, Some(plugin_index)) => Error::PostHook {
                plugin_index,
                plugin: name,
                source: Box::new(err),
            },
            (err, Stage::Cleanup, Some(plugin_index)) => Error::Cleanup {
                plugin_index,
                plugin: name,
                source: Box::new(err),
            },
            (err, _, _) => Error::Provider {
                source: Box::new(err),
            },
        }
    }

    /// Fold a list of errors into at most one: none, the single error, or a composite.
    pub fn combine(mut errors: Vec<Error>) -> Option<Error> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Error::Composite(CompositeError { errors })),
        }
    }
}

/// Several failures from one execution, in the order they occurred.
#[derive(Debug)]
pub struct CompositeError {
    pub errors: Vec<Error>,
}

impl CompositeError {
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for CompositeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} errors occurred", self.errors.len())?;
        for (i, e) in self.errors.iter().enumerate() {
            write!(f, "\n  [{}] {}", i, e)?;
        }
        Ok(())
    }
}

impl std::error::Error for CompositeError {}
