//! Closure-backed plugins.

use async_trait::async_trait;

use super::base::{Plugin, PreHookOutcome};
use crate::pipeline::ExecutionContext;
use crate::types::{Request, Response};
use crate::Result;

type PreFn = dyn Fn(&mut ExecutionContext, &Request) -> Result<PreHookOutcome> + Send + Sync;
type PostFn = dyn Fn(&mut ExecutionContext, &Response) -> Result<Option<Response>> + Send + Sync;
type CleanupFn = dyn Fn() -> Result<()> + Send + Sync;

/// A plugin assembled from synchronous closures.
///
/// Missing hooks are no-ops. Handy for small integrations that do not warrant
/// a dedicated type.
///
/// ```rust
/// use ai_gateway_hooks::plugins::{FnPlugin, PreHookOutcome};
///
/// let tagger = FnPlugin::new("tagger").on_pre(|ctx, _req| {
///     ctx.insert("tagged", serde_json::json!(true));
///     Ok(PreHookOutcome::proceed())
/// });
/// ```
pub struct FnPlugin {
    name: String,
    pre: Option<Box<PreFn>>,
    post: Option<Box<PostFn>>,
    cleanup: Option<Box<CleanupFn>>,
}

impl FnPlugin {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pre: None,
            post: None,
            cleanup: None,
        }
    }

    pub fn on_pre<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut ExecutionContext, &Request) -> Result<PreHookOutcome> + Send + Sync + 'static,
    {
        self.pre = Some(Box::new(f));
        self
    }

    pub fn on_post<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut ExecutionContext, &Response) -> Result<Option<Response>> + Send + Sync + 'static,
    {
        self.post = Some(Box::new(f));
        self
    }

    pub fn on_cleanup<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        self.cleanup = Some(Box::new(f));
        self
    }
}

impl std::fmt::Debug for FnPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnPlugin")
            .field("name", &self.name)
            .field("pre", &self.pre.is_some())
            .field("post", &self.post.is_some())
            .field("cleanup", &self.cleanup.is_some())
            .finish()
    }
}

#[async_trait]
impl Plugin for FnPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    async fn pre_hook(
        &self,
        ctx: &mut ExecutionContext,
        request: &Request,
    ) -> Result<PreHookOutcome> {
        match &self.pre {
            Some(f) => f(ctx, request),
            None => Ok(PreHookOutcome::proceed()),
        }
    }

    async fn post_hook(
        &self,
        ctx: &mut ExecutionContext,
        response: &Response,
    ) -> Result<Option<Response>> {
        match &self.post {
            Some(f) => f(ctx, response),
            None => Ok(None),
        }
    }

    async fn cleanup(&self) -> Result<()> {
        match &self.cleanup {
            Some(f) => f(),
            None => Ok(()),
        }
    }
}
