//! Plugin capability contract.

use async_trait::async_trait;

use crate::pipeline::ExecutionContext;
use crate::types::{Request, Response};
use crate::Result;

/// What a pre-hook wants the executor to do next.
///
/// - `request: Some(_)` replaces the outbound request.
/// - `response: Some(_)` short-circuits: no later pre-hook and no provider
///   call run for this request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreHookOutcome {
    pub request: Option<Request>,
    pub response: Option<Response>,
}

impl PreHookOutcome {
    /// Keep the request as is and continue.
    pub fn proceed() -> Self {
        Self::default()
    }

    /// Continue with a replacement request.
    pub fn replace(request: Request) -> Self {
        Self {
            request: Some(request),
            response: None,
        }
    }

    /// Answer the request without calling further pre-hooks or the provider.
    pub fn short_circuit(response: Response) -> Self {
        Self {
            request: None,
            response: Some(response),
        }
    }

    pub fn with_request(mut self, request: Request) -> Self {
        self.request = Some(request);
        self
    }

    pub fn is_short_circuit(&self) -> bool {
        self.response.is_some()
    }
}

/// A gateway extension wrapped around every provider call.
///
/// For each request, `post_hook` runs if and only if `pre_hook` ran, in the
/// reverse order of activation. `cleanup` runs once at process shutdown.
/// Implementations hold their own synchronization: the executor calls hooks
/// of the same plugin concurrently for different requests.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str {
        let full = std::any::type_name::<Self>();
        let path = full.split('<').next().unwrap_or(full);
        path.rsplit("::").next().unwrap_or(path)
    }

    async fn pre_hook(
        &self,
        ctx: &mut ExecutionContext,
        request: &Request,
    ) -> Result<PreHookOutcome>;

    /// `Ok(None)` keeps the current response; `Ok(Some(_))` replaces it.
    async fn post_hook(
        &self,
        ctx: &mut ExecutionContext,
        response: &Response,
    ) -> Result<Option<Response>>;

    async fn cleanup(&self) -> Result<()>;
}
