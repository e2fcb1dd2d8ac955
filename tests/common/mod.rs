//! Shared test plugins: they append every hook call to a common log.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ai_gateway_hooks::{
    Error, ExecutionContext, Plugin, PreHookOutcome, Request, Response, Result,
};
use async_trait::async_trait;
use serde_json::json;

pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(log: &CallLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

#[derive(Clone)]
pub enum PreBehavior {
    Proceed,
    Replace(Request),
    ShortCircuit(Response),
    Fail(&'static str),
    /// Suspend until the request is cancelled.
    Hang,
    Sleep(Duration),
}

pub struct Recorder {
    name: String,
    log: CallLog,
    pre: PreBehavior,
    fail_post: bool,
    stamp_post: bool,
    fail_cleanup: bool,
    hang_post: bool,
    pub cleanups: Arc<AtomicUsize>,
}

impl Recorder {
    pub fn new(name: &str, log: &CallLog) -> Self {
        Self {
            name: name.to_string(),
            log: Arc::clone(log),
            pre: PreBehavior::Proceed,
            fail_post: false,
            stamp_post: false,
            fail_cleanup: false,
            hang_post: false,
            cleanups: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn pre(mut self, behavior: PreBehavior) -> Self {
        self.pre = behavior;
        self
    }

    pub fn failing_post(mut self) -> Self {
        self.fail_post = true;
        self
    }

    /// Post-hook replaces the response, appending its name to `payload.trail`.
    pub fn stamping_post(mut self) -> Self {
        self.stamp_post = true;
        self
    }

    pub fn hanging_post(mut self) -> Self {
        self.hang_post = true;
        self
    }

    pub fn failing_cleanup(mut self) -> Self {
        self.fail_cleanup = true;
        self
    }

    fn push(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }
}

#[async_trait]
impl Plugin for Recorder {
    fn name(&self) -> &str {
        &self.name
    }

    async fn pre_hook(
        &self,
        ctx: &mut ExecutionContext,
        _request: &Request,
    ) -> Result<PreHookOutcome> {
        self.push(format!("pre:{}", self.name));
        match &self.pre {
            PreBehavior::Proceed => Ok(PreHookOutcome::proceed()),
            PreBehavior::Replace(r) => Ok(PreHookOutcome::replace(r.clone())),
            PreBehavior::ShortCircuit(r) => Ok(PreHookOutcome::short_circuit(r.clone())),
            PreBehavior::Fail(msg) => Err(Error::plugin(*msg)),
            PreBehavior::Hang => std::future::pending().await,
            PreBehavior::Sleep(d) => {
                tokio::time::sleep(*d).await;
                ctx.check()?;
                Ok(PreHookOutcome::proceed())
            }
        }
    }

    async fn post_hook(
        &self,
        _ctx: &mut ExecutionContext,
        response: &Response,
    ) -> Result<Option<Response>> {
        self.push(format!("post:{}", self.name));
        if self.hang_post {
            return std::future::pending().await;
        }
        if self.fail_post {
            return Err(Error::plugin(format!("{} post-hook failed", self.name)));
        }
        if self.stamp_post {
            let mut next = response.clone();
            let mut trail = next.payload["trail"].as_array().cloned().unwrap_or_default();
            trail.push(json!(self.name));
            next.payload["trail"] = json!(trail);
            return Ok(Some(next));
        }
        Ok(None)
    }

    async fn cleanup(&self) -> Result<()> {
        self.cleanups.fetch_add(1, Ordering::SeqCst);
        self.push(format!("cleanup:{}", self.name));
        if self.fail_cleanup {
            return Err(Error::plugin(format!("{} cleanup failed", self.name)));
        }
        Ok(())
    }
}

/// Provider stand-in that logs the call and echoes the request's model.
pub async fn echo_provider(log: CallLog, request: Request) -> Result<Response> {
    log.lock().unwrap().push("invoke".to_string());
    Ok(Response::new(json!({ "model": request.model })))
}

pub async fn failing_provider(log: CallLog, _request: Request) -> Result<Response> {
    log.lock().unwrap().push("invoke".to_string());
    Err(Error::plugin("upstream returned 503"))
}

pub fn request() -> Request {
    Request::for_model("openai/gpt-4o-mini").with_operation("chat")
}
