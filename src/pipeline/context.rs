//! Per-request execution context: cancellation, deadline and hook-shared values.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{CancelReason, Error, Stage};
use crate::Result;

/// Carrier of one request's cancellation signal and its hook-shared values.
///
/// A context belongs to exactly one execution. It is moved into the executor
/// and handed to hooks by `&mut`, so two requests can never observe each
/// other's values.
#[derive(Debug)]
pub struct ExecutionContext {
    request_id: String,
    token: CancellationToken,
    deadline: Option<Instant>,
    values: HashMap<String, serde_json::Value>,
    stage: Stage,
    plugin_index: Option<usize>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            token: CancellationToken::new(),
            deadline: None,
            values: HashMap::new(),
            stage: Stage::Pre,
            plugin_index: None,
        }
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = id.into();
        self
    }

    /// Tie this request to a caller-owned token.
    ///
    /// The context uses a child token: cancelling the parent cancels the
    /// request, cancelling the request leaves the parent untouched.
    pub fn with_parent_token(mut self, parent: &CancellationToken) -> Self {
        self.token = parent.child_token();
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Deadline `timeout` from now. An earlier existing deadline wins.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < candidate => existing,
            _ => candidate,
        });
        self
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Handle that cancels this request when triggered.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline; `None` when no deadline is set.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Stage the executor is currently running hooks for.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Index of the plugin whose hook is currently running.
    pub fn plugin_index(&self) -> Option<usize> {
        self.plugin_index
    }

    pub(crate) fn enter(&mut self, stage: Stage, plugin_index: Option<usize>) {
        self.stage = stage;
        self.plugin_index = plugin_index;
    }

    pub fn cancel_reason(&self) -> Option<CancelReason> {
        self.signal().reason()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_reason().is_some()
    }

    /// Fail fast if the request was cancelled or its deadline passed.
    ///
    /// Hooks call this before expensive or suspending work.
    pub fn check(&self) -> Result<()> {
        match self.cancel_reason() {
            Some(reason) => Err(Error::cancelled(self.stage, self.plugin_index, reason)),
            None => Ok(()),
        }
    }

    /// Resolves once the request is cancelled or its deadline elapses.
    pub async fn cancelled(&self) -> CancelReason {
        self.signal().fired().await
    }

    /// Detached view of the cancellation signal, usable while `self` is borrowed.
    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            token: self.token.clone(),
            deadline: self.deadline,
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) -> Option<serde_json::Value> {
        self.values.insert(key.into(), value)
    }

    pub fn insert_as<T: Serialize>(&mut self, key: impl Into<String>, value: &T) -> Result<()> {
        let v = serde_json::to_value(value)?;
        self.values.insert(key.into(), v);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.values.get(key)
    }

    /// Typed lookup. `Ok(None)` if absent, an error if the stored value has another shape.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.values.get(key) {
            Some(v) => Ok(Some(serde_json::from_value(v.clone())?)),
            None => Ok(None),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.values.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Cancellation token plus deadline, cloned out of a context.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CancelSignal {
    /// Reason the signal has already fired, if it has.
    pub fn reason(&self) -> Option<CancelReason> {
        if self.token.is_cancelled() {
            return Some(CancelReason::Cancelled);
        }
        match self.deadline {
            Some(d) if d <= Instant::now() => Some(CancelReason::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves once the token is cancelled or the deadline elapses.
    pub async fn fired(&self) -> CancelReason {
        match self.deadline {
            Some(deadline) => tokio::select! {
                _ = self.token.cancelled() => CancelReason::Cancelled,
                _ = tokio::time::sleep_until(deadline) => CancelReason::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                CancelReason::Cancelled
            }
        }
    }

    /// Run `fut` until it completes or the signal fires, whichever is first.
    pub async fn guard<F>(&self, fut: F) -> std::result::Result<F::Output, CancelReason>
    where
        F: Future,
    {
        tokio::select! {
            reason = self.fired() => Err(reason),
            value = fut => Ok(value),
        }
    }
}
