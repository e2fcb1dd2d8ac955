//! Response value flowing back through post-hooks.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Stage};

/// Token accounting reported alongside a response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl Usage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// Description of the failure an error-response stands in for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub stage: Option<Stage>,
    pub plugin_index: Option<usize>,
    pub message: String,
}

/// Result of a request, produced by a short-circuiting pre-hook or by the
/// provider, and replaceable by any post-hook.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    /// Set on error-responses; observer plugins use it to see failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

impl Response {
    pub fn new(payload: serde_json::Value) -> Self {
        Self {
            payload,
            ..Default::default()
        }
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Placeholder response describing `err`, used when no real response exists.
    pub fn error_response(err: &Error) -> Self {
        Self {
            payload: serde_json::Value::Null,
            usage: None,
            error: Some(ErrorInfo {
                stage: err.stage(),
                plugin_index: err.plugin_index(),
                message: err.to_string(),
            }),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CancelReason;

    #[test]
    fn error_response_carries_stage() {
        let err = Error::cancelled(Stage::Provider, None, CancelReason::Cancelled);
        let resp = Response::error_response(&err);
        assert!(resp.is_error());
        let info = resp.error.unwrap();
        assert_eq!(info.stage, Some(Stage::Provider));
        assert_eq!(info.plugin_index, None);
        assert!(info.message.contains("cancelled"));
    }

    #[test]
    fn usage_totals() {
        assert_eq!(Usage::new(12, 30).total_tokens, 42);
        assert_eq!(Usage::new(u64::MAX, 1).total_tokens, u64::MAX);
    }
}
