//! Outbound request carried through the hook chain.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The call a gateway is about to make to a provider.
///
/// The payload is opaque at this layer; its shape belongs to the surrounding
/// gateway. Any pre-hook may replace the whole request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Provider identifier (e.g. "openai", "deepseek")
    pub provider: String,
    /// Provider model id (e.g. "gpt-4o-mini")
    pub model: String,
    /// Operation intent (e.g. "chat", "embeddings")
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub operation: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Request {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            ..Default::default()
        }
    }

    /// Parse a `"provider/model"` identifier; a bare model id leaves the provider empty.
    pub fn for_model(id: &str) -> Self {
        match id.split_once('/') {
            Some((provider, model)) => Self::new(provider, model),
            None => Self::new("", id),
        }
    }

    pub fn with_operation(mut self, op: impl Into<String>) -> Self {
        self.operation = op.into();
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// `"provider/model"`, or just the model when no provider is set.
    pub fn model_id(&self) -> String {
        if self.provider.is_empty() {
            self.model.clone()
        } else {
            format!("{}/{}", self.provider, self.model)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn for_model_splits_provider() {
        let req = Request::for_model("deepseek/deepseek-chat");
        assert_eq!(req.provider, "deepseek");
        assert_eq!(req.model, "deepseek-chat");
        assert_eq!(req.model_id(), "deepseek/deepseek-chat");

        let bare = Request::for_model("gpt-4o");
        assert!(bare.provider.is_empty());
        assert_eq!(bare.model_id(), "gpt-4o");
    }
}
